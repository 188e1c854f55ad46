// src/state.rs

use std::sync::Arc;

use axum::extract::FromRef;

use crate::{config::Config, exam::runner::SessionRegistry, store::ExamStore};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ExamStore>,
    pub config: Config,
    pub sessions: SessionRegistry,
}

impl AppState {
    pub fn new(store: Arc<dyn ExamStore>, config: Config) -> Self {
        Self {
            store,
            config,
            sessions: SessionRegistry::new(),
        }
    }
}

impl FromRef<AppState> for Arc<dyn ExamStore> {
    fn from_ref(state: &AppState) -> Self {
        state.store.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

impl FromRef<AppState> for SessionRegistry {
    fn from_ref(state: &AppState) -> Self {
        state.sessions.clone()
    }
}
