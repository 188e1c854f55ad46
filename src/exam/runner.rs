// src/exam/runner.rs

//! Hosts live sessions and drives their countdowns.

use std::{collections::HashMap, sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use tokio::{
    sync::Mutex,
    task::JoinHandle,
    time::{self, Instant},
};
use uuid::Uuid;

use crate::{
    error::AppError,
    exam::{
        eligibility,
        report::{self, ExamReport, SubmitTrigger},
        session::{ExamSession, Tick},
    },
    store::ExamStore,
};

const TICK: Duration = Duration::from_secs(1);

pub type SharedSession = Arc<Mutex<ExamSession>>;

/// Live sessions keyed by (exam, student).
#[derive(Clone, Default)]
pub struct SessionRegistry {
    sessions: Arc<Mutex<HashMap<(Uuid, Uuid), SharedSession>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, exam_id: Uuid, student_id: Uuid) -> Option<SharedSession> {
        self.sessions.lock().await.get(&(exam_id, student_id)).cloned()
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    async fn insert(&self, exam_id: Uuid, student_id: Uuid, session: SharedSession) {
        self.sessions.lock().await.insert((exam_id, student_id), session);
    }

    /// Drops the entry for the pair if it still points at `session`.
    async fn release(&self, exam_id: Uuid, student_id: Uuid, session: &SharedSession) {
        let mut sessions = self.sessions.lock().await;
        if sessions
            .get(&(exam_id, student_id))
            .is_some_and(|hosted| Arc::ptr_eq(hosted, session))
        {
            sessions.remove(&(exam_id, student_id));
        }
    }
}

/// Loads the exam, runs the eligibility gate and opens a session.
///
/// A session still running for the pair is returned as is; otherwise the gate
/// runs again. Blocked sessions are returned to the caller but not hosted.
pub async fn start_session(
    store: Arc<dyn ExamStore>,
    registry: &SessionRegistry,
    exam_id: Uuid,
    student_id: Uuid,
    now: DateTime<Utc>,
) -> Result<SharedSession, AppError> {
    if let Some(existing) = registry.get(exam_id, student_id).await {
        if existing.lock().await.is_active() {
            return Ok(existing);
        }
    }

    let exam = store
        .get_exam(exam_id)
        .await?
        .ok_or(AppError::NotFound("Exam not found".to_string()))?;
    let raw_questions = store.get_exam_questions(exam_id).await?;

    let decision = eligibility::check_eligibility(store.as_ref(), &exam, student_id, now).await?;

    let granted = decision.can_attempt();

    let mut session = ExamSession::new(exam, student_id, &raw_questions);
    session.resolve(decision)?;

    let shared: SharedSession = Arc::new(Mutex::new(session));

    if granted {
        registry.insert(exam_id, student_id, shared.clone()).await;
        spawn_countdown(store, registry.clone(), shared.clone());
    }

    Ok(shared)
}

/// Ticks the session once per second until it leaves `Active`. On expiry the
/// forced submission is persisted and the session leaves the registry.
pub fn spawn_countdown(store: Arc<dyn ExamStore>, registry: SessionRegistry, session: SharedSession) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = time::interval_at(Instant::now() + TICK, TICK);

        loop {
            interval.tick().await;

            let (key, submission) = {
                let mut guard = session.lock().await;
                match guard.tick() {
                    Tick::Running { .. } => continue,
                    Tick::Idle => break,
                    Tick::Expired => ((guard.exam().id, guard.student_id()), guard.submission()),
                }
            };

            if let Some(submission) = submission {
                report::persist(store.as_ref(), &submission).await;
            }
            registry.release(key.0, key.1, &session).await;
            break;
        }
    })
}

/// User-initiated submit. The result is returned even if persisting fails.
pub async fn submit_session(
    store: &dyn ExamStore,
    registry: &SessionRegistry,
    session: &SharedSession,
) -> Result<ExamReport, AppError> {
    let (report, submission) = {
        let mut guard = session.lock().await;
        let report = guard.submit(SubmitTrigger::User)?.clone();
        (report, guard.submission())
    };

    if let Some(submission) = submission {
        report::persist(store, &submission).await;
    }
    registry
        .release(report.exam_id, report.student_id, session)
        .await;

    Ok(report)
}
