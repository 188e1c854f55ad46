// src/handlers/mod.rs

pub mod exam;
pub mod session;
pub mod staff;
