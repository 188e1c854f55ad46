// src/exam/mod.rs

//! Exam-taking core: normalization, eligibility, the session state machine,
//! scoring and result reporting.

pub mod eligibility;
pub mod normalize;
pub mod report;
pub mod runner;
pub mod scoring;
pub mod session;
