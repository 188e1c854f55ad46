// src/exam/session.rs

//! One student's pass through one exam.
//!
//! `Loading -> Blocked | Active -> Submitted`. Only an `Active` session accepts
//! answers or cursor moves; `Submitted` is terminal. The countdown is driven
//! from outside by calling `tick()` once per second.

use serde::Serialize;
use uuid::Uuid;

use crate::{
    error::AppError,
    exam::{
        eligibility::{BlockReason, Eligibility},
        normalize,
        report::{self, ExamReport, SubmitTrigger},
        scoring,
    },
    models::{
        attempt::{AnswerMap, AttemptSubmission},
        exam::Exam,
        question::{PublicQuestion, Question, RawQuestion},
    },
};

/// Seconds left at which the client should highlight the timer.
pub const LOW_TIME_SECONDS: u32 = 300;

#[derive(Debug, Clone, PartialEq)]
pub enum Phase {
    Loading,
    Blocked(BlockReason),
    Active,
    Submitted,
}

/// Outcome of one countdown step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// The session is not running; the countdown should stop.
    Idle,
    Running { time_left: u32 },
    /// Time ran out and the session was submitted with the answers it had.
    Expired,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Progress {
    pub answered: usize,
    pub total: usize,
    pub percent: f64,
    /// Every playable question has an answer, so a user submit is allowed.
    pub complete: bool,
}

#[derive(Debug)]
pub struct ExamSession {
    exam: Exam,
    student_id: Uuid,
    questions: Vec<Question>,
    phase: Phase,
    time_left: u32,
    cursor: usize,
    answers: AnswerMap,
    report: Option<ExamReport>,
}

impl ExamSession {
    /// Starts in `Loading`. Questions are normalized here, once.
    pub fn new(exam: Exam, student_id: Uuid, raw_questions: &[RawQuestion]) -> Self {
        Self {
            questions: normalize::normalize_all(raw_questions),
            exam,
            student_id,
            phase: Phase::Loading,
            time_left: 0,
            cursor: 0,
            answers: AnswerMap::new(),
            report: None,
        }
    }

    /// Applies the eligibility decision: `Loading -> Blocked | Active`.
    pub fn resolve(&mut self, eligibility: Eligibility) -> Result<(), AppError> {
        if self.phase != Phase::Loading {
            return Err(AppError::Conflict("Exam session already started".to_string()));
        }

        match eligibility {
            Eligibility::Blocked(reason) => {
                tracing::debug!(exam_id = %self.exam.id, student_id = %self.student_id, ?reason, "session blocked");
                self.phase = Phase::Blocked(reason);
            }
            Eligibility::Granted(_) => {
                self.time_left = self.exam.duration_seconds();
                self.cursor = 0;
                self.answers.clear();
                self.phase = Phase::Active;
                tracing::debug!(
                    exam_id = %self.exam.id,
                    student_id = %self.student_id,
                    time_left = self.time_left,
                    "session active"
                );
            }
        }
        Ok(())
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn is_active(&self) -> bool {
        self.phase == Phase::Active
    }

    pub fn exam(&self) -> &Exam {
        &self.exam
    }

    pub fn student_id(&self) -> Uuid {
        self.student_id
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn answers(&self) -> &AnswerMap {
        &self.answers
    }

    pub fn time_left(&self) -> u32 {
        self.time_left
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn report(&self) -> Option<&ExamReport> {
        self.report.as_ref()
    }

    fn ensure_active(&self) -> Result<(), AppError> {
        match &self.phase {
            Phase::Active => Ok(()),
            Phase::Submitted => Err(AppError::Conflict("Exam already submitted".to_string())),
            Phase::Blocked(reason) => Err(AppError::Forbidden(reason.message().to_string())),
            Phase::Loading => Err(AppError::Conflict("Exam session is still loading".to_string())),
        }
    }

    /// Records or replaces the answer for a question. The option index is not range-checked.
    pub fn select_answer(&mut self, question_id: Uuid, option_index: i64) -> Result<(), AppError> {
        self.ensure_active()?;
        if !self.questions.iter().any(|q| q.id == question_id) {
            return Err(AppError::NotFound("Question not found in this exam".to_string()));
        }
        self.answers.insert(question_id, option_index);
        Ok(())
    }

    /// Moves the cursor to any question; navigation need not be sequential.
    pub fn go_to_question(&mut self, index: usize) -> Result<(), AppError> {
        self.ensure_active()?;
        if index >= self.questions.len() {
            return Err(AppError::BadRequest(format!(
                "Question index {} out of range (0..{})",
                index,
                self.questions.len()
            )));
        }
        self.cursor = index;
        Ok(())
    }

    /// One second of countdown. Reaching zero submits whatever is answered.
    pub fn tick(&mut self) -> Tick {
        if !self.is_active() {
            return Tick::Idle;
        }

        self.time_left = self.time_left.saturating_sub(1);
        if self.time_left > 0 {
            return Tick::Running {
                time_left: self.time_left,
            };
        }

        tracing::info!(exam_id = %self.exam.id, student_id = %self.student_id, "exam time expired");
        self.finish(SubmitTrigger::Timeout);
        Tick::Expired
    }

    /// `Active -> Submitted`. A user submit needs every playable question
    /// answered; a timeout submit takes the answers as they are.
    pub fn submit(&mut self, trigger: SubmitTrigger) -> Result<&ExamReport, AppError> {
        self.ensure_active()?;

        if trigger == SubmitTrigger::User {
            let progress = self.progress();
            if !progress.complete {
                return Err(AppError::BadRequest(format!(
                    "Answer every question before submitting ({} of {} answered)",
                    progress.answered, progress.total
                )));
            }
        }

        self.finish(trigger);
        self.report
            .as_ref()
            .ok_or(AppError::InternalServerError("Submitted session has no report".to_string()))
    }

    fn finish(&mut self, trigger: SubmitTrigger) {
        let result = scoring::score(&self.exam, &self.questions, &self.answers);
        self.report = Some(report::build_report(
            &self.exam,
            self.student_id,
            &self.questions,
            &self.answers,
            result,
            Some(trigger),
        ));
        self.phase = Phase::Submitted;
    }

    /// The record to persist, once submitted.
    pub fn submission(&self) -> Option<AttemptSubmission> {
        self.report
            .as_ref()
            .map(|r| report::submission(self.exam.id, self.student_id, &self.answers, &r.result))
    }

    pub fn progress(&self) -> Progress {
        let playable: Vec<&Question> = self.questions.iter().filter(|q| q.is_playable()).collect();
        let answered = playable
            .iter()
            .filter(|q| self.answers.contains_key(&q.id))
            .count();
        let total = playable.len();

        Progress {
            answered,
            total,
            percent: if total > 0 {
                answered as f64 / total as f64 * 100.0
            } else {
                100.0
            },
            complete: answered == total,
        }
    }

    pub fn view(&self) -> SessionView {
        let (state, block) = match &self.phase {
            Phase::Loading => ("loading", None),
            Phase::Blocked(reason) => ("blocked", Some(reason.clone())),
            Phase::Active => ("active", None),
            Phase::Submitted => ("submitted", None),
        };
        let progress = self.progress();

        SessionView {
            exam_id: self.exam.id,
            title: self.exam.title.clone(),
            state,
            message: block.as_ref().map(|b| b.message()),
            block,
            time_left: self.time_left,
            time_left_display: format_time(self.time_left),
            low_time: self.is_active() && self.time_left < LOW_TIME_SECONDS,
            current_question_index: self.cursor,
            questions: match self.phase {
                Phase::Active | Phase::Submitted => self.questions.iter().map(PublicQuestion::from).collect(),
                _ => Vec::new(),
            },
            answers: self.answers.clone(),
            incomplete_warning: self.is_active() && !progress.complete,
            progress,
            result: self.report.clone(),
        }
    }
}

/// Snapshot returned to the client.
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub exam_id: Uuid,
    pub title: String,
    pub state: &'static str,
    #[serde(flatten)]
    pub block: Option<BlockReason>,
    pub message: Option<&'static str>,
    pub time_left: u32,
    pub time_left_display: String,
    pub low_time: bool,
    pub current_question_index: usize,
    pub questions: Vec<PublicQuestion>,
    pub answers: AnswerMap,
    pub progress: Progress,
    /// Non-blocking hint shown while some questions are unanswered.
    pub incomplete_warning: bool,
    pub result: Option<ExamReport>,
}

/// `HH:MM:SS`.
pub fn format_time(seconds: u32) -> String {
    format!(
        "{:02}:{:02}:{:02}",
        seconds / 3600,
        (seconds % 3600) / 60,
        seconds % 60
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::attempt::Attempt;
    use chrono::Utc;
    use serde_json::json;

    fn exam(duration_minutes: i32) -> Exam {
        Exam {
            id: Uuid::new_v4(),
            course_id: Uuid::new_v4(),
            title: "Chemistry".to_string(),
            description: None,
            duration_minutes,
            total_marks: None,
            passing_marks: Some(50),
            start_time: None,
            end_time: None,
            is_active: true,
            created_at: None,
        }
    }

    /// Four questions worth 2 marks each; the correct answer is always "b".
    fn raw_questions(exam_id: Uuid) -> Vec<RawQuestion> {
        (0..4)
            .map(|i| RawQuestion {
                id: Uuid::new_v4(),
                exam_id,
                display_order: i,
                question_text: format!("Question {}", i),
                options: Some(json!({"a": "one", "b": "two", "c": "three", "d": "four"})),
                correct_answer: Some(json!("b")),
                marks: Some(2),
            })
            .collect()
    }

    fn granted(exam: &Exam, student: Uuid) -> Eligibility {
        Eligibility::Granted(Attempt::in_progress(exam.id, student, Utc::now()))
    }

    fn active_session(duration_minutes: i32) -> ExamSession {
        let exam = exam(duration_minutes);
        let student = Uuid::new_v4();
        let raw = raw_questions(exam.id);
        let eligibility = granted(&exam, student);
        let mut session = ExamSession::new(exam, student, &raw);
        session.resolve(eligibility).unwrap();
        session
    }

    fn ids(session: &ExamSession) -> Vec<Uuid> {
        session.questions().iter().map(|q| q.id).collect()
    }

    #[test]
    fn test_grant_starts_timer_and_cursor() {
        let session = active_session(30);
        assert!(session.is_active());
        assert_eq!(session.time_left(), 1800);
        assert_eq!(session.cursor(), 0);
        assert!(session.answers().is_empty());
    }

    #[test]
    fn test_blocked_session_rejects_answers() {
        let exam = exam(30);
        let raw = raw_questions(exam.id);
        let mut session = ExamSession::new(exam, Uuid::new_v4(), &raw);
        session
            .resolve(Eligibility::Blocked(BlockReason::AlreadyAttempted { prior_score: Some(4) }))
            .unwrap();

        let qid = session.questions()[0].id;
        assert!(matches!(session.select_answer(qid, 1), Err(AppError::Forbidden(_))));
        assert_eq!(session.tick(), Tick::Idle);
        assert_eq!(session.view().state, "blocked");
        assert!(session.view().questions.is_empty());
    }

    #[test]
    fn test_resolve_only_from_loading() {
        let mut session = active_session(5);
        let again = Eligibility::Blocked(BlockReason::AlreadyAttempted { prior_score: None });
        assert!(session.resolve(again).is_err());
    }

    #[test]
    fn test_select_answer_upserts() {
        let mut session = active_session(5);
        let qid = ids(&session)[0];
        session.select_answer(qid, 0).unwrap();
        session.select_answer(qid, 3).unwrap();
        assert_eq!(session.answers().get(&qid), Some(&3));
        assert_eq!(session.answers().len(), 1);
    }

    #[test]
    fn test_select_answer_accepts_out_of_range_index() {
        let mut session = active_session(5);
        let qid = ids(&session)[1];
        session.select_answer(qid, 42).unwrap();
        assert_eq!(session.answers().get(&qid), Some(&42));
    }

    #[test]
    fn test_select_answer_unknown_question() {
        let mut session = active_session(5);
        assert!(matches!(
            session.select_answer(Uuid::new_v4(), 0),
            Err(AppError::NotFound(_))
        ));
    }

    #[test]
    fn test_navigation_is_non_linear() {
        let mut session = active_session(5);
        session.go_to_question(3).unwrap();
        assert_eq!(session.cursor(), 3);
        session.go_to_question(1).unwrap();
        assert_eq!(session.cursor(), 1);
        assert!(matches!(session.go_to_question(4), Err(AppError::BadRequest(_))));
        assert_eq!(session.cursor(), 1);
    }

    #[test]
    fn test_user_submit_requires_every_answer() {
        let mut session = active_session(5);
        let qs = ids(&session);
        session.select_answer(qs[0], 1).unwrap();

        assert!(matches!(session.submit(SubmitTrigger::User), Err(AppError::BadRequest(_))));
        assert!(session.is_active());
        assert!(session.view().incomplete_warning);
    }

    #[test]
    fn test_three_correct_answers_pass() {
        let mut session = active_session(5);
        let qs = ids(&session);
        session.select_answer(qs[0], 1).unwrap();
        session.select_answer(qs[1], 1).unwrap();
        session.select_answer(qs[2], 1).unwrap();
        session.select_answer(qs[3], 0).unwrap();

        let report = session.submit(SubmitTrigger::User).unwrap();
        assert_eq!(report.result.score, 6);
        assert_eq!(report.result.total, 8);
        assert_eq!(report.result.percentage, 75.0);
        assert!(report.result.passed);
        assert_eq!(report.trigger, Some(SubmitTrigger::User));
    }

    #[test]
    fn test_timeout_submits_partial_answers() {
        let mut session = active_session(1);
        let qs = ids(&session);
        session.select_answer(qs[0], 1).unwrap();

        for _ in 0..59 {
            assert!(matches!(session.tick(), Tick::Running { .. }));
        }
        assert_eq!(session.time_left(), 1);
        assert_eq!(session.tick(), Tick::Expired);
        assert_eq!(session.phase(), &Phase::Submitted);

        let report = session.report().unwrap();
        assert_eq!(report.result.score, 2);
        assert_eq!(report.result.percentage, 25.0);
        assert!(!report.result.passed);
        assert_eq!(report.trigger, Some(SubmitTrigger::Timeout));
    }

    #[test]
    fn test_submitted_session_is_frozen() {
        let mut session = active_session(1);
        let qs = ids(&session);
        for _ in 0..60 {
            session.tick();
        }
        assert_eq!(session.phase(), &Phase::Submitted);

        assert!(matches!(session.select_answer(qs[0], 1), Err(AppError::Conflict(_))));
        assert!(session.submit(SubmitTrigger::Timeout).is_err());
        assert_eq!(session.tick(), Tick::Idle);
        assert!(session.answers().is_empty());

        let submission = session.submission().unwrap();
        assert_eq!(submission.score, 0);
        assert!(!submission.passed);
    }

    #[test]
    fn test_zero_duration_expires_on_first_tick() {
        let mut session = active_session(0);
        assert_eq!(session.tick(), Tick::Expired);
    }

    #[test]
    fn test_unplayable_questions_do_not_block_submit() {
        let exam = exam(5);
        let student = Uuid::new_v4();
        let mut raw = raw_questions(exam.id);
        raw[3].options = Some(json!("not json"));
        let eligibility = granted(&exam, student);
        let mut session = ExamSession::new(exam, student, &raw);
        session.resolve(eligibility).unwrap();

        let qs = ids(&session);
        for id in &qs[..3] {
            session.select_answer(*id, 1).unwrap();
        }
        assert!(session.progress().complete);
        assert!(session.submit(SubmitTrigger::User).is_ok());
    }

    #[test]
    fn test_format_time() {
        assert_eq!(format_time(0), "00:00:00");
        assert_eq!(format_time(3725), "01:02:05");
    }

    #[test]
    fn test_view_serializes_block_reason_inline() {
        let exam = exam(5);
        let mut session = ExamSession::new(exam, Uuid::new_v4(), &[]);
        let start = Utc::now();
        session
            .resolve(Eligibility::Blocked(BlockReason::NotStarted { scheduled_start: start }))
            .unwrap();

        let json = serde_json::to_value(session.view()).unwrap();
        assert_eq!(json["state"], "blocked");
        assert_eq!(json["reason"], "not_started");
        assert!(json["scheduled_start"].is_string());
    }
}
