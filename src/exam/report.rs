// src/exam/report.rs

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::AppError,
    exam::scoring::{self, ScoreResult},
    models::{
        attempt::{AnswerMap, Attempt, AttemptSubmission},
        exam::Exam,
        question::Question,
    },
    store::ExamStore,
    utils::html::clean_html,
};

/// What ended the attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmitTrigger {
    User,
    Timeout,
}

/// Grade band by percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Grade {
    Excellent,
    VeryGood,
    Good,
    Acceptable,
    Fail,
}

impl Grade {
    pub fn from_percentage(percentage: f64) -> Self {
        match percentage {
            p if p >= 85.0 => Grade::Excellent,
            p if p >= 75.0 => Grade::VeryGood,
            p if p >= 65.0 => Grade::Good,
            p if p >= 50.0 => Grade::Acceptable,
            _ => Grade::Fail,
        }
    }
}

/// One row of the per-question breakdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionOutcome {
    pub question_id: Uuid,
    pub display_order: i32,
    pub text: String,
    pub selected_index: Option<i64>,
    pub selected_text: Option<String>,
    pub is_correct: bool,
    /// Only filled in when the selection was wrong or missing.
    pub correct_text: Option<String>,
    pub points_awarded: i32,
    pub marks: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExamReport {
    pub exam_id: Uuid,
    pub exam_title: String,
    pub student_id: Uuid,
    /// `None` for a result rebuilt from a stored attempt.
    pub trigger: Option<SubmitTrigger>,
    pub result: ScoreResult,
    pub grade: Grade,
    pub questions: Vec<QuestionOutcome>,
}

/// Breakdown in the order the questions were shown.
pub fn breakdown(questions: &[Question], answers: &AnswerMap) -> Vec<QuestionOutcome> {
    questions
        .iter()
        .map(|q| {
            let selected = answers.get(&q.id).copied();
            let is_correct = selected == Some(q.correct_index);

            QuestionOutcome {
                question_id: q.id,
                display_order: q.display_order,
                text: clean_html(&q.text),
                selected_index: selected,
                selected_text: selected.and_then(|i| q.option_text(i)).map(str::to_string),
                is_correct,
                correct_text: if is_correct {
                    None
                } else {
                    q.option_text(q.correct_index).map(str::to_string)
                },
                points_awarded: if is_correct { q.marks } else { 0 },
                marks: q.marks,
            }
        })
        .collect()
}

pub fn build_report(
    exam: &Exam,
    student_id: Uuid,
    questions: &[Question],
    answers: &AnswerMap,
    result: ScoreResult,
    trigger: Option<SubmitTrigger>,
) -> ExamReport {
    ExamReport {
        exam_id: exam.id,
        exam_title: exam.title.clone(),
        student_id,
        trigger,
        grade: Grade::from_percentage(result.percentage),
        questions: breakdown(questions, answers),
        result,
    }
}

pub fn submission(exam_id: Uuid, student_id: Uuid, answers: &AnswerMap, result: &ScoreResult) -> AttemptSubmission {
    AttemptSubmission {
        exam_id,
        student_id,
        answers: answers.clone(),
        score: result.score,
        total_marks: result.total,
        passed: result.passed,
    }
}

/// Hands the frozen attempt to the store. A failure is logged and swallowed:
/// the student already has the locally computed result.
pub async fn persist(store: &dyn ExamStore, submission: &AttemptSubmission) -> Option<Attempt> {
    match store.submit_attempt(submission).await {
        Ok(attempt) => {
            tracing::info!(
                exam_id = %submission.exam_id,
                student_id = %submission.student_id,
                score = submission.score,
                status = %attempt.status,
                "exam attempt persisted"
            );
            Some(attempt)
        }
        Err(e) => {
            tracing::error!(
                exam_id = %submission.exam_id,
                student_id = %submission.student_id,
                "Failed to persist exam attempt: {}",
                e
            );
            None
        }
    }
}

/// Rebuilds the read-only result for an attempt that was already submitted.
///
/// The stored score is authoritative. Total and passing mark are recomputed
/// from the exam and its questions exactly as at submission time.
pub fn prior_result(exam: &Exam, questions: &[Question], attempt: &Attempt) -> Result<ExamReport, AppError> {
    if !attempt.is_submitted() {
        return Err(AppError::NotFound("Exam attempt has not been submitted".to_string()));
    }

    let answers = attempt
        .answers
        .as_ref()
        .map(|a| a.0.clone())
        .unwrap_or_default();
    let regraded = scoring::score(exam, questions, &answers);

    let total = scoring::total_marks(exam.total_marks, questions);
    let mut result = ScoreResult::evaluate(attempt.score.unwrap_or(0), total, exam.passing_marks);
    result.correct_count = regraded.correct_count;
    result.answered_count = regraded.answered_count;
    result.question_count = regraded.question_count;

    Ok(build_report(exam, attempt.student_id, questions, &answers, result, None))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{models::attempt::STATUS_PASSED, store::MemoryExamStore};
    use chrono::Utc;
    use sqlx::types::Json;

    fn exam() -> Exam {
        Exam {
            id: Uuid::new_v4(),
            course_id: Uuid::new_v4(),
            title: "Geography".to_string(),
            description: None,
            duration_minutes: 10,
            total_marks: None,
            passing_marks: Some(50),
            start_time: None,
            end_time: None,
            is_active: true,
            created_at: None,
        }
    }

    fn questions() -> Vec<Question> {
        // Question i is answered correctly by option i.
        (0..3)
            .map(|i| Question {
                id: Uuid::new_v4(),
                display_order: i,
                text: format!("<b>Capital #{}</b><script>x()</script>", i),
                options: vec!["Paris".into(), "Rome".into(), "Cairo".into()],
                correct_index: i64::from(i),
                marks: 2,
            })
            .collect()
    }

    #[test]
    fn test_grade_bands() {
        assert_eq!(Grade::from_percentage(100.0), Grade::Excellent);
        assert_eq!(Grade::from_percentage(85.0), Grade::Excellent);
        assert_eq!(Grade::from_percentage(80.0), Grade::VeryGood);
        assert_eq!(Grade::from_percentage(65.0), Grade::Good);
        assert_eq!(Grade::from_percentage(50.0), Grade::Acceptable);
        assert_eq!(Grade::from_percentage(49.9), Grade::Fail);
    }

    #[test]
    fn test_breakdown_marks_correct_wrong_and_missing() {
        let qs = questions();
        let mut answers = AnswerMap::new();
        answers.insert(qs[0].id, 0);
        answers.insert(qs[1].id, 2);

        let rows = breakdown(&qs, &answers);
        assert_eq!(rows.len(), 3);

        assert!(rows[0].is_correct);
        assert_eq!(rows[0].points_awarded, 2);
        assert_eq!(rows[0].correct_text, None);

        assert!(!rows[1].is_correct);
        assert_eq!(rows[1].selected_text.as_deref(), Some("Cairo"));
        assert_eq!(rows[1].correct_text.as_deref(), Some("Rome"));

        assert_eq!(rows[2].selected_index, None);
        assert_eq!(rows[2].correct_text.as_deref(), Some("Cairo"));
        assert_eq!(rows[2].points_awarded, 0);
    }

    #[test]
    fn test_breakdown_preserves_order_and_strips_scripts() {
        let qs = questions();
        let rows = breakdown(&qs, &AnswerMap::new());
        let order: Vec<i32> = rows.iter().map(|r| r.display_order).collect();
        assert_eq!(order, vec![0, 1, 2]);
        assert!(!rows[0].text.contains("script"));
        assert!(rows[0].text.contains("<b>"));
    }

    #[test]
    fn test_prior_result_reproduces_recorded_totals() {
        let exam = exam();
        let qs = questions();
        let mut answers = AnswerMap::new();
        answers.insert(qs[0].id, 0);
        answers.insert(qs[1].id, 1);

        let recorded = scoring::score(&exam, &qs, &answers);
        let attempt = Attempt {
            score: Some(recorded.score),
            total_marks: Some(recorded.total),
            status: STATUS_PASSED.to_string(),
            answers: Some(Json(answers.clone())),
            completed_at: Some(Utc::now()),
            ..Attempt::in_progress(exam.id, Uuid::new_v4(), Utc::now())
        };

        let report = prior_result(&exam, &qs, &attempt).unwrap();
        assert_eq!(report.result, recorded);
        assert_eq!(report.trigger, None);
    }

    #[test]
    fn test_prior_result_requires_submission() {
        let attempt = Attempt::in_progress(Uuid::new_v4(), Uuid::new_v4(), Utc::now());
        assert!(prior_result(&exam(), &questions(), &attempt).is_err());
    }

    #[tokio::test]
    async fn test_persist_failure_is_swallowed() {
        let store = MemoryExamStore::new();
        let result = ScoreResult::evaluate(3, 6, Some(50));
        let sub = submission(Uuid::new_v4(), Uuid::new_v4(), &AnswerMap::new(), &result);

        // Nothing was claimed, so the store rejects it.
        assert!(persist(&store, &sub).await.is_none());
    }
}
