// src/exam/scoring.rs

use serde::{Deserialize, Serialize};

use crate::models::{attempt::AnswerMap, exam::Exam, question::Question};

/// Outcome of grading one attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    pub score: i32,
    pub total: i32,
    pub percentage: f64,
    pub passing_marks: i32,
    pub passed: bool,
    pub correct_count: usize,
    pub answered_count: usize,
    pub question_count: usize,
}

/// The declared total when present and non-zero, otherwise the sum of question marks.
pub fn total_marks(declared: Option<i32>, questions: &[Question]) -> i32 {
    match declared {
        Some(total) if total != 0 => total,
        _ => questions.iter().map(|q| q.marks).sum(),
    }
}

/// Resolves the raw passing value into an absolute mark count.
///
/// A raw value above `total` but not above 100 is read as a percentage of
/// `total`; anything else is already a mark count. This cannot tell "4 marks"
/// from "4%" on a small exam, and the stored data offers nothing better.
pub fn passing_marks(raw: Option<i32>, total: i32) -> i32 {
    let raw = raw.unwrap_or(0);
    if total > 0 && raw > total && raw <= 100 {
        (f64::from(raw) / 100.0 * f64::from(total)).ceil() as i32
    } else {
        raw
    }
}

/// Grades `answers` against the canonical questions of `exam`.
pub fn score(exam: &Exam, questions: &[Question], answers: &AnswerMap) -> ScoreResult {
    let mut obtained = 0;
    let mut correct_count = 0;

    for question in questions {
        if answers.get(&question.id) == Some(&question.correct_index) {
            obtained += question.marks;
            correct_count += 1;
        }
    }

    let total = total_marks(exam.total_marks, questions);
    let mut result = ScoreResult::evaluate(obtained, total, exam.passing_marks);
    result.correct_count = correct_count;
    result.answered_count = questions.iter().filter(|q| answers.contains_key(&q.id)).count();
    result.question_count = questions.len();
    result
}

impl ScoreResult {
    /// Percentage and pass/fail for an obtained score. Counts are left at zero.
    pub fn evaluate(obtained: i32, total: i32, raw_passing: Option<i32>) -> Self {
        let passing = passing_marks(raw_passing, total);
        let percentage = if total > 0 {
            f64::from(obtained) / f64::from(total) * 100.0
        } else {
            0.0
        };

        Self {
            score: obtained,
            total,
            percentage,
            passing_marks: passing,
            passed: obtained >= passing,
            correct_count: 0,
            answered_count: 0,
            question_count: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn exam(total: Option<i32>, passing: Option<i32>) -> Exam {
        Exam {
            id: Uuid::new_v4(),
            course_id: Uuid::new_v4(),
            title: "Algebra".to_string(),
            description: None,
            duration_minutes: 30,
            total_marks: total,
            passing_marks: passing,
            start_time: None,
            end_time: None,
            is_active: true,
            created_at: None,
        }
    }

    fn questions(count: usize, marks: i32) -> Vec<Question> {
        (0..count)
            .map(|i| Question {
                id: Uuid::new_v4(),
                display_order: i as i32,
                text: format!("Q{}", i),
                options: vec!["w".into(), "x".into(), "y".into(), "z".into()],
                correct_index: (i % 4) as i64,
                marks,
            })
            .collect()
    }

    fn answer_correctly(qs: &[Question], n: usize) -> AnswerMap {
        qs.iter().take(n).map(|q| (q.id, q.correct_index)).collect()
    }

    #[test]
    fn test_passing_marks_absolute_below_total() {
        assert_eq!(passing_marks(Some(30), 50), 30);
    }

    #[test]
    fn test_passing_marks_percentage_above_total() {
        assert_eq!(passing_marks(Some(60), 50), 30);
    }

    #[test]
    fn test_passing_marks_rounds_up() {
        // 50% of 7 is 3.5.
        assert_eq!(passing_marks(Some(50), 7), 4);
    }

    #[test]
    fn test_passing_marks_above_hundred_stays_absolute() {
        assert_eq!(passing_marks(Some(150), 120), 150);
    }

    #[test]
    fn test_passing_marks_missing_is_zero() {
        assert_eq!(passing_marks(None, 10), 0);
    }

    #[test]
    fn test_total_falls_back_to_question_sum() {
        let qs = questions(3, 2);
        assert_eq!(total_marks(None, &qs), 6);
        assert_eq!(total_marks(Some(0), &qs), 6);
        assert_eq!(total_marks(Some(20), &qs), 20);
    }

    #[test]
    fn test_three_of_four_passes() {
        let qs = questions(4, 2);
        let result = score(&exam(None, Some(50)), &qs, &answer_correctly(&qs, 3));
        assert_eq!(result.total, 8);
        assert_eq!(result.passing_marks, 4);
        assert_eq!(result.score, 6);
        assert_eq!(result.percentage, 75.0);
        assert!(result.passed);
    }

    #[test]
    fn test_one_of_four_fails() {
        let qs = questions(4, 2);
        let result = score(&exam(None, Some(50)), &qs, &answer_correctly(&qs, 1));
        assert_eq!(result.score, 2);
        assert_eq!(result.percentage, 25.0);
        assert!(!result.passed);
    }

    #[test]
    fn test_wrong_and_missing_answers_score_zero() {
        let qs = questions(2, 1);
        let mut answers = AnswerMap::new();
        answers.insert(qs[0].id, qs[0].correct_index + 1);
        let result = score(&exam(None, None), &qs, &answers);
        assert_eq!(result.score, 0);
        assert_eq!(result.answered_count, 1);
        assert_eq!(result.correct_count, 0);
    }

    #[test]
    fn test_zero_total_degrades_gracefully() {
        let result = score(&exam(None, Some(0)), &[], &AnswerMap::new());
        assert_eq!(result.total, 0);
        assert_eq!(result.percentage, 0.0);
        assert!(result.passed);
    }

    #[test]
    fn test_additional_correct_answer_never_lowers_score() {
        let qs = questions(6, 3);
        let exam = exam(None, Some(60));
        let mut previous = score(&exam, &qs, &AnswerMap::new());
        for n in 1..=qs.len() {
            let current = score(&exam, &qs, &answer_correctly(&qs, n));
            assert!(current.score >= previous.score);
            assert!(current.percentage >= previous.percentage);
            previous = current;
        }
    }
}
