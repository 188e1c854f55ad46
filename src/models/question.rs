// src/models/question.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Represents the 'exam_questions' table in the database.
///
/// `options` and `correct_answer` are JSONB columns whose shape varies between
/// historical authoring tools. Nothing outside `exam::normalize` should look at them.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct RawQuestion {
    pub id: Uuid,
    pub exam_id: Uuid,
    pub display_order: i32,
    pub question_text: String,

    /// A JSON-encoded string, an object keyed `a`..`d`, or an array.
    pub options: Option<serde_json::Value>,

    /// A letter `a`..`d`, or a zero-based numeric index.
    pub correct_answer: Option<serde_json::Value>,

    pub marks: Option<i32>,
}

/// A question in canonical form, produced once at ingestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: Uuid,
    pub display_order: i32,
    pub text: String,
    pub options: Vec<String>,
    pub correct_index: i64,
    pub marks: i32,
}

impl Question {
    /// A question without options cannot be answered and is rendered as such.
    pub fn is_playable(&self) -> bool {
        !self.options.is_empty()
    }

    pub fn option_text(&self, index: i64) -> Option<&str> {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.options.get(i))
            .map(String::as_str)
    }
}

/// DTO for sending a question to the student (excludes the answer key).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicQuestion {
    pub id: Uuid,
    pub display_order: i32,
    pub text: String,
    pub options: Vec<String>,
    pub marks: i32,
    pub playable: bool,
}

impl From<&Question> for PublicQuestion {
    fn from(q: &Question) -> Self {
        Self {
            id: q.id,
            display_order: q.display_order,
            text: crate::utils::html::clean_html(&q.text),
            options: q.options.clone(),
            marks: q.marks,
            playable: q.is_playable(),
        }
    }
}
