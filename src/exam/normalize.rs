// src/exam/normalize.rs

//! Canonicalizes stored multiple-choice data.
//!
//! Questions have been written by several authoring tools over time, so the
//! `options` column may hold a JSON-encoded string, an object keyed `a`..`d`,
//! or an array, and `correct_answer` may hold a letter, a number, or the text
//! of the correct option. Everything past this module sees only `Question`.

use serde_json::Value;

use crate::models::question::{Question, RawQuestion};

/// Object keys read, in order, when options are stored as `{a, b, c, d}`.
const OPTION_KEYS: [&str; 4] = ["a", "b", "c", "d"];

/// Marks awarded when a question carries no positive mark value.
pub const DEFAULT_MARKS: i32 = 1;

/// Converts a stored question into canonical form. Never fails: malformed
/// options become an empty list and an unreadable answer becomes index 0.
pub fn normalize(raw: &RawQuestion) -> Question {
    let options = normalize_options(raw.options.as_ref());
    let correct_index = normalize_correct_answer(raw.correct_answer.as_ref(), &options);

    Question {
        id: raw.id,
        display_order: raw.display_order,
        text: raw.question_text.clone(),
        options,
        correct_index,
        marks: raw.marks.filter(|m| *m > 0).unwrap_or(DEFAULT_MARKS),
    }
}

/// Normalizes a whole exam, preserving display order.
pub fn normalize_all(raw: &[RawQuestion]) -> Vec<Question> {
    let mut questions: Vec<Question> = raw.iter().map(normalize).collect();
    questions.sort_by_key(|q| q.display_order);
    questions
}

pub fn normalize_options(options: Option<&Value>) -> Vec<String> {
    match options {
        Some(Value::String(encoded)) => match serde_json::from_str::<Value>(encoded) {
            Ok(Value::Array(items)) => items.iter().map(option_text).collect(),
            Ok(Value::Object(map)) => from_keyed(&map),
            // A JSON scalar or undecodable text carries no options.
            Ok(_) | Err(_) => Vec::new(),
        },
        Some(Value::Array(items)) => items.iter().map(option_text).collect(),
        Some(Value::Object(map)) => from_keyed(map),
        _ => Vec::new(),
    }
}

pub fn normalize_correct_answer(answer: Option<&Value>, options: &[String]) -> i64 {
    match answer {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.trunc() as i64))
            .unwrap_or(0),
        Some(Value::String(s)) => index_from_str(s, options),
        _ => 0,
    }
}

fn index_from_str(raw: &str, options: &[String]) -> i64 {
    let trimmed = raw.trim();

    // Authoring screens store the correct option's text. Match it before
    // reading letters or indices so options like "1" or "b" resolve correctly.
    if let Some(i) = options.iter().position(|opt| opt == raw || opt.trim() == trimmed) {
        return i as i64;
    }
    if let Some(i) = letter_index(trimmed) {
        return i;
    }
    if !trimmed.is_empty() && trimmed.bytes().all(|b| b.is_ascii_digit()) {
        if let Ok(i) = trimmed.parse::<i64>() {
            return i;
        }
    }

    tracing::debug!(answer = raw, "unrecognized correct answer, falling back to index 0");
    0
}

fn letter_index(s: &str) -> Option<i64> {
    match s.to_ascii_lowercase().as_str() {
        "a" => Some(0),
        "b" => Some(1),
        "c" => Some(2),
        "d" => Some(3),
        _ => None,
    }
}

fn from_keyed(map: &serde_json::Map<String, Value>) -> Vec<String> {
    OPTION_KEYS
        .iter()
        .filter_map(|key| map.get(*key))
        .filter(|v| is_truthy(v))
        .map(option_text)
        .collect()
}

/// Mirrors how loosely-typed clients treat empty values.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn option_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
