use super::{DEFAULT_TITLE, SuggestionOutcome, TaskSuggestion, suggestion_id};
use crate::task::TaskPriority;
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::LazyLock;

static JSON_ARRAY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\[\s*\{.*\}\s*\]").expect("json array regex is valid"));

/// Reads the model's free text into suggestions.
///
/// The outermost `[{...}]` span is parsed when the model wraps the array in
/// prose; otherwise the whole text is. Anything that is not an array of
/// objects yields the defaults.
pub fn parse_model_response(text: &str, now: DateTime<Utc>) -> SuggestionOutcome {
    let candidate = JSON_ARRAY
        .find(text)
        .map(|m| m.as_str())
        .unwrap_or(text);

    let items = match serde_json::from_str::<Value>(candidate) {
        Ok(Value::Array(items)) => items,
        _ => return SuggestionOutcome::fallback(now),
    };

    let mut suggestions = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        match item {
            Value::Object(fields) => suggestions.push(suggestion_from(fields, index, now)),
            _ => return SuggestionOutcome::fallback(now),
        }
    }
    SuggestionOutcome::Generated(suggestions)
}

fn suggestion_from(fields: &Map<String, Value>, index: usize, now: DateTime<Utc>) -> TaskSuggestion {
    let text = |key: &str| {
        fields
            .get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    TaskSuggestion {
        id: suggestion_id(now, index),
        title: text("title").unwrap_or_else(|| DEFAULT_TITLE.to_string()),
        description: text("description").unwrap_or_default(),
        due_date: text("dueDate")
            .and_then(|raw| parse_due_date(&raw))
            .unwrap_or_else(|| now + Duration::days(1)),
        priority: text("priority")
            .and_then(|p| p.parse::<TaskPriority>().ok())
            .unwrap_or(TaskPriority::Medium),
        tags: match fields.get("tags") {
            Some(Value::Array(tags)) => tags
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect(),
            _ => Vec::new(),
        },
        is_premium: true,
    }
}

fn parse_due_date(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .map(|date| date.and_time(chrono::NaiveTime::MIN).and_utc())
}
