//! AI task suggestions: what gets sent to the model and how its answer is read.
//!
//! Nothing in here fails. Anything the model gets wrong resolves to
//! [`default_suggestions`], wrapped in [`SuggestionOutcome::DefaultFallback`].

mod parse;
mod prompt;

pub use parse::parse_model_response;
pub use prompt::{TaskStats, build_prompt};

use crate::task::{NewTask, TaskPriority, TaskStatus};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

pub const SUGGESTION_COUNT: usize = 3;
pub const DEFAULT_TITLE: &str = "Suggested Task";

/// Sampling parameters sent with every generation request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationSettings {
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    pub max_output_tokens: u32,
}

impl GenerationSettings {
    pub const PRIMARY_MODEL: &'static str = "gemini-2.0-flash-lite";
    pub const FALLBACK_MODEL: &'static str = "gemini-1.0-pro";
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            top_p: 0.8,
            top_k: 40,
            max_output_tokens: 1024,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskSuggestion {
    pub id: String,
    pub title: String,
    pub description: String,
    pub due_date: DateTime<Utc>,
    pub priority: TaskPriority,
    pub tags: Vec<String>,
    pub is_premium: bool,
}

impl TaskSuggestion {
    /// The pending task created when a user accepts this suggestion.
    pub fn into_new_task(self) -> NewTask {
        NewTask {
            title: self.title,
            description: Some(self.description),
            status: TaskStatus::Pending,
            due_date: Some(self.due_date),
            priority: self.priority,
            tags: self.tags,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SuggestionOutcome {
    Generated(Vec<TaskSuggestion>),
    DefaultFallback(Vec<TaskSuggestion>),
}

impl SuggestionOutcome {
    pub fn fallback(now: DateTime<Utc>) -> Self {
        SuggestionOutcome::DefaultFallback(default_suggestions(now))
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, SuggestionOutcome::DefaultFallback(_))
    }

    pub fn suggestions(&self) -> &[TaskSuggestion] {
        match self {
            SuggestionOutcome::Generated(s) | SuggestionOutcome::DefaultFallback(s) => s,
        }
    }

    pub fn into_suggestions(self) -> Vec<TaskSuggestion> {
        match self {
            SuggestionOutcome::Generated(s) | SuggestionOutcome::DefaultFallback(s) => s,
        }
    }
}

pub(crate) fn suggestion_id(now: DateTime<Utc>, index: usize) -> String {
    format!("ai-suggestion-{}-{}", now.timestamp_millis(), index)
}

/// The three canned suggestions used whenever generation is skipped or fails.
pub fn default_suggestions(now: DateTime<Utc>) -> Vec<TaskSuggestion> {
    let tomorrow = now + Duration::days(1);
    let next_week = now + Duration::days(7);
    let tags = |a: &str, b: &str| vec![a.to_string(), b.to_string()];

    vec![
        TaskSuggestion {
            id: suggestion_id(now, 1),
            title: "Create a weekly planning session".to_string(),
            description: "Set aside 30 minutes every Sunday to plan your week ahead and prioritize tasks.".to_string(),
            due_date: tomorrow,
            priority: TaskPriority::High,
            tags: tags("productivity", "planning"),
            is_premium: true,
        },
        TaskSuggestion {
            id: suggestion_id(now, 2),
            title: "Set up task categories".to_string(),
            description: "Organize your tasks into categories like work, personal, health, etc. for better management.".to_string(),
            due_date: tomorrow,
            priority: TaskPriority::Medium,
            tags: tags("organization", "productivity"),
            is_premium: true,
        },
        TaskSuggestion {
            id: suggestion_id(now, 3),
            title: "Review and reflect on completed tasks".to_string(),
            description: "Take time to review what you've accomplished and reflect on your productivity patterns.".to_string(),
            due_date: next_week,
            priority: TaskPriority::Low,
            tags: tags("reflection", "productivity"),
            is_premium: true,
        },
    ]
}
