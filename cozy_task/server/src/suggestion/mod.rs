//! Premium AI task suggestions.
//!
//! Generation goes through [`TextGenerator`] so the model backend can be swapped
//! in tests. [`SuggestionService`] never fails: every error ends in the canned defaults.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cozy_task_core::suggestion::{GenerationSettings, build_prompt, parse_model_response};
use cozy_task_core::{Routine, SuggestionOutcome, Task};
use std::sync::Arc;

pub mod api;
pub mod gemini;

pub use gemini::GeminiClient;

/// Error type for text generation.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("Generation request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Model API returned {status}: {message}")]
    Api { status: u16, message: String },
    #[error("Model returned no text")]
    EmptyResponse,
    #[error("No model API key configured")]
    MissingApiKey,
}

/// A hosted language model.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Sends `prompt` to `model` and returns the generated text.
    async fn generate(&self, model: &str, prompt: &str) -> Result<String, GenerationError>;
}

pub struct SuggestionService {
    generator: Arc<dyn TextGenerator>,
}

impl SuggestionService {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }

    /// Suggests new tasks from the user's history.
    ///
    /// # Arguments
    ///
    /// * `tasks` - The user's whole collection.
    /// * `routines` - Optional routine context for the prompt.
    /// * `now` - Used for suggestion ids and default due dates.
    ///
    /// # Returns
    ///
    /// Generated suggestions, or the defaults when there is no history or both models fail.
    #[tracing::instrument(skip(self, tasks, routines), fields(task_count = tasks.len()))]
    pub async fn suggest(
        &self,
        tasks: &[Task],
        routines: &[Routine],
        now: DateTime<Utc>,
    ) -> SuggestionOutcome {
        if tasks.is_empty() {
            return SuggestionOutcome::fallback(now);
        }

        let prompt = build_prompt(tasks, routines);
        for model in [
            GenerationSettings::PRIMARY_MODEL,
            GenerationSettings::FALLBACK_MODEL,
        ] {
            match self.generator.generate(model, &prompt).await {
                Ok(text) => {
                    let outcome = parse_model_response(&text, now);
                    if outcome.is_fallback() {
                        tracing::warn!("Could not parse suggestions from {}", model);
                    }
                    return outcome;
                }
                Err(err) => tracing::warn!("Generation with {} failed: {}", model, err),
            }
        }
        SuggestionOutcome::fallback(now)
    }
}
