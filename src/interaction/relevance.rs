//! The relevance check.
//!
//! Any reply other than a bare "yes" (case-insensitive, surrounding whitespace ignored),
//! and any error from the model, counts as "not relevant": a missed notification is
//! preferable to a false one.

use tracing::{error, instrument};

use crate::{base::types::RelevanceContext, service::llm::LlmClient};

/// Ask the relevance agent whether `message_text` matches `preferences`.
#[instrument(skip_all, fields(preferences = preferences.len()))]
pub async fn check_relevance(llm: &LlmClient, message_text: &str, preferences: &[String]) -> bool {
    let context = RelevanceContext {
        message_text: message_text.to_string(),
        preferences: preferences.to_vec(),
    };

    match llm.get_relevance_agent_response(&context).await {
        Ok(answer) => is_affirmative(&answer),
        Err(err) => {
            error!("Error in relevance agent call: {:#}", err);
            false
        }
    }
}

/// Whether a model reply means "relevant".
pub fn is_affirmative(answer: &str) -> bool {
    answer.trim().to_lowercase() == "yes"
}

// Tests.
