//! Prompt templates for LLM usage.

/// System directive for the relevance agent.
pub const RELEVANCE_AGENT_SYSTEM_DIRECTIVE: &str = "You are a helpful assistant that determines message relevance strictly based on the given preferences.";

/// Build the user prompt for the relevance agent.
///
/// Preferences are joined with `"; "`, and the model is told to answer with exactly `Yes` or `No`.
pub fn relevance_agent_user_prompt(preferences: &[String], message_text: &str) -> String {
    let preferences = preferences.join("; ");

    format!("Is the following message relevant based on these preferences: '{preferences}'? Answer with only 'Yes' or 'No'. Message: {message_text}")
}

// Tests.
