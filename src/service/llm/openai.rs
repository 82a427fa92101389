//! Thin wrapper around async-openai for relevance checks.
//!
//! Any OpenAI-compatible chat completions endpoint works (Groq by default); the base URL,
//! model, and system directive all come from the configuration.

use std::sync::Arc;

use async_openai::{
    Client,
    config::OpenAIConfig,
    types::{ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs},
};
use async_trait::async_trait;
use tokio::time::timeout;
use tracing::{debug, instrument};

use crate::base::{
    config::Config,
    prompts::relevance_agent_user_prompt,
    types::{RelevanceContext, Res},
};

use super::{GenericLlmClient, LlmClient};

// Extra methods on `LlmClient` applied by the openai implementation.

impl LlmClient {
    pub fn openai(config: &Config) -> Self {
        let client = OpenAiLlmClient::new(config);
        Self { inner: Arc::new(client) }
    }
}

// Specific implementations.

/// OpenAI LLM client implementation.
#[derive(Clone)]
pub struct OpenAiLlmClient {
    client: Client<OpenAIConfig>,
    config: Config,
}

impl OpenAiLlmClient {
    /// Create a new OpenAI LLM client.
    #[instrument(name = "OpenAiLlmClient::new", skip_all)]
    pub fn new(config: &Config) -> Self {
        let cfg = OpenAIConfig::new().with_api_key(config.llm_api_key.clone()).with_api_base(config.llm_api_base.clone());

        Self {
            client: Client::with_config(cfg),
            config: config.clone(),
        }
    }

    /// Build the relevance agent messages.
    fn build_relevance_agent_input(&self, context: &RelevanceContext) -> Res<Vec<ChatCompletionRequestMessage>> {
        Ok(vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(self.config.relevance_agent_system_directive.clone())
                .build()?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(relevance_agent_user_prompt(&context.preferences, &context.message_text))
                .build()?
                .into(),
        ])
    }
}

#[async_trait]
impl GenericLlmClient for OpenAiLlmClient {
    #[instrument(name = "OpenAiLlmClient::get_relevance_agent_response", skip_all)]
    async fn get_relevance_agent_response(&self, context: &RelevanceContext) -> Res<String> {
        let messages = self.build_relevance_agent_input(context)?;

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.config.llm_model)
            .temperature(self.config.llm_temperature)
            .max_completion_tokens(self.config.llm_max_tokens)
            .messages(messages)
            .build()?;

        // Single attempt, bounded by the configured timeout.
        let response = timeout(self.config.llm_timeout(), self.client.chat().create(request))
            .await
            .map_err(|_| anyhow::anyhow!("LLM call timed out after {} seconds", self.config.llm_timeout_secs))??;

        let content = response.choices.first().and_then(|choice| choice.message.content.clone()).unwrap_or_default();

        debug!("Relevance agent replied: {content:?}");

        Ok(content)
    }
}

// Tests.
