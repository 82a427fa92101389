//! Integration with Large Language Model services.
//!
//! The relevance-bot asks a model a single question per (message, user) pair:
//! is this message relevant to these preferences? The module defines the
//! `GenericLlmClient` trait that can be implemented for different LLM providers,
//! with a default implementation for OpenAI-compatible endpoints.

pub mod openai;

use std::{ops::Deref, sync::Arc};

use async_trait::async_trait;

use crate::base::types::{RelevanceContext, Res};

// Traits.

/// Generic LLM client trait that clients must implement.
///
/// This trait defines the core functionality for interacting with large language models.
/// Implementing this trait allows different LLM providers to be used with the relevance-bot.
#[async_trait]
pub trait GenericLlmClient: Send + Sync + 'static {
    /// Ask the relevance agent whether a message matches a set of preferences.
    ///
    /// Returns the model's raw reply, which is expected to be a short "Yes" or "No".
    async fn get_relevance_agent_response(&self, context: &RelevanceContext) -> Res<String>;
}

// Structs.

/// LLM client for the application.
///
/// This is trivially cloneable and can be passed around without the need for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct LlmClient {
    inner: Arc<dyn GenericLlmClient>,
}

impl Deref for LlmClient {
    type Target = dyn GenericLlmClient;

    fn deref(&self) -> &Self::Target {
        &*self.inner
    }
}

impl LlmClient {
    pub fn new(inner: Arc<dyn GenericLlmClient>) -> Self {
        Self { inner }
    }
}
