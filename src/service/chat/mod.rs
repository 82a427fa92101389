//! Chat service integration for relevance-bot.
//!
//! This module provides functionality for interacting with chat platforms like Discord:
//! - Receiving messages, commands, and gateway events
//! - Sending direct messages
//! - Looking up users, servers, and server membership
//!
//! It defines the `GenericChatClient` trait that can be implemented for different
//! chat services, with a default implementation for Discord.

pub mod commands;
pub mod discord;

use std::{ops::Deref, sync::Arc};

use async_trait::async_trait;

use crate::base::types::{ChatServer, Res, Void};

// Traits.

/// Generic "chat" trait that clients must implement.
///
/// This trait defines the core functionality for interacting with chat platforms
/// like Discord. Implementing this trait allows different chat services to be used
/// with the relevance-bot.
#[async_trait]
pub trait GenericChatClient: Send + Sync + 'static {
    /// Get the bot user ID.
    ///
    /// Used to skip messages the bot authored itself.
    fn bot_user_id(&self) -> &str;

    /// Start the chat client listener.
    ///
    /// This connects to the gateway, registers commands and event handlers, and
    /// runs until the connection is shut down.
    async fn start(&self) -> Void;

    /// Send a direct message to a user.
    async fn send_direct_message(&self, user_id: &str, text: &str) -> Void;

    /// Get a user's display name by ID.
    async fn get_user_name(&self, user_id: &str) -> Res<String>;

    /// Get the ID of the account that owns the bot application.
    async fn get_owner_id(&self) -> Res<String>;

    /// Get every server the bot has joined.
    async fn get_servers(&self) -> Res<Vec<ChatServer>>;

    /// Check whether a user is a member of a server.
    ///
    /// Returns `Ok(false)` when the platform reports the member as not found.
    async fn is_server_member(&self, server_id: &str, user_id: &str) -> Res<bool>;
}

// Structs.

/// Chat client for the application.
///
/// It is designed to be trivially cloneable, allowing it to be passed around
/// without the need for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct ChatClient {
    inner: Arc<dyn GenericChatClient>,
}

impl Deref for ChatClient {
    type Target = dyn GenericChatClient;

    fn deref(&self) -> &Self::Target {
        &*self.inner
    }
}

impl ChatClient {
    pub fn new(inner: Arc<dyn GenericChatClient>) -> Self {
        Self { inner }
    }
}
