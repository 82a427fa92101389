//! Event handling and user interactions for relevance-bot.
//!
//! This module provides functionality for handling chat events and commands:
//! - Reconciling authorized users when the gateway is ready
//! - Checking incoming messages against stored preferences
//! - Managing per-server preferences through commands
//! - Notifying users of relevant messages

pub mod message_event;
pub mod notify;
pub mod preferences;
pub mod ready_event;
pub mod relevance;
