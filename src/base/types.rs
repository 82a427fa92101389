//! Shared types for the relevance-bot.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The error type used throughout the application.
pub type Err = anyhow::Error;
/// A result with the application error type.
pub type Res<T> = Result<T, Err>;
/// A result with no value.
pub type Void = Res<()>;

// Preference records.

/// The preferences a user has set for a single server.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ServerPreferences {
    /// The server (guild) name; unique within a user's record.
    pub server_name: String,
    /// Free-text preferences, in insertion order (duplicates allowed).
    #[serde(default)]
    pub preferences: Vec<String>,
}

impl ServerPreferences {
    /// Create an empty entry for the given server.
    pub fn new(server_name: impl Into<String>) -> Self {
        Self {
            server_name: server_name.into(),
            preferences: Vec::new(),
        }
    }
}

/// All preferences tracked for one authorized user.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct UserPreferences {
    /// The chat platform user ID (unique key).
    pub user_id: String,
    /// Per-server preference lists; lookup is by server name.
    #[serde(default)]
    pub servers: Vec<ServerPreferences>,
}

impl UserPreferences {
    /// Create a record with no servers.
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            servers: Vec::new(),
        }
    }

    /// Find the entry for a server by name.
    pub fn server(&self, server_name: &str) -> Option<&ServerPreferences> {
        self.servers.iter().find(|s| s.server_name == server_name)
    }

    /// Find the entry for a server by name, mutably.
    pub fn server_mut(&mut self, server_name: &str) -> Option<&mut ServerPreferences> {
        self.servers.iter_mut().find(|s| s.server_name == server_name)
    }

    /// Find the entry for a server by name, appending an empty one if absent.
    pub fn server_or_insert(&mut self, server_name: &str) -> &mut ServerPreferences {
        let index = match self.servers.iter().position(|s| s.server_name == server_name) {
            Some(index) => index,
            None => {
                self.servers.push(ServerPreferences::new(server_name));
                self.servers.len() - 1
            }
        };

        &mut self.servers[index]
    }
}

// Chat types.

/// A server (guild) the bot has joined.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatServer {
    /// The server ID.
    pub id: String,
    /// The server display name.
    pub name: String,
}

/// A message received in a server channel, as seen by the relevance workflow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingMessage {
    /// The author's user ID.
    pub author_id: String,
    /// The author's user name.
    pub author_name: String,
    /// The originating server name.
    pub server_name: String,
    /// The originating channel name.
    pub channel_name: String,
    /// The message body.
    pub content: String,
}

/// The user and server a preference command was invoked from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandInvocation {
    /// The invoking user's ID.
    pub user_id: String,
    /// The invoking user's name.
    pub user_name: String,
    /// The server the command was invoked in.
    pub server_name: String,
}

// LLM types.

/// Everything the relevance agent needs to judge a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelevanceContext {
    /// The message body under evaluation.
    pub message_text: String,
    /// The user's preferences for the originating server.
    pub preferences: Vec<String>,
}

// Command replies.

/// The outcome of a preference command, rendered as the reply text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreferenceReply {
    /// A preference was appended.
    Added {
        /// The invoking user's name.
        user_name: String,
        /// The new preference.
        preference: String,
    },
    /// A preference was removed.
    Removed {
        /// The invoking user's name.
        user_name: String,
        /// The removed preference.
        preference: String,
    },
    /// The preference to remove is not in the list.
    NotFound,
    /// The current preferences for the server.
    Listing {
        /// The invoking user's name.
        user_name: String,
        /// The stored preferences, in insertion order.
        preferences: Vec<String>,
    },
    /// No preferences are set for the server.
    Empty {
        /// The invoking user's name.
        user_name: String,
    },
    /// The server's preferences were cleared.
    Reset {
        /// The invoking user's name.
        user_name: String,
    },
    /// The user has a record, but no entry for this server.
    NoServerEntry,
    /// The user has no record at all.
    NoUserRecord,
}

impl fmt::Display for PreferenceReply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PreferenceReply::Added { user_name, preference } => write!(f, "New preference added for {user_name}: {preference}"),
            PreferenceReply::Removed { user_name, preference } => write!(f, "Preference removed for {user_name}: {preference}"),
            PreferenceReply::NotFound => write!(f, "Preference not found."),
            PreferenceReply::Listing { user_name, preferences } => {
                write!(f, "Current preferences for {user_name}:")?;
                for preference in preferences {
                    write!(f, "\n- {preference}")?;
                }
                Ok(())
            }
            PreferenceReply::Empty { user_name } => write!(f, "No preferences set for {user_name} in this server."),
            PreferenceReply::Reset { user_name } => write!(f, "Preferences reset for {user_name} in this server."),
            PreferenceReply::NoServerEntry => write!(f, "No preferences found for this server."),
            PreferenceReply::NoUserRecord => write!(f, "No user data found."),
        }
    }
}

// Tests.
