//! Library root for `relevance-bot`.
//!
//! Relevance-bot is an LLM-powered Discord assistant designed to:
//! - Keep a per-user, per-server list of free-text preferences
//! - Ask an LLM whether each new server message is relevant to those preferences
//! - Direct-message users about the messages that are
//!
//! The bot integrates with Discord for chat, SurrealDB for storage,
//! and OpenAI-compatible endpoints for relevance checks. The architecture is built around
//! extensible traits that allow for different implementations of each service.

#[deny(missing_docs)]
pub mod base;
pub mod import;
pub mod interaction;
pub mod runtime;
pub mod service;

use std::path::Path;

use base::{config::Config, types::Res, types::Void};
use rustls::crypto;
use service::db::DbClient;
use tracing::{info, warn};

/// Public async entry for the binary crate.
///
/// Sets up necessary services and starts the relevance-bot runtime:
/// - Initializes the crypto provider
/// - Creates the runtime context with database, LLM, and chat clients
/// - Starts the gateway event loop
pub async fn start(config: Config) -> Void {
    info!("Starting relevance-bot ...");

    config.require_secrets()?;

    // Start the crypto provider.
    install_crypto_provider();

    // Initialize the runtime.
    let runtime = runtime::Runtime::new(config).await?;

    // Start the runtime.
    runtime.start().await?;

    info!("Relevance-bot stopped.");

    Ok(())
}

/// Public async entry for the bulk importer.
///
/// Returns the number of user records upserted.
pub async fn run_import(config: Config, path: &Path) -> Res<usize> {
    install_crypto_provider();

    let db = DbClient::surreal(&config).await?;

    import::import_file(&db, path).await
}

fn install_crypto_provider() {
    if crypto::ring::default_provider().install_default().is_err() {
        warn!("A crypto provider was already installed.");
    }
}
