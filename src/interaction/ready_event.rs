//! Startup reconciliation of authorized users.
//!
//! When the gateway reports ready, every stored user is checked against the servers the bot
//! has joined. If no users are stored yet, the bot's owner is seeded as the only authorized
//! user. Membership lookups are paced to stay under the platform's rate limits.

use tracing::{Instrument, error, info, instrument, warn};

use crate::{
    base::{
        pacing::ReconcilePacing,
        types::{ChatServer, Res, UserPreferences},
    },
    service::{chat::ChatClient, db::DbClient},
};

/// What reconciliation found for one authorized user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserReconciliation {
    /// The user's ID.
    pub user_id: String,
    /// The user's display name.
    pub user_name: String,
    /// Names of the servers shared by the bot and the user.
    pub shared_servers: Vec<String>,
}

/// Handles the ready event.
///
/// It spawns a new task to handle the event asynchronously.
#[instrument(skip_all)]
pub fn handle_ready_event(db: DbClient, chat: ChatClient, pacing: ReconcilePacing) {
    tokio::spawn(
        async move {
            // Process the event.
            let result = reconcile_authorized_users(&db, &chat, &pacing).await;

            // Log any errors.
            match result {
                Ok(summary) => info!("Ready event completed successfully ({} users reconciled).", summary.len()),
                Err(err) => error!("Error in ready event: {:#}", err),
            }
        }
        .in_current_span(),
    );
}

/// Reconciles every authorized user, seeding the bot owner if there are none.
///
/// Failures for a single user are logged and skipped.
#[instrument(skip_all)]
pub async fn reconcile_authorized_users(db: &DbClient, chat: &ChatClient, pacing: &ReconcilePacing) -> Res<Vec<UserReconciliation>> {
    let mut user_ids = db.get_user_ids().await?;

    info!("Found {} authorized users in the database.", user_ids.len());

    if user_ids.is_empty() {
        let owner_id = chat.get_owner_id().await?;

        db.replace_user(&UserPreferences::new(owner_id.clone())).await?;
        info!("Added owner with ID {} as an authorized user.", owner_id);

        user_ids.push(owner_id);
    }

    let servers = chat.get_servers().await?;
    let mut summary = Vec::with_capacity(user_ids.len());

    for user_id in &user_ids {
        pacing.users.wait().await;

        match reconcile_user(db, chat, pacing, &servers, user_id).await {
            Ok(reconciliation) => summary.push(reconciliation),
            Err(err) => error!("Error processing user {}: {:#}", user_id, err),
        }
    }

    Ok(summary)
}

/// Finds the servers shared with one user, logs their preferences there, and re-saves the record.
#[instrument(skip(db, chat, pacing, servers))]
async fn reconcile_user(db: &DbClient, chat: &ChatClient, pacing: &ReconcilePacing, servers: &[ChatServer], user_id: &str) -> Res<UserReconciliation> {
    let user_name = chat.get_user_name(user_id).await?;

    info!("Checking for authorized user with ID: {}", user_id);

    let mut shared_servers = Vec::new();

    for server in servers {
        pacing.member_lookups.wait().await;

        match chat.is_server_member(&server.id, user_id).await {
            Ok(true) => shared_servers.push(server.name.clone()),
            Ok(false) => {}
            Err(err) => warn!("Failed to check membership of {} in {}: {:#}", user_id, server.name, err),
        }
    }

    db.update_user(user_id, |current| {
        let record = current.unwrap_or_else(|| UserPreferences::new(user_id));

        for server_name in &shared_servers {
            if let Some(server) = record.server(server_name) {
                info!("Server: {} / preferences for {}: {}", server_name, user_name, server.preferences.join(", "));
            }
        }

        (Some(record), ())
    })
    .await?;

    log_shared_servers(&user_name, &shared_servers);

    Ok(UserReconciliation {
        user_id: user_id.to_string(),
        user_name,
        shared_servers,
    })
}

fn log_shared_servers(user_name: &str, shared_servers: &[String]) {
    if shared_servers.is_empty() {
        info!("There are no servers where both the bot and user {} are present.", user_name);
    } else {
        info!("Server preferences checked for {} shared servers for user {}.", shared_servers.len(), user_name);
    }
}
