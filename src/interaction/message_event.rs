//! Routes incoming server messages to the users whose preferences they match.

use tracing::{Instrument, debug, error, info, instrument};

use crate::{
    base::types::{IncomingMessage, Res},
    interaction::{notify, relevance},
    service::{chat::ChatClient, db::DbClient, llm::LlmClient},
};

/// Handles a message event.
///
/// It spawns a new task to handle the event asynchronously.
#[instrument(skip_all)]
pub fn handle_message_event(message: IncomingMessage, db: DbClient, llm: LlmClient, chat: ChatClient) {
    tokio::spawn(
        async move {
            // Process the event.
            let result = process_message_event(&message, &db, &llm, &chat).await;

            // Log any errors.
            if let Err(err) = &result {
                error!("Error while handling message event: {:#}", err);
            }
        }
        .in_current_span(),
    );
}

/// Checks the message against every user's preferences for its server, and notifies
/// each user it is relevant to.
///
/// Returns the number of notifications sent.
#[instrument(skip_all, fields(server = %message.server_name, author = %message.author_name))]
pub async fn process_message_event(message: &IncomingMessage, db: &DbClient, llm: &LlmClient, chat: &ChatClient) -> Res<usize> {
    if message.author_id == chat.bot_user_id() {
        debug!("Skipping message authored by the bot.");
        return Ok(0);
    }

    if message.content.trim().is_empty() {
        debug!("Skipping message without text content.");
        return Ok(0);
    }

    let users = db.get_all_users().await?;
    let mut notified = 0;

    for user in &users {
        let Some(server) = user.server(&message.server_name) else {
            continue;
        };

        if server.preferences.is_empty() {
            continue;
        }

        if !relevance::check_relevance(llm, &message.content, &server.preferences).await {
            continue;
        }

        // Delivery failures are per user.
        match notify::notify_user(chat, &user.user_id, message).await {
            Ok(()) => notified += 1,
            Err(err) => error!("Failed to notify user `{}`: {:#}", user.user_id, err),
        }
    }

    if notified > 0 {
        info!("Message was relevant to {} users.", notified);
    }

    Ok(notified)
}
