//! Direct-message notifications for relevant posts.

use tracing::{info, instrument};

use crate::{
    base::types::{IncomingMessage, Void},
    service::chat::ChatClient,
};

/// Render the notification text for a relevant message.
pub fn format_notification(message: &IncomingMessage) -> String {
    format!(
        "New relevant post by {} in {} - #{}:\n{}",
        message.author_name, message.server_name, message.channel_name, message.content
    )
}

/// Send the notification for `message` to `user_id`.
#[instrument(skip(chat, message))]
pub async fn notify_user(chat: &ChatClient, user_id: &str, message: &IncomingMessage) -> Void {
    chat.send_direct_message(user_id, &format_notification(message)).await?;

    info!("Notified user `{}` of a relevant post in {}.", user_id, message.server_name);

    Ok(())
}

// Tests.
