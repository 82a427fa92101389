//! Text commands for managing preferences.
//!
//! Each command resolves who invoked it and where, hands off to
//! [`interaction::preferences`], and replies in the channel. Failures never escape:
//! they are logged and turned into a fixed error reply.

use tracing::{error, warn};

use crate::{
    base::types::{CommandInvocation, Err, PreferenceReply, Res, Void},
    interaction::preferences,
};

use super::discord::DiscordUserState;

// Failure replies.

pub const ADD_FAILURE_REPLY: &str = "An error occurred while adding the preference.";
pub const REMOVE_FAILURE_REPLY: &str = "An error occurred while removing the preference.";
pub const VIEW_FAILURE_REPLY: &str = "An error occurred while retrieving preferences.";
pub const RESET_FAILURE_REPLY: &str = "An error occurred while resetting preferences.";

/// The poise context used by every command.
pub type PoiseContext<'a> = poise::Context<'a, DiscordUserState, Err>;

/// Every command the bot registers.
pub fn all() -> Vec<poise::Command<DiscordUserState, Err>> {
    vec![ping(), add_preference(), remove_preference(), view_preferences(), reset_preferences()]
}

/// Liveness check.
#[poise::command(prefix_command)]
pub async fn ping(ctx: PoiseContext<'_>) -> Void {
    ctx.say("Pong!").await?;
    Ok(())
}

/// Add a preference for this server.
#[poise::command(prefix_command, guild_only, required_permissions = "ADMINISTRATOR")]
pub async fn add_preference(ctx: PoiseContext<'_>, #[rest] preference: String) -> Void {
    let result = async {
        let invocation = command_invocation(ctx).await?;
        preferences::add_preference(&ctx.data().db, &invocation, &preference).await
    }
    .await;

    send_reply(ctx, result, ADD_FAILURE_REPLY).await
}

/// Remove a preference from this server.
#[poise::command(prefix_command, guild_only, required_permissions = "ADMINISTRATOR")]
pub async fn remove_preference(ctx: PoiseContext<'_>, #[rest] preference: String) -> Void {
    let result = async {
        let invocation = command_invocation(ctx).await?;
        preferences::remove_preference(&ctx.data().db, &invocation, &preference).await
    }
    .await;

    send_reply(ctx, result, REMOVE_FAILURE_REPLY).await
}

/// List your preferences for this server.
#[poise::command(prefix_command, guild_only)]
pub async fn view_preferences(ctx: PoiseContext<'_>) -> Void {
    let result = async {
        let invocation = command_invocation(ctx).await?;
        preferences::view_preferences(&ctx.data().db, &invocation).await
    }
    .await;

    send_reply(ctx, result, VIEW_FAILURE_REPLY).await
}

/// Clear your preferences for this server.
#[poise::command(prefix_command, guild_only, required_permissions = "ADMINISTRATOR")]
pub async fn reset_preferences(ctx: PoiseContext<'_>) -> Void {
    let result = async {
        let invocation = command_invocation(ctx).await?;
        preferences::reset_preferences(&ctx.data().db, &invocation).await
    }
    .await;

    send_reply(ctx, result, RESET_FAILURE_REPLY).await
}

/// Global error handler for the framework.
pub async fn on_error(error: poise::FrameworkError<'_, DiscordUserState, Err>) {
    match error {
        poise::FrameworkError::Setup { error, .. } => error!("Failed to set up the framework: {:?}", error),
        poise::FrameworkError::EventHandler { error, .. } => error!("Error while handling event: {:?}", error),
        poise::FrameworkError::Command { error, ctx, .. } => error!("Error in command `{}`: {:?}", ctx.command().name, error),
        error => {
            warn!("Command framework error: {}", error);

            if let Err(e) = poise::builtins::on_error(error).await {
                error!("Error while handling error: {}", e)
            }
        }
    }
}

// Helpers.

/// Who invoked the command, and in which server.
async fn command_invocation(ctx: PoiseContext<'_>) -> Res<CommandInvocation> {
    let cached_name = ctx.guild().map(|guild| guild.name.clone());

    let server_name = match cached_name {
        Some(name) => name,
        None => ctx.partial_guild().await.map(|guild| guild.name).ok_or_else(|| anyhow::anyhow!("The command was not invoked in a server."))?,
    };

    Ok(CommandInvocation {
        user_id: ctx.author().id.to_string(),
        user_name: ctx.author().name.clone(),
        server_name,
    })
}

/// Reply with the outcome, or with the fallback text if the command failed.
async fn send_reply(ctx: PoiseContext<'_>, result: Res<PreferenceReply>, failure: &str) -> Void {
    if let Err(err) = &result {
        error!("Error in {} command: {:#}", ctx.command().name, err);
    }

    ctx.say(reply_text(result, failure)).await?;

    Ok(())
}

/// The text sent back for a command outcome; any failure maps to the fixed `failure` text.
pub fn reply_text(result: Res<PreferenceReply>, failure: &str) -> String {
    match result {
        Ok(reply) => reply.to_string(),
        Err(_) => failure.to_string(),
    }
}
