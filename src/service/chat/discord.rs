//! Discord implementation of the chat client.
//!
//! Outbound calls go through serenity's REST client. `start` connects to the gateway with a
//! poise framework for the text commands, and routes ready and message events to the
//! interaction handlers.

use std::{num::NonZeroU64, ops::Deref, sync::Arc};

use async_trait::async_trait;
use serenity::{
    all::{FullEvent, GatewayIntents, GuildId, Message, UserId},
    client::Context,
    http::{GuildPagination, Http},
};
use tracing::{info, instrument, warn};

use crate::{
    base::{
        config::Config,
        pacing::ReconcilePacing,
        types::{ChatServer, IncomingMessage, Res, Void},
    },
    interaction,
    service::{db::DbClient, llm::LlmClient},
};

use super::{ChatClient, GenericChatClient, commands};

/// Discord caps a guild listing page at 200 entries.
const GUILD_PAGE_SIZE: u64 = 200;

// Extra methods on `ChatClient` applied by the discord implementation.

impl ChatClient {
    /// Creates a new Discord chat client.
    pub async fn discord(config: &Config, db: DbClient, llm: LlmClient) -> Res<Self> {
        let client = DiscordChatClient::new(config, db, llm).await?;
        Ok(Self { inner: Arc::new(client) })
    }
}

impl From<DiscordChatClient> for ChatClient {
    fn from(client: DiscordChatClient) -> Self {
        Self { inner: Arc::new(client) }
    }
}

// Structs.

/// User state for the poise framework; every command and event handler can reach it.
pub struct DiscordUserState {
    /// The application configuration.
    pub config: Config,
    /// The preference store.
    pub db: DbClient,
    /// The relevance agent.
    pub llm: LlmClient,
    /// The chat client, for outbound calls from spawned handlers.
    pub chat: ChatClient,
}

/// Discord client implementation.
#[derive(Clone)]
struct DiscordChatClient {
    bot_user_id: String,
    http: Arc<Http>,
    config: Config,
    db: DbClient,
    llm: LlmClient,
}

impl Deref for DiscordChatClient {
    type Target = Http;

    fn deref(&self) -> &Self::Target {
        &self.http
    }
}

impl DiscordChatClient {
    /// Create a new Discord chat client.
    #[instrument(name = "DiscordChatClient::new", skip_all)]
    async fn new(config: &Config, db: DbClient, llm: LlmClient) -> Res<Self> {
        let http = Arc::new(Http::new(&config.discord_token));

        // Get the bot's user ID.

        let bot_user = http.get_current_user().await?;
        let bot_user_id = bot_user.id.to_string();

        info!("Discord bot user: {} ({})", bot_user.name, bot_user_id);

        Ok(Self {
            bot_user_id,
            http,
            config: config.clone(),
            db,
            llm,
        })
    }
}

#[async_trait]
impl GenericChatClient for DiscordChatClient {
    fn bot_user_id(&self) -> &str {
        &self.bot_user_id
    }

    async fn start(&self) -> Void {
        let intents = GatewayIntents::non_privileged() | GatewayIntents::MESSAGE_CONTENT | GatewayIntents::GUILD_MEMBERS;

        let state = DiscordUserState {
            config: self.config.clone(),
            db: self.db.clone(),
            llm: self.llm.clone(),
            chat: ChatClient::from(self.clone()),
        };

        let framework = poise::Framework::builder()
            .options(poise::FrameworkOptions {
                commands: commands::all(),
                prefix_options: poise::PrefixFrameworkOptions {
                    prefix: Some(self.config.command_prefix.clone()),
                    ..Default::default()
                },
                on_error: |error| Box::pin(commands::on_error(error)),
                event_handler: |ctx, event, _framework, state| Box::pin(handle_discord_event(ctx, event, state)),
                ..Default::default()
            })
            .setup(move |_ctx, ready, _framework| {
                Box::pin(async move {
                    info!("Framework ready for {}.", ready.user.name);
                    Ok(state)
                })
            })
            .build();

        let mut client = serenity::Client::builder(&self.config.discord_token, intents).framework(framework).await?;

        // Release the gateway connections on Ctrl-C.

        let shard_manager = client.shard_manager.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Shutting down Discord shards ...");
                shard_manager.shutdown_all().await;
            }
        });

        client.start().await?;

        Ok(())
    }

    #[instrument(skip(self, text))]
    async fn send_direct_message(&self, user_id: &str, text: &str) -> Void {
        let user_id = parse_user_id(user_id)?;

        let channel = user_id.create_dm_channel(&**self).await?;
        channel.say(&**self, text).await.map_err(|e| anyhow::anyhow!("Failed to send direct message: {}", e))?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_user_name(&self, user_id: &str) -> Res<String> {
        let user = parse_user_id(user_id)?.to_user(&**self).await?;

        Ok(user.name)
    }

    #[instrument(skip(self))]
    async fn get_owner_id(&self) -> Res<String> {
        let info = self.get_current_application_info().await?;

        info.owner
            .map(|owner| owner.id.to_string())
            .or_else(|| info.team.map(|team| team.owner_user_id.to_string()))
            .ok_or_else(|| anyhow::anyhow!("The application has no owner."))
    }

    #[instrument(skip(self))]
    async fn get_servers(&self) -> Res<Vec<ChatServer>> {
        let mut servers = Vec::new();
        let mut after = None;

        loop {
            let page = self.get_guilds(after.map(GuildPagination::After), Some(GUILD_PAGE_SIZE)).await?;
            let page_len = page.len() as u64;

            after = page.last().map(|guild| guild.id);
            servers.extend(page.into_iter().map(|guild| ChatServer { id: guild.id.to_string(), name: guild.name }));

            if page_len < GUILD_PAGE_SIZE {
                break;
            }
        }

        Ok(servers)
    }

    #[instrument(skip(self))]
    async fn is_server_member(&self, server_id: &str, user_id: &str) -> Res<bool> {
        let guild_id = parse_guild_id(server_id)?;
        let user_id = parse_user_id(user_id)?;

        match self.get_member(guild_id, user_id).await {
            Ok(_) => Ok(true),
            Err(serenity::Error::Http(e)) if e.status_code().map(|status| status.as_u16()) == Some(404) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

// Gateway event handling.

/// Routes gateway events to the interaction handlers.
#[instrument(skip_all)]
async fn handle_discord_event(ctx: &Context, event: &FullEvent, state: &DiscordUserState) -> Void {
    match event {
        FullEvent::Ready { data_about_bot } => {
            info!("{} has connected to Discord!", data_about_bot.user.name);
            info!("Bot is in {} servers.", data_about_bot.guilds.len());

            interaction::ready_event::handle_ready_event(state.db.clone(), state.chat.clone(), ReconcilePacing::from_config(&state.config));
        }
        FullEvent::Message { new_message } => {
            let Some(message) = to_incoming_message(ctx, new_message).await else {
                return Ok(());
            };

            interaction::message_event::handle_message_event(message, state.db.clone(), state.llm.clone(), state.chat.clone());
        }
        _ => {}
    }

    Ok(())
}

/// Converts a server message into the form the relevance workflow uses.
///
/// Returns `None` for direct messages, or when the server name cannot be resolved.
async fn to_incoming_message(ctx: &Context, message: &Message) -> Option<IncomingMessage> {
    let guild_id = message.guild_id?;

    let cached_name = guild_id.name(ctx);
    let server_name = match cached_name {
        Some(name) => name,
        None => match guild_id.to_partial_guild(ctx).await {
            Ok(guild) => guild.name,
            Err(e) => {
                warn!("Failed to resolve the name of server {}: {}", guild_id, e);
                return None;
            }
        },
    };

    let channel_name = message.channel_id.name(ctx).await.unwrap_or_else(|_| message.channel_id.to_string());

    Some(IncomingMessage {
        author_id: message.author.id.to_string(),
        author_name: message.author.name.clone(),
        server_name,
        channel_name,
        content: message.content.clone(),
    })
}

// Helpers.

fn parse_user_id(user_id: &str) -> Res<UserId> {
    let raw: NonZeroU64 = user_id.parse().map_err(|e| anyhow::anyhow!("Invalid user ID `{}`: {}", user_id, e))?;
    Ok(UserId::from(raw))
}

fn parse_guild_id(guild_id: &str) -> Res<GuildId> {
    let raw: NonZeroU64 = guild_id.parse().map_err(|e| anyhow::anyhow!("Invalid server ID `{}`: {}", guild_id, e))?;
    Ok(GuildId::from(raw))
}

// Tests.
