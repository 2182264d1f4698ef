//! Discord client construction and shared bot state.
//!
//! Builds the serenity client with the gateway intents the features need,
//! registers the voice manager, and seeds the shared state every handler
//! reads from the context data map.

use std::sync::Arc;

use serenity::all::GatewayIntents;
use serenity::prelude::TypeMapKey;
use serenity::Client;
use songbird::SerenityInit;
use tracing::info;

use crate::audit::AuditLog;
use crate::chat::ChatService;
use crate::config::types::Config;
use crate::discord::handler::Handler;
use crate::fixup::LinkRewriter;
use crate::mcstatus::StatusClient;
use crate::moderation::WarnStore;
use crate::music::MusicController;
use crate::roles::ReactionRoleStore;

/// Everything the event handlers share.
pub struct BotState {
    pub config: Arc<Config>,
    pub audit: AuditLog,
    pub status: StatusClient,
    /// Absent when `OPENROUTER_API_KEY` is unset.
    pub chat: Option<ChatService>,
    /// Absent when `LAVALINK_HOST` is unset.
    pub music: Option<Arc<MusicController>>,
    pub warns: WarnStore,
    pub reaction_roles: ReactionRoleStore,
    pub rewriter: LinkRewriter,
}

impl TypeMapKey for BotState {
    type Value = Arc<BotState>;
}

/// Builder for the Discord client.
pub struct DiscordBotBuilder {
    config: Config,
}

impl DiscordBotBuilder {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub async fn build(self) -> anyhow::Result<Client> {
        let config = Arc::new(self.config);

        let status = StatusClient::new(&config.minecraft)?;
        let chat = match config.chat.clone() {
            Some(chat_config) => Some(ChatService::new(chat_config)?),
            None => None,
        };
        let music = match config.lavalink.clone() {
            Some(lavalink) => Some(MusicController::new(lavalink, config.music.clone())?),
            None => None,
        };

        if chat.is_some() {
            info!("Mention responder enabled");
        } else {
            info!("Mention responder disabled (OPENROUTER_API_KEY not set)");
        }
        if music.is_some() {
            info!("Music playback enabled");
        } else {
            info!("Music playback disabled (LAVALINK_HOST not set)");
        }

        let state = Arc::new(BotState {
            audit: AuditLog::new(config.discord.log_channel_id),
            status,
            chat,
            music,
            warns: WarnStore::new(config.moderation.warn_store_path.clone()),
            reaction_roles: ReactionRoleStore::new(config.roles.store_path.clone()),
            rewriter: LinkRewriter::new()?,
            config: config.clone(),
        });

        let intents = GatewayIntents::GUILDS
            | GatewayIntents::GUILD_MESSAGES
            | GatewayIntents::MESSAGE_CONTENT
            | GatewayIntents::GUILD_VOICE_STATES
            | GatewayIntents::GUILD_MESSAGE_REACTIONS
            | GatewayIntents::GUILD_MEMBERS;

        let client = Client::builder(&config.discord.token, intents)
            .event_handler(Handler)
            .register_songbird()
            .await?;

        {
            let mut data = client.data.write().await;
            data.insert::<BotState>(state);
        }

        Ok(client)
    }
}
