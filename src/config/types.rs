//! Configuration type definitions.

use std::path::PathBuf;
use std::time::Duration;

/// Which bot token the process runs under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Main,
    Dev,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Main => "main",
            Self::Dev => "dev",
        }
    }

    /// Name of the environment variable holding this environment's token.
    pub fn token_var(&self) -> &'static str {
        match self {
            Self::Main => "BOT_TOKEN_MAIN",
            Self::Dev => "BOT_TOKEN_DEV",
        }
    }
}

/// Root configuration structure.
#[derive(Debug, Clone)]
pub struct Config {
    pub discord: DiscordConfig,
    pub minecraft: MinecraftConfig,
    pub chat: Option<ChatConfig>,
    pub lavalink: Option<LavalinkConfig>,
    pub music: MusicConfig,
    pub roles: RolesConfig,
    pub moderation: ModerationConfig,
    pub greeter: GreeterConfig,
}

/// Discord connection settings.
#[derive(Debug, Clone)]
pub struct DiscordConfig {
    pub token: String,
    pub environment: Environment,
    /// Channel receiving voice and deletion audit records.
    pub log_channel_id: u64,
    /// When set, slash commands register to this guild only (instant
    /// propagation); otherwise they register globally.
    pub guild_id: Option<u64>,
}

/// Minecraft status checker settings.
#[derive(Debug, Clone)]
pub struct MinecraftConfig {
    pub server_address: String,
    pub user_agent: String,
}

/// OpenRouter mention-responder settings. Absent when no API key is set.
#[derive(Debug, Clone)]
pub struct ChatConfig {
    pub api_key: String,
    pub api_url: String,
    pub site_url: Option<String>,
    pub app_name: Option<String>,
    pub model: String,
    pub system_prompt: String,
    /// Remembered messages per user (two per exchange).
    pub memory_limit: usize,
}

/// Lavalink node connection settings. Absent when no host is set.
#[derive(Debug, Clone)]
pub struct LavalinkConfig {
    pub host: String,
    pub port: u16,
    pub password: String,
    pub region: Option<String>,
    pub ssl: bool,
}

impl LavalinkConfig {
    pub fn rest_base(&self) -> String {
        let scheme = if self.ssl { "https" } else { "http" };
        format!("{}://{}:{}", scheme, self.host, self.port)
    }

    pub fn socket_url(&self) -> String {
        let scheme = if self.ssl { "wss" } else { "ws" };
        format!("{}://{}:{}/v4/websocket", scheme, self.host, self.port)
    }
}

/// Music playback behavior.
#[derive(Debug, Clone)]
pub struct MusicConfig {
    /// Members holding this role are blocked from music commands.
    pub dj_role_id: Option<u64>,
    /// How long to stay in voice with an empty queue before leaving.
    pub idle_timeout: Duration,
    /// Player volume applied on `/play`.
    pub volume: u16,
}

/// Reaction role settings.
#[derive(Debug, Clone)]
pub struct RolesConfig {
    /// Role required to create reaction-role messages, when set.
    pub admin_role_id: Option<u64>,
    /// Unicode emoji seeded onto reaction-role messages.
    pub emoji: String,
    pub store_path: PathBuf,
}

/// Moderation settings.
#[derive(Debug, Clone)]
pub struct ModerationConfig {
    pub warn_store_path: PathBuf,
}

/// New-member greeter settings.
#[derive(Debug, Clone)]
pub struct GreeterConfig {
    /// When set, new members are renamed to `<prefix> <username>`.
    pub nickname_prefix: Option<String>,
}
