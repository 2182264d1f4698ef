//! Environment-driven configuration loading.
//!
//! Every setting comes from environment variables, read once at startup:
//! - `BOT_ENVIRONMENT` - `main` (default) or `dev`; selects the token
//! - `BOT_TOKEN_MAIN` / `BOT_TOKEN_DEV` - Discord bot tokens
//! - `LOG_CHANNEL_ID` - audit log channel
//! - `GUILD_ID` - optional guild scope for slash command registration
//! - `MC_SERVER_ADDRESS` - Minecraft server checked by `/mcstatus`
//! - `OPENROUTER_API_KEY` and friends - mention responder
//! - `LAVALINK_HOST` and friends - music playback node
//! - `MUSIC_DJ_ROLE_ID` - role blocked from music commands
//!
//! Optional subsystems (chat, music) stay disabled when their key variable
//! is absent; required variables produce a descriptive startup error.

use std::env;
use std::time::Duration;

use crate::common::error::ConfigError;
use crate::config::types::{
    ChatConfig, Config, DiscordConfig, Environment, GreeterConfig, LavalinkConfig,
    MinecraftConfig, ModerationConfig, MusicConfig, RolesConfig,
};

const DEFAULT_MC_SERVER: &str = "agartha.my.pebble.host";
const DEFAULT_USER_AGENT: &str =
    "DiscordBot/1.0 (contact:admin@superintendent.me .superintendent discord)";
const DEFAULT_OPENROUTER_URL: &str = "https://openrouter.ai/api/v1/chat/completions";
const DEFAULT_MODEL: &str = "z-ai/glm-4.5-air:free";
const DEFAULT_SYSTEM_PROMPT: &str =
    "You are Superintendent, a helpful Discord assistant. Keep replies concise and friendly.";
const DEFAULT_MEMORY_LIMIT: usize = 12;
const DEFAULT_LAVALINK_PORT: u16 = 2333;
const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 300;
const DEFAULT_VOLUME: u16 = 100;
const DEFAULT_REACTION_EMOJI: &str = "\u{2705}";
const DEFAULT_REACTION_STORE: &str = "reaction_roles.json";
const DEFAULT_WARN_STORE: &str = "warns.json";

/// Load configuration from the process environment.
pub fn load() -> Result<Config, ConfigError> {
    from_lookup(|name| env::var(name).ok())
}

/// Load configuration through a variable lookup, so tests can inject maps.
pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Config, ConfigError> {
    let environment = match get("BOT_ENVIRONMENT").as_deref() {
        None | Some("main") => Environment::Main,
        Some("dev") => Environment::Dev,
        Some(other) => {
            return Err(ConfigError::InvalidVar {
                name: "BOT_ENVIRONMENT",
                message: format!("expected 'main' or 'dev', got '{}'", other),
            })
        }
    };

    let token_var = environment.token_var();
    let token = get(token_var)
        .filter(|v| !v.is_empty())
        .ok_or(ConfigError::MissingVar { name: token_var })?;

    let log_channel_id = parse_u64(&get, "LOG_CHANNEL_ID")?
        .ok_or(ConfigError::MissingVar { name: "LOG_CHANNEL_ID" })?;

    let discord = DiscordConfig {
        token,
        environment,
        log_channel_id,
        guild_id: parse_u64(&get, "GUILD_ID")?,
    };

    let minecraft = MinecraftConfig {
        server_address: get("MC_SERVER_ADDRESS").unwrap_or_else(|| DEFAULT_MC_SERVER.to_string()),
        user_agent: get("MC_USER_AGENT").unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
    };

    let chat = match get("OPENROUTER_API_KEY").filter(|v| !v.is_empty()) {
        Some(api_key) => Some(ChatConfig {
            api_key,
            api_url: get("OPENROUTER_API_URL")
                .unwrap_or_else(|| DEFAULT_OPENROUTER_URL.to_string()),
            site_url: get("OPENROUTER_SITE_URL").filter(|v| !v.is_empty()),
            app_name: get("OPENROUTER_APP_NAME").filter(|v| !v.is_empty()),
            model: get("OPENROUTER_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            system_prompt: get("CHAT_SYSTEM_PROMPT")
                .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string()),
            memory_limit: parse_usize(&get, "CHAT_MEMORY_LIMIT")?.unwrap_or(DEFAULT_MEMORY_LIMIT),
        }),
        None => None,
    };

    let lavalink = match get("LAVALINK_HOST").filter(|v| !v.is_empty()) {
        Some(host) => Some(LavalinkConfig {
            host,
            port: parse_u16(&get, "LAVALINK_PORT")?.unwrap_or(DEFAULT_LAVALINK_PORT),
            password: get("LAVALINK_PASSWORD")
                .filter(|v| !v.is_empty())
                .ok_or(ConfigError::MissingVar { name: "LAVALINK_PASSWORD" })?,
            region: get("LAVALINK_REGION").filter(|v| !v.is_empty()),
            ssl: parse_bool(&get, "LAVALINK_SSL")?.unwrap_or(false),
        }),
        None => None,
    };

    let music = MusicConfig {
        dj_role_id: parse_u64(&get, "MUSIC_DJ_ROLE_ID")?,
        idle_timeout: Duration::from_secs(
            parse_u64(&get, "MUSIC_IDLE_TIMEOUT")?.unwrap_or(DEFAULT_IDLE_TIMEOUT_SECS),
        ),
        volume: parse_u16(&get, "MUSIC_VOLUME")?.unwrap_or(DEFAULT_VOLUME),
    };

    let roles = RolesConfig {
        admin_role_id: parse_u64(&get, "REACTION_ROLE_ADMIN_ROLE_ID")?,
        emoji: get("REACTION_ROLE_EMOJI").unwrap_or_else(|| DEFAULT_REACTION_EMOJI.to_string()),
        store_path: get("REACTION_ROLE_STORE_PATH")
            .unwrap_or_else(|| DEFAULT_REACTION_STORE.to_string())
            .into(),
    };

    let moderation = ModerationConfig {
        warn_store_path: get("WARN_STORE_PATH")
            .unwrap_or_else(|| DEFAULT_WARN_STORE.to_string())
            .into(),
    };

    let greeter = GreeterConfig {
        nickname_prefix: get("JOIN_NICKNAME_PREFIX").filter(|v| !v.is_empty()),
    };

    Ok(Config {
        discord,
        minecraft,
        chat,
        lavalink,
        music,
        roles,
        moderation,
        greeter,
    })
}

fn parse_u64(
    get: &impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<Option<u64>, ConfigError> {
    match get(name).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(value) => value
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidVar {
                name,
                message: format!("expected an integer, got '{}'", value),
            }),
    }
}

fn parse_u16(
    get: &impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<Option<u16>, ConfigError> {
    match get(name).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(value) => value
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidVar {
                name,
                message: format!("expected an integer, got '{}'", value),
            }),
    }
}

fn parse_usize(
    get: &impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<Option<usize>, ConfigError> {
    match get(name).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(value) => value
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidVar {
                name,
                message: format!("expected an integer, got '{}'", value),
            }),
    }
}

fn parse_bool(
    get: &impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<Option<bool>, ConfigError> {
    match get(name).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(value) => match value.to_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(Some(true)),
            "0" | "false" | "no" | "off" => Ok(Some(false)),
            _ => Err(ConfigError::InvalidVar {
                name,
                message: format!("expected a boolean, got '{}'", value),
            }),
        },
    }
}
