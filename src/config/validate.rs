//! Configuration validation.
//!
//! Validates configuration values and provides helpful error messages.

use crate::common::error::ConfigError;
use crate::config::types::Config;

/// Validate a configuration and return detailed errors.
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let mut errors = Vec::new();

    if config.discord.token.is_empty() {
        errors.push("discord token is required".to_string());
    }
    if config.discord.log_channel_id == 0 {
        errors.push("LOG_CHANNEL_ID must be non-zero".to_string());
    }
    if config.minecraft.server_address.is_empty() {
        errors.push("MC_SERVER_ADDRESS must not be empty".to_string());
    }

    if let Some(ref chat) = config.chat {
        if chat.memory_limit == 0 {
            errors.push("CHAT_MEMORY_LIMIT must be at least 1".to_string());
        }
        if !chat.api_url.starts_with("http://") && !chat.api_url.starts_with("https://") {
            errors.push(format!(
                "OPENROUTER_API_URL must be an http(s) URL, got '{}'",
                chat.api_url
            ));
        }
    }

    if let Some(ref lavalink) = config.lavalink {
        if lavalink.port == 0 {
            errors.push("LAVALINK_PORT must be non-zero".to_string());
        }
    }

    if config.music.volume > 1000 {
        errors.push(format!(
            "MUSIC_VOLUME must be 0-1000 (got {})",
            config.music.volume
        ));
    }
    if config.music.idle_timeout.is_zero() {
        errors.push("MUSIC_IDLE_TIMEOUT must be non-zero".to_string());
    }

    if emojis::get(&config.roles.emoji).is_none() {
        errors.push(format!(
            "REACTION_ROLE_EMOJI '{}' is not a recognized Unicode emoji",
            config.roles.emoji
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationError {
            message: errors.join("\n"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::env::from_lookup;
    use std::collections::HashMap;

    fn make_valid_config() -> Config {
        let vars: HashMap<&str, &str> = [
            ("BOT_TOKEN_MAIN", "token"),
            ("LOG_CHANNEL_ID", "42"),
            ("OPENROUTER_API_KEY", "sk-or-abc"),
            ("LAVALINK_HOST", "localhost"),
            ("LAVALINK_PASSWORD", "secret"),
        ]
        .into_iter()
        .collect();
        from_lookup(|name| vars.get(name).map(|v| v.to_string())).unwrap()
    }

    #[test]
    fn test_valid_config_passes() {
        let config = make_valid_config();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_zero_log_channel_fails() {
        let mut config = make_valid_config();
        config.discord.log_channel_id = 0;

        let result = validate_config(&config);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("LOG_CHANNEL_ID"));
    }

    #[test]
    fn test_excessive_volume_fails() {
        let mut config = make_valid_config();
        config.music.volume = 1001;

        let result = validate_config(&config);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("MUSIC_VOLUME"));
    }

    #[test]
    fn test_non_emoji_reaction_fails() {
        let mut config = make_valid_config();
        config.roles.emoji = "not an emoji".to_string();

        let result = validate_config(&config);
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("REACTION_ROLE_EMOJI"));
    }

    #[test]
    fn test_default_emoji_is_valid() {
        let config = make_valid_config();
        assert!(emojis::get(&config.roles.emoji).is_some());
    }

    #[test]
    fn test_bad_api_url_fails() {
        let mut config = make_valid_config();
        if let Some(ref mut chat) = config.chat {
            chat.api_url = "openrouter.ai/api".to_string();
        }

        let result = validate_config(&config);
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("OPENROUTER_API_URL"));
    }
}
