//! Minecraft server status checks via the mcsrvstat.us API.
//!
//! `/mcstatus` queries `https://api.mcsrvstat.us/3/<address>` and formats an
//! online/offline reply. Unreachable APIs and timeouts get their own
//! user-visible messages so an unreachable status service is never mistaken
//! for an offline game server.

use std::time::Duration;

use serde::Deserialize;

use crate::common::error::StatusError;
use crate::config::types::MinecraftConfig;

/// Public status API endpoint (v3).
pub const API_BASE: &str = "https://api.mcsrvstat.us/3";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Response payload from the status API. Only the fields the reply uses.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerStatus {
    #[serde(default)]
    pub online: bool,
    pub motd: Option<Motd>,
    pub players: Option<Players>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Motd {
    #[serde(default)]
    pub clean: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Players {
    pub online: u32,
    pub max: u32,
    #[serde(default)]
    pub list: Vec<PlayerEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlayerEntry {
    pub name: String,
}

/// Client for the status API, bound to one server address.
pub struct StatusClient {
    http: reqwest::Client,
    url: String,
    address: String,
}

impl StatusClient {
    pub fn new(config: &MinecraftConfig) -> Result<Self, StatusError> {
        Self::with_api_base(config, API_BASE)
    }

    /// Build against a custom API base. Used by tests.
    pub fn with_api_base(config: &MinecraftConfig, api_base: &str) -> Result<Self, StatusError> {
        let http = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            url: format!("{}/{}", api_base, config.server_address),
            address: config.server_address.clone(),
        })
    }

    /// The server address this client reports on.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Query the status API once.
    pub async fn fetch(&self) -> Result<ServerStatus, StatusError> {
        let response = self.http.get(&self.url).send().await.map_err(|e| {
            if e.is_timeout() {
                StatusError::Timeout
            } else {
                StatusError::Http(e)
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(StatusError::Api {
                status: status.as_u16(),
            });
        }

        Ok(response.json::<ServerStatus>().await?)
    }
}

/// Format the user-visible reply for a fetched status.
pub fn format_reply(address: &str, status: &ServerStatus) -> String {
    if !status.online {
        return format!("\u{274c} **{} is OFFLINE**", address);
    }

    let motd = status
        .motd
        .as_ref()
        .filter(|m| !m.clean.is_empty())
        .map(|m| m.clean.join("\n"))
        .unwrap_or_else(|| "No MOTD available".to_string());

    let players = status
        .players
        .as_ref()
        .map(|p| format!("{}/{}", p.online, p.max))
        .unwrap_or_else(|| "Unknown".to_string());

    let player_list = status
        .players
        .as_ref()
        .filter(|p| !p.list.is_empty())
        .map(|p| {
            let names: Vec<String> = p.list.iter().map(|e| format!("- {}", e.name)).collect();
            format!("\n**Players online:**\n{}", names.join("\n"))
        })
        .unwrap_or_default();

    format!(
        "\u{2705} **{} is ONLINE**\n**MOTD:** {}\n**Players:** {}{}",
        address, motd, players, player_list
    )
}

/// Format the user-visible reply for a failed fetch.
pub fn failure_reply(error: &StatusError) -> String {
    match error {
        StatusError::Api { status } => {
            format!("\u{26a0} Failed to check server status (HTTP {})", status)
        }
        StatusError::Timeout => "\u{26a0} Timed out while reaching the status API.".to_string(),
        StatusError::Http(e) => format!("\u{26a0} Error checking server status: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn minecraft_config() -> MinecraftConfig {
        MinecraftConfig {
            server_address: "test.example.org".to_string(),
            user_agent: "DiscordBot/1.0 (test)".to_string(),
        }
    }

    #[test]
    fn test_online_reply_includes_motd_and_players() {
        let status = ServerStatus {
            online: true,
            motd: Some(Motd {
                clean: vec!["Welcome".to_string(), "to the server".to_string()],
            }),
            players: Some(Players {
                online: 2,
                max: 20,
                list: vec![
                    PlayerEntry {
                        name: "alice".to_string(),
                    },
                    PlayerEntry {
                        name: "bob".to_string(),
                    },
                ],
            }),
        };

        let reply = format_reply("test.example.org", &status);
        assert!(reply.contains("test.example.org is ONLINE"));
        assert!(reply.contains("Welcome\nto the server"));
        assert!(reply.contains("**Players:** 2/20"));
        assert!(reply.contains("- alice"));
        assert!(reply.contains("- bob"));
    }

    #[test]
    fn test_online_reply_without_details() {
        let status = ServerStatus {
            online: true,
            motd: None,
            players: None,
        };

        let reply = format_reply("test.example.org", &status);
        assert!(reply.contains("No MOTD available"));
        assert!(reply.contains("**Players:** Unknown"));
        assert!(!reply.contains("Players online"));
    }

    #[test]
    fn test_offline_reply() {
        let status = ServerStatus {
            online: false,
            motd: None,
            players: None,
        };

        let reply = format_reply("test.example.org", &status);
        assert!(reply.contains("test.example.org is OFFLINE"));
    }

    #[test]
    fn test_failure_replies_are_distinct() {
        let api = failure_reply(&StatusError::Api { status: 502 });
        let timeout = failure_reply(&StatusError::Timeout);
        assert!(api.contains("HTTP 502"));
        assert!(timeout.contains("Timed out"));
        assert_ne!(api, timeout);
    }

    #[tokio::test]
    async fn test_fetch_parses_online_payload() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/3/test.example.org"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "online": true,
                "motd": { "raw": ["raw"], "clean": ["A Minecraft Server"], "html": ["html"] },
                "players": {
                    "online": 1,
                    "max": 10,
                    "list": [ { "name": "alice", "uuid": "0-0-0-0-0" } ]
                },
                "version": { "name_raw": "1.21", "name_clean": "1.21", "name_html": "1.21" }
            })))
            .mount(&server)
            .await;

        let client =
            StatusClient::with_api_base(&minecraft_config(), &format!("{}/3", server.uri()))
                .unwrap();
        let status = client.fetch().await.unwrap();
        assert!(status.online);
        assert_eq!(status.players.unwrap().list[0].name, "alice");
    }

    #[tokio::test]
    async fn test_fetch_offline_payload() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/3/test.example.org"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "online": false,
                "hostname": "test.example.org"
            })))
            .mount(&server)
            .await;

        let client =
            StatusClient::with_api_base(&minecraft_config(), &format!("{}/3", server.uri()))
                .unwrap();
        let status = client.fetch().await.unwrap();
        assert!(!status.online);
    }

    #[tokio::test]
    async fn test_fetch_http_error_surfaces_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/3/test.example.org"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client =
            StatusClient::with_api_base(&minecraft_config(), &format!("{}/3", server.uri()))
                .unwrap();
        match client.fetch().await {
            Err(StatusError::Api { status }) => assert_eq!(status, 503),
            other => panic!("expected Api error, got {:?}", other.map(|_| ())),
        }
    }
}
