//! Lavalink v4 REST client.

use std::time::Duration;

use tracing::debug;

use crate::common::error::LavalinkError;
use crate::config::types::LavalinkConfig;
use crate::lavalink::protocol::{LoadResult, PlayerUpdate, StatsData};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Thin client over the node's `/v4` REST surface.
pub struct RestClient {
    http: reqwest::Client,
    base: String,
    password: String,
}

impl RestClient {
    pub fn new(config: &LavalinkConfig) -> Result<Self, LavalinkError> {
        Self::with_base(config, config.rest_base())
    }

    /// Build against a custom base URL. Used by tests.
    pub fn with_base(config: &LavalinkConfig, base: String) -> Result<Self, LavalinkError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            base,
            password: config.password.clone(),
        })
    }

    /// Resolve a query or URL into tracks.
    pub async fn load_tracks(&self, identifier: &str) -> Result<LoadResult, LavalinkError> {
        let response = self
            .http
            .get(format!("{}/v4/loadtracks", self.base))
            .query(&[("identifier", identifier)])
            .header("Authorization", &self.password)
            .send()
            .await?;
        let response = Self::check(response).await?;
        Ok(response.json().await?)
    }

    /// Patch the player for a guild within the given socket session.
    pub async fn update_player(
        &self,
        session_id: &str,
        guild_id: u64,
        update: &PlayerUpdate,
        no_replace: bool,
    ) -> Result<(), LavalinkError> {
        debug!(guild_id, no_replace, "Updating Lavalink player");
        let response = self
            .http
            .patch(format!(
                "{}/v4/sessions/{}/players/{}",
                self.base, session_id, guild_id
            ))
            .query(&[("noReplace", no_replace)])
            .header("Authorization", &self.password)
            .json(update)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    /// Destroy the player for a guild, releasing node resources.
    pub async fn destroy_player(
        &self,
        session_id: &str,
        guild_id: u64,
    ) -> Result<(), LavalinkError> {
        debug!(guild_id, "Destroying Lavalink player");
        let response = self
            .http
            .delete(format!(
                "{}/v4/sessions/{}/players/{}",
                self.base, session_id, guild_id
            ))
            .header("Authorization", &self.password)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    /// Fetch node statistics.
    pub async fn stats(&self) -> Result<StatsData, LavalinkError> {
        let response = self
            .http
            .get(format!("{}/v4/stats", self.base))
            .header("Authorization", &self.password)
            .send()
            .await?;
        let response = Self::check(response).await?;
        Ok(response.json().await?)
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, LavalinkError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(LavalinkError::Api {
            status: status.as_u16(),
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn lavalink_config() -> LavalinkConfig {
        LavalinkConfig {
            host: "localhost".to_string(),
            port: 2333,
            password: "youshallnotpass".to_string(),
            region: None,
            ssl: false,
        }
    }

    async fn client(server: &MockServer) -> RestClient {
        RestClient::with_base(&lavalink_config(), server.uri()).unwrap()
    }

    #[tokio::test]
    async fn test_load_tracks_sends_password_and_identifier() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v4/loadtracks"))
            .and(query_param("identifier", "ytsearch:test"))
            .and(header("Authorization", "youshallnotpass"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "loadType": "empty",
                "data": {}
            })))
            .mount(&server)
            .await;

        let result = client(&server).await.load_tracks("ytsearch:test").await;
        assert!(matches!(result.unwrap(), LoadResult::Empty(_)));
    }

    #[tokio::test]
    async fn test_update_player_hits_session_path() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/v4/sessions/abc/players/42"))
            .and(query_param("noReplace", "false"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;

        client(&server)
            .await
            .update_player("abc", 42, &PlayerUpdate::pause(true), false)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_destroy_player_tolerates_no_content() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/v4/sessions/abc/players/42"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        client(&server).await.destroy_player("abc", 42).await.unwrap();
    }

    #[tokio::test]
    async fn test_unauthorized_surfaces_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v4/stats"))
            .respond_with(ResponseTemplate::new(401).set_body_string("Unauthorized"))
            .mount(&server)
            .await;

        match client(&server).await.stats().await {
            Err(LavalinkError::Api { status, body }) => {
                assert_eq!(status, 401);
                assert_eq!(body, "Unauthorized");
            }
            other => panic!("expected Api error, got {:?}", other.map(|_| ())),
        }
    }
}
