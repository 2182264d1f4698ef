//! OpenRouter chat-completion client.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::chat::memory::ChatMessage;
use crate::common::error::ChatError;
use crate::config::types::ChatConfig;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
const TEMPERATURE: f32 = 0.7;

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

pub struct OpenRouterClient {
    http: reqwest::Client,
    config: ChatConfig,
}

impl OpenRouterClient {
    pub fn new(config: ChatConfig) -> Result<Self, ChatError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self { http, config })
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Run one completion over the given messages and return the reply text.
    pub async fn complete(&self, messages: &[ChatMessage]) -> Result<String, ChatError> {
        let payload = CompletionRequest {
            model: &self.config.model,
            messages,
            temperature: TEMPERATURE,
        };

        let mut request = self
            .http
            .post(&self.config.api_url)
            .bearer_auth(&self.config.api_key)
            .json(&payload);
        if let Some(ref site_url) = self.config.site_url {
            request = request.header("HTTP-Referer", site_url);
        }
        if let Some(ref app_name) = self.config.app_name {
            request = request.header("X-Title", app_name);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ChatError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let completion: CompletionResponse = response.json().await?;
        debug!("OpenRouter returned {} choice(s)", completion.choices.len());

        let choice = completion.choices.into_iter().next().ok_or(ChatError::NoChoices)?;
        let content = choice
            .message
            .content
            .map(|c| c.trim().to_string())
            .unwrap_or_default();
        if content.is_empty() {
            return Err(ChatError::EmptyContent);
        }
        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn chat_config(api_url: String) -> ChatConfig {
        ChatConfig {
            api_key: "sk-or-test".to_string(),
            api_url,
            site_url: Some("https://example.org".to_string()),
            app_name: Some("superintendent".to_string()),
            model: "z-ai/glm-4.5-air:free".to_string(),
            system_prompt: "Be helpful.".to_string(),
            memory_limit: 12,
        }
    }

    #[tokio::test]
    async fn test_complete_returns_trimmed_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/chat/completions"))
            .and(header("Authorization", "Bearer sk-or-test"))
            .and(header("X-Title", "superintendent"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [
                    { "message": { "role": "assistant", "content": "  hello there  " } }
                ]
            })))
            .mount(&server)
            .await;

        let client = OpenRouterClient::new(chat_config(format!(
            "{}/api/v1/chat/completions",
            server.uri()
        )))
        .unwrap();
        let reply = client
            .complete(&[ChatMessage::user("hi")])
            .await
            .unwrap();
        assert_eq!(reply, "hello there");
    }

    #[tokio::test]
    async fn test_complete_surfaces_api_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
            .mount(&server)
            .await;

        let client = OpenRouterClient::new(chat_config(format!(
            "{}/api/v1/chat/completions",
            server.uri()
        )))
        .unwrap();
        match client.complete(&[ChatMessage::user("hi")]).await {
            Err(ChatError::Api { status, body }) => {
                assert_eq!(status, 429);
                assert_eq!(body, "rate limited");
            }
            other => panic!("expected Api error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_complete_rejects_empty_choices() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
            .mount(&server)
            .await;

        let client = OpenRouterClient::new(chat_config(format!(
            "{}/api/v1/chat/completions",
            server.uri()
        )))
        .unwrap();
        assert!(matches!(
            client.complete(&[ChatMessage::user("hi")]).await,
            Err(ChatError::NoChoices)
        ));
    }
}
