//! Mention responder backed by OpenRouter with per-user memory.

pub mod memory;
pub mod openrouter;

use tracing::info;

use crate::common::error::ChatError;
use crate::config::types::ChatConfig;
use memory::{ChatMessage, MemoryStore};
use openrouter::OpenRouterClient;

/// Reply sent when the completion API fails.
pub const APOLOGY: &str = "I couldn't reach my AI brain right now. Please try again later.";

/// Maximum characters per reply chunk (Discord's limit minus headroom).
pub const CHUNK_LIMIT: usize = 1800;

/// Returns true when the message content mentions the given user.
pub fn mentioned(content: &str, bot_id: u64) -> bool {
    content.contains(&format!("<@{}>", bot_id)) || content.contains(&format!("<@!{}>", bot_id))
}

/// Remove mention tokens for the given user and trim the remainder.
pub fn strip_mentions(content: &str, bot_id: u64) -> String {
    content
        .replace(&format!("<@!{}>", bot_id), "")
        .replace(&format!("<@{}>", bot_id), "")
        .trim()
        .to_string()
}

/// The mention responder: memory plus completion client.
pub struct ChatService {
    client: OpenRouterClient,
    memory: MemoryStore,
    system_prompt: String,
}

impl ChatService {
    pub fn new(config: ChatConfig) -> Result<Self, ChatError> {
        let memory = MemoryStore::new(config.memory_limit);
        let system_prompt = config.system_prompt.clone();
        Ok(Self {
            client: OpenRouterClient::new(config)?,
            memory,
            system_prompt,
        })
    }

    /// Answer a cleaned mention and remember the exchange.
    ///
    /// Nothing is recorded when the completion fails, so a retry replays the
    /// same history.
    pub async fn respond(&self, user_id: u64, text: &str) -> Result<String, ChatError> {
        let mut messages = vec![ChatMessage::system(&self.system_prompt)];
        messages.extend(self.memory.history(user_id).await);
        messages.push(ChatMessage::user(text));

        let reply = self.client.complete(&messages).await?;
        self.memory.record_exchange(user_id, text, &reply).await;

        let preview: String = reply.chars().take(200).collect();
        info!(user_id, model = self.client.model(), "AI response: {}", preview);
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mention_detection() {
        assert!(mentioned("<@42> hello", 42));
        assert!(mentioned("hey <@!42>", 42));
        assert!(!mentioned("<@43> hello", 42));
        assert!(!mentioned("plain message", 42));
    }

    #[test]
    fn test_strip_mentions() {
        assert_eq!(strip_mentions("<@42> hello", 42), "hello");
        assert_eq!(strip_mentions("hey <@!42> there", 42), "hey  there");
        assert_eq!(strip_mentions("<@42>", 42), "");
    }
}
