//! Bounded per-user conversation memory.
//!
//! Each user gets an independent rolling window of recent exchanges. The
//! window is process-lifetime only; nothing persists.

use std::collections::{HashMap, VecDeque};

use serde::Serialize;
use tokio::sync::Mutex;

/// One message in a conversation, in the wire shape the completion API takes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub role: &'static str,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system",
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user",
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant",
            content: content.into(),
        }
    }
}

/// Per-user rolling message windows, updated atomically per user.
pub struct MemoryStore {
    limit: usize,
    memories: Mutex<HashMap<u64, VecDeque<ChatMessage>>>,
}

impl MemoryStore {
    /// `limit` counts messages, not exchanges; an exchange appends two.
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            memories: Mutex::new(HashMap::new()),
        }
    }

    /// Snapshot a user's remembered messages, oldest first.
    pub async fn history(&self, user_id: u64) -> Vec<ChatMessage> {
        let memories = self.memories.lock().await;
        memories
            .get(&user_id)
            .map(|window| window.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Append one completed exchange, evicting the oldest messages beyond
    /// the window limit.
    pub async fn record_exchange(&self, user_id: u64, user_text: &str, assistant_text: &str) {
        let mut memories = self.memories.lock().await;
        let window = memories.entry(user_id).or_default();
        window.push_back(ChatMessage::user(user_text));
        window.push_back(ChatMessage::assistant(assistant_text));
        while window.len() > self.limit {
            window.pop_front();
        }
    }
}
