//! Audit records written to the log channel.
//!
//! Voice join/leave transitions and deleted messages both land in the
//! channel named by `LOG_CHANNEL_ID`. Failures to deliver a record are
//! logged and never fatal.

use serenity::http::Http;
use serenity::model::id::ChannelId;
use tracing::warn;

use crate::common::format::truncate;

/// Deleted message content is capped at this many characters.
const CONTENT_LIMIT: usize = 1500;

/// A user's voice presence change worth logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceTransition {
    Joined { channel_id: u64 },
    Left { channel_id: u64 },
}

/// Classify a voice state change into a loggable transition.
///
/// Channel moves and in-channel updates (mute, deafen, stream) return
/// `None`: only a plain join or a plain leave produces a log record.
pub fn classify_transition(
    old_channel: Option<u64>,
    new_channel: Option<u64>,
) -> Option<VoiceTransition> {
    match (old_channel, new_channel) {
        (None, Some(channel_id)) => Some(VoiceTransition::Joined { channel_id }),
        (Some(channel_id), None) => Some(VoiceTransition::Left { channel_id }),
        _ => None,
    }
}

pub fn join_message(user: &str, channel: &str) -> String {
    format!("\u{1f399}\u{fe0f} **{}** joined **{}**", user, channel)
}

pub fn leave_message(user: &str, channel: &str) -> String {
    format!("\u{274c} **{}** left **{}**", user, channel)
}

/// What could be recovered about a deleted message from the cache.
#[derive(Debug, Clone, Default)]
pub struct DeletedMessageRecord {
    pub channel_id: u64,
    pub message_id: u64,
    pub author_mention: Option<String>,
    pub author_id: Option<u64>,
    pub content: Option<String>,
    pub attachments: Vec<String>,
}

/// Render a deletion record the way the log channel shows it.
pub fn render_deleted(record: &DeletedMessageRecord) -> String {
    let mut parts = vec![format!("Message deleted in <#{}>", record.channel_id)];

    if record.author_mention.is_some() || record.author_id.is_some() {
        let mut author_bits = Vec::new();
        if let Some(ref mention) = record.author_mention {
            author_bits.push(mention.clone());
        }
        if let Some(id) = record.author_id {
            author_bits.push(format!("ID: {}", id));
        }
        parts.push(format!("Author: {}", author_bits.join(" ")));
    }

    parts.push(format!("Message ID: {}", record.message_id));

    match record.content.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
        Some(content) => {
            parts.push("Content:".to_string());
            parts.push(truncate(content, CONTENT_LIMIT));
        }
        None => parts.push("Content: <not available>".to_string()),
    }

    if !record.attachments.is_empty() {
        parts.push("Attachments:".to_string());
        for attachment in &record.attachments {
            parts.push(format!("- {}", attachment));
        }
    }

    parts.join("\n")
}

/// Writer bound to the configured log channel.
pub struct AuditLog {
    channel_id: ChannelId,
}

impl AuditLog {
    pub fn new(log_channel_id: u64) -> Self {
        Self {
            channel_id: ChannelId::new(log_channel_id),
        }
    }

    /// Deliver one record. Send failures are logged, never propagated.
    pub async fn send(&self, http: &Http, text: &str) {
        if let Err(e) = self.channel_id.say(http, text).await {
            warn!(
                "Failed to write audit record to channel {}: {}",
                self.channel_id, e
            );
        }
    }
}
