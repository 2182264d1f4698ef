//! Per-guild track queue entries and queue rendering.

use crate::common::format::format_duration;
use crate::lavalink::protocol::Track;

/// A track together with the user who asked for it.
#[derive(Debug, Clone)]
pub struct QueuedTrack {
    pub track: Track,
    pub requester: u64,
}

/// How many pending tracks `/queue` lists before summarizing the rest.
pub const QUEUE_DISPLAY_LIMIT: usize = 10;

/// Render the `/queue` reply for a guild with something playing or pending.
pub fn render_queue(current: Option<&QueuedTrack>, pending: &[QueuedTrack]) -> String {
    let mut lines: Vec<String> = Vec::new();

    if let Some(now) = current {
        lines.push(format!(
            "**Now playing:** {} (`{}`) - requested by <@{}>",
            now.track.info.title,
            format_duration(now.track.info.duration_ms()),
            now.requester
        ));
    }

    if !pending.is_empty() {
        lines.push(String::new());
        lines.push("**Up next:**".to_string());
        for (index, entry) in pending.iter().take(QUEUE_DISPLAY_LIMIT).enumerate() {
            lines.push(format!(
                "{}. {} (`{}`) - requested by <@{}>",
                index + 1,
                entry.track.info.title,
                format_duration(entry.track.info.duration_ms()),
                entry.requester
            ));
        }
        if pending.len() > QUEUE_DISPLAY_LIMIT {
            lines.push(format!(
                "...and {} more.",
                pending.len() - QUEUE_DISPLAY_LIMIT
            ));
        }
    }

    lines.join("\n")
}

#[cfg(test)]
pub(crate) fn test_track(title: &str, length_ms: u64) -> Track {
    use crate::lavalink::protocol::TrackInfo;

    Track {
        encoded: format!("encoded-{}", title),
        info: TrackInfo {
            identifier: title.to_string(),
            is_seekable: true,
            author: "author".to_string(),
            length: length_ms,
            is_stream: false,
            position: 0,
            title: title.to_string(),
            uri: Some(format!("https://youtu.be/{}", title)),
            source_name: "youtube".to_string(),
            artwork_url: None,
            isrc: None,
        },
    }
}
