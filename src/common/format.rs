//! Formatting helpers for user-visible text.

/// Format a track duration in milliseconds as `h:mm:ss` or `m:ss`.
///
/// Streams carry no duration and render as `LIVE`.
pub fn format_duration(duration_ms: Option<u64>) -> String {
    let ms = match duration_ms {
        Some(ms) if ms > 0 => ms,
        _ => return "LIVE".to_string(),
    };
    let seconds = ms / 1000;
    let (minutes, seconds) = (seconds / 60, seconds % 60);
    let (hours, minutes) = (minutes / 60, minutes % 60);
    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{}:{:02}", minutes, seconds)
    }
}

/// Format a byte count with binary units, one decimal above bytes.
pub fn format_bytes(num_bytes: Option<u64>) -> String {
    let mut value = num_bytes.unwrap_or(0) as f64;
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    for unit in UNITS {
        if value < 1024.0 || unit == "TiB" {
            if unit == "B" {
                return format!("{} {}", value as u64, unit);
            }
            return format!("{:.1} {}", value, unit);
        }
        value /= 1024.0;
    }
    unreachable!()
}

/// Format an uptime in milliseconds as `1d 2h 3m 4s`, omitting leading
/// zero components.
pub fn format_uptime(uptime_ms: Option<u64>) -> String {
    let total_seconds = uptime_ms.unwrap_or(0) / 1000;
    let (days, remainder) = (total_seconds / 86_400, total_seconds % 86_400);
    let (hours, remainder) = (remainder / 3600, remainder % 3600);
    let (minutes, seconds) = (remainder / 60, remainder % 60);

    let mut parts = Vec::new();
    if days > 0 {
        parts.push(format!("{}d", days));
    }
    if hours > 0 || days > 0 {
        parts.push(format!("{}h", hours));
    }
    if minutes > 0 || hours > 0 || days > 0 {
        parts.push(format!("{}m", minutes));
    }
    parts.push(format!("{}s", seconds));
    parts.join(" ")
}

/// Split a long reply into chunks at line boundaries.
///
/// Each chunk stays within `limit` characters unless a single line already
/// exceeds it, in which case that line becomes its own oversized chunk.
pub fn chunk_message(content: &str, limit: usize) -> Vec<String> {
    if content.chars().count() <= limit {
        return vec![content.to_string()];
    }

    let mut chunks: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for line in content.split('\n') {
        let piece_len = line.chars().count() + 1;
        if current_len + piece_len > limit && !current.is_empty() {
            chunks.push(current.trim_end().to_string());
            current.clear();
            current_len = 0;
        }
        current.push_str(line);
        current.push('\n');
        current_len += piece_len;
    }
    if !current.is_empty() {
        chunks.push(current.trim_end().to_string());
    }

    chunks.retain(|chunk| !chunk.is_empty());
    chunks
}

/// Keep text under a Discord message limit with a short ellipsis.
pub fn truncate(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let cut: String = text.chars().take(limit.saturating_sub(3)).collect();
    format!("{}...", cut)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration_minutes_seconds() {
        assert_eq!(format_duration(Some(754_000)), "12:34");
        assert_eq!(format_duration(Some(61_000)), "1:01");
    }

    #[test]
    fn test_duration_with_hours() {
        assert_eq!(format_duration(Some(3_661_000)), "1:01:01");
    }

    #[test]
    fn test_duration_live() {
        assert_eq!(format_duration(None), "LIVE");
        assert_eq!(format_duration(Some(0)), "LIVE");
    }

    #[test]
    fn test_bytes_units() {
        assert_eq!(format_bytes(Some(512)), "512 B");
        assert_eq!(format_bytes(Some(2048)), "2.0 KiB");
        assert_eq!(format_bytes(Some(5 * 1024 * 1024)), "5.0 MiB");
        assert_eq!(format_bytes(None), "0 B");
    }

    #[test]
    fn test_uptime_components() {
        assert_eq!(format_uptime(Some(5_000)), "5s");
        assert_eq!(format_uptime(Some(65_000)), "1m 5s");
        assert_eq!(format_uptime(Some(90_061_000)), "1d 1h 1m 1s");
        // Hours are shown whenever days are, even at zero
        assert_eq!(format_uptime(Some(86_400_000)), "1d 0h 0m 0s");
        assert_eq!(format_uptime(None), "0s");
    }

    #[test]
    fn test_chunk_short_message_untouched() {
        let chunks = chunk_message("hello world", 1800);
        assert_eq!(chunks, vec!["hello world".to_string()]);
    }

    #[test]
    fn test_chunk_splits_on_lines() {
        let content = format!("{}\n{}", "a".repeat(30), "b".repeat(30));
        let chunks = chunk_message(&content, 40);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0], "a".repeat(30));
        assert_eq!(chunks[1], "b".repeat(30));
    }

    #[test]
    fn test_chunk_never_splits_inside_line() {
        let content = format!("{}\n{}\n{}", "x".repeat(20), "y".repeat(20), "z".repeat(20));
        for chunk in chunk_message(&content, 45) {
            for line in chunk.split('\n') {
                assert!(line.chars().all(|c| c == 'x' || c == 'y' || c == 'z'));
                assert_eq!(line.len(), 20);
            }
        }
    }

    #[test]
    fn test_chunk_oversized_line_kept_whole() {
        let content = format!("short\n{}", "q".repeat(100));
        let chunks = chunk_message(&content, 40);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[1].len(), 100);
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        let long = "a".repeat(20);
        let cut = truncate(&long, 10);
        assert_eq!(cut.chars().count(), 10);
        assert!(cut.ends_with("..."));
    }
}
