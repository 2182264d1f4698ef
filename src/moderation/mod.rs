//! Moderation: a JSON-backed warn ledger.
//!
//! Warnings persist to a small JSON file (`warns.json` by default) so they
//! survive restarts. A malformed or missing file degrades to an empty
//! ledger instead of failing startup.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tracing::{error, warn};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct WarnEntry {
    warns: Vec<String>,
}

/// Per-user warning lists, persisted after every mutation.
pub struct WarnStore {
    path: PathBuf,
    entries: Mutex<HashMap<u64, WarnEntry>>,
}

impl WarnStore {
    pub fn new(path: PathBuf) -> Self {
        let entries = Self::load(&path);
        Self {
            path,
            entries: Mutex::new(entries),
        }
    }

    fn load(path: &PathBuf) -> HashMap<u64, WarnEntry> {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(_) => return HashMap::new(),
        };
        let parsed: HashMap<String, WarnEntry> = match serde_json::from_str(&raw) {
            Ok(parsed) => parsed,
            Err(e) => {
                error!("Failed to parse warn file {}: {}", path.display(), e);
                return HashMap::new();
            }
        };

        parsed
            .into_iter()
            .filter_map(|(key, entry)| match key.parse::<u64>() {
                Ok(user_id) => Some((user_id, entry)),
                Err(_) => {
                    warn!("Ignoring malformed warn entry key '{}'", key);
                    None
                }
            })
            .collect()
    }

    fn save(&self, entries: &HashMap<u64, WarnEntry>) {
        let serializable: HashMap<String, &WarnEntry> = entries
            .iter()
            .map(|(user_id, entry)| (user_id.to_string(), entry))
            .collect();
        match serde_json::to_string_pretty(&serializable) {
            Ok(json) => {
                if let Err(e) = fs::write(&self.path, json) {
                    error!("Failed to persist warn data: {}", e);
                }
            }
            Err(e) => error!("Failed to serialize warn data: {}", e),
        }
    }

    /// Record a warning and return the user's updated list.
    pub fn add_warn(&self, user_id: u64, text: impl Into<String>) -> Vec<String> {
        let mut entries = self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let entry = entries.entry(user_id).or_default();
        entry.warns.push(text.into());
        let current = entry.warns.clone();
        self.save(&entries);
        current
    }

    /// A user's warnings, oldest first. Empty when none recorded.
    pub fn get_warns(&self, user_id: u64) -> Vec<String> {
        let entries = self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        entries
            .get(&user_id)
            .map(|entry| entry.warns.clone())
            .unwrap_or_default()
    }
}

/// Render a warning list for the `/warns` reply.
pub fn format_warns(warns: &[String]) -> String {
    if warns.is_empty() {
        return "No warnings recorded.".to_string();
    }
    warns
        .iter()
        .enumerate()
        .map(|(index, text)| format!("{}. {}", index + 1, text))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_starts_empty() {
        let dir = tempdir().unwrap();
        let store = WarnStore::new(dir.path().join("warns.json"));
        assert!(store.get_warns(1).is_empty());
    }

    #[test]
    fn test_warns_round_trip_through_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("warns.json");

        let store = WarnStore::new(path.clone());
        store.add_warn(7, "spamming");
        store.add_warn(7, "still spamming");
        store.add_warn(8, "other user");

        let reloaded = WarnStore::new(path);
        assert_eq!(reloaded.get_warns(7), vec!["spamming", "still spamming"]);
        assert_eq!(reloaded.get_warns(8), vec!["other user"]);
        assert!(reloaded.get_warns(9).is_empty());
    }

    #[test]
    fn test_malformed_file_degrades_to_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("warns.json");
        std::fs::write(&path, "{ not json").unwrap();

        let store = WarnStore::new(path);
        assert!(store.get_warns(1).is_empty());
    }

    #[test]
    fn test_format_warns() {
        assert_eq!(format_warns(&[]), "No warnings recorded.");
        let warns = vec!["first".to_string(), "second".to_string()];
        assert_eq!(format_warns(&warns), "1. first\n2. second");
    }
}
