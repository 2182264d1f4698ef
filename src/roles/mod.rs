//! Reaction roles: a JSON-backed table from message id to role.
//!
//! `/reaction` posts a prompt message and records it here; the reaction
//! add/remove listeners grant or revoke the role for matching reactions.
//! Malformed entries are skipped on load with a warning.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, warn};

/// One reaction-role binding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionRoleEntry {
    pub guild_id: u64,
    pub channel_id: u64,
    pub role_id: u64,
    pub emoji: String,
}

/// Message id to binding table, persisted after every mutation.
pub struct ReactionRoleStore {
    path: PathBuf,
    entries: Mutex<HashMap<u64, ReactionRoleEntry>>,
}

impl ReactionRoleStore {
    pub fn new(path: PathBuf) -> Self {
        let entries = Self::load(&path);
        Self {
            path,
            entries: Mutex::new(entries),
        }
    }

    fn load(path: &PathBuf) -> HashMap<u64, ReactionRoleEntry> {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(_) => return HashMap::new(),
        };
        let parsed: HashMap<String, Value> = match serde_json::from_str(&raw) {
            Ok(parsed) => parsed,
            Err(e) => {
                error!("Failed to parse reaction role file {}: {}", path.display(), e);
                return HashMap::new();
            }
        };

        let mut loaded = HashMap::new();
        for (raw_message_id, payload) in parsed {
            let message_id = match raw_message_id.parse::<u64>() {
                Ok(id) => id,
                Err(_) => {
                    warn!("Ignoring malformed reaction role entry {}", raw_message_id);
                    continue;
                }
            };
            match serde_json::from_value::<ReactionRoleEntry>(payload) {
                Ok(entry) => {
                    loaded.insert(message_id, entry);
                }
                Err(_) => {
                    warn!("Ignoring malformed reaction role entry {}", raw_message_id);
                }
            }
        }
        loaded
    }

    fn save(&self, entries: &HashMap<u64, ReactionRoleEntry>) {
        let serializable: HashMap<String, &ReactionRoleEntry> = entries
            .iter()
            .map(|(message_id, entry)| (message_id.to_string(), entry))
            .collect();
        match serde_json::to_string_pretty(&serializable) {
            Ok(json) => {
                if let Err(e) = fs::write(&self.path, json) {
                    error!("Failed to persist reaction role data: {}", e);
                }
            }
            Err(e) => error!("Failed to serialize reaction role data: {}", e),
        }
    }

    pub fn set_entry(&self, message_id: u64, entry: ReactionRoleEntry) {
        let mut entries = self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        entries.insert(message_id, entry);
        self.save(&entries);
    }

    pub fn remove_entry(&self, message_id: u64) {
        let mut entries = self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if entries.remove(&message_id).is_some() {
            self.save(&entries);
        }
    }

    pub fn get_entry(&self, message_id: u64) -> Option<ReactionRoleEntry> {
        let entries = self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        entries.get(&message_id).cloned()
    }

    pub fn len(&self) -> usize {
        let entries = self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The prompt message posted under `/reaction`.
pub fn prompt_message(emoji: &str, role_id: u64) -> String {
    format!(
        "React with {} to receive <@&{}>.\nRemove your reaction to have the role removed.",
        emoji, role_id
    )
}
