//! In-process preference store.
//!
//! A plain map owned by the conversation loop. There is no locking, no
//! eviction and no size bound: one user talks to one loop at a time.

use chrono::{DateTime, Utc};
use concierge_core::error::MemoryError;
use concierge_core::preference::{PreferenceUpdate, Preferences, normalize_key};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

/// User id → preference record.
#[derive(Debug, Clone, Default)]
pub struct PreferenceStore {
    records: HashMap<String, Preferences>,
}

/// The JSON shape written by [`PreferenceStore::export_to`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreferenceSnapshot {
    pub users: HashMap<String, Preferences>,
    pub exported_at: DateTime<Utc>,
}

impl PreferenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The user's record; empty if nothing was remembered yet.
    pub fn get(&self, user: &str) -> Preferences {
        self.records.get(user).cloned().unwrap_or_default()
    }

    /// Remember `key = value` for `user`, replacing any earlier value.
    ///
    /// The key is stored exactly as given. Model-flagged keys arrive already
    /// normalized through [`PreferenceUpdate`].
    pub fn set(&mut self, user: &str, key: &str, value: &str) {
        debug!(user, key, "Remembering preference");
        self.records
            .entry(user.to_string())
            .or_default()
            .insert(key.to_string(), value.to_string());
    }

    /// Apply a model-flagged update.
    pub fn apply(&mut self, user: &str, update: &PreferenceUpdate) {
        self.set(user, &update.key, &update.value);
    }

    /// Drop one key, matched as typed or in its normalized form.
    /// Returns whether it existed.
    pub fn forget(&mut self, user: &str, key: &str) -> bool {
        let Some(record) = self.records.get_mut(user) else {
            return false;
        };
        let removed = record.remove(key).is_some() || record.remove(&normalize_key(key)).is_some();
        if record.is_empty() {
            self.records.remove(user);
        }
        removed
    }

    /// Number of users with at least one preference.
    pub fn user_count(&self) -> usize {
        self.records.len()
    }

    /// Total remembered facts across all users.
    pub fn preference_count(&self) -> usize {
        self.records.values().map(|r| r.len()).sum()
    }

    pub fn snapshot(&self) -> PreferenceSnapshot {
        PreferenceSnapshot {
            users: self.records.clone(),
            exported_at: Utc::now(),
        }
    }

    /// Write every record to `path` as pretty JSON.
    pub fn export_to(&self, path: &Path) -> Result<usize, MemoryError> {
        let json = serde_json::to_string_pretty(&self.snapshot())
            .map_err(|e| MemoryError::Malformed(e.to_string()))?;
        std::fs::write(path, json)
            .map_err(|e| MemoryError::Storage(format!("{}: {e}", path.display())))?;
        Ok(self.records.len())
    }

    /// Merge records from a snapshot file. Imported values win on conflict.
    ///
    /// Returns the number of users touched.
    pub fn import_from(&mut self, path: &Path) -> Result<usize, MemoryError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| MemoryError::Storage(format!("{}: {e}", path.display())))?;
        let snapshot: PreferenceSnapshot =
            serde_json::from_str(&content).map_err(|e| MemoryError::Malformed(e.to_string()))?;

        let touched = snapshot.users.len();
        for (user, prefs) in snapshot.users {
            for (key, value) in prefs {
                self.set(&user, &key, &value);
            }
        }
        Ok(touched)
    }
}
