//! Named terminal windows.
//!
//! Hooks can name the window they run in (`register_window` datagrams).
//! Sessions discovered in a named window are grouped under that name in
//! status output. Persisted to `windows.json`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::persist::{load_json, save_json};

/// A window the user gave a name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedWindow {
    pub name: String,
    /// Terminal-assigned window id (tmux "@3")
    pub window_id: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub session_count: u32,
}

#[derive(Debug, Serialize, Deserialize)]
struct WindowsDocument {
    windows: Vec<TrackedWindow>,
    last_used_window: Option<String>,
    last_updated: DateTime<Utc>,
}

/// Registry of named windows keyed by name.
#[derive(Debug, Default)]
pub struct WindowRegistry {
    path: Option<PathBuf>,
    windows: BTreeMap<String, TrackedWindow>,
    last_used: Option<String>,
}

impl WindowRegistry {
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Loads `windows.json`; missing or corrupt → empty.
    pub fn load(path: &Path) -> Self {
        let mut registry = Self {
            path: Some(path.to_path_buf()),
            ..Self::default()
        };

        if let Some(doc) = load_json::<WindowsDocument>(path) {
            registry.windows = doc
                .windows
                .into_iter()
                .map(|w| (w.name.clone(), w))
                .collect();
            registry.last_used = doc
                .last_used_window
                .filter(|name| registry.windows.contains_key(name));
        }

        registry
    }

    /// Names a window and marks it last used.
    ///
    /// Re-registering a known name points it at `window_id` and keeps its
    /// creation time and session count.
    pub fn register_window(&mut self, name: &str, window_id: &str) -> TrackedWindow {
        self.register_window_at(name, window_id, Utc::now())
    }

    pub fn register_window_at(
        &mut self,
        name: &str,
        window_id: &str,
        now: DateTime<Utc>,
    ) -> TrackedWindow {
        let window = match self.windows.get_mut(name) {
            Some(existing) => {
                info!(name, window_id, "Window re-registered");
                existing.window_id = window_id.to_string();
                existing.clone()
            }
            None => {
                info!(name, window_id, "Window registered");
                let window = TrackedWindow {
                    name: name.to_string(),
                    window_id: window_id.to_string(),
                    created_at: now,
                    session_count: 0,
                };
                self.windows.insert(name.to_string(), window.clone());
                window
            }
        };
        self.last_used = Some(name.to_string());
        self.persist();
        window
    }

    pub fn unregister_window(&mut self, name: &str) -> bool {
        if self.windows.remove(name).is_none() {
            return false;
        }
        if self.last_used.as_deref() == Some(name) {
            self.last_used = None;
        }
        self.persist();
        true
    }

    pub fn get_window(&self, name: &str) -> Option<&TrackedWindow> {
        self.windows.get(name)
    }

    pub fn get_window_by_terminal_window_id(&self, window_id: &str) -> Option<&TrackedWindow> {
        self.windows.values().find(|w| w.window_id == window_id)
    }

    /// The window marked last used, else the most recently created one.
    pub fn last_used_window(&self) -> Option<&TrackedWindow> {
        self.last_used
            .as_ref()
            .and_then(|name| self.windows.get(name))
            .or_else(|| self.windows.values().max_by_key(|w| w.created_at))
    }

    pub fn mark_window_used(&mut self, name: &str) {
        if self.windows.contains_key(name) {
            self.last_used = Some(name.to_string());
            self.persist();
        }
    }

    pub fn increment_session_count(&mut self, name: &str) {
        if let Some(window) = self.windows.get_mut(name) {
            window.session_count = window.session_count.saturating_add(1);
            self.persist();
        }
    }

    pub fn decrement_session_count(&mut self, name: &str) {
        if let Some(window) = self.windows.get_mut(name) {
            window.session_count = window.session_count.saturating_sub(1);
            self.persist();
        }
    }

    pub fn all_windows(&self) -> Vec<TrackedWindow> {
        self.windows.values().cloned().collect()
    }

    /// Drops windows whose id is not in `valid_ids`. Returns removed names.
    pub fn cleanup_stale(&mut self, valid_ids: &[String]) -> Vec<String> {
        let removed: Vec<String> = self
            .windows
            .values()
            .filter(|w| !valid_ids.contains(&w.window_id))
            .map(|w| w.name.clone())
            .collect();

        if removed.is_empty() {
            return removed;
        }

        for name in &removed {
            self.windows.remove(name);
            if self.last_used.as_deref() == Some(name.as_str()) {
                self.last_used = None;
            }
        }
        info!(?removed, "Removed stale windows");
        self.persist();
        removed
    }

    pub fn persist(&self) {
        let Some(path) = &self.path else {
            return;
        };

        let doc = WindowsDocument {
            windows: self.all_windows(),
            last_used_window: self.last_used.clone(),
            last_updated: Utc::now(),
        };

        if let Err(e) = save_json(path, &doc) {
            warn!(error = %e, "Failed to save window registry");
        }
    }
}
