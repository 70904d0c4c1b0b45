//! Authoritative per-session state and notification cadence.
//!
//! The store owns every [`TrackedSession`]. It detects state transitions,
//! hands out palette slots and decides which sessions are due a
//! notification. Every structural change is written to `state.json`;
//! steady-state updates that do not change the state are kept in memory.
//!
//! Time-dependent operations come in pairs: `foo()` uses the wall clock,
//! `foo_at(now)` takes the instant explicitly.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use hud_core::{
    ClaudeState, DomainResult, ExternalId, Rgb, StatusSummary, TerminalId, TrackedSession,
    PALETTE_SIZE,
};

use crate::persist::{load_json, save_json};

/// Default minimum gap between two notifications for one session.
pub const DEFAULT_COOLDOWN_SECS: i64 = 30;

/// Default gap before a still-waiting session is reminded again.
pub const DEFAULT_REMINDER_SECS: i64 = 300;

/// Cooldown and reminder windows. Both must have passed for a repeat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotificationPolicy {
    pub cooldown: Duration,
    pub reminder: Duration,
}

impl Default for NotificationPolicy {
    fn default() -> Self {
        Self {
            cooldown: Duration::seconds(DEFAULT_COOLDOWN_SECS),
            reminder: Duration::seconds(DEFAULT_REMINDER_SECS),
        }
    }
}

impl NotificationPolicy {
    /// True if `session` is due a notification at `now`.
    #[must_use]
    pub fn is_due(&self, session: &TrackedSession, now: DateTime<Utc>) -> bool {
        if session.current_state != ClaudeState::WaitingInput || session.in_cooldown(now) {
            return false;
        }
        match session.last_notification {
            None => true,
            Some(last) => now - last >= self.reminder,
        }
    }
}

/// On-disk layout of `state.json`.
#[derive(Debug, Serialize, Deserialize)]
struct StateDocument {
    sessions: Vec<TrackedSession>,
    last_updated: DateTime<Utc>,
}

/// Table of tracked sessions keyed by terminal id.
#[derive(Debug)]
pub struct SessionStore {
    path: Option<PathBuf>,
    sessions: BTreeMap<TerminalId, TrackedSession>,
    policy: NotificationPolicy,
}

impl SessionStore {
    /// Creates a store that never touches disk.
    pub fn in_memory(policy: NotificationPolicy) -> Self {
        Self {
            path: None,
            sessions: BTreeMap::new(),
            policy,
        }
    }

    /// Loads `state.json`; missing or corrupt → empty.
    pub fn load(path: &Path, policy: NotificationPolicy) -> Self {
        let mut store = Self {
            path: Some(path.to_path_buf()),
            sessions: BTreeMap::new(),
            policy,
        };

        if let Some(doc) = load_json::<StateDocument>(path) {
            for session in doc.sessions {
                if session.terminal_id.is_empty() || session.color_index >= PALETTE_SIZE {
                    warn!(terminal_id = %session.terminal_id, "Skipping invalid stored session");
                    continue;
                }
                store.sessions.insert(session.terminal_id.clone(), session);
            }
            info!(
                path = %path.display(),
                sessions = store.sessions.len(),
                "Loaded session state"
            );
        }

        store
    }

    pub fn policy(&self) -> NotificationPolicy {
        self.policy
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Starts tracking a terminal session and returns its record.
    ///
    /// Tracking an already tracked session returns the existing record.
    ///
    /// # Errors
    ///
    /// Rejects an empty terminal id.
    pub fn track(
        &mut self,
        terminal_id: TerminalId,
        project_path: &str,
        window_name: Option<String>,
    ) -> DomainResult<TrackedSession> {
        self.track_at(terminal_id, project_path, window_name, Utc::now())
    }

    pub fn track_at(
        &mut self,
        terminal_id: TerminalId,
        project_path: &str,
        window_name: Option<String>,
        now: DateTime<Utc>,
    ) -> DomainResult<TrackedSession> {
        if let Some(existing) = self.sessions.get(&terminal_id) {
            return Ok(existing.clone());
        }

        let color_index = self.next_color_index();
        let session = TrackedSession::new(
            terminal_id.clone(),
            project_path,
            window_name,
            color_index,
            now,
        )?;
        info!(
            terminal_id = %terminal_id,
            project = %session.project_name,
            color_index,
            "Tracking session"
        );
        self.sessions.insert(terminal_id, session.clone());
        self.persist();
        Ok(session)
    }

    /// Stops tracking a session, freeing its palette slot.
    ///
    /// Returns false if the session was not tracked.
    pub fn untrack(&mut self, terminal_id: &TerminalId) -> bool {
        if self.sessions.remove(terminal_id).is_none() {
            return false;
        }
        info!(terminal_id = %terminal_id, "Untracked session");
        self.persist();
        true
    }

    /// Lowest free slot, or the slot after the highest one when all are taken.
    fn next_color_index(&self) -> usize {
        let used: Vec<usize> = self.sessions.values().map(|s| s.color_index).collect();
        (0..PALETTE_SIZE)
            .find(|slot| !used.contains(slot))
            .unwrap_or_else(|| used.iter().max().map_or(0, |max| (max + 1) % PALETTE_SIZE))
    }

    // ========================================================================
    // Updates
    // ========================================================================

    /// Records a freshly derived state.
    ///
    /// Returns true on a transition. Unknown sessions are ignored.
    pub fn update(
        &mut self,
        terminal_id: &TerminalId,
        state: ClaudeState,
        task: Option<String>,
    ) -> bool {
        self.update_at(terminal_id, state, task, Utc::now())
    }

    pub fn update_at(
        &mut self,
        terminal_id: &TerminalId,
        state: ClaudeState,
        task: Option<String>,
        now: DateTime<Utc>,
    ) -> bool {
        let Some(session) = self.sessions.get_mut(terminal_id) else {
            return false;
        };

        let previous = session.current_state;
        session.current_state = state;
        session.current_task = task;
        session.last_updated = now;

        if previous == state {
            return false;
        }

        debug!(
            terminal_id = %terminal_id,
            from = %previous,
            to = %state,
            "State transition"
        );
        self.persist();
        true
    }

    /// Attaches the agent identity to a session. Set once, never replaced.
    pub fn attach_external_id(&mut self, terminal_id: &TerminalId, external_id: ExternalId) -> bool {
        let attached = self
            .sessions
            .get_mut(terminal_id)
            .is_some_and(|s| s.attach_external_id(external_id));
        if attached {
            self.persist();
        }
        attached
    }

    /// Records the background a session had before any alert.
    ///
    /// Only the first capture is kept.
    pub fn set_original_background(&mut self, terminal_id: &TerminalId, color: Rgb) -> bool {
        let Some(session) = self.sessions.get_mut(terminal_id) else {
            return false;
        };
        if session.original_background.is_some() {
            return false;
        }
        session.original_background = Some(color);
        self.persist();
        true
    }

    // ========================================================================
    // Notification cadence
    // ========================================================================

    /// Waiting sessions that are due a notification.
    pub fn sessions_needing_notification(&self) -> Vec<TrackedSession> {
        self.sessions_needing_notification_at(Utc::now())
    }

    pub fn sessions_needing_notification_at(&self, now: DateTime<Utc>) -> Vec<TrackedSession> {
        self.sessions
            .values()
            .filter(|s| self.policy.is_due(s, now))
            .cloned()
            .collect()
    }

    /// Starts the cooldown after a notification went out.
    pub fn mark_notified(&mut self, terminal_id: &TerminalId) {
        self.mark_notified_at(terminal_id, Utc::now());
    }

    pub fn mark_notified_at(&mut self, terminal_id: &TerminalId, now: DateTime<Utc>) {
        let cooldown = self.policy.cooldown;
        let Some(session) = self.sessions.get_mut(terminal_id) else {
            return;
        };
        session.last_notification = Some(now);
        session.notification_cooldown_until = Some(now + cooldown);
        self.persist();
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn get(&self, terminal_id: &TerminalId) -> Option<&TrackedSession> {
        self.sessions.get(terminal_id)
    }

    pub fn contains(&self, terminal_id: &TerminalId) -> bool {
        self.sessions.contains_key(terminal_id)
    }

    /// All sessions ordered by terminal id.
    pub fn all(&self) -> Vec<TrackedSession> {
        self.sessions.values().cloned().collect()
    }

    pub fn terminal_ids(&self) -> Vec<TerminalId> {
        self.sessions.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn summary(&self) -> StatusSummary {
        StatusSummary::from_sessions(self.sessions.values())
    }

    // ========================================================================
    // Persistence
    // ========================================================================

    /// Rewrites `state.json`. Failures are logged.
    pub fn persist(&self) {
        let Some(path) = &self.path else {
            return;
        };

        let doc = StateDocument {
            sessions: self.sessions.values().cloned().collect(),
            last_updated: Utc::now(),
        };

        if let Err(e) = save_json(path, &doc) {
            warn!(error = %e, "Failed to save session state");
        }
    }
}

/// Reads sessions from a `state.json` without taking ownership of it.
pub fn read_sessions(path: &Path) -> Vec<TrackedSession> {
    load_json::<StateDocument>(path)
        .map(|doc| doc.sessions)
        .unwrap_or_default()
}
