//! Tracked terminal sessions and their identifiers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

use crate::color::palette_color;
use crate::{ClaudeState, DomainError, DomainResult, Rgb, PALETTE_SIZE};

// ============================================================================
// Type-Safe Identifiers
// ============================================================================

/// Identifier the agent reports about itself.
///
/// Arrives in ingestion messages as `session_id` (a UUID string such as
/// "8e11bfb5-7dc2-432b-9206-928fa5c35731"). Also names the agent's debug log.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExternalId(String);

impl ExternalId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the underlying string reference.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns a shortened display form (first 8 characters).
    #[must_use]
    pub fn short(&self) -> &str {
        self.0.get(..8).unwrap_or(&self.0)
    }
}

impl fmt::Display for ExternalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ExternalId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ExternalId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for ExternalId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Identifier the terminal multiplexer assigns to a session (e.g. tmux "%5").
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TerminalId(String);

impl TerminalId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the underlying string reference.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for TerminalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for TerminalId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for TerminalId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for TerminalId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Last path component of a project directory, or "unknown".
///
/// Trailing separators are ignored, so "/work/api/" yields "api".
pub fn project_name_from_path(path: &str) -> String {
    Path::new(path.trim_end_matches('/'))
        .file_name()
        .and_then(|name| name.to_str())
        .filter(|name| !name.is_empty())
        .unwrap_or("unknown")
        .to_string()
}

// ============================================================================
// Tracked Session
// ============================================================================

/// One terminal session hosting an agent, as seen by the daemon.
///
/// Keyed by [`TerminalId`]. The external id is attached later, once the
/// correlator pairs the session with an ingestion identity, and is never
/// replaced afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedSession {
    /// Agent-reported identity, once known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_id: Option<ExternalId>,

    /// Hosting terminal session
    pub terminal_id: TerminalId,

    /// Working directory the session was discovered in
    pub project_path: String,

    /// Display name derived from `project_path`
    pub project_name: String,

    /// Named window this session was opened in, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window_name: Option<String>,

    /// Slot in [`crate::PROJECT_PALETTE`]
    pub color_index: usize,

    /// Background before the daemon touched it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_background: Option<Rgb>,

    pub current_state: ClaudeState,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_task: Option<String>,

    pub last_updated: DateTime<Utc>,

    #[serde(default)]
    pub last_notification: Option<DateTime<Utc>>,

    #[serde(default)]
    pub notification_cooldown_until: Option<DateTime<Utc>>,
}

impl TrackedSession {
    /// Creates an idle session.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::EmptyIdentifier`] for a blank terminal id and
    /// [`DomainError::InvalidFieldValue`] for a color index outside the palette.
    pub fn new(
        terminal_id: TerminalId,
        project_path: impl Into<String>,
        window_name: Option<String>,
        color_index: usize,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        if terminal_id.is_empty() {
            return Err(DomainError::EmptyIdentifier {
                field: "terminal id",
            });
        }
        if color_index >= PALETTE_SIZE {
            return Err(DomainError::InvalidFieldValue {
                field: "color_index".to_string(),
                value: color_index.to_string(),
                expected: format!("0..{PALETTE_SIZE}"),
            });
        }

        let project_path = project_path.into();
        let project_name = project_name_from_path(&project_path);

        Ok(Self {
            external_id: None,
            terminal_id,
            project_path,
            project_name,
            window_name,
            color_index,
            original_background: None,
            current_state: ClaudeState::Idle,
            current_task: None,
            last_updated: now,
            last_notification: None,
            notification_cooldown_until: None,
        })
    }

    /// Project background color.
    #[must_use]
    pub fn palette_color(&self) -> Rgb {
        palette_color(self.color_index)
    }

    /// Attaches the external id if none is set yet.
    ///
    /// Returns true if the id was attached.
    pub fn attach_external_id(&mut self, id: ExternalId) -> bool {
        if self.external_id.is_some() {
            return false;
        }
        self.external_id = Some(id);
        true
    }

    /// True while a notification cooldown is running at `now`.
    #[must_use]
    pub fn in_cooldown(&self, now: DateTime<Utc>) -> bool {
        self.notification_cooldown_until
            .is_some_and(|until| now < until)
    }

    /// One-line status, e.g. `api: WAITING_INPUT - Bash`.
    #[must_use]
    pub fn status_line(&self) -> String {
        match &self.current_task {
            Some(task) if !task.is_empty() => {
                format!("{}: {} - {}", self.project_name, self.current_state, task)
            }
            _ => format!("{}: {}", self.project_name, self.current_state),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn session(id: &str, path: &str) -> TrackedSession {
        TrackedSession::new(TerminalId::new(id), path, None, 0, Utc::now()).unwrap()
    }

    #[test]
    fn test_external_id_short() {
        let id = ExternalId::new("8e11bfb5-7dc2-432b-9206-928fa5c35731");
        assert_eq!(id.short(), "8e11bfb5");
        assert_eq!(ExternalId::new("abc").short(), "abc");
    }

    #[test]
    fn test_ids_serialize_transparently() {
        let json = serde_json::to_string(&TerminalId::new("%5")).unwrap();
        assert_eq!(json, "\"%5\"");
    }

    #[test]
    fn test_project_name_from_path() {
        assert_eq!(project_name_from_path("/work/api"), "api");
        assert_eq!(project_name_from_path("/work/api/"), "api");
        assert_eq!(project_name_from_path("relative/web"), "web");
        assert_eq!(project_name_from_path(""), "unknown");
        assert_eq!(project_name_from_path("/"), "unknown");
    }

    #[test]
    fn test_new_session_defaults() {
        let s = session("%1", "/work/api");
        assert_eq!(s.project_name, "api");
        assert_eq!(s.current_state, ClaudeState::Idle);
        assert!(s.external_id.is_none());
        assert!(s.last_notification.is_none());
        assert_eq!(s.palette_color(), crate::PROJECT_PALETTE[0]);
    }

    #[test]
    fn test_new_rejects_empty_terminal_id() {
        let err = TrackedSession::new(TerminalId::new(" "), "/x", None, 0, Utc::now());
        assert_eq!(
            err.unwrap_err(),
            DomainError::EmptyIdentifier {
                field: "terminal id"
            }
        );
    }

    #[test]
    fn test_new_rejects_color_out_of_range() {
        let err = TrackedSession::new(TerminalId::new("%1"), "/x", None, PALETTE_SIZE, Utc::now());
        assert!(matches!(err, Err(DomainError::InvalidFieldValue { .. })));
    }

    #[test]
    fn test_external_id_set_once() {
        let mut s = session("%1", "/work/api");
        assert!(s.attach_external_id(ExternalId::new("a")));
        assert!(!s.attach_external_id(ExternalId::new("b")));
        assert_eq!(s.external_id, Some(ExternalId::new("a")));
    }

    #[test]
    fn test_in_cooldown() {
        let now = Utc::now();
        let mut s = session("%1", "/work/api");
        assert!(!s.in_cooldown(now));
        s.notification_cooldown_until = Some(now + Duration::seconds(30));
        assert!(s.in_cooldown(now));
        assert!(!s.in_cooldown(now + Duration::seconds(30)));
    }

    #[test]
    fn test_status_line() {
        let mut s = session("%1", "/work/api");
        s.current_state = ClaudeState::WaitingInput;
        assert_eq!(s.status_line(), "api: WAITING_INPUT");
        s.current_task = Some("Bash".to_string());
        assert_eq!(s.status_line(), "api: WAITING_INPUT - Bash");
    }

    #[test]
    fn test_serde_roundtrip_keeps_optional_fields() {
        let mut s = session("%3", "/work/web");
        s.original_background = Some(Rgb::new(0, 0, 0));
        s.window_name = Some("main".to_string());
        let json = serde_json::to_string(&s).unwrap();
        assert!(json.contains("\"original_background\":\"#000000\""));
        let back: TrackedSession = serde_json::from_str(&json).unwrap();
        assert_eq!(back, s);
    }
}
