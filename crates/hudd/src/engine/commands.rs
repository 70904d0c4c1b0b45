//! Engine commands, replies and errors.
//!
//! Every command carries a oneshot `respond_to` so callers can await the
//! outcome; the poll and cleanup loops use that to keep their sweeps in
//! step with the engine.

use hud_core::{ClaudeState, DomainError, Rgb, StatusSummary, TerminalId, TrackedSession};
use hud_protocol::IngestMessage;
use hud_term::TerminalSession;
use thiserror::Error;
use tokio::sync::oneshot;

// ============================================================================
// Engine Commands
// ============================================================================

/// Commands processed by the engine actor, one at a time.
#[derive(Debug)]
pub enum EngineCommand {
    /// Apply a decoded ingestion datagram.
    Ingest {
        message: IngestMessage,
        respond_to: oneshot::Sender<IngestOutcome>,
    },

    /// Apply a state derived by the poller for a tracked session.
    ///
    /// Replies whether the state changed.
    ApplyPolled {
        terminal_id: TerminalId,
        state: ClaudeState,
        respond_to: oneshot::Sender<bool>,
    },

    /// Start tracking a discovered agent session.
    ///
    /// # Errors
    /// - `EngineError::Domain` if the terminal id is empty
    Track {
        discovered: Box<DiscoveredSession>,
        respond_to: oneshot::Sender<Result<TrackedSession, EngineError>>,
    },

    /// Reconcile tracked state against the sessions that are still alive.
    Cleanup {
        live: Vec<TerminalSession>,
        respond_to: oneshot::Sender<CleanupReport>,
    },

    /// Notify every session that is due a reminder.
    ///
    /// Replies with the number of notifications raised.
    RunReminders {
        respond_to: oneshot::Sender<usize>,
    },

    GetSession {
        terminal_id: TerminalId,
        respond_to: oneshot::Sender<Option<TrackedSession>>,
    },

    GetAllSessions {
        respond_to: oneshot::Sender<Vec<TrackedSession>>,
    },

    GetSummary {
        respond_to: oneshot::Sender<StatusSummary>,
    },

    /// Write every document to disk.
    Flush { respond_to: oneshot::Sender<()> },
}

// ============================================================================
// Payloads and Replies
// ============================================================================

/// An agent session found by the discovery sweep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredSession {
    pub terminal_id: TerminalId,
    /// Terminal window hosting the session
    pub window_id: String,
    pub project_path: String,
    /// Background before any alert was shown, if one was set
    pub background: Option<Rgb>,
}

/// What happened to an ingested message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    /// The update reached a terminal session.
    Applied {
        terminal_id: TerminalId,
        changed: bool,
    },
    /// No tracked terminal session is known for the sender yet; the update
    /// was dropped.
    Unresolved,
    /// A window name was registered.
    WindowRegistered,
    /// A window name was dropped; `removed` is false if it was unknown.
    WindowUnregistered { removed: bool },
}

/// Result of one cleanup pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupReport {
    pub untracked: Vec<TerminalId>,
    pub unmapped: Vec<TerminalId>,
    pub removed_windows: Vec<String>,
}

impl CleanupReport {
    pub fn is_empty(&self) -> bool {
        self.untracked.is_empty() && self.unmapped.is_empty() && self.removed_windows.is_empty()
    }
}

// ============================================================================
// Engine Errors
// ============================================================================

#[derive(Debug, Clone, Error)]
pub enum EngineError {
    /// The engine stopped before replying.
    #[error("engine channel closed")]
    ChannelClosed,

    #[error(transparent)]
    Domain(#[from] DomainError),
}
