//! Client interface for the engine actor.
//!
//! # Panic-Free Guarantees
//!
//! - No `.unwrap()`, `.expect()`, `panic!()` in production code
//! - Channel errors are mapped to `EngineError::ChannelClosed`

use tokio::sync::{mpsc, oneshot};

use hud_core::{ClaudeState, StatusSummary, TerminalId, TrackedSession};
use hud_protocol::IngestMessage;
use hud_term::TerminalSession;

use super::commands::{CleanupReport, DiscoveredSession, EngineCommand, EngineError, IngestOutcome};

/// Cheap-to-clone handle shared by the listener, the poller and the CLI.
#[derive(Clone)]
pub struct EngineHandle {
    sender: mpsc::Sender<EngineCommand>,
}

impl EngineHandle {
    pub fn new(sender: mpsc::Sender<EngineCommand>) -> Self {
        Self { sender }
    }

    /// Sends a command built around a fresh reply channel and awaits the reply.
    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> EngineCommand,
    ) -> Result<T, EngineError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(build(tx))
            .await
            .map_err(|_| EngineError::ChannelClosed)?;
        rx.await.map_err(|_| EngineError::ChannelClosed)
    }

    /// Applies a decoded ingestion message.
    ///
    /// # Errors
    ///
    /// - `EngineError::ChannelClosed` if the engine has shut down
    pub async fn ingest(&self, message: IngestMessage) -> Result<IngestOutcome, EngineError> {
        self.request(|respond_to| EngineCommand::Ingest {
            message,
            respond_to,
        })
        .await
    }

    /// Applies a polled state. Returns whether the state changed.
    pub async fn apply_polled(
        &self,
        terminal_id: TerminalId,
        state: ClaudeState,
    ) -> Result<bool, EngineError> {
        self.request(|respond_to| EngineCommand::ApplyPolled {
            terminal_id,
            state,
            respond_to,
        })
        .await
    }

    /// Starts tracking a discovered session.
    ///
    /// # Errors
    ///
    /// - `EngineError::Domain` if the terminal id is empty
    /// - `EngineError::ChannelClosed` if the engine has shut down
    pub async fn track(&self, discovered: DiscoveredSession) -> Result<TrackedSession, EngineError> {
        self.request(|respond_to| EngineCommand::Track {
            discovered: Box::new(discovered),
            respond_to,
        })
        .await?
    }

    pub async fn cleanup(&self, live: Vec<TerminalSession>) -> Result<CleanupReport, EngineError> {
        self.request(|respond_to| EngineCommand::Cleanup { live, respond_to })
            .await
    }

    /// Raises due reminders. Returns how many were sent.
    pub async fn run_reminders(&self) -> Result<usize, EngineError> {
        self.request(|respond_to| EngineCommand::RunReminders { respond_to })
            .await
    }

    /// Returns `None` if the session is not tracked or the engine is gone.
    pub async fn get_session(&self, terminal_id: TerminalId) -> Option<TrackedSession> {
        self.request(|respond_to| EngineCommand::GetSession {
            terminal_id,
            respond_to,
        })
        .await
        .ok()?
    }

    /// Returns an empty vector if the engine is gone.
    pub async fn get_all_sessions(&self) -> Vec<TrackedSession> {
        self.request(|respond_to| EngineCommand::GetAllSessions { respond_to })
            .await
            .unwrap_or_default()
    }

    pub async fn summary(&self) -> Result<StatusSummary, EngineError> {
        self.request(|respond_to| EngineCommand::GetSummary { respond_to })
            .await
    }

    /// Writes every document to disk and waits for completion.
    pub async fn flush(&self) -> Result<(), EngineError> {
        self.request(|respond_to| EngineCommand::Flush { respond_to })
            .await
    }

    /// True once the engine has stopped receiving.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}
