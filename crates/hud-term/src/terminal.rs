//! Terminal-control collaborator interface.

use async_trait::async_trait;
use hud_core::{Rgb, TerminalId};

use crate::TerminalError;

/// Variable holding a session's working directory.
pub const VAR_PATH: &str = "path";

/// Variable holding a session's foreground command.
pub const VAR_COMMAND: &str = "command";

/// A live terminal session and the window hosting it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TerminalSession {
    pub terminal_id: TerminalId,
    pub window_id: String,
}

impl TerminalSession {
    pub fn new(terminal_id: impl Into<TerminalId>, window_id: impl Into<String>) -> Self {
        Self {
            terminal_id: terminal_id.into(),
            window_id: window_id.into(),
        }
    }
}

/// Everything the daemon needs from a terminal emulator or multiplexer.
///
/// Implementations must be cheap to call concurrently; the daemon invokes
/// them from the poll loop and from spawned side-effect tasks.
#[async_trait]
pub trait TerminalControl: Send + Sync {
    /// Lists every live session.
    async fn list_sessions(&self) -> Result<Vec<TerminalSession>, TerminalError>;

    /// Reads a session variable ([`VAR_PATH`], [`VAR_COMMAND`], ...).
    ///
    /// `Ok(None)` if the variable is unset or empty.
    async fn read_variable(
        &self,
        terminal_id: &TerminalId,
        name: &str,
    ) -> Result<Option<String>, TerminalError>;

    /// Captures the visible screen, top line first.
    async fn capture_screen(&self, terminal_id: &TerminalId) -> Result<Vec<String>, TerminalError>;

    /// Current background color, if one is explicitly set.
    async fn background(&self, terminal_id: &TerminalId) -> Result<Option<Rgb>, TerminalError>;

    async fn set_background(&self, terminal_id: &TerminalId, color: Rgb)
        -> Result<(), TerminalError>;
}
