//! Discrete activity state of a monitored agent.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Activity state of a Claude Code session.
///
/// Variants are declared in ascending attention priority, so the derived
/// `Ord` gives `Error > WaitingInput > Done > Working > Idle`. The order is
/// only used to rank sessions for display; any state may follow any other.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub enum ClaudeState {
    /// Nothing happening, agent sits at its prompt.
    #[default]
    #[serde(rename = "idle")]
    Idle,

    /// Agent is streaming or running tools.
    #[serde(rename = "working")]
    Working,

    /// Agent finished its last task.
    #[serde(rename = "done")]
    Done,

    /// Agent is blocked on a permission prompt or question.
    #[serde(rename = "waiting")]
    WaitingInput,

    /// Agent reported an error.
    #[serde(rename = "error")]
    Error,
}

impl ClaudeState {
    /// All states, lowest priority first.
    pub const ALL: [ClaudeState; 5] = [
        Self::Idle,
        Self::Working,
        Self::Done,
        Self::WaitingInput,
        Self::Error,
    ];

    /// Parses a wire label. Unknown labels map to `Idle`.
    pub fn from_label(label: &str) -> Self {
        match label {
            "working" => Self::Working,
            "waiting" => Self::WaitingInput,
            "done" => Self::Done,
            "error" => Self::Error,
            _ => Self::Idle,
        }
    }

    /// Returns the wire label for this state.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Working => "working",
            Self::WaitingInput => "waiting",
            Self::Done => "done",
            Self::Error => "error",
        }
    }

    /// Attention priority, 0 (idle) to 4 (error).
    #[must_use]
    pub fn priority(&self) -> u8 {
        match self {
            Self::Idle => 0,
            Self::Working => 1,
            Self::Done => 2,
            Self::WaitingInput => 3,
            Self::Error => 4,
        }
    }

    /// Returns the status icon used in formatted output.
    #[must_use]
    pub fn icon(&self) -> &'static str {
        match self {
            Self::Working => "\u{2699}",
            Self::WaitingInput => "\u{23F3}",
            Self::Done => "\u{2713}",
            Self::Error => "\u{2717}",
            Self::Idle => "\u{25CB}",
        }
    }

    /// Returns true if the user has to act for the agent to proceed.
    #[must_use]
    pub fn needs_attention(&self) -> bool {
        matches!(self, Self::WaitingInput)
    }
}

impl fmt::Display for ClaudeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "IDLE"),
            Self::Working => write!(f, "WORKING"),
            Self::WaitingInput => write!(f, "WAITING_INPUT"),
            Self::Done => write!(f, "DONE"),
            Self::Error => write!(f, "ERROR"),
        }
    }
}
