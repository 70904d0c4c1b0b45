//! External ↔ terminal identity pairs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{ExternalId, TerminalId};

/// A confirmed pairing of an agent identity with its hosting terminal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityMapping {
    pub external_id: ExternalId,
    pub terminal_id: TerminalId,
    /// Working directory both sides reported when the pair was made
    pub cwd: String,
    pub created_at: DateTime<Utc>,
}

impl IdentityMapping {
    pub fn new(
        external_id: ExternalId,
        terminal_id: TerminalId,
        cwd: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            external_id,
            terminal_id,
            cwd: cwd.into(),
            created_at,
        }
    }
}
