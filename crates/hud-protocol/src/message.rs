//! Validated ingestion messages.

use hud_core::{classify_text, ClaudeState, ExternalId, LOG_PATTERNS};
use thiserror::Error;

use crate::parse::RawMessage;

/// Errors that cause a datagram to be dropped.
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// Payload is not a JSON object
    #[error("Malformed datagram: {0}")]
    Malformed(#[from] serde_json::Error),

    /// A required field is missing or empty
    #[error("Missing required field: {field}")]
    MissingField { field: &'static str },
}

/// Hook-reported activity of one agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateUpdate {
    pub external_id: ExternalId,
    /// Agent working directory, empty if the hook did not report one
    pub cwd: String,
    pub state: ClaudeState,
    pub hook_event: Option<String>,
    pub task: Option<String>,
}

/// Names a terminal window so later sessions can be grouped under it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowRegistration {
    pub name: String,
    pub window_id: String,
}

/// A datagram the daemon acts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestMessage {
    StateUpdate(StateUpdate),
    RegisterWindow(WindowRegistration),
    /// Forgets a window name
    UnregisterWindow { name: String },
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl StateUpdate {
    fn from_raw(raw: RawMessage) -> Result<Self, ProtocolError> {
        let external_id = non_empty(raw.session_id)
            .map(ExternalId::new)
            .ok_or(ProtocolError::MissingField {
                field: "session_id",
            })?;

        // An explicit label wins, even an unknown one. Raw text is only
        // consulted when the hook sent no label at all.
        let state = match (raw.state.as_deref(), raw.text.as_deref()) {
            (Some(label), _) => ClaudeState::from_label(label),
            (None, Some(text)) => classify_text(text, &LOG_PATTERNS),
            (None, None) => ClaudeState::Idle,
        };

        Ok(Self {
            external_id,
            cwd: raw.cwd.unwrap_or_default(),
            state,
            hook_event: non_empty(raw.hook_event),
            task: non_empty(raw.task),
        })
    }
}

impl IngestMessage {
    /// Validates a raw message.
    ///
    /// `Ok(None)` means the message type is not one this daemon handles.
    pub fn from_raw(raw: RawMessage) -> Result<Option<Self>, ProtocolError> {
        match raw.kind.as_deref() {
            Some("state_update") => Ok(Some(Self::StateUpdate(StateUpdate::from_raw(raw)?))),
            Some("register_window") => {
                let name = non_empty(raw.name).ok_or(ProtocolError::MissingField { field: "name" })?;
                let window_id = non_empty(raw.window_id).ok_or(ProtocolError::MissingField {
                    field: "window_id",
                })?;
                Ok(Some(Self::RegisterWindow(WindowRegistration { name, window_id })))
            }
            Some("unregister_window") => {
                let name = non_empty(raw.name).ok_or(ProtocolError::MissingField { field: "name" })?;
                Ok(Some(Self::UnregisterWindow { name }))
            }
            _ => Ok(None),
        }
    }
}

/// Decodes one datagram.
///
/// Returns `Ok(None)` for well-formed messages of an unknown type.
pub fn decode(bytes: &[u8]) -> Result<Option<IngestMessage>, ProtocolError> {
    IngestMessage::from_raw(RawMessage::from_slice(bytes)?)
}
