//! Parsing raw ingestion JSON.
//!
//! Every field is optional at this layer; validation happens when the raw
//! message is converted into an [`crate::IngestMessage`].

use serde::Deserialize;

/// Raw datagram payload as sent by hook scripts.
///
/// Unknown fields are ignored so hooks can send extra context.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawMessage {
    /// Message discriminator ("state_update", "register_window",
    /// "unregister_window")
    #[serde(rename = "type", default)]
    pub kind: Option<String>,

    // state_update
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub cwd: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub hook_event: Option<String>,
    /// Raw log text to classify when `state` is absent
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub task: Option<String>,

    // register_window, unregister_window
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub window_id: Option<String>,
}

impl RawMessage {
    /// Parses a datagram payload.
    pub fn from_slice(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_state_update() {
        let json = br#"{
            "type": "state_update",
            "session_id": "abc-123",
            "cwd": "/work/api",
            "state": "waiting",
            "hook_event": "Notification",
            "extra": {"ignored": true}
        }"#;

        let raw = RawMessage::from_slice(json).unwrap();
        assert_eq!(raw.kind.as_deref(), Some("state_update"));
        assert_eq!(raw.session_id.as_deref(), Some("abc-123"));
        assert_eq!(raw.state.as_deref(), Some("waiting"));
        assert!(raw.text.is_none());
    }

    #[test]
    fn test_parse_minimal() {
        let raw = RawMessage::from_slice(b"{}").unwrap();
        assert!(raw.kind.is_none());
        assert!(raw.session_id.is_none());
    }

    #[test]
    fn test_parse_rejects_non_object() {
        assert!(RawMessage::from_slice(b"[1,2]").is_err());
        assert!(RawMessage::from_slice(b"not json").is_err());
        assert!(RawMessage::from_slice(b"").is_err());
    }
}
