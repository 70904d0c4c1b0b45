//! HUD Protocol - Wire format of ingestion datagrams
//!
//! Agent hooks send one JSON object per datagram to the daemon socket.
//! This crate turns those bytes into typed [`IngestMessage`]s:
//! - `parse` - lenient raw JSON structures
//! - `message` - validated messages handed to the daemon

pub mod message;
pub mod parse;

pub use message::{decode, IngestMessage, ProtocolError, StateUpdate, WindowRegistration};
pub use parse::RawMessage;
