//! agent-hud daemon - hook ingestion, screen polling and attention notifications
//!
//! This crate provides the daemon half of agent-hud:
//! - `engine` - actor that owns session state and issues side effects
//! - `listener` - Unix datagram socket receiving hook events
//! - `poller` - periodic classification, cleanup and discovery sweeps
//! - `store`, `correlator`, `windows` - the persisted state the engine owns
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        hudd daemon                          │
//! ├─────────────────────────────────────────────────────────────┤
//! │                                                             │
//! │  ┌─────────────────┐     ┌─────────────────────────────┐    │
//! │  │IngestionListener│────▶│        EngineActor          │    │
//! │  │ (UnixDatagram)  │     │  SessionStore               │    │
//! │  └─────────────────┘     │  IdentityCorrelator         │    │
//! │  ┌─────────────────┐     │  WindowRegistry             │    │
//! │  │     Poller      │────▶│                             │    │
//! │  │ (poll + sweep)  │     └──────────────┬──────────────┘    │
//! │  └────────┬────────┘                    │ spawned           │
//! │           │ capture / list              ▼                   │
//! │           ▼                 ┌───────────────────────────┐   │
//! │  ┌─────────────────┐        │ TerminalControl, Notifier │   │
//! │  │ TerminalControl │        │ (background, desktop)     │   │
//! │  └─────────────────┘        └───────────────────────────┘   │
//! │                                                             │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Panic-Free Guarantees
//!
//! All production code in this crate follows the panic-free policy:
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - All fallible operations return `Result` or `Option`
//! - Channel operations handle closure gracefully

pub mod cli;
pub mod config;
pub mod correlator;
pub mod daemon;
pub mod debug_log;
pub mod engine;
pub mod listener;
pub mod persist;
pub mod poller;
pub mod store;
pub mod windows;
