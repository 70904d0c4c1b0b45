//! Engine: the single task that owns daemon state.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐  Ingest        ┌──────────────┐  set_background  ┌──────────────┐
//! │   Listener   │───────────────▶│              │─────────────────▶│   Terminal   │
//! └──────────────┘                │ EngineActor  │                  └──────────────┘
//! ┌──────────────┐  ApplyPolled   │              │  notify          ┌──────────────┐
//! │    Poller    │───────────────▶│ SessionStore │─────────────────▶│   Notifier   │
//! └──────────────┘  Track/Cleanup │ Correlator   │                  └──────────────┘
//!                                 │ Windows      │
//!                                 └──────────────┘
//! ```
//!
//! Commands arrive over an mpsc channel and are handled one at a time.
//! Terminal and notifier calls are spawned so a slow `osascript` or `tmux`
//! never stalls ingestion.
//!
//! # Panic-Free Guarantees
//!
//! All operations in this module follow the panic-free policy:
//! - No `.unwrap()` or `.expect()` in production code
//! - Channel operations handle closure gracefully

use std::sync::Arc;

use tokio::sync::mpsc;

use hud_term::{Notifier, TerminalControl};

mod actor;
mod commands;
mod handle;

pub use actor::{EngineActor, EngineState, NOTIFICATION_TITLE};
pub use commands::{CleanupReport, DiscoveredSession, EngineCommand, EngineError, IngestOutcome};
pub use handle::EngineHandle;

/// Command channel buffer size.
const COMMAND_BUFFER: usize = 100;

/// Spawns the engine actor and returns a handle to it.
///
/// The actor runs until every handle is dropped, then flushes its
/// documents.
pub fn spawn_engine(
    state: EngineState,
    terminal: Arc<dyn TerminalControl>,
    notifier: Arc<dyn Notifier>,
) -> EngineHandle {
    let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_BUFFER);

    let actor = EngineActor::new(cmd_rx, state, terminal, notifier);
    tokio::spawn(actor.run());

    EngineHandle::new(cmd_tx)
}
