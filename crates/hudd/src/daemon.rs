//! Wires the engine, the listener and the poller together.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use hud_term::{AgentDetector, Notifier, TerminalControl};

use crate::config::{HudPaths, Settings};
use crate::correlator::IdentityCorrelator;
use crate::debug_log::DebugLogReader;
use crate::engine::{spawn_engine, EngineState};
use crate::listener::{IngestionListener, ListenerError};
use crate::poller::Poller;
use crate::store::SessionStore;
use crate::windows::WindowRegistry;

/// Loads the persisted documents named by `paths`.
pub fn load_state(settings: &Settings, paths: &HudPaths) -> EngineState {
    EngineState {
        store: SessionStore::load(&paths.state_file, settings.notification_policy()),
        correlator: IdentityCorrelator::load(&paths.session_map_file),
        windows: WindowRegistry::load(&paths.windows_file),
    }
}

/// Runs the daemon until `cancel_token` fires.
///
/// Only a failure to bind the ingestion socket is fatal; it is returned
/// before any polling starts.
pub async fn run(
    settings: &Settings,
    paths: &HudPaths,
    terminal: Arc<dyn TerminalControl>,
    notifier: Arc<dyn Notifier>,
    cancel_token: CancellationToken,
) -> Result<(), ListenerError> {
    let engine = spawn_engine(
        load_state(settings, paths),
        Arc::clone(&terminal),
        notifier,
    );
    info!("Engine started");

    let listener = IngestionListener::new(&paths.socket, engine.clone(), cancel_token.clone());
    let socket = listener.bind()?;

    let poller = Poller::new(
        engine.clone(),
        terminal,
        AgentDetector::new(settings.agent_process_name.clone()),
        DebugLogReader::new(&paths.debug_log_dir),
        cancel_token.clone(),
    )
    .with_intervals(settings.poll_interval(), settings.cleanup_interval());
    let poller_task = tokio::spawn(async move { poller.run().await });

    listener.serve(socket).await;

    // The listener only returns early when the engine is gone.
    cancel_token.cancel();
    if let Err(e) = poller_task.await {
        warn!(error = %e, "Poller task failed");
    }
    if let Err(e) = engine.flush().await {
        warn!(error = %e, "Final flush failed");
    }

    info!("Daemon stopped");
    Ok(())
}
