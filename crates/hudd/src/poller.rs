//! Periodic sweeps over live terminal sessions.
//!
//! Two loops run side by side:
//!
//! - the **poll loop** (every 500 ms by default) classifies fresh evidence
//!   for each tracked session and then raises due reminders;
//! - the **sweep loop** (every 5 s by default) reconciles tracked state with
//!   the sessions that still exist and starts tracking new agent sessions.
//!
//! Evidence for a session is the tail of its debug log when the external id
//! is known and the log is fresh, otherwise its captured screen.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use hud_core::{classify, ClaudeState, TerminalId, TrackedSession, LOG_PATTERNS, SCREEN_PATTERNS};
use hud_term::{AgentDetector, TerminalControl, VAR_COMMAND, VAR_PATH};

use crate::debug_log::DebugLogReader;
use crate::engine::{DiscoveredSession, EngineError, EngineHandle};

/// Drives the poll and sweep loops against one terminal backend.
pub struct Poller {
    engine: EngineHandle,
    terminal: Arc<dyn TerminalControl>,
    detector: AgentDetector,
    debug_logs: DebugLogReader,
    poll_interval: Duration,
    sweep_interval: Duration,
    cancel_token: CancellationToken,
}

impl Poller {
    pub fn new(
        engine: EngineHandle,
        terminal: Arc<dyn TerminalControl>,
        detector: AgentDetector,
        debug_logs: DebugLogReader,
        cancel_token: CancellationToken,
    ) -> Self {
        Self {
            engine,
            terminal,
            detector,
            debug_logs,
            poll_interval: Duration::from_millis(500),
            sweep_interval: Duration::from_secs(5),
            cancel_token,
        }
    }

    #[must_use]
    pub fn with_intervals(mut self, poll: Duration, sweep: Duration) -> Self {
        self.poll_interval = poll;
        self.sweep_interval = sweep;
        self
    }

    /// Runs both loops until cancelled or the engine stops.
    pub async fn run(&self) {
        info!(
            poll_ms = self.poll_interval.as_millis() as u64,
            sweep_ms = self.sweep_interval.as_millis() as u64,
            "Poller starting"
        );
        tokio::join!(self.poll_loop(), self.sweep_loop());
        info!("Poller stopped");
    }

    async fn poll_loop(&self) {
        let mut ticker = interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = self.cancel_token.cancelled() => break,
                _ = ticker.tick() => {
                    if let Err(EngineError::ChannelClosed) = self.poll_once().await {
                        debug!("Poll loop stopping: engine channel closed");
                        break;
                    }
                }
            }
        }
    }

    async fn sweep_loop(&self) {
        let mut ticker = interval(self.sweep_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = self.cancel_token.cancelled() => break,
                _ = ticker.tick() => {
                    if let Err(EngineError::ChannelClosed) = self.sweep_once().await {
                        debug!("Sweep loop stopping: engine channel closed");
                        break;
                    }
                }
            }
        }
    }

    // ========================================================================
    // Poll
    // ========================================================================

    /// Classifies every tracked session once, then raises due reminders.
    ///
    /// Returns how many sessions changed state.
    pub async fn poll_once(&self) -> Result<usize, EngineError> {
        let mut changed = 0;

        for session in self.engine.get_all_sessions().await {
            let Some(state) = self.observe(&session).await else {
                continue;
            };
            if self
                .engine
                .apply_polled(session.terminal_id.clone(), state)
                .await?
            {
                changed += 1;
            }
        }

        let reminded = self.engine.run_reminders().await?;
        if reminded > 0 {
            debug!(reminded, "Reminders sent");
        }
        Ok(changed)
    }

    async fn observe(&self, session: &TrackedSession) -> Option<ClaudeState> {
        if let Some(external_id) = session.external_id.clone() {
            let reader = self.debug_logs.clone();
            match tokio::task::spawn_blocking(move || reader.read_fresh(&external_id)).await {
                Ok(Some(lines)) => return Some(classify(&lines, &LOG_PATTERNS)),
                Ok(None) => {}
                Err(e) => warn!(error = %e, "Debug log read task failed"),
            }
        }

        match self.terminal.capture_screen(&session.terminal_id).await {
            Ok(lines) => Some(classify(&lines, &SCREEN_PATTERNS)),
            Err(e) => {
                trace!(terminal_id = %session.terminal_id, error = %e, "Screen capture failed");
                None
            }
        }
    }

    // ========================================================================
    // Sweep
    // ========================================================================

    /// Drops sessions that disappeared and tracks new agent sessions.
    ///
    /// Returns how many sessions started being tracked. If the terminal
    /// cannot be enumerated the sweep is skipped. Agent sessions whose
    /// working directory cannot be read stay untracked until it can.
    pub async fn sweep_once(&self) -> Result<usize, EngineError> {
        let live = match self.terminal.list_sessions().await {
            Ok(live) => live,
            Err(e) => {
                warn!(error = %e, "Cannot enumerate terminal sessions, skipping sweep");
                return Ok(0);
            }
        };

        self.engine.cleanup(live.clone()).await?;

        let tracked: HashSet<TerminalId> = self
            .engine
            .get_all_sessions()
            .await
            .into_iter()
            .map(|s| s.terminal_id)
            .collect();

        let mut discovered = 0;
        for candidate in live {
            if tracked.contains(&candidate.terminal_id) || !self.hosts_agent(&candidate.terminal_id).await {
                continue;
            }

            // Without a cwd there is nothing to correlate on; the next sweep
            // tries again.
            let Some(project_path) = self
                .terminal
                .read_variable(&candidate.terminal_id, VAR_PATH)
                .await
                .ok()
                .flatten()
                .filter(|path| !path.is_empty())
            else {
                debug!(terminal_id = %candidate.terminal_id, "Working directory unavailable, not tracking yet");
                continue;
            };
            let background = self
                .terminal
                .background(&candidate.terminal_id)
                .await
                .unwrap_or_else(|e| {
                    debug!(terminal_id = %candidate.terminal_id, error = %e, "Background read failed");
                    None
                });

            let result = self
                .engine
                .track(DiscoveredSession {
                    terminal_id: candidate.terminal_id.clone(),
                    window_id: candidate.window_id,
                    project_path,
                    background,
                })
                .await;

            match result {
                Ok(_) => discovered += 1,
                Err(EngineError::ChannelClosed) => return Err(EngineError::ChannelClosed),
                Err(e) => warn!(terminal_id = %candidate.terminal_id, error = %e, "Cannot track session"),
            }
        }

        Ok(discovered)
    }

    async fn hosts_agent(&self, terminal_id: &TerminalId) -> bool {
        if let Ok(Some(command)) = self.terminal.read_variable(terminal_id, VAR_COMMAND).await {
            if self.detector.matches_command(&command) {
                return true;
            }
        }

        match self.terminal.capture_screen(terminal_id).await {
            Ok(lines) => self.detector.matches_screen(&lines),
            Err(_) => false,
        }
    }
}
