//! Shared fakes for the daemon integration tests.
//!
//! Tests CAN use `.unwrap()` and `.expect()`.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use hud_core::{Rgb, TerminalId};
use hud_term::{
    Notifier, NotifyError, TerminalControl, TerminalError, TerminalSession, VAR_COMMAND, VAR_PATH,
};
use tokio::time::{sleep, Instant};

use hudd::correlator::IdentityCorrelator;
use hudd::engine::{spawn_engine, EngineHandle, EngineState};
use hudd::store::{NotificationPolicy, SessionStore};
use hudd::windows::WindowRegistry;

/// Maximum time to wait for a spawned side effect to land.
pub const EFFECT_TIMEOUT: Duration = Duration::from_millis(1000);

/// Interval between condition checks.
const POLL_STEP: Duration = Duration::from_millis(10);

// ============================================================================
// Fake Terminal
// ============================================================================

#[derive(Default)]
struct Pane {
    window_id: String,
    variables: HashMap<String, String>,
    screen: Vec<String>,
    background: Option<Rgb>,
}

#[derive(Default)]
struct FakeState {
    panes: Vec<(TerminalId, Pane)>,
    background_calls: Vec<(TerminalId, Rgb)>,
    fail_listing: bool,
}

/// In-memory terminal that records background changes.
#[derive(Default)]
pub struct FakeTerminal {
    state: Mutex<FakeState>,
}

impl FakeTerminal {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Adds a pane running `command` in `path`.
    pub fn add_pane(&self, id: &str, window_id: &str, path: &str, command: &str, background: Option<Rgb>) {
        let mut variables = HashMap::new();
        variables.insert(VAR_PATH.to_string(), path.to_string());
        variables.insert(VAR_COMMAND.to_string(), command.to_string());
        let pane = Pane {
            window_id: window_id.to_string(),
            variables,
            screen: Vec::new(),
            background,
        };
        self.state.lock().unwrap().panes.push((TerminalId::new(id), pane));
    }

    pub fn remove_pane(&self, id: &str) {
        self.state
            .lock()
            .unwrap()
            .panes
            .retain(|(pane_id, _)| pane_id.as_str() != id);
    }

    pub fn set_path(&self, id: &str, path: &str) {
        let mut state = self.state.lock().unwrap();
        if let Some((_, pane)) = state.panes.iter_mut().find(|(p, _)| p.as_str() == id) {
            pane.variables.insert(VAR_PATH.to_string(), path.to_string());
        }
    }

    pub fn set_screen(&self, id: &str, lines: &[&str]) {
        let mut state = self.state.lock().unwrap();
        if let Some((_, pane)) = state.panes.iter_mut().find(|(p, _)| p.as_str() == id) {
            pane.screen = lines.iter().map(|l| l.to_string()).collect();
        }
    }

    pub fn fail_listing(&self, fail: bool) {
        self.state.lock().unwrap().fail_listing = fail;
    }

    pub fn background_calls(&self) -> Vec<(TerminalId, Rgb)> {
        self.state.lock().unwrap().background_calls.clone()
    }

    fn with_pane<T>(&self, id: &TerminalId, f: impl FnOnce(&Pane) -> T) -> Result<T, TerminalError> {
        let state = self.state.lock().unwrap();
        state
            .panes
            .iter()
            .find(|(p, _)| p == id)
            .map(|(_, pane)| f(pane))
            .ok_or_else(|| TerminalError::InvalidTerminalId(id.to_string()))
    }
}

#[async_trait]
impl TerminalControl for FakeTerminal {
    async fn list_sessions(&self) -> Result<Vec<TerminalSession>, TerminalError> {
        let state = self.state.lock().unwrap();
        if state.fail_listing {
            return Err(TerminalError::CommandFailed {
                command: "list".to_string(),
                stderr: "no server running".to_string(),
            });
        }
        Ok(state
            .panes
            .iter()
            .map(|(id, pane)| TerminalSession::new(id.clone(), pane.window_id.clone()))
            .collect())
    }

    async fn read_variable(
        &self,
        terminal_id: &TerminalId,
        name: &str,
    ) -> Result<Option<String>, TerminalError> {
        self.with_pane(terminal_id, |pane| pane.variables.get(name).cloned())
    }

    async fn capture_screen(&self, terminal_id: &TerminalId) -> Result<Vec<String>, TerminalError> {
        self.with_pane(terminal_id, |pane| pane.screen.clone())
    }

    async fn background(&self, terminal_id: &TerminalId) -> Result<Option<Rgb>, TerminalError> {
        self.with_pane(terminal_id, |pane| pane.background)
    }

    async fn set_background(&self, terminal_id: &TerminalId, color: Rgb) -> Result<(), TerminalError> {
        self.state
            .lock()
            .unwrap()
            .background_calls
            .push((terminal_id.clone(), color));
        Ok(())
    }
}

// ============================================================================
// Recording Notifier
// ============================================================================

/// Notifier that keeps every (title, body) it was asked to show.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(String, String)>>,
}

impl RecordingNotifier {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, title: &str, body: &str) -> Result<(), NotifyError> {
        self.sent
            .lock()
            .unwrap()
            .push((title.to_string(), body.to_string()));
        Ok(())
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Engine over in-memory state and the given fakes.
pub fn spawn_test_engine(terminal: Arc<FakeTerminal>, notifier: Arc<RecordingNotifier>) -> EngineHandle {
    let state = EngineState {
        store: SessionStore::in_memory(NotificationPolicy::default()),
        correlator: IdentityCorrelator::in_memory(),
        windows: WindowRegistry::in_memory(),
    };
    spawn_engine(state, terminal, notifier)
}

/// Waits until `condition` holds or the timeout passes. Returns the last check.
pub async fn wait_until(condition: impl Fn() -> bool) -> bool {
    let start = Instant::now();
    while start.elapsed() < EFFECT_TIMEOUT {
        if condition() {
            return true;
        }
        sleep(POLL_STEP).await;
    }
    condition()
}
