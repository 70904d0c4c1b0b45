//! Engine actor - owns all mutable daemon state and processes commands.
//!
//! # Panic-Free Guarantees
//!
//! - No `.unwrap()`, `.expect()`, `panic!()` in production code
//! - Reply send failures are ignored (the caller went away)
//! - Side-effect failures are logged inside their spawned task

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, trace, warn};

use hud_core::{ClaudeState, TerminalId, TrackedSession, ALERT_BACKGROUND};
use hud_protocol::{IngestMessage, StateUpdate};
use hud_term::{Notifier, TerminalControl, TerminalSession};

use super::commands::{CleanupReport, DiscoveredSession, EngineCommand, EngineError, IngestOutcome};
use crate::correlator::IdentityCorrelator;
use crate::store::SessionStore;
use crate::windows::WindowRegistry;

/// Title of every desktop notification.
pub const NOTIFICATION_TITLE: &str = "Claude HUD";

/// The state the engine takes ownership of at startup.
#[derive(Debug)]
pub struct EngineState {
    pub store: SessionStore,
    pub correlator: IdentityCorrelator,
    pub windows: WindowRegistry,
}

// ============================================================================
// Engine Actor
// ============================================================================

/// Single owner of the session store, the identity correlator and the
/// window registry.
///
/// Commands are processed sequentially, so no locks guard domain state.
/// Calls into the terminal and the notifier are spawned and never awaited
/// here.
pub struct EngineActor {
    receiver: tokio::sync::mpsc::Receiver<EngineCommand>,
    store: SessionStore,
    correlator: IdentityCorrelator,
    windows: WindowRegistry,
    terminal: Arc<dyn TerminalControl>,
    notifier: Arc<dyn Notifier>,
}

impl EngineActor {
    pub fn new(
        receiver: tokio::sync::mpsc::Receiver<EngineCommand>,
        state: EngineState,
        terminal: Arc<dyn TerminalControl>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let EngineState {
            store,
            mut correlator,
            windows,
        } = state;

        // Restored sessions take part in matching again; restored mappings
        // are returned unchanged.
        for session in store.all() {
            correlator.register_terminal(session.terminal_id, &session.project_path);
        }

        Self {
            receiver,
            store,
            correlator,
            windows,
            terminal,
            notifier,
        }
    }

    /// Processes commands until every sender is dropped, then flushes.
    pub async fn run(mut self) {
        info!(
            sessions = self.store.len(),
            mappings = self.correlator.len(),
            "Engine starting"
        );

        while let Some(cmd) = self.receiver.recv().await {
            self.handle_command(cmd);
        }

        self.flush();
        info!(sessions = self.store.len(), "Engine stopped");
    }

    fn handle_command(&mut self, cmd: EngineCommand) {
        match cmd {
            EngineCommand::Ingest {
                message,
                respond_to,
            } => {
                let outcome = self.handle_ingest(message);
                let _ = respond_to.send(outcome);
            }
            EngineCommand::ApplyPolled {
                terminal_id,
                state,
                respond_to,
            } => {
                let changed = self.handle_apply_polled(&terminal_id, state);
                let _ = respond_to.send(changed);
            }
            EngineCommand::Track {
                discovered,
                respond_to,
            } => {
                let result = self.handle_track(*discovered);
                let _ = respond_to.send(result);
            }
            EngineCommand::Cleanup { live, respond_to } => {
                let report = self.handle_cleanup(&live);
                let _ = respond_to.send(report);
            }
            EngineCommand::RunReminders { respond_to } => {
                let sent = self.handle_run_reminders(Utc::now());
                let _ = respond_to.send(sent);
            }
            EngineCommand::GetSession {
                terminal_id,
                respond_to,
            } => {
                let _ = respond_to.send(self.store.get(&terminal_id).cloned());
            }
            EngineCommand::GetAllSessions { respond_to } => {
                let _ = respond_to.send(self.store.all());
            }
            EngineCommand::GetSummary { respond_to } => {
                let _ = respond_to.send(self.store.summary());
            }
            EngineCommand::Flush { respond_to } => {
                self.flush();
                let _ = respond_to.send(());
            }
        }
    }

    // ========================================================================
    // Updates
    // ========================================================================

    fn handle_ingest(&mut self, message: IngestMessage) -> IngestOutcome {
        match message {
            IngestMessage::StateUpdate(update) => self.handle_state_update(update),
            IngestMessage::RegisterWindow(registration) => {
                self.windows
                    .register_window(&registration.name, &registration.window_id);
                IngestOutcome::WindowRegistered
            }
            IngestMessage::UnregisterWindow { name } => IngestOutcome::WindowUnregistered {
                removed: self.windows.unregister_window(&name),
            },
        }
    }

    fn handle_state_update(&mut self, update: StateUpdate) -> IngestOutcome {
        let StateUpdate {
            external_id,
            cwd,
            state,
            hook_event,
            task,
        } = update;

        let Some(terminal_id) = self.correlator.register_external(external_id.clone(), &cwd)
        else {
            debug!(
                external_id = %external_id,
                cwd = %cwd,
                hook_event = ?hook_event,
                "No terminal session for update, dropping"
            );
            return IngestOutcome::Unresolved;
        };

        // A restored mapping can name a terminal that is not tracked (yet).
        if !self.store.contains(&terminal_id) {
            debug!(
                external_id = %external_id,
                terminal_id = %terminal_id,
                "Mapped terminal is not tracked, dropping"
            );
            return IngestOutcome::Unresolved;
        }

        self.store.attach_external_id(&terminal_id, external_id);
        let changed = self.apply_state(&terminal_id, state, task, Utc::now());
        IngestOutcome::Applied {
            terminal_id,
            changed,
        }
    }

    /// Polled evidence carries no task; the last reported task is kept.
    fn handle_apply_polled(&mut self, terminal_id: &TerminalId, state: ClaudeState) -> bool {
        let task = self
            .store
            .get(terminal_id)
            .and_then(|s| s.current_task.clone());
        self.apply_state(terminal_id, state, task, Utc::now())
    }

    fn apply_state(
        &mut self,
        terminal_id: &TerminalId,
        state: ClaudeState,
        task: Option<String>,
        now: DateTime<Utc>,
    ) -> bool {
        if !self.store.update_at(terminal_id, state, task, now) {
            return false;
        }
        self.on_transition(terminal_id, now);
        true
    }

    fn on_transition(&mut self, terminal_id: &TerminalId, now: DateTime<Utc>) {
        let Some(session) = self.store.get(terminal_id).cloned() else {
            return;
        };

        self.request_background(&session);

        if self.store.policy().is_due(&session, now) {
            self.send_notification(&session);
            self.store.mark_notified_at(terminal_id, now);
        }
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    fn handle_track(&mut self, discovered: DiscoveredSession) -> Result<TrackedSession, EngineError> {
        let DiscoveredSession {
            terminal_id,
            window_id,
            project_path,
            background,
        } = discovered;

        if let Some(existing) = self.store.get(&terminal_id) {
            return Ok(existing.clone());
        }

        let window_name = self
            .windows
            .get_window_by_terminal_window_id(&window_id)
            .map(|w| w.name.clone());

        let tracked = self
            .store
            .track(terminal_id.clone(), &project_path, window_name.clone())?;

        if let Some(name) = &window_name {
            self.windows.increment_session_count(name);
            self.windows.mark_window_used(name);
        }
        if let Some(color) = background {
            self.store.set_original_background(&terminal_id, color);
        }
        if let Some(external_id) = self
            .correlator
            .register_terminal(terminal_id.clone(), &project_path)
        {
            self.store.attach_external_id(&terminal_id, external_id);
        }

        Ok(self.store.get(&terminal_id).cloned().unwrap_or(tracked))
    }

    fn handle_cleanup(&mut self, live: &[TerminalSession]) -> CleanupReport {
        let live_ids: HashSet<&TerminalId> = live.iter().map(|s| &s.terminal_id).collect();
        let mut report = CleanupReport::default();

        for terminal_id in self.store.terminal_ids() {
            if live_ids.contains(&terminal_id) {
                continue;
            }
            if let Some(name) = self
                .store
                .get(&terminal_id)
                .and_then(|s| s.window_name.clone())
            {
                self.windows.decrement_session_count(&name);
            }
            self.store.untrack(&terminal_id);
            self.correlator.unregister_terminal(&terminal_id);
            report.untracked.push(terminal_id);
        }

        for terminal_id in self.correlator.mapped_terminals() {
            if !live_ids.contains(&terminal_id)
                && self.correlator.unregister_terminal(&terminal_id).is_some()
            {
                report.unmapped.push(terminal_id);
            }
        }

        let window_ids: Vec<String> = live.iter().map(|s| s.window_id.clone()).collect();
        report.removed_windows = self.windows.cleanup_stale(&window_ids);

        if !report.is_empty() {
            info!(
                untracked = report.untracked.len(),
                unmapped = report.unmapped.len(),
                windows = report.removed_windows.len(),
                "Cleanup removed stale entries"
            );
        }
        report
    }

    // ========================================================================
    // Side Effects
    // ========================================================================

    fn handle_run_reminders(&mut self, now: DateTime<Utc>) -> usize {
        let due = self.store.sessions_needing_notification_at(now);
        for session in &due {
            self.send_notification(session);
            self.store.mark_notified_at(&session.terminal_id, now);
        }
        due.len()
    }

    /// Alert color while waiting for input, the original color otherwise.
    /// Without a captured original the alert is still shown but never
    /// restored.
    fn request_background(&self, session: &TrackedSession) {
        let color = if session.current_state == ClaudeState::WaitingInput {
            ALERT_BACKGROUND
        } else {
            let Some(original) = session.original_background else {
                trace!(terminal_id = %session.terminal_id, "No original background to restore");
                return;
            };
            original
        };

        let terminal = Arc::clone(&self.terminal);
        let terminal_id = session.terminal_id.clone();
        tokio::spawn(async move {
            if let Err(e) = terminal.set_background(&terminal_id, color).await {
                warn!(terminal_id = %terminal_id, error = %e, "Failed to set background");
            }
        });
    }

    fn send_notification(&self, session: &TrackedSession) {
        let notifier = Arc::clone(&self.notifier);
        let body = format!("{} needs input", session.project_name);
        let terminal_id = session.terminal_id.clone();
        info!(terminal_id = %terminal_id, project = %session.project_name, "Notifying");

        tokio::spawn(async move {
            if let Err(e) = notifier.notify(NOTIFICATION_TITLE, &body).await {
                warn!(terminal_id = %terminal_id, error = %e, "Notification failed");
            }
        });
    }

    fn flush(&self) {
        self.store.persist();
        self.correlator.persist();
        self.windows.persist();
        debug!("Engine state flushed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::NotificationPolicy;
    use async_trait::async_trait;
    use hud_core::{ExternalId, Rgb};
    use hud_protocol::WindowRegistration;
    use hud_term::{NotifyError, TerminalError};
    use tokio::sync::mpsc;

    struct NullTerminal;

    #[async_trait]
    impl TerminalControl for NullTerminal {
        async fn list_sessions(&self) -> Result<Vec<TerminalSession>, TerminalError> {
            Ok(Vec::new())
        }
        async fn read_variable(
            &self,
            _: &TerminalId,
            _: &str,
        ) -> Result<Option<String>, TerminalError> {
            Ok(None)
        }
        async fn capture_screen(&self, _: &TerminalId) -> Result<Vec<String>, TerminalError> {
            Ok(Vec::new())
        }
        async fn background(&self, _: &TerminalId) -> Result<Option<Rgb>, TerminalError> {
            Ok(None)
        }
        async fn set_background(&self, _: &TerminalId, _: Rgb) -> Result<(), TerminalError> {
            Ok(())
        }
    }

    struct NullNotifier;

    #[async_trait]
    impl Notifier for NullNotifier {
        async fn notify(&self, _: &str, _: &str) -> Result<(), NotifyError> {
            Ok(())
        }
    }

    fn actor() -> EngineActor {
        let (_tx, rx) = mpsc::channel(1);
        let state = EngineState {
            store: SessionStore::in_memory(NotificationPolicy::default()),
            correlator: IdentityCorrelator::in_memory(),
            windows: WindowRegistry::in_memory(),
        };
        EngineActor::new(rx, state, Arc::new(NullTerminal), Arc::new(NullNotifier))
    }

    fn discovered(id: &str, window: &str, path: &str) -> DiscoveredSession {
        DiscoveredSession {
            terminal_id: TerminalId::new(id),
            window_id: window.to_string(),
            project_path: path.to_string(),
            background: Some(Rgb::new(0, 0, 0)),
        }
    }

    fn update(id: &str, cwd: &str, state: ClaudeState) -> StateUpdate {
        StateUpdate {
            external_id: ExternalId::new(id),
            cwd: cwd.to_string(),
            state,
            hook_event: None,
            task: Some("Bash".to_string()),
        }
    }

    #[tokio::test]
    async fn test_track_resolves_window_name() {
        let mut actor = actor();
        actor.handle_ingest(IngestMessage::RegisterWindow(WindowRegistration {
            name: "backend".to_string(),
            window_id: "@1".to_string(),
        }));

        let session = actor.handle_track(discovered("%1", "@1", "/p/api")).unwrap();
        assert_eq!(session.window_name.as_deref(), Some("backend"));
        assert_eq!(session.original_background, Some(Rgb::new(0, 0, 0)));
        assert_eq!(actor.windows.get_window("backend").unwrap().session_count, 1);

        // Tracking again does not count twice.
        actor.handle_track(discovered("%1", "@1", "/p/api")).unwrap();
        assert_eq!(actor.windows.get_window("backend").unwrap().session_count, 1);
    }

    #[tokio::test]
    async fn test_window_messages_and_last_used() {
        let mut actor = actor();
        for (name, id) in [("backend", "@1"), ("docs", "@2")] {
            actor.handle_ingest(IngestMessage::RegisterWindow(WindowRegistration {
                name: name.to_string(),
                window_id: id.to_string(),
            }));
        }
        assert_eq!(actor.windows.last_used_window().unwrap().name, "docs");

        actor.handle_track(discovered("%1", "@1", "/p/api")).unwrap();
        assert_eq!(actor.windows.last_used_window().unwrap().name, "backend");

        let outcome = actor.handle_ingest(IngestMessage::UnregisterWindow {
            name: "backend".to_string(),
        });
        assert_eq!(outcome, IngestOutcome::WindowUnregistered { removed: true });
        assert!(actor.windows.get_window("backend").is_none());

        let outcome = actor.handle_ingest(IngestMessage::UnregisterWindow {
            name: "backend".to_string(),
        });
        assert_eq!(outcome, IngestOutcome::WindowUnregistered { removed: false });
    }

    #[tokio::test]
    async fn test_update_for_untracked_mapped_terminal_is_dropped() {
        let mut actor = actor();
        actor
            .correlator
            .register_terminal(TerminalId::new("%9"), "/p");

        let outcome = actor.handle_state_update(update("ext", "/p", ClaudeState::Working));
        assert_eq!(outcome, IngestOutcome::Unresolved);
        assert!(actor.store.is_empty());
    }

    #[tokio::test]
    async fn test_update_before_terminal_is_dropped_then_matched_on_track() {
        let mut actor = actor();
        let outcome = actor.handle_state_update(update("ext", "/p/api", ClaudeState::Working));
        assert_eq!(outcome, IngestOutcome::Unresolved);

        let session = actor.handle_track(discovered("%1", "@1", "/p/api")).unwrap();
        assert_eq!(session.external_id, Some(ExternalId::new("ext")));

        let outcome = actor.handle_state_update(update("ext", "/p/api", ClaudeState::Working));
        assert_eq!(
            outcome,
            IngestOutcome::Applied {
                terminal_id: TerminalId::new("%1"),
                changed: true
            }
        );
    }

    #[tokio::test]
    async fn test_polled_update_keeps_task() {
        let mut actor = actor();
        actor.handle_track(discovered("%1", "@1", "/p")).unwrap();
        actor.handle_state_update(update("ext", "/p", ClaudeState::Working));

        assert!(actor.handle_apply_polled(&TerminalId::new("%1"), ClaudeState::Done));
        let session = actor.store.get(&TerminalId::new("%1")).unwrap();
        assert_eq!(session.current_task.as_deref(), Some("Bash"));
    }

    #[tokio::test]
    async fn test_transition_to_waiting_marks_notified() {
        let mut actor = actor();
        actor.handle_track(discovered("%1", "@1", "/p")).unwrap();
        actor.handle_state_update(update("ext", "/p", ClaudeState::WaitingInput));

        let session = actor.store.get(&TerminalId::new("%1")).unwrap();
        assert!(session.last_notification.is_some());
        assert_eq!(actor.handle_run_reminders(Utc::now()), 0);
    }

    #[tokio::test]
    async fn test_cleanup_untracks_dead_sessions() {
        let mut actor = actor();
        actor.handle_ingest(IngestMessage::RegisterWindow(WindowRegistration {
            name: "w".to_string(),
            window_id: "@1".to_string(),
        }));
        actor.handle_track(discovered("%1", "@1", "/p/a")).unwrap();
        actor.handle_track(discovered("%2", "@2", "/p/b")).unwrap();
        actor.handle_state_update(update("ext", "/p/a", ClaudeState::Working));

        let report = actor.handle_cleanup(&[TerminalSession::new("%2", "@2")]);
        assert_eq!(report.untracked, vec![TerminalId::new("%1")]);
        assert_eq!(report.removed_windows, vec!["w".to_string()]);
        assert!(actor.correlator.lookup_by_external(&ExternalId::new("ext")).is_none());
        assert!(actor.store.contains(&TerminalId::new("%2")));
    }

    #[tokio::test]
    async fn test_cleanup_unmaps_restored_terminals_that_are_gone() {
        let mut actor = actor();
        actor
            .correlator
            .register_external(ExternalId::new("ext"), "/p");
        actor.correlator.register_terminal(TerminalId::new("%9"), "/p");

        let report = actor.handle_cleanup(&[]);
        assert!(report.untracked.is_empty());
        assert_eq!(report.unmapped, vec![TerminalId::new("%9")]);
    }
}
