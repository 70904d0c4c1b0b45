//! Integration tests for the engine actor: correlation, transitions,
//! notification cadence and persistence.
//!
//! Tests CAN use `.unwrap()` and `.expect()`.

mod common;

use std::time::Duration;

use hud_core::{ClaudeState, ExternalId, Rgb, TerminalId, ALERT_BACKGROUND};
use hud_protocol::{IngestMessage, StateUpdate, WindowRegistration};
use hudd::config::{HudPaths, Settings};
use hudd::daemon::load_state;
use hudd::engine::{spawn_engine, DiscoveredSession, IngestOutcome, NOTIFICATION_TITLE};
use tempfile::TempDir;
use tokio::time::sleep;

use common::{spawn_test_engine, wait_until, FakeTerminal, RecordingNotifier};

const ORIGINAL: Rgb = Rgb::new(0x1e, 0x1e, 0x1e);

fn state_update(external_id: &str, cwd: &str, state: ClaudeState) -> IngestMessage {
    IngestMessage::StateUpdate(StateUpdate {
        external_id: ExternalId::new(external_id),
        cwd: cwd.to_string(),
        state,
        hook_event: Some("Notification".to_string()),
        task: None,
    })
}

fn discovered(id: &str, window_id: &str, path: &str) -> DiscoveredSession {
    DiscoveredSession {
        terminal_id: TerminalId::new(id),
        window_id: window_id.to_string(),
        project_path: path.to_string(),
        background: Some(ORIGINAL),
    }
}

#[tokio::test]
async fn test_end_to_end_single_notification() {
    let terminal = FakeTerminal::new();
    let notifier = RecordingNotifier::new();
    let engine = spawn_test_engine(terminal.clone(), notifier.clone());

    // No terminal session shares the cwd yet: dropped.
    let outcome = engine
        .ingest(state_update("abc", "/p/api", ClaudeState::WaitingInput))
        .await
        .unwrap();
    assert_eq!(outcome, IngestOutcome::Unresolved);

    // The terminal appears and pairs with the waiting registration.
    let session = engine.track(discovered("%1", "@1", "/p/api")).await.unwrap();
    assert_eq!(session.external_id, Some(ExternalId::new("abc")));

    let outcome = engine
        .ingest(state_update("abc", "/p/api", ClaudeState::WaitingInput))
        .await
        .unwrap();
    assert_eq!(
        outcome,
        IngestOutcome::Applied {
            terminal_id: TerminalId::new("%1"),
            changed: true
        }
    );

    assert!(wait_until(|| notifier.count() == 1).await);
    assert_eq!(
        notifier.sent()[0],
        (NOTIFICATION_TITLE.to_string(), "api needs input".to_string())
    );
    assert!(wait_until(|| terminal.background_calls().len() == 1).await);
    assert_eq!(
        terminal.background_calls()[0],
        (TerminalId::new("%1"), ALERT_BACKGROUND)
    );

    // Leaving and re-entering the waiting state inside the cooldown.
    engine
        .ingest(state_update("abc", "/p/api", ClaudeState::Working))
        .await
        .unwrap();
    engine
        .ingest(state_update("abc", "/p/api", ClaudeState::WaitingInput))
        .await
        .unwrap();
    assert_eq!(engine.run_reminders().await.unwrap(), 0);

    assert!(wait_until(|| terminal.background_calls().len() == 3).await);
    sleep(Duration::from_millis(50)).await;
    assert_eq!(notifier.count(), 1);

    // The original color came back in between.
    assert!(terminal
        .background_calls()
        .contains(&(TerminalId::new("%1"), ORIGINAL)));
}

#[tokio::test]
async fn test_repeated_state_is_not_a_transition() {
    let terminal = FakeTerminal::new();
    let notifier = RecordingNotifier::new();
    let engine = spawn_test_engine(terminal.clone(), notifier.clone());

    engine.track(discovered("%1", "@1", "/p/web")).await.unwrap();
    let first = engine
        .ingest(state_update("s1", "/p/web", ClaudeState::Working))
        .await
        .unwrap();
    let second = engine
        .ingest(state_update("s1", "/p/web", ClaudeState::Working))
        .await
        .unwrap();

    assert!(matches!(first, IngestOutcome::Applied { changed: true, .. }));
    assert!(matches!(second, IngestOutcome::Applied { changed: false, .. }));

    let session = engine.get_session(TerminalId::new("%1")).await.unwrap();
    assert_eq!(session.current_state, ClaudeState::Working);
    assert_eq!(notifier.count(), 0);
}

#[tokio::test]
async fn test_alert_without_original_is_never_restored() {
    let terminal = FakeTerminal::new();
    let notifier = RecordingNotifier::new();
    let engine = spawn_test_engine(terminal.clone(), notifier.clone());

    let mut pane = discovered("%1", "@1", "/p/x");
    pane.background = None;
    engine.track(pane).await.unwrap();
    engine
        .ingest(state_update("s", "/p/x", ClaudeState::WaitingInput))
        .await
        .unwrap();

    assert!(wait_until(|| notifier.count() == 1).await);
    assert!(wait_until(|| terminal.background_calls().len() == 1).await);
    assert_eq!(
        terminal.background_calls()[0],
        (TerminalId::new("%1"), ALERT_BACKGROUND)
    );

    // Leaving the waiting state has no color to go back to.
    let outcome = engine
        .ingest(state_update("s", "/p/x", ClaudeState::Working))
        .await
        .unwrap();
    assert!(matches!(outcome, IngestOutcome::Applied { changed: true, .. }));
    sleep(Duration::from_millis(50)).await;
    assert_eq!(terminal.background_calls().len(), 1);
}

#[tokio::test]
async fn test_first_terminal_wins_shared_cwd() {
    let terminal = FakeTerminal::new();
    let notifier = RecordingNotifier::new();
    let engine = spawn_test_engine(terminal, notifier);

    engine.track(discovered("%1", "@1", "/p/shared")).await.unwrap();
    engine.track(discovered("%2", "@1", "/p/shared")).await.unwrap();

    let a = engine
        .ingest(state_update("a", "/p/shared", ClaudeState::Working))
        .await
        .unwrap();
    let b = engine
        .ingest(state_update("b", "/p/shared", ClaudeState::Working))
        .await
        .unwrap();

    assert!(matches!(a, IngestOutcome::Applied { terminal_id, .. } if terminal_id == TerminalId::new("%1")));
    assert!(matches!(b, IngestOutcome::Applied { terminal_id, .. } if terminal_id == TerminalId::new("%2")));
}

#[tokio::test]
async fn test_summary_groups_by_registered_window() {
    let terminal = FakeTerminal::new();
    let notifier = RecordingNotifier::new();
    let engine = spawn_test_engine(terminal, notifier);

    engine
        .ingest(IngestMessage::RegisterWindow(WindowRegistration {
            name: "backend".to_string(),
            window_id: "@1".to_string(),
        }))
        .await
        .unwrap();
    engine.track(discovered("%1", "@1", "/p/api")).await.unwrap();
    engine.track(discovered("%2", "@2", "/p/web")).await.unwrap();

    let summary = engine.summary().await.unwrap();
    assert_eq!(summary.total_sessions, 2);
    let text = summary.format(None);
    assert!(text.contains("Window: backend"));
    assert!(text.contains("Window: Unnamed"));
    assert!(summary.format(Some("backend")).contains("api"));
}

#[tokio::test]
async fn test_restored_mapping_without_session_is_unresolved() {
    let dir = TempDir::new().unwrap();
    let paths = HudPaths::in_dir(dir.path(), dir.path().join("debug"));
    std::fs::write(
        &paths.session_map_file,
        r#"{"mapping":{"ext-1":"%9"},"updated":"2026-01-01T00:00:00Z"}"#,
    )
    .unwrap();
    assert!(!paths.state_file.exists());

    let notifier = RecordingNotifier::new();
    let engine = spawn_engine(
        load_state(&Settings::default(), &paths),
        FakeTerminal::new(),
        notifier.clone(),
    );

    let outcome = engine
        .ingest(state_update("ext-1", "/p/api", ClaudeState::WaitingInput))
        .await
        .unwrap();
    assert_eq!(outcome, IngestOutcome::Unresolved);
    assert!(engine.get_all_sessions().await.is_empty());
    sleep(Duration::from_millis(50)).await;
    assert_eq!(notifier.count(), 0);
}

#[tokio::test]
async fn test_state_survives_restart() {
    let dir = TempDir::new().unwrap();
    let paths = HudPaths::in_dir(dir.path(), dir.path().join("debug"));
    let settings = Settings::default();

    {
        let engine = spawn_engine(
            load_state(&settings, &paths),
            FakeTerminal::new(),
            RecordingNotifier::new(),
        );
        engine.track(discovered("%1", "@1", "/p/api")).await.unwrap();
        engine
            .ingest(state_update("abc", "/p/api", ClaudeState::Done))
            .await
            .unwrap();
        engine.flush().await.unwrap();
    }

    assert!(paths.state_file.exists());
    assert!(paths.session_map_file.exists());

    let engine = spawn_engine(
        load_state(&settings, &paths),
        FakeTerminal::new(),
        RecordingNotifier::new(),
    );
    let session = engine.get_session(TerminalId::new("%1")).await.unwrap();
    assert_eq!(session.current_state, ClaudeState::Done);
    assert_eq!(session.original_background, Some(ORIGINAL));

    // The restored mapping resolves immediately.
    let outcome = engine
        .ingest(state_update("abc", "/somewhere/else", ClaudeState::Working))
        .await
        .unwrap();
    assert!(matches!(outcome, IngestOutcome::Applied { changed: true, .. }));
}
