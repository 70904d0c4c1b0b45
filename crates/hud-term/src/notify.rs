//! Desktop notification collaborator.

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info};

use crate::NotifyError;

/// Raises user-visible notifications.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, title: &str, body: &str) -> Result<(), NotifyError>;
}

/// Native desktop notifications.
///
/// `osascript` on macOS (with the "Glass" sound), `notify-send` elsewhere.
#[derive(Debug, Clone, Default)]
pub struct DesktopNotifier;

impl DesktopNotifier {
    pub fn new() -> Self {
        Self
    }

    fn command(title: &str, body: &str) -> (&'static str, Vec<String>) {
        if cfg!(target_os = "macos") {
            let script = format!(
                "display notification \"{}\" with title \"{}\" sound name \"Glass\"",
                applescript_escape(body),
                applescript_escape(title)
            );
            ("osascript", vec!["-e".to_string(), script])
        } else {
            (
                "notify-send",
                vec!["--app-name=agent-hud".to_string(), title.to_string(), body.to_string()],
            )
        }
    }
}

/// Escapes a value for use inside an AppleScript string literal.
fn applescript_escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

#[async_trait]
impl Notifier for DesktopNotifier {
    async fn notify(&self, title: &str, body: &str) -> Result<(), NotifyError> {
        let (program, args) = Self::command(title, body);
        let status = Command::new(program)
            .args(&args)
            .status()
            .await
            .map_err(|source| NotifyError::Spawn {
                program: program.to_string(),
                source,
            })?;

        if !status.success() {
            return Err(NotifyError::Failed {
                program: program.to_string(),
                status: status.to_string(),
            });
        }

        debug!(program, title, "Notification sent");
        Ok(())
    }
}

/// Writes notifications to the log instead of the desktop.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, title: &str, body: &str) -> Result<(), NotifyError> {
        info!(title, body, "Notification");
        Ok(())
    }
}
