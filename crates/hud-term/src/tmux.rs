//! tmux adapter for [`TerminalControl`].
//!
//! Terminal ids are pane ids ("%5"), window ids are tmux window ids ("@2").
//! Backgrounds are read from and written to the pane's `window-style`
//! option, so a color only exists once someone set one.

use async_trait::async_trait;
use hud_core::{Rgb, TerminalId};
use tokio::process::Command;
use tracing::{debug, trace};

use crate::terminal::{TerminalControl, TerminalSession, VAR_COMMAND, VAR_PATH};
use crate::TerminalError;

const STYLE_OPTION: &str = "window-style";

/// Drives a tmux server through its CLI.
#[derive(Debug, Clone)]
pub struct TmuxTerminal {
    program: String,
}

impl Default for TmuxTerminal {
    fn default() -> Self {
        Self::new("tmux")
    }
}

impl TmuxTerminal {
    /// Uses the given tmux executable.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Runs tmux with `args` and returns stdout.
    async fn run(&self, args: &[&str]) -> Result<String, TerminalError> {
        trace!(program = %self.program, ?args, "tmux");
        let output = Command::new(&self.program)
            .args(args)
            .output()
            .await
            .map_err(|source| TerminalError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(TerminalError::CommandFailed {
                command: format!("{} {}", self.program, args.first().copied().unwrap_or("")),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Reads the pane's own `window-style`, falling back to its window's.
    async fn style(&self, pane: &str) -> Result<String, TerminalError> {
        let pane_style = self
            .run(&["show-options", "-p", "-q", "-v", "-t", pane, STYLE_OPTION])
            .await?;
        if !pane_style.trim().is_empty() {
            return Ok(pane_style);
        }
        self.run(&["show-options", "-w", "-q", "-v", "-t", pane, STYLE_OPTION])
            .await
    }
}

fn pane_target(terminal_id: &TerminalId) -> Result<&str, TerminalError> {
    let id = terminal_id.as_str();
    if id.is_empty() {
        return Err(TerminalError::InvalidTerminalId(id.to_string()));
    }
    Ok(id)
}

/// Maps a variable name to a tmux format string.
///
/// Known names get their pane format; anything else is passed through as
/// a raw tmux format variable.
fn format_for(name: &str) -> String {
    match name {
        VAR_PATH => "#{pane_current_path}".to_string(),
        VAR_COMMAND => "#{pane_current_command}".to_string(),
        other => format!("#{{{other}}}"),
    }
}

/// Parses `list-panes -F "#{pane_id} #{window_id}"` output.
fn parse_pane_list(output: &str) -> Vec<TerminalSession> {
    output
        .lines()
        .filter_map(|line| {
            let mut parts = line.split_whitespace();
            match (parts.next(), parts.next()) {
                (Some(pane), Some(window)) => Some(TerminalSession::new(pane, window)),
                _ => None,
            }
        })
        .collect()
}

/// Extracts `bg=#rrggbb` from a tmux style string such as `fg=white,bg=#1e3a5f`.
///
/// Named colors and `default` yield `None`.
fn parse_style_background(style: &str) -> Option<Rgb> {
    style
        .trim()
        .split([',', ' '])
        .filter_map(|part| part.trim().strip_prefix("bg="))
        .last()
        .and_then(|value| Rgb::from_hex(value).ok())
}

/// Splits captured output into lines, dropping the blank rows tmux pads
/// the bottom of the pane with.
fn screen_lines(output: &str) -> Vec<String> {
    let mut lines: Vec<String> = output.lines().map(|l| l.trim_end().to_string()).collect();
    while lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }
    lines
}

#[async_trait]
impl TerminalControl for TmuxTerminal {
    async fn list_sessions(&self) -> Result<Vec<TerminalSession>, TerminalError> {
        let output = self
            .run(&["list-panes", "-a", "-F", "#{pane_id} #{window_id}"])
            .await?;
        let sessions = parse_pane_list(&output);
        debug!(count = sessions.len(), "Listed tmux panes");
        Ok(sessions)
    }

    async fn read_variable(
        &self,
        terminal_id: &TerminalId,
        name: &str,
    ) -> Result<Option<String>, TerminalError> {
        let pane = pane_target(terminal_id)?;
        let format = format_for(name);
        let output = self
            .run(&["display-message", "-p", "-t", pane, &format])
            .await?;
        let value = output.trim();
        Ok((!value.is_empty()).then(|| value.to_string()))
    }

    async fn capture_screen(&self, terminal_id: &TerminalId) -> Result<Vec<String>, TerminalError> {
        let pane = pane_target(terminal_id)?;
        let output = self.run(&["capture-pane", "-p", "-t", pane]).await?;
        Ok(screen_lines(&output))
    }

    async fn background(&self, terminal_id: &TerminalId) -> Result<Option<Rgb>, TerminalError> {
        let pane = pane_target(terminal_id)?;
        let style = self.style(pane).await?;
        Ok(parse_style_background(&style))
    }

    async fn set_background(
        &self,
        terminal_id: &TerminalId,
        color: Rgb,
    ) -> Result<(), TerminalError> {
        let pane = pane_target(terminal_id)?;
        let style = format!("bg={}", color.to_hex());
        self.run(&["set-option", "-p", "-t", pane, STYLE_OPTION, &style])
            .await?;
        debug!(terminal_id = %terminal_id, color = %color, "Set pane background");
        Ok(())
    }
}
