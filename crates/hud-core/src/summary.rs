//! Status overview grouped by window.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use crate::{ClaudeState, TrackedSession};

/// Group name for sessions that were not opened in a named window.
pub const UNNAMED_WINDOW: &str = "Unnamed";

/// Sessions of one window, highest attention first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowSummary {
    pub name: String,
    pub sessions: Vec<TrackedSession>,
    pub by_state: BTreeMap<ClaudeState, usize>,
}

/// Snapshot of every tracked session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusSummary {
    pub total_sessions: usize,
    pub by_state: BTreeMap<ClaudeState, usize>,
    /// Ordered by window name
    pub windows: Vec<WindowSummary>,
}

fn empty_counts() -> BTreeMap<ClaudeState, usize> {
    ClaudeState::ALL.iter().map(|s| (*s, 0)).collect()
}

impl StatusSummary {
    pub fn from_sessions<'a>(sessions: impl IntoIterator<Item = &'a TrackedSession>) -> Self {
        let mut by_state = empty_counts();
        let mut grouped: BTreeMap<String, Vec<TrackedSession>> = BTreeMap::new();
        let mut total_sessions = 0;

        for session in sessions {
            total_sessions += 1;
            *by_state.entry(session.current_state).or_insert(0) += 1;
            let window = session
                .window_name
                .clone()
                .unwrap_or_else(|| UNNAMED_WINDOW.to_string());
            grouped.entry(window).or_default().push(session.clone());
        }

        let windows = grouped
            .into_iter()
            .map(|(name, mut sessions)| {
                sessions.sort_by(|a, b| {
                    b.current_state
                        .cmp(&a.current_state)
                        .then_with(|| a.project_name.cmp(&b.project_name))
                });
                let mut counts = empty_counts();
                for s in &sessions {
                    *counts.entry(s.current_state).or_insert(0) += 1;
                }
                WindowSummary {
                    name,
                    sessions,
                    by_state: counts,
                }
            })
            .collect();

        Self {
            total_sessions,
            by_state,
            windows,
        }
    }

    /// Number of sessions in `state`.
    #[must_use]
    pub fn count(&self, state: ClaudeState) -> usize {
        self.by_state.get(&state).copied().unwrap_or(0)
    }

    /// Human-readable listing, optionally restricted to one window.
    #[must_use]
    pub fn format(&self, window_filter: Option<&str>) -> String {
        let mut out = String::new();

        for window in &self.windows {
            if window_filter.is_some_and(|f| f != window.name) {
                continue;
            }
            let _ = writeln!(out, "Window: {}", window.name);
            for session in &window.sessions {
                let _ = writeln!(
                    out,
                    "  {} {}",
                    session.current_state.icon(),
                    session.status_line()
                );
            }
            out.push('\n');
        }

        if out.is_empty() {
            return "No active sessions".to_string();
        }
        out.trim_end().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TerminalId;
    use chrono::Utc;

    fn session(id: &str, path: &str, window: Option<&str>, state: ClaudeState) -> TrackedSession {
        let mut s = TrackedSession::new(
            TerminalId::new(id),
            path,
            window.map(String::from),
            0,
            Utc::now(),
        )
        .unwrap();
        s.current_state = state;
        s
    }

    #[test]
    fn test_empty_summary() {
        let none: Vec<TrackedSession> = Vec::new();
        let summary = StatusSummary::from_sessions(&none);
        assert_eq!(summary.total_sessions, 0);
        assert_eq!(summary.count(ClaudeState::Idle), 0);
        assert_eq!(summary.format(None), "No active sessions");
    }

    #[test]
    fn test_groups_by_window_and_counts() {
        let sessions = vec![
            session("%1", "/w/api", Some("main"), ClaudeState::Working),
            session("%2", "/w/web", Some("main"), ClaudeState::WaitingInput),
            session("%3", "/w/cli", None, ClaudeState::Idle),
        ];
        let summary = StatusSummary::from_sessions(&sessions);

        assert_eq!(summary.total_sessions, 3);
        assert_eq!(summary.count(ClaudeState::Working), 1);
        assert_eq!(summary.count(ClaudeState::Error), 0);
        assert_eq!(summary.windows.len(), 2);

        let main = &summary.windows[1];
        assert_eq!(main.name, "main");
        // Waiting outranks working
        assert_eq!(main.sessions[0].project_name, "web");
        assert_eq!(main.by_state[&ClaudeState::WaitingInput], 1);
        assert_eq!(summary.windows[0].name, UNNAMED_WINDOW);
    }

    #[test]
    fn test_format() {
        let mut waiting = session("%2", "/w/web", Some("main"), ClaudeState::WaitingInput);
        waiting.current_task = Some("Bash".to_string());
        let sessions = vec![waiting, session("%3", "/w/cli", None, ClaudeState::Idle)];
        let summary = StatusSummary::from_sessions(&sessions);

        let text = summary.format(None);
        assert_eq!(
            text,
            "Window: Unnamed\n  \u{25CB} cli: IDLE\n\nWindow: main\n  \u{23F3} web: WAITING_INPUT - Bash"
        );

        let only_main = summary.format(Some("main"));
        assert!(only_main.starts_with("Window: main"));
        assert!(!only_main.contains("cli"));

        assert_eq!(summary.format(Some("nope")), "No active sessions");
    }
}
