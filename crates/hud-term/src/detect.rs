//! Recognizing terminal sessions that host the agent.

/// Screen fragments that only the agent's TUI draws (lowercase).
pub const SCREEN_INDICATORS: &[&str] = &["claude", "❯", "ctrl+c to interrupt", "for shortcuts"];

/// Decides whether a terminal session runs the agent.
#[derive(Debug, Clone)]
pub struct AgentDetector {
    process_name: String,
}

impl AgentDetector {
    /// `process_name` is matched case-insensitively against foreground commands.
    pub fn new(process_name: impl Into<String>) -> Self {
        Self {
            process_name: process_name.into().to_lowercase(),
        }
    }

    /// True if the foreground command names the agent.
    #[must_use]
    pub fn matches_command(&self, command: &str) -> bool {
        !self.process_name.is_empty() && command.to_lowercase().contains(&self.process_name)
    }

    /// True if any screen line shows an agent indicator.
    #[must_use]
    pub fn matches_screen<S: AsRef<str>>(&self, lines: &[S]) -> bool {
        lines.iter().any(|line| {
            let line = line.as_ref().to_lowercase();
            SCREEN_INDICATORS.iter().any(|ind| line.contains(ind))
        })
    }
}

impl Default for AgentDetector {
    fn default() -> Self {
        Self::new("claude")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matches_command() {
        let detector = AgentDetector::default();
        assert!(detector.matches_command("claude"));
        assert!(detector.matches_command("Claude-Code"));
        assert!(!detector.matches_command("zsh"));
        assert!(!AgentDetector::new("").matches_command("anything"));
    }

    #[test]
    fn test_matches_screen() {
        let detector = AgentDetector::default();
        assert!(detector.matches_screen(&["", "  ? for shortcuts"]));
        assert!(detector.matches_screen(&["❯ "]));
        assert!(!detector.matches_screen(&["user@host:~$ ls", "Cargo.toml  src"]));
        let empty: [&str; 0] = [];
        assert!(!detector.matches_screen(&empty));
    }
}
