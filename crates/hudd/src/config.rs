//! Daemon settings and on-disk layout.
//!
//! Settings come from a TOML file (`--config`, else
//! `<config dir>/agent-hud/config.toml`); every field has a default, so a
//! missing file or a partial one is fine. `HUD_SOCKET` and `HUD_STATE_DIR`
//! override the file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::store::NotificationPolicy;

/// Environment override for the ingestion socket path.
pub const SOCKET_ENV: &str = "HUD_SOCKET";

/// Environment override for the state directory.
pub const STATE_DIR_ENV: &str = "HUD_STATE_DIR";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Daemon settings (from config file).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Directory for state documents, socket, pid and log (default `~/.claude-hud`)
    #[serde(default)]
    pub state_dir: Option<PathBuf>,

    /// Ingestion socket (default `<state_dir>/daemon.sock`)
    #[serde(default)]
    pub socket_path: Option<PathBuf>,

    /// Screen/log poll interval in milliseconds
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    /// Cleanup and discovery interval in milliseconds
    #[serde(default = "default_cleanup_interval")]
    pub cleanup_interval_ms: u64,

    /// Minimum gap between notifications for one session
    #[serde(default = "default_notification_cooldown")]
    pub notification_cooldown_secs: u64,

    /// Gap before a still-waiting session is notified again
    #[serde(default = "default_reminder_interval")]
    pub reminder_interval_secs: u64,

    /// Foreground command name that marks an agent session
    #[serde(default = "default_agent_process_name")]
    pub agent_process_name: String,

    /// Where the agent writes per-session debug logs (default `~/.claude/debug`)
    #[serde(default)]
    pub debug_log_dir: Option<PathBuf>,

    /// Send desktop notifications (otherwise they are only logged)
    #[serde(default = "default_notifications")]
    pub notifications: bool,
}

fn default_poll_interval() -> u64 {
    500
}

fn default_cleanup_interval() -> u64 {
    5000
}

fn default_notification_cooldown() -> u64 {
    30
}

fn default_reminder_interval() -> u64 {
    300
}

fn default_agent_process_name() -> String {
    "claude".to_string()
}

fn default_notifications() -> bool {
    true
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            state_dir: None,
            socket_path: None,
            poll_interval_ms: default_poll_interval(),
            cleanup_interval_ms: default_cleanup_interval(),
            notification_cooldown_secs: default_notification_cooldown(),
            reminder_interval_secs: default_reminder_interval(),
            agent_process_name: default_agent_process_name(),
            debug_log_dir: None,
            notifications: default_notifications(),
        }
    }
}

impl Settings {
    /// Default config file location.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("agent-hud").join("config.toml"))
    }

    /// Loads settings from `path` or the default location.
    ///
    /// An explicit path must exist. A missing default file yields defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut settings = match path {
            Some(p) => Self::from_file(p)?,
            None => match Self::default_path().filter(|p| p.exists()) {
                Some(p) => Self::from_file(&p)?,
                None => Self::default(),
            },
        };
        settings.apply_env(|key| std::env::var(key).ok());
        settings.validate();
        Ok(settings)
    }

    fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Applies environment overrides through `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(socket) = lookup(SOCKET_ENV).filter(|v| !v.is_empty()) {
            self.socket_path = Some(PathBuf::from(socket));
        }
        if let Some(dir) = lookup(STATE_DIR_ENV).filter(|v| !v.is_empty()) {
            self.state_dir = Some(PathBuf::from(dir));
        }
    }

    /// Clamps intervals so a zero in the config file cannot spin the CPU.
    pub fn validate(&mut self) {
        const MIN_INTERVAL_MS: u64 = 50;

        self.poll_interval_ms = self.poll_interval_ms.max(MIN_INTERVAL_MS);
        self.cleanup_interval_ms = self.cleanup_interval_ms.max(MIN_INTERVAL_MS);
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_millis(self.cleanup_interval_ms)
    }

    pub fn notification_policy(&self) -> NotificationPolicy {
        NotificationPolicy {
            cooldown: secs(self.notification_cooldown_secs),
            reminder: secs(self.reminder_interval_secs),
        }
    }

    /// Resolves every file location the daemon uses.
    pub fn paths(&self) -> HudPaths {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("/tmp"));
        let state_dir = self
            .state_dir
            .clone()
            .unwrap_or_else(|| home.join(".claude-hud"));
        let debug_log_dir = self
            .debug_log_dir
            .clone()
            .unwrap_or_else(|| home.join(".claude").join("debug"));
        let mut paths = HudPaths::in_dir(state_dir, debug_log_dir);
        if let Some(socket) = &self.socket_path {
            paths.socket = socket.clone();
        }
        paths
    }
}

fn secs(value: u64) -> chrono::Duration {
    chrono::Duration::seconds(i64::try_from(value).unwrap_or(i64::MAX / 1000))
}

/// Every file the daemon reads or writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HudPaths {
    pub state_dir: PathBuf,
    pub socket: PathBuf,
    pub state_file: PathBuf,
    pub session_map_file: PathBuf,
    pub windows_file: PathBuf,
    pub pid_file: PathBuf,
    pub log_file: PathBuf,
    pub debug_log_dir: PathBuf,
}

impl HudPaths {
    /// Standard layout under `state_dir`.
    pub fn in_dir(state_dir: impl Into<PathBuf>, debug_log_dir: impl Into<PathBuf>) -> Self {
        let state_dir = state_dir.into();
        Self {
            socket: state_dir.join("daemon.sock"),
            state_file: state_dir.join("state.json"),
            session_map_file: state_dir.join("session-map.json"),
            windows_file: state_dir.join("windows.json"),
            pid_file: state_dir.join("hudd.pid"),
            log_file: state_dir.join("hudd.log"),
            debug_log_dir: debug_log_dir.into(),
            state_dir,
        }
    }
}
