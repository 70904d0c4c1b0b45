//! Command-line front end for `hudd`.
//!
//! # Usage
//!
//! ```bash
//! # Start the daemon (foreground)
//! hudd start
//!
//! # Start the daemon (background/daemonized)
//! hudd start -d
//!
//! # Stop the daemon
//! hudd stop
//!
//! # Check daemon status
//! hudd status
//!
//! # Print tracked sessions grouped by window
//! hudd sessions
//!
//! # List named windows
//! hudd windows
//!
//! # Custom socket and debug logging
//! HUD_SOCKET=/run/hud.sock RUST_LOG=hudd=debug hudd start
//! ```
//!
//! # Signal Handling
//!
//! - SIGTERM/SIGINT: graceful shutdown (documents are flushed, the socket
//!   file is removed)

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use hud_core::StatusSummary;
use hud_term::{DesktopNotifier, LogNotifier, Notifier, TmuxTerminal};

use crate::config::{HudPaths, Settings};
use crate::store::read_sessions;
use crate::windows::WindowRegistry;

/// Log directives used when `RUST_LOG` is unset or empty.
const DEFAULT_LOG_DIRECTIVES: &str = "hudd=info,hud_core=info,hud_protocol=info,hud_term=info";

/// Agent HUD daemon - tracks agent sessions and flags the ones waiting on you
#[derive(Parser, Debug)]
#[command(name = "hudd", version, about)]
struct Args {
    /// Config file (default: <config dir>/agent-hud/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the daemon
    Start {
        /// Run as a background daemon (fork to background)
        #[arg(short = 'd', long)]
        daemon: bool,
    },
    /// Stop the running daemon
    Stop,
    /// Show daemon status
    Status,
    /// Print tracked sessions grouped by window
    Sessions {
        /// Only show this window
        #[arg(short, long)]
        window: Option<String>,
    },
    /// List named windows
    Windows,
}

// ============================================================================
// PID File
// ============================================================================

/// Reads the PID from the PID file, if it exists.
fn read_pid(pid_file: &Path) -> Option<u32> {
    let mut file = File::open(pid_file).ok()?;
    let mut contents = String::new();
    file.read_to_string(&mut contents).ok()?;
    contents.trim().parse().ok()
}

fn write_pid(pid_file: &Path) -> Result<()> {
    if let Some(parent) = pid_file.parent() {
        fs::create_dir_all(parent).context("Failed to create state directory")?;
    }
    let mut file = File::create(pid_file).context("Failed to create PID file")?;
    write!(file, "{}", process::id()).context("Failed to write PID")?;
    Ok(())
}

fn remove_pid_file(pid_file: &Path) {
    let _ = fs::remove_file(pid_file);
}

/// Checks if a process with the given PID is running.
fn is_process_running(pid: u32) -> bool {
    // Signal 0 only checks for existence and permission.
    let Ok(pid) = i32::try_from(pid) else {
        return false;
    };
    unsafe { libc::kill(pid, 0) == 0 }
}

/// PID of the running daemon. A stale PID file is removed.
fn is_daemon_running(pid_file: &Path) -> Option<u32> {
    if let Some(pid) = read_pid(pid_file) {
        if is_process_running(pid) {
            return Some(pid);
        }
        remove_pid_file(pid_file);
    }
    None
}

fn stop_daemon(pid: u32) -> Result<()> {
    let target = i32::try_from(pid).context("PID out of range")?;
    let result = unsafe { libc::kill(target, libc::SIGTERM) };
    if result != 0 {
        bail!("Failed to send SIGTERM to process {pid}");
    }
    Ok(())
}

// ============================================================================
// Entry Point
// ============================================================================

/// Parses arguments and runs the selected command.
pub fn run() -> Result<()> {
    let args = Args::parse();

    let settings = Settings::load(args.config.as_deref()).context("Failed to load settings")?;
    let paths = settings.paths();

    let command = args.command.unwrap_or(Command::Start { daemon: false });

    match command {
        Command::Start { daemon } => {
            if let Some(pid) = is_daemon_running(&paths.pid_file) {
                eprintln!("Daemon is already running (PID {pid})");
                eprintln!("Use 'hudd stop' to stop it first.");
                process::exit(1);
            }

            if daemon {
                // Must happen before the tokio runtime starts.
                daemonize(&paths.log_file)?;
            }

            write_pid(&paths.pid_file)?;
            let result = run_daemon(&settings, &paths);
            remove_pid_file(&paths.pid_file);

            result
        }
        Command::Stop => {
            let Some(pid) = is_daemon_running(&paths.pid_file) else {
                println!("Daemon is not running.");
                return Ok(());
            };

            println!("Stopping daemon (PID {pid})...");
            stop_daemon(pid)?;

            for _ in 0..50 {
                if !is_process_running(pid) {
                    println!("Daemon stopped.");
                    return Ok(());
                }
                std::thread::sleep(std::time::Duration::from_millis(100));
            }

            eprintln!("Daemon did not stop within 5 seconds.");
            process::exit(1);
        }
        Command::Status => {
            let Some(pid) = is_daemon_running(&paths.pid_file) else {
                println!("Daemon is not running.");
                process::exit(1);
            };

            println!("Daemon is running (PID {pid})");
            if paths.socket.exists() {
                println!("Socket: {}", paths.socket.display());
            }
            println!("State: {}", paths.state_dir.display());
            Ok(())
        }
        Command::Sessions { window } => {
            let sessions = read_sessions(&paths.state_file);
            let summary = StatusSummary::from_sessions(&sessions);
            println!("{}", summary.format(window.as_deref()));
            Ok(())
        }
        Command::Windows => {
            let registry = WindowRegistry::load(&paths.windows_file);
            println!("{}", format_windows(&registry));
            Ok(())
        }
    }
}

fn format_windows(registry: &WindowRegistry) -> String {
    let windows = registry.all_windows();
    if windows.is_empty() {
        return "No named windows.".to_string();
    }

    let mut out = format!("Named windows: {}\n", windows.len());
    for window in &windows {
        out.push_str(&format!(
            "  {} ({}, sessions: {})\n",
            window.name, window.window_id, window.session_count
        ));
    }
    if let Some(last) = registry.last_used_window() {
        out.push_str(&format!("Last used: {}", last.name));
    }
    out.trim_end().to_string()
}

fn daemonize(log_path: &Path) -> Result<()> {
    use daemonize::Daemonize;

    if let Some(parent) = log_path.parent() {
        fs::create_dir_all(parent).context("Failed to create log directory")?;
    }

    let stdout = File::create(log_path).context("Failed to create log file for stdout")?;
    let stderr = stdout
        .try_clone()
        .context("Failed to create log file for stderr")?;

    Daemonize::new()
        .working_directory("/")
        .stdout(stdout)
        .stderr(stderr)
        .start()
        .context("Failed to daemonize")?;

    Ok(())
}

/// `RUST_LOG` replaces the defaults entirely when set.
fn log_filter(rust_log: Option<&str>) -> EnvFilter {
    match rust_log.filter(|directives| !directives.trim().is_empty()) {
        Some(directives) => EnvFilter::new(directives),
        None => EnvFilter::new(DEFAULT_LOG_DIRECTIVES),
    }
}

#[tokio::main]
async fn run_daemon(settings: &Settings, paths: &HudPaths) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(
            std::env::var(EnvFilter::DEFAULT_ENV).ok().as_deref(),
        ))
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        pid = process::id(),
        state_dir = %paths.state_dir.display(),
        "HUD daemon starting"
    );

    let cancel_token = CancellationToken::new();

    let shutdown_token = cancel_token.clone();
    tokio::spawn(async move {
        if let Err(e) = wait_for_shutdown_signal().await {
            error!(error = %e, "Error waiting for shutdown signal");
        }
        info!("Shutdown signal received");
        shutdown_token.cancel();
    });

    let notifier: Arc<dyn Notifier> = if settings.notifications {
        Arc::new(DesktopNotifier::new())
    } else {
        Arc::new(LogNotifier)
    };

    if let Err(e) = crate::daemon::run(
        settings,
        paths,
        Arc::new(TmuxTerminal::default()),
        notifier,
        cancel_token,
    )
    .await
    {
        error!(error = %e, "Daemon error");
        return Err(e.into());
    }

    Ok(())
}

/// Waits for SIGTERM or SIGINT.
async fn wait_for_shutdown_signal() -> Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    tokio::select! {
        _ = sigterm.recv() => {
            info!("Received SIGTERM");
        }
        _ = sigint.recv() => {
            info!("Received SIGINT");
        }
    }

    Ok(())
}
