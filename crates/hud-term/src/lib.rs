//! HUD Term - Terminal-control and notification collaborators
//!
//! The daemon only talks to the outside world through two traits:
//! - [`TerminalControl`] - enumerate sessions, read their variables,
//!   capture their screen, read and set their background
//! - [`Notifier`] - raise a desktop notification
//!
//! Concrete adapters ship alongside: [`TmuxTerminal`], [`DesktopNotifier`]
//! and [`LogNotifier`]. Everything else talks to the traits.
//!
//! # Panic-Free Guarantees
//!
//! No `.unwrap()`, `.expect()`, `panic!()` outside tests. External command
//! failures are returned as errors for the caller to log.

pub mod detect;
pub mod error;
pub mod notify;
pub mod terminal;
pub mod tmux;

pub use detect::{AgentDetector, SCREEN_INDICATORS};
pub use error::{NotifyError, TerminalError};
pub use notify::{DesktopNotifier, LogNotifier, Notifier};
pub use terminal::{TerminalControl, TerminalSession, VAR_COMMAND, VAR_PATH};
pub use tmux::TmuxTerminal;
