//! HUD Core - Shared types for agent attention tracking
//!
//! This crate provides the domain types shared between the protocol
//! crate, the terminal adapters and the daemon (hudd):
//! - `state` - the discrete activity state of an agent
//! - `classifier` - pattern-based text → state classification
//! - `session` - tracked terminal sessions and their identifiers
//! - `identity` - external ↔ terminal identity pairs
//! - `color` - project palette and alert background
//! - `summary` - status overview grouped by window
//!
//! All code follows the panic-free policy: no `.unwrap()`, `.expect()`,
//! `panic!()`, `unreachable!()`, `todo!()`, or direct indexing `[i]`.

pub mod classifier;
pub mod color;
pub mod error;
pub mod identity;
pub mod session;
pub mod state;
pub mod summary;

// Re-exports for convenience
pub use classifier::{classify, classify_text, PatternSet, LOG_PATTERNS, SCREEN_PATTERNS};
pub use color::{palette_color, Rgb, ALERT_BACKGROUND, PALETTE_SIZE, PROJECT_PALETTE};
pub use error::{DomainError, DomainResult};
pub use identity::IdentityMapping;
pub use session::{project_name_from_path, ExternalId, TerminalId, TrackedSession};
pub use state::ClaudeState;
pub use summary::{StatusSummary, WindowSummary, UNNAMED_WINDOW};
