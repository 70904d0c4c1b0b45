//! HUD daemon - tracks agent sessions and flags the ones waiting on you.
//!
//! Thin wrapper so `cargo install agent-hud` ships the daemon binary.

fn main() -> anyhow::Result<()> {
    hudd::cli::run()
}
