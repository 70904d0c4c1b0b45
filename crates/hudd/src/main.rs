//! HUD daemon - tracks agent sessions and flags the ones waiting on you.
//!
//! See [`hudd::cli`] for usage.

fn main() -> anyhow::Result<()> {
    hudd::cli::run()
}
