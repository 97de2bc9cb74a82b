//! Tracing initialization.
//!
//! The `RUST_LOG` environment variable wins when set; otherwise the
//! caller's default level applies. Initialization is idempotent so the
//! binary, tests, and embedding hosts can all call it without coordinating
//! who goes first.

use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber.
///
/// A subscriber that is already installed counts as success; anything else
/// that keeps the subscriber from starting is reported as an error.
pub fn init_tracing(default_level: &str) -> Result<(), String> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    let result = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();

    match result {
        Ok(()) => Ok(()),
        Err(e) if e.to_string().contains("already been set") => Ok(()),
        Err(e) => Err(format!("Failed to initialize tracing: {e}")),
    }
}
