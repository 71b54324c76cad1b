//! Log setup for hosts.
//!
//! The runtime logs through [`tracing`]: `debug` for hub and dispatch
//! traffic, `warn` for configuration and transport errors. These helpers
//! install a `tracing-subscriber` formatter filtered by `RUST_LOG`, falling
//! back to the given directive when the variable is unset.

use std::error::Error;
use std::fs::{File, OpenOptions};
use std::io;
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

fn filter(default: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

/// Log to stderr.
///
/// Fails if a global subscriber is already installed.
pub fn init(default: &str) -> Result<(), Box<dyn Error + Send + Sync + 'static>> {
    tracing_subscriber::fmt()
        .with_env_filter(filter(default))
        .with_writer(io::stderr)
        .try_init()
}

/// Log to a file, opened in append mode. Useful when stderr belongs to the
/// host's own output.
///
/// # Example
///
/// ```no_run
/// ding::logging::log_to_file("ding.log", "ding_core=debug").unwrap();
/// ```
pub fn log_to_file(path: impl AsRef<Path>, default: &str) -> io::Result<()> {
    let file: File = OpenOptions::new().create(true).append(true).open(path)?;
    tracing_subscriber::fmt()
        .with_env_filter(filter(default))
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .try_init()
        .map_err(io::Error::other)
}
