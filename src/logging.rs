//! Tracing subscriber setup
//!
//! The terminal UI owns stdout/stderr while it runs, so the monitor logs to a
//! file. The other subcommands log to stderr.

use crate::error::AppResult;
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::{EnvFilter, fmt};

fn env_filter() -> EnvFilter {
    let mut filter = EnvFilter::from_default_env();
    if std::env::var_os(EnvFilter::DEFAULT_ENV).is_none()
        && let Ok(d) = "quietward=info".parse()
    {
        filter = filter.add_directive(d);
    }
    filter
}

/// Log to stderr
pub fn init_stderr() {
    let _ = fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr)
        .try_init();
}

/// Append logs to `path`, creating its directory if needed
pub fn init_file(path: &Path) -> AppResult<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let _ = fmt()
        .with_env_filter(env_filter())
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .try_init();
    Ok(())
}
