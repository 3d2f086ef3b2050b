use anyhow::{Context, Result, anyhow};
use std::{fs::File, path::Path, sync::Mutex};
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter
pub const LOG_ENV: &str = "DUDRILL_LOG";

/// Installs a file logger when a path is given. The terminal belongs to the
/// UI, so nothing is ever logged to stdout or stderr.
pub fn init(log_file: Option<&Path>) -> Result<()> {
    let Some(path) = log_file else {
        return Ok(());
    };

    let file = File::create(path)
        .with_context(|| format!("cannot create log file {}", path.display()))?;
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_thread_names(true)
        .try_init()
        .map_err(|e| anyhow!("failed to install logger: {e}"))
}
