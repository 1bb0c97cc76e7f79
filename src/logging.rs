use std::fs;
use std::path::PathBuf;
use anyhow::{Result, anyhow};
use tracing_subscriber::EnvFilter;

const LOG_FILE: &str = "topic-chat.log";

/// `RUST_LOG` wins over the configured filter.
fn env_filter(default_filter: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter))
}

/// Log to a file while the terminal belongs to the UI. Returns the file path.
pub fn init_file(dir: PathBuf, default_filter: &str) -> Result<PathBuf> {
    fs::create_dir_all(&dir)?;
    let appender = tracing_appender::rolling::never(&dir, LOG_FILE);

    tracing_subscriber::fmt()
        .with_env_filter(env_filter(default_filter))
        .with_writer(appender)
        .with_ansi(false)
        .try_init()
        .map_err(|e| anyhow!("Could not initialize logging: {}", e))?;

    Ok(dir.join(LOG_FILE))
}

/// Log to stderr for one-shot commands that leave stdout to their output.
pub fn init_stderr(default_filter: &str) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(default_filter))
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow!("Could not initialize logging: {}", e))
}
