use anyhow::Context;
use std::path::Path;
use std::sync::Mutex;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Environment variable for overriding which log messages are written
const LOG_ENV_VAR: &str = "SNAKEVIRUS_LOG";

/// Send log messages to the file at `path`, appending to it if it already
/// exists.  The terminal belongs to the game, so logs never go anywhere else.
pub(crate) fn init(path: &Path) -> anyhow::Result<()> {
    let file = fs_err::File::options()
        .append(true)
        .create(true)
        .open(path)
        .context("failed to open log file")?;
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .with_env_var(LOG_ENV_VAR)
        .from_env_lossy();
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .try_init()
        .map_err(anyhow::Error::msg)
        .context("failed to install logger")
}
