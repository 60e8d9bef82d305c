use quay_core::paths::AppDir;
use std::path::PathBuf;

const LOG_FILE_NAME: &str = "quay.log";

pub const DEFAULT_LOG_LEVEL: &str = "warn";

fn log_file_with(env: impl Fn(&str) -> Option<String>) -> PathBuf {
    AppDir::Cache.path_with(env).join(LOG_FILE_NAME)
}

/// Start file logging. `surface` names what this invocation drives (the TUI or a
/// subcommand) so interleaved runs can be told apart in the shared log.
pub fn setup_logging(level: log::LevelFilter, surface: &str) -> anyhow::Result<()> {
    let log_file = log_file_with(|var| std::env::var(var).ok());
    if let Some(parent) = log_file.parent() {
        std::fs::create_dir_all(parent)?;
    }
    // Rotate at 10 MB, keeping 10 files
    simple_log::file(log_file.to_string_lossy().into_owned(), level, 10, 10)
        .map_err(|e| anyhow::anyhow!(e))?;
    log::info!(
        "quay {} [{surface}] pid {} started at level {level}; sessions in {}",
        env!("CARGO_PKG_VERSION"),
        std::process::id(),
        AppDir::State.path().display()
    );
    Ok(())
}
