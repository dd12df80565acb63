//! Logging initialisation via tracing-subscriber.
//!
//! Call [`init`] once at startup, after config is loaded. This crate logs at
//! `app_level`, dependencies at `deps_level`. Output goes to stderr, to a file,
//! to both, or nowhere.

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::LoggingConfig;

/// Filter directive for the configured levels, e.g. `info,jotter=debug`.
pub fn filter_directive(config: &LoggingConfig) -> String {
    format!("{},{}={}", config.deps_level, env!("CARGO_CRATE_NAME"), config.app_level)
}

/// Install the global subscriber. `RUST_LOG`, when set, replaces the
/// configured levels.
pub fn init(config: &LoggingConfig) -> Result<()> {
    let directive = filter_directive(config);
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&directive))
        .with_context(|| format!("invalid log filter '{directive}'"))?;

    let console = config
        .to_console
        .then(|| fmt::layer().with_writer(std::io::stderr));

    let file = match config.file_path.as_deref() {
        Some(path) => Some(
            fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(open_log_file(Path::new(path))?)),
        ),
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file)
        .try_init()
        .context("failed to set tracing subscriber")?;
    Ok(())
}

fn open_log_file(path: &Path) -> Result<std::fs::File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create log directory {}", parent.display()))?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open log file {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directive_scopes_app_level_to_this_crate() {
        let config = LoggingConfig {
            app_level: "trace".into(),
            deps_level: "warn".into(),
            ..Default::default()
        };
        assert_eq!(filter_directive(&config), "warn,jotter=trace");
        assert!(EnvFilter::try_new(filter_directive(&config)).is_ok());
    }

    #[test]
    fn log_file_parents_are_created() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("nested/logs/jotter.log");
        open_log_file(&path).unwrap();
        assert!(path.exists());
    }
}
