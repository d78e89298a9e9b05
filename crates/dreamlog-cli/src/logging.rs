//! Logging setup
//!
//! Logs go to the configured log file, or to stderr when none is set. The
//! level comes from the config; `DREAMLOG_LOG` overrides it with a full
//! filter directive.

use std::fs::OpenOptions;

use tracing::debug;
use tracing_subscriber::EnvFilter;

use dreamlog_core::Config;

pub fn init(config: &Config) {
    let filter = EnvFilter::try_from_env("DREAMLOG_LOG").unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "dreamlog_core={level},dreamlog_cli={level}",
            level = config.log_level
        ))
    });

    let Some(log_path) = config.log_file.as_ref() else {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .try_init();
        return;
    };

    let log_file = match OpenOptions::new().create(true).append(true).open(log_path) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Warning: Could not open log file {:?}: {}", log_path, e);
            return;
        }
    };

    // Ignore error if already initialized
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(false)
        .with_writer(log_file)
        .try_init();

    debug!("logging to {:?}", log_path);
}
