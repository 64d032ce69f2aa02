//! Logging setup and configuration

use std::fs::{self, OpenOptions};
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Setup tracing subscriber for the application
pub fn setup_logging(default_level: &str) -> crate::Result<()> {
    setup_logging_with_file(default_level, None)
}

/// Setup tracing with an additional plain-text layer appending to `log_file`
///
/// `RUST_LOG` takes precedence over `default_level` when set.
pub fn setup_logging_with_file(default_level: &str, log_file: Option<&Path>) -> crate::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| crate::Error::Config(format!("Invalid log filter: {}", e)))?;

    let file_layer = match log_file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_thread_names(true)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(file_layer)
        .try_init()
        .map_err(|e| crate::Error::Config(format!("Logging already initialized: {}", e)))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_filter_rejected() {
        // Only meaningful when RUST_LOG is not set for the test run
        if std::env::var_os("RUST_LOG").is_some() {
            return;
        }
        let result = setup_logging("info,[=");
        assert!(matches!(result, Err(crate::Error::Config(_))));
    }

    #[test]
    fn test_file_layer_creates_and_appends() {
        if std::env::var_os("RUST_LOG").is_some() {
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("aurora.log");

        // The global subscriber can only be installed once per process
        if setup_logging_with_file("info", Some(&path)).is_err() {
            return;
        }
        tracing::warn!("written to the log file");

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("written to the log file"));
        assert!(!content.contains("\x1b["));
    }
}
