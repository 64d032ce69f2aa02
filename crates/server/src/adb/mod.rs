//! `adb` adapters
//!
//! Everything the monitor needs from a handset goes through the `adb`
//! executable: the device listing, attribute queries, and UI automation.

mod automator;
mod query;

pub use automator::AdbAutomatorFactory;
pub use query::AdbQuery;

use monitor::QueryError;
use std::process::Command;
use tracing::trace;

/// Runs the `adb` executable
#[derive(Debug, Clone)]
pub struct Adb {
    path: String,
}

impl Adb {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    /// Run `adb <args>` and return its stdout, which may be empty
    pub fn run(&self, args: &[&str]) -> Result<String, QueryError> {
        let command = format!("adb {}", args.join(" "));
        trace!("Running {}", command);

        let output = Command::new(&self.path)
            .args(args)
            .output()
            .map_err(|e| QueryError::Spawn {
                command: command.clone(),
                reason: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(QueryError::Failed {
                command,
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Run `adb -s <serial> shell <args>`
    pub fn shell(&self, serial_no: &str, args: &[&str]) -> Result<String, QueryError> {
        let mut full = vec!["-s", serial_no, "shell"];
        full.extend_from_slice(args);
        self.run(&full)
    }

    /// Like [`Adb::run`], but empty output is [`QueryError::Empty`]
    pub fn query(&self, args: &[&str]) -> Result<String, QueryError> {
        let output = self.run(args)?;
        if output.trim().is_empty() {
            return Err(QueryError::Empty(format!("adb {}", args.join(" "))));
        }
        Ok(output)
    }
}
