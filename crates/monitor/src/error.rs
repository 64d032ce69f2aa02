//! Monitor error types

use crate::customization::JobStatus;
use protocol::Attribute;
use std::any::Any;
use thiserror::Error;

/// Failure reported by an external device-query facility
///
/// `Empty` is the normal "nothing to report" condition (no devices, or a
/// property that is not set) and is never treated as a fault.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum QueryError {
    /// The command produced no output
    #[error("no output from `{0}`")]
    Empty(String),

    /// The command could not be started
    #[error("failed to run `{command}`: {reason}")]
    Spawn { command: String, reason: String },

    /// The command exited unsuccessfully
    #[error("`{command}` exited with {status}: {stderr}")]
    Failed {
        command: String,
        status: String,
        stderr: String,
    },
}

/// Errors raised by the monitor core
#[derive(Debug, Error)]
pub enum MonitorError {
    /// Attribute columns disagree with the serial list; the facility's output
    /// format changed while the cycle was running
    #[error(
        "enumeration integrity violated: {serials} serial(s) but {values} {attribute} value(s)"
    )]
    Integrity {
        attribute: Attribute,
        serials: usize,
        values: usize,
    },

    /// A listener rejected a device notification
    #[error("listener {listener} failed: {reason}")]
    Listener { listener: String, reason: String },

    /// A report could not be persisted
    #[error("report sink error: {0}")]
    Report(String),

    /// A job was moved through its state machine out of order
    #[error("invalid job transition {from} -> {to}")]
    InvalidTransition { from: JobStatus, to: JobStatus },
}

pub type Result<T> = std::result::Result<T, MonitorError>;

/// Best-effort text of a caught panic payload
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
