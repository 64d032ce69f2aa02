//! Protocol error types

use thiserror::Error;

/// Errors raised while parsing `adb` output
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    /// The output was blank after trimming
    #[error("empty output")]
    Empty,

    /// `wm size` output did not contain a `WIDTHxHEIGHT` pair
    #[error("invalid screen size: {0}")]
    InvalidScreenSize(String),

    /// A uiautomator dump did not contain a hierarchy
    #[error("invalid ui hierarchy dump: {0}")]
    InvalidHierarchy(String),

    /// A `bounds` attribute was not of the form `[x1,y1][x2,y2]`
    #[error("invalid bounds: {0}")]
    InvalidBounds(String),
}

/// Type alias for protocol results
pub type Result<T> = std::result::Result<T, ParseError>;
