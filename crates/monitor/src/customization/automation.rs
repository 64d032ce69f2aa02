//! UI automation seam
//!
//! The worker drives the handset through these primitives only. The real
//! implementation shells out to `adb`; tests use a scripted fake.

use protocol::{Attribute, Device};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// How a label on screen is compared against the wanted text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    Exact,
    #[default]
    Contains,
    StartsWith,
}

impl MatchMode {
    pub fn matches(&self, candidate: &str, wanted: &str) -> bool {
        match self {
            MatchMode::Exact => candidate == wanted,
            MatchMode::Contains => candidate.contains(wanted),
            MatchMode::StartsWith => candidate.starts_with(wanted),
        }
    }
}

/// Failure of an automation primitive
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AutomationError {
    /// The wanted element is not on screen
    #[error("element not found: {0}")]
    ElementNotFound(String),

    /// The device stopped answering (unplugged, adbd restarted, ...)
    #[error("transport error: {0}")]
    Transport(String),

    /// The device record lacks an attribute the workflow needs
    #[error("device has no {0}")]
    MissingAttribute(Attribute),

    #[error("{0}")]
    Other(String),
}

impl AutomationError {
    /// Whether this is an ordinary outcome on a production line rather than
    /// a defect
    pub fn is_expected(&self) -> bool {
        !matches!(self, AutomationError::Other(_))
    }
}

pub type AutomationResult<T> = std::result::Result<T, AutomationError>;

/// Primitives for driving one device's UI
pub trait Automator: Send {
    /// Wake the screen and dismiss the keyguard
    fn unlock(&self) -> AutomationResult<()>;

    /// Fallback unlock gesture, used once when [`Automator::unlock`] fails
    fn swipe_unlock(&self) -> AutomationResult<()>;

    /// Open the dialer with `code` entered
    fn dial(&self, code: &str) -> AutomationResult<()>;

    /// Tap the first element whose text matches
    fn tap_by_text(&self, text: &str, mode: MatchMode) -> AutomationResult<()>;

    /// Scroll until an element whose text matches is visible
    ///
    /// Gives up with [`AutomationError::ElementNotFound`] after
    /// `max_attempts` scroll gestures.
    fn scroll_to_text(&self, text: &str, mode: MatchMode, max_attempts: u32)
    -> AutomationResult<()>;
}

/// Opens an [`Automator`] session for a device
pub trait AutomatorFactory: Send + Sync {
    fn connect(&self, device: &Device) -> AutomationResult<Box<dyn Automator>>;
}
