//! Device and UI type definitions
//!
//! This module defines the immutable device record, the per-line entries of
//! the `adb devices` listing, and the small geometry types used when driving
//! the on-screen UI.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// A device under customization
///
/// Identity is the serial number alone: two records with the same
/// `serial_no` compare equal even when their attributes differ, so a device
/// whose IMEI query failed once is still the same device on the next cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Device {
    /// ADB serial number, stable per physical unit
    pub serial_no: String,
    /// IMEI (if the query succeeded)
    pub imei: Option<String>,
    /// Android release string, e.g. "13"
    pub android_version: Option<String>,
    /// Market model name, e.g. "SM-G991B"
    pub model_name: Option<String>,
}

impl Device {
    /// Create a device record with no attributes
    pub fn new(serial_no: impl Into<String>) -> Self {
        Self {
            serial_no: serial_no.into(),
            imei: None,
            android_version: None,
            model_name: None,
        }
    }

    /// Set the IMEI
    pub fn with_imei(mut self, imei: impl Into<String>) -> Self {
        self.imei = Some(imei.into());
        self
    }

    /// Set the Android version
    pub fn with_android_version(mut self, version: impl Into<String>) -> Self {
        self.android_version = Some(version.into());
        self
    }

    /// Set the model name
    pub fn with_model_name(mut self, model: impl Into<String>) -> Self {
        self.model_name = Some(model.into());
        self
    }
}

impl PartialEq for Device {
    fn eq(&self, other: &Self) -> bool {
        self.serial_no == other.serial_no
    }
}

impl Eq for Device {}

impl Hash for Device {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.serial_no.hash(state);
    }
}

impl PartialOrd for Device {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Device {
    fn cmp(&self, other: &Self) -> Ordering {
        self.serial_no.cmp(&other.serial_no)
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}, imei {})",
            self.serial_no,
            self.model_name.as_deref().unwrap_or("unknown model"),
            self.imei.as_deref().unwrap_or("unknown")
        )
    }
}

/// Host-side state of a listed device
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DeviceState {
    /// The device accepted this host's ADB key (`device`)
    Authorized,
    /// The device is waiting for the user to accept the ADB key
    Unauthorized,
    /// Any other state (`offline`, `recovery`, `no permissions`, ...)
    Other(String),
}

impl DeviceState {
    /// Map an `adb devices` state keyword
    pub fn from_keyword(keyword: &str) -> Self {
        match keyword {
            "device" | "authorized" => DeviceState::Authorized,
            "unauthorized" => DeviceState::Unauthorized,
            other => DeviceState::Other(other.to_string()),
        }
    }
}

/// One data line of the `adb devices` listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceEntry {
    /// Serial number column
    pub serial_no: String,
    /// State column
    pub state: DeviceState,
}

/// Per-device attribute queried through `adb shell`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Attribute {
    Imei,
    AndroidVersion,
    ModelName,
}

impl Attribute {
    /// All attributes, in the order they are queried
    pub const ALL: [Attribute; 3] = [
        Attribute::Imei,
        Attribute::AndroidVersion,
        Attribute::ModelName,
    ];

    /// The `getprop` key for this attribute, if it is a system property
    pub fn property(&self) -> Option<&'static str> {
        match self {
            Attribute::Imei => None,
            Attribute::AndroidVersion => Some("ro.build.version.release"),
            Attribute::ModelName => Some("ro.product.model"),
        }
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Attribute::Imei => "imei",
            Attribute::AndroidVersion => "android_version",
            Attribute::ModelName => "model_name",
        };
        f.write_str(name)
    }
}

/// Display dimensions in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenSize {
    pub width: u32,
    pub height: u32,
}

/// On-screen rectangle `[left,top][right,bottom]`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Bounds {
    /// Centre point, where a tap lands
    pub fn center(&self) -> (i32, i32) {
        ((self.left + self.right) / 2, (self.top + self.bottom) / 2)
    }

    /// Whether the rectangle has a visible area
    pub fn is_visible(&self) -> bool {
        self.right > self.left && self.bottom > self.top
    }
}

/// A node of a uiautomator hierarchy dump
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UiNode {
    /// Text shown by the node (unescaped)
    pub text: String,
    /// Accessibility description (unescaped)
    pub content_desc: String,
    /// Whether the node is marked scrollable
    pub scrollable: bool,
    /// Screen rectangle
    pub bounds: Bounds,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_device_identity_is_serial_only() {
        let a = Device::new("R58M").with_imei("3545").with_model_name("SM-G991B");
        let b = Device::new("R58M");
        assert_eq!(a, b);

        let mut set = HashSet::new();
        set.insert(a);
        assert!(!set.insert(b));
    }

    #[test]
    fn test_device_state_keywords() {
        assert_eq!(DeviceState::from_keyword("device"), DeviceState::Authorized);
        assert_eq!(
            DeviceState::from_keyword("unauthorized"),
            DeviceState::Unauthorized
        );
        assert_eq!(
            DeviceState::from_keyword("offline"),
            DeviceState::Other("offline".to_string())
        );
    }

    #[test]
    fn test_bounds_center() {
        let bounds = Bounds {
            left: 0,
            top: 100,
            right: 200,
            bottom: 300,
        };
        assert_eq!(bounds.center(), (100, 200));
        assert!(bounds.is_visible());
    }
}
