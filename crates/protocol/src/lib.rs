//! Protocol library for aurora
//!
//! This crate defines the device record shared by every aurora crate and the
//! parsers for the line-oriented text that `adb` prints: the device listing,
//! the IMEI parcel returned by `service call iphonesubinfo`, the `wm size`
//! report and uiautomator hierarchy dumps.
//!
//! # Example
//!
//! ```
//! use protocol::{DeviceState, parse_device_list};
//!
//! let output = "List of devices attached\nR58M123ABC\tdevice\nZY22\tunauthorized\n";
//! let entries = parse_device_list(output);
//!
//! assert_eq!(entries.len(), 2);
//! assert_eq!(entries[0].serial_no, "R58M123ABC");
//! assert_eq!(entries[1].state, DeviceState::Unauthorized);
//! ```

pub mod error;
pub mod parse;
pub mod types;

pub use error::{ParseError, Result};
pub use parse::{parse_device_list, parse_imei_parcel, parse_screen_size, parse_ui_nodes};
pub use types::{Attribute, Bounds, Device, DeviceEntry, DeviceState, ScreenSize, UiNode};
