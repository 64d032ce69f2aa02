//! Common utilities for aurora
//!
//! This crate provides functionality shared between the monitor core and the
//! server binary: error handling, logging setup, and the channel bridge that
//! carries hotplug events from the USB event thread to the device watcher.

pub mod channel;
pub mod error;
pub mod logging;

pub use channel::{HotplugEvent, HotplugReceiver, HotplugSender, create_hotplug_bridge};
pub use error::{Error, Result};
pub use logging::{setup_logging, setup_logging_with_file};
