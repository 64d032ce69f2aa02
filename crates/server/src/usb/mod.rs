//! USB bus events
//!
//! libusb hotplug callbacks run on a dedicated thread and only wake the
//! watcher; they never inspect the device further. On platforms without
//! hotplug support the same thread emits periodic rescan requests instead.

mod filter;
mod hotplug;

pub use filter::{DeviceFilter, parse_filters};
pub use hotplug::{UsbHotplugSource, list_usb_devices};
