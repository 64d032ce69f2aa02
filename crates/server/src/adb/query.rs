//! Device listing and attribute queries

use super::Adb;
use monitor::{DeviceQuery, QueryError};
use protocol::{Attribute, parse_imei_parcel};

/// [`DeviceQuery`] backed by `adb`
pub struct AdbQuery {
    adb: Adb,
}

impl AdbQuery {
    pub fn new(adb: Adb) -> Self {
        Self { adb }
    }
}

impl DeviceQuery for AdbQuery {
    fn list_devices(&self) -> Result<String, QueryError> {
        self.adb.query(&["devices"])
    }

    fn query_attribute(&self, serial_no: &str, attribute: Attribute) -> Result<String, QueryError> {
        match attribute.property() {
            Some(key) => self
                .adb
                .query(&["-s", serial_no, "shell", "getprop", key])
                .map(|value| value.trim().to_string()),
            None => {
                let parcel =
                    self.adb
                        .query(&["-s", serial_no, "shell", "service", "call", "iphonesubinfo", "1"])?;
                parse_imei_parcel(&parcel)
                    .ok_or_else(|| QueryError::Empty(format!("imei of {}", serial_no)))
            }
        }
    }
}
