//! Device enumeration
//!
//! Turns the listing and attribute facilities into immutable [`Device`]
//! records. The facilities are slow (each call is an `adb` round trip) and
//! flaky, so absence is normal: an empty or failed listing means "no
//! devices", and a failed attribute query leaves only that attribute unset.

use crate::error::{MonitorError, QueryError, Result};
use crate::filter::AuthorizationFilter;
use protocol::{Attribute, Device, DeviceEntry, parse_device_list};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, trace};

/// External facility that lists devices and reads their attributes
pub trait DeviceQuery: Send + Sync {
    /// Raw text of the device listing (`adb devices`)
    fn list_devices(&self) -> std::result::Result<String, QueryError>;

    /// One attribute of one device, trimmed
    fn query_attribute(
        &self,
        serial_no: &str,
        attribute: Attribute,
    ) -> std::result::Result<String, QueryError>;
}

/// Authorized devices and unauthorized serials seen by one listing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Enumeration {
    pub authorized: BTreeSet<Device>,
    pub unauthorized_ids: BTreeSet<String>,
}

/// Builds device records from a [`DeviceQuery`]
#[derive(Clone)]
pub struct DeviceEnumerator {
    query: Arc<dyn DeviceQuery>,
}

impl DeviceEnumerator {
    pub fn new(query: Arc<dyn DeviceQuery>) -> Self {
        Self { query }
    }

    /// Enumerate authorized devices and unauthorized serials from a single
    /// listing
    pub fn enumerate(&self) -> Result<Enumeration> {
        let classification = AuthorizationFilter::classify(&self.listing());
        let authorized = self.describe(&classification.authorized_ids)?;

        debug!(
            authorized = authorized.len(),
            unauthorized = classification.unauthorized_ids.len(),
            "Enumerated devices"
        );

        Ok(Enumeration {
            authorized,
            unauthorized_ids: classification.unauthorized_ids,
        })
    }

    /// Authorized devices with their attributes
    pub fn list_authorized(&self) -> Result<BTreeSet<Device>> {
        let classification = AuthorizationFilter::classify(&self.listing());
        self.describe(&classification.authorized_ids)
    }

    /// Serials waiting for the user to accept the host key
    pub fn list_unauthorized_ids(&self) -> BTreeSet<String> {
        AuthorizationFilter::classify(&self.listing()).unauthorized_ids
    }

    fn listing(&self) -> Vec<DeviceEntry> {
        match self.query.list_devices() {
            Ok(output) => parse_device_list(&output),
            Err(QueryError::Empty(_)) => Vec::new(),
            Err(e) => {
                debug!("Device listing failed, treating as no devices: {}", e);
                Vec::new()
            }
        }
    }

    fn describe(&self, serials: &BTreeSet<String>) -> Result<BTreeSet<Device>> {
        let serials: Vec<&String> = serials.iter().collect();

        let imeis = self.attribute_column(&serials, Attribute::Imei);
        let versions = self.attribute_column(&serials, Attribute::AndroidVersion);
        let models = self.attribute_column(&serials, Attribute::ModelName);

        for (attribute, column) in [
            (Attribute::Imei, &imeis),
            (Attribute::AndroidVersion, &versions),
            (Attribute::ModelName, &models),
        ] {
            if column.len() != serials.len() {
                return Err(MonitorError::Integrity {
                    attribute,
                    serials: serials.len(),
                    values: column.len(),
                });
            }
        }

        let devices = serials
            .into_iter()
            .zip(imeis)
            .zip(versions)
            .zip(models)
            .map(|(((serial_no, imei), android_version), model_name)| Device {
                serial_no: serial_no.clone(),
                imei,
                android_version,
                model_name,
            })
            .collect();

        Ok(devices)
    }

    /// One value per serial, in serial order
    ///
    /// A reply is expected to hold a single line. Every extra line becomes an
    /// extra value, so a reply whose format changed shows up as a column that
    /// no longer lines up with the serial list.
    fn attribute_column(&self, serials: &[&String], attribute: Attribute) -> Vec<Option<String>> {
        let mut column = Vec::with_capacity(serials.len());

        for serial_no in serials {
            match self.query.query_attribute(serial_no, attribute) {
                Ok(reply) => {
                    let values: Vec<String> = reply
                        .lines()
                        .map(str::trim)
                        .filter(|line| !line.is_empty())
                        .map(str::to_string)
                        .collect();
                    if values.is_empty() {
                        column.push(None);
                    } else {
                        column.extend(values.into_iter().map(Some));
                    }
                }
                Err(e) => {
                    trace!(serial_no = %serial_no, %attribute, "Attribute unavailable: {}", e);
                    column.push(None);
                }
            }
        }

        column
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{ScriptedQuery, listing};

    #[test]
    fn test_enumerate_single_listing() {
        let query = Arc::new(ScriptedQuery::new());
        query.push_listing(listing(&["dev1"], &["dev2"]));
        query.set_full_attributes("dev1");

        let enumerator = DeviceEnumerator::new(query.clone());
        let enumeration = enumerator.enumerate().unwrap();

        assert_eq!(enumeration.authorized.len(), 1);
        let dev1 = enumeration.authorized.iter().next().unwrap();
        assert_eq!(dev1.serial_no, "dev1");
        assert!(dev1.imei.is_some());
        assert!(enumeration.unauthorized_ids.contains("dev2"));
        assert_eq!(query.list_calls(), 1);
    }

    #[test]
    fn test_partial_attributes_are_valid() {
        let query = Arc::new(ScriptedQuery::new());
        query.push_listing(listing(&["dev1"], &[]));
        query.set_attribute("dev1", Attribute::ModelName, "SM-A515F");
        query.set_attribute("dev1", Attribute::AndroidVersion, "   ");

        let devices = DeviceEnumerator::new(query).list_authorized().unwrap();
        let dev1 = devices.iter().next().unwrap();

        assert_eq!(dev1.model_name.as_deref(), Some("SM-A515F"));
        assert_eq!(dev1.imei, None);
        assert_eq!(dev1.android_version, None);
    }

    #[test]
    fn test_failed_listing_is_empty() {
        let query = Arc::new(ScriptedQuery::new());
        query.fail_listing(QueryError::Spawn {
            command: "adb devices".to_string(),
            reason: "No such file or directory".to_string(),
        });

        let enumerator = DeviceEnumerator::new(query);
        assert_eq!(enumerator.enumerate().unwrap(), Enumeration::default());
        assert!(enumerator.list_unauthorized_ids().is_empty());
    }

    #[test]
    fn test_multi_line_reply_violates_integrity() {
        let query = Arc::new(ScriptedQuery::new());
        query.push_listing(listing(&["dev1", "dev2"], &[]));
        query.set_attribute("dev1", Attribute::ModelName, "SM-A515F\nSM-G991B");

        let result = DeviceEnumerator::new(query).enumerate();
        assert!(matches!(
            result,
            Err(MonitorError::Integrity {
                attribute: Attribute::ModelName,
                serials: 2,
                values: 3,
            })
        ));
    }

    #[test]
    fn test_trailing_newline_is_one_value() {
        let query = Arc::new(ScriptedQuery::new());
        query.push_listing(listing(&["dev1"], &[]));
        query.set_attribute("dev1", Attribute::AndroidVersion, "13\r\n");

        let devices = DeviceEnumerator::new(query).list_authorized().unwrap();
        let dev1 = devices.iter().next().unwrap();
        assert_eq!(dev1.android_version.as_deref(), Some("13"));
    }

    #[test]
    fn test_no_output_is_empty() {
        let query = Arc::new(ScriptedQuery::new());
        let enumerator = DeviceEnumerator::new(query);
        assert!(enumerator.list_authorized().unwrap().is_empty());
    }
}
