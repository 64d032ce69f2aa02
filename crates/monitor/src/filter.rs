//! Authorization filter
//!
//! Splits a parsed device listing into the serials that accepted this host's
//! ADB key and the ones still waiting for the user. Devices in any other
//! state (offline, recovery, sideload, missing udev permissions) are left
//! out of both sets; they will be picked up by a later cycle once they
//! settle into one of the two.

use protocol::{DeviceEntry, DeviceState};
use std::collections::BTreeSet;

/// Result of classifying one listing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classification {
    pub authorized_ids: BTreeSet<String>,
    pub unauthorized_ids: BTreeSet<String>,
}

/// Stateless classifier over `adb devices` entries
pub struct AuthorizationFilter;

impl AuthorizationFilter {
    pub fn classify(entries: &[DeviceEntry]) -> Classification {
        let mut classification = Classification::default();

        for entry in entries {
            match entry.state {
                DeviceState::Authorized => {
                    classification
                        .authorized_ids
                        .insert(entry.serial_no.clone());
                }
                DeviceState::Unauthorized => {
                    classification
                        .unauthorized_ids
                        .insert(entry.serial_no.clone());
                }
                DeviceState::Other(_) => {}
            }
        }

        classification
    }
}
