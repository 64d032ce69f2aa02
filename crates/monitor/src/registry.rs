//! Authorized device registry
//!
//! Holds the last snapshot of authorized devices and diffs every new
//! enumeration against it. Snapshots are immutable; a reconcile swaps the
//! whole snapshot under the lock, so readers never see a half-applied diff.

use protocol::Device;
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};
use tracing::trace;

/// Set of devices considered authorized at one point in time
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceSnapshot {
    devices: BTreeSet<Device>,
}

impl DeviceSnapshot {
    pub fn new(devices: BTreeSet<Device>) -> Self {
        Self { devices }
    }

    pub fn devices(&self) -> &BTreeSet<Device> {
        &self.devices
    }

    pub fn contains(&self, serial_no: &str) -> bool {
        self.devices.iter().any(|d| d.serial_no == serial_no)
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Identity diff `self -> next`
    ///
    /// Added devices carry the attributes from `next`, removed devices the
    /// last attributes seen in `self`.
    pub fn diff(&self, next: &DeviceSnapshot) -> SnapshotDiff {
        SnapshotDiff {
            added: next.devices.difference(&self.devices).cloned().collect(),
            removed: self.devices.difference(&next.devices).cloned().collect(),
        }
    }
}

impl FromIterator<Device> for DeviceSnapshot {
    fn from_iter<I: IntoIterator<Item = Device>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Devices that appeared and disappeared between two snapshots
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnapshotDiff {
    pub added: BTreeSet<Device>,
    pub removed: BTreeSet<Device>,
}

impl SnapshotDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Owner of the current authorized snapshot
#[derive(Debug, Default)]
pub struct DeviceRegistry {
    current: Mutex<Arc<DeviceSnapshot>>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the current snapshot with `next` and return what changed
    pub fn reconcile(&self, next: DeviceSnapshot) -> SnapshotDiff {
        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        let diff = current.diff(&next);
        *current = Arc::new(next);

        trace!(
            added = diff.added.len(),
            removed = diff.removed.len(),
            total = current.len(),
            "Reconciled device snapshot"
        );
        diff
    }

    /// The snapshot applied by the latest reconcile
    pub fn current(&self) -> Arc<DeviceSnapshot> {
        self.current
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}
