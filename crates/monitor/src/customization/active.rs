//! Serials with a job in flight

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

/// Set of serials with a live worker
///
/// Membership is held by an [`ActiveJob`] guard: the serial is inserted by
/// [`ActiveJobRegistry::try_begin`] and removed when the guard drops, so a
/// worker that fails or panics still releases its device.
#[derive(Debug, Default)]
pub struct ActiveJobRegistry {
    serials: Mutex<HashSet<String>>,
}

impl ActiveJobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `serial_no`, or `None` if a job for it is already running
    pub fn try_begin(self: &Arc<Self>, serial_no: &str) -> Option<ActiveJob> {
        let mut serials = self.serials.lock().unwrap_or_else(|e| e.into_inner());
        if !serials.insert(serial_no.to_string()) {
            return None;
        }
        Some(ActiveJob {
            registry: self.clone(),
            serial_no: serial_no.to_string(),
        })
    }

    pub fn contains(&self, serial_no: &str) -> bool {
        self.serials
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(serial_no)
    }

    pub fn len(&self) -> usize {
        self.serials.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sorted snapshot of the active serials
    pub fn active_serials(&self) -> Vec<String> {
        let mut serials: Vec<String> = self
            .serials
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .cloned()
            .collect();
        serials.sort();
        serials
    }

    fn release(&self, serial_no: &str) {
        self.serials
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(serial_no);
    }
}

/// Membership of one serial in the [`ActiveJobRegistry`]
#[derive(Debug)]
pub struct ActiveJob {
    registry: Arc<ActiveJobRegistry>,
    serial_no: String,
}

impl ActiveJob {
    pub fn serial_no(&self) -> &str {
        &self.serial_no
    }
}

impl Drop for ActiveJob {
    fn drop(&mut self) {
        self.registry.release(&self.serial_no);
    }
}
