//! One reconcile cycle: enumerate, diff, notify
//!
//! Both the hotplug watcher and the unauthorized poller drive cycles. They
//! are serialized end to end so that the notifications of two overlapping
//! cycles can never be delivered out of order (e.g. a stale `added` landing
//! after a fresher `removed` for the same device).

use crate::dispatcher::ListenerDispatcher;
use crate::enumerator::DeviceEnumerator;
use crate::error::Result;
use crate::registry::{DeviceRegistry, DeviceSnapshot};
use std::collections::BTreeSet;
use std::sync::Mutex;
use tracing::debug;

/// Outcome of a completed cycle
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub added: usize,
    pub removed: usize,
    pub unauthorized_ids: BTreeSet<String>,
}

/// Enumerator, registry and dispatcher wired into a single step
pub struct Reconciler {
    enumerator: DeviceEnumerator,
    registry: DeviceRegistry,
    dispatcher: ListenerDispatcher,
    cycle: Mutex<()>,
}

impl Reconciler {
    pub fn new(enumerator: DeviceEnumerator, dispatcher: ListenerDispatcher) -> Self {
        Self {
            enumerator,
            registry: DeviceRegistry::new(),
            dispatcher,
            cycle: Mutex::new(()),
        }
    }

    /// Run one cycle
    ///
    /// An integrity error abandons the cycle before the registry is touched;
    /// the next trigger starts over from a fresh listing.
    pub fn run_cycle(&self) -> Result<CycleReport> {
        self.run_cycle_then(|_| {})
    }

    /// Run one cycle, then call `then` with its report before the next
    /// cycle may start
    pub fn run_cycle_then<F>(&self, then: F) -> Result<CycleReport>
    where
        F: FnOnce(&CycleReport),
    {
        let _cycle = self.cycle.lock().unwrap_or_else(|e| e.into_inner());

        let enumeration = self.enumerator.enumerate()?;
        let diff = self
            .registry
            .reconcile(DeviceSnapshot::new(enumeration.authorized));

        for device in &diff.removed {
            self.dispatcher.dispatch_removed(device);
        }
        for device in &diff.added {
            self.dispatcher.dispatch_added(device);
        }

        if !diff.is_empty() {
            debug!(
                "Cycle complete: {} added, {} removed, {} unauthorized",
                diff.added.len(),
                diff.removed.len(),
                enumeration.unauthorized_ids.len()
            );
        }

        let report = CycleReport {
            added: diff.added.len(),
            removed: diff.removed.len(),
            unauthorized_ids: enumeration.unauthorized_ids,
        };
        then(&report);
        Ok(report)
    }

    pub fn registry(&self) -> &DeviceRegistry {
        &self.registry
    }

    pub fn enumerator(&self) -> &DeviceEnumerator {
        &self.enumerator
    }
}
