//! Unauthorized-device long poll
//!
//! Accepting the host key on the handset produces no bus event, so while any
//! device is listed as unauthorized a background loop keeps re-running the
//! reconcile cycle until the unauthorized set drains. Only one loop runs at
//! a time; starting it again while it is active is a no-op.

use crate::cycle::Reconciler;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Handle to the single long-poll loop
#[derive(Clone)]
pub struct UnauthorizedPoller {
    reconciler: Arc<Reconciler>,
    interval: Duration,
    active: Arc<AtomicBool>,
    stopped: Arc<AtomicBool>,
}

/// Holds the active flag for one loop; clears it at most once, at the
/// latest when the loop exits (including by panic)
struct ActiveFlag {
    active: Arc<AtomicBool>,
    held: bool,
}

impl ActiveFlag {
    fn new(active: Arc<AtomicBool>) -> Self {
        Self { active, held: true }
    }

    fn release(&mut self) {
        if self.held {
            self.held = false;
            self.active.store(false, Ordering::Release);
        }
    }
}

impl Drop for ActiveFlag {
    fn drop(&mut self) {
        self.release();
    }
}

impl UnauthorizedPoller {
    pub fn new(reconciler: Arc<Reconciler>, interval: Duration) -> Self {
        Self {
            reconciler,
            interval,
            active: Arc::new(AtomicBool::new(false)),
            stopped: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Whether a poll loop is currently running
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Start the poll loop if `unauthorized_ids` is non-empty and no loop is
    /// running
    ///
    /// Returns true when this call started a new loop.
    pub fn check(&self, unauthorized_ids: &BTreeSet<String>) -> bool {
        if unauthorized_ids.is_empty() || self.stopped.load(Ordering::Acquire) {
            return false;
        }

        if self
            .active
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("Unauthorized poll already running");
            return false;
        }

        let mut flag = ActiveFlag::new(self.active.clone());
        let reconciler = self.reconciler.clone();
        let stopped = self.stopped.clone();
        let interval = self.interval;

        info!(
            "Waiting for authorization on {:?}, polling every {:?}",
            unauthorized_ids, interval
        );

        let spawned = thread::Builder::new()
            .name("unauthorized-poller".to_string())
            .spawn(move || {
                poll_until_authorized(&reconciler, interval, &stopped, &mut flag);
            });

        match spawned {
            Ok(_) => true,
            Err(e) => {
                error!("Failed to spawn unauthorized poller: {}", e);
                false
            }
        }
    }

    /// Stop the loop at its next wake-up and refuse new starts
    pub fn shutdown(&self) {
        self.stopped.store(true, Ordering::Release);
    }
}

fn poll_until_authorized(
    reconciler: &Reconciler,
    interval: Duration,
    stopped: &AtomicBool,
    flag: &mut ActiveFlag,
) {
    loop {
        thread::sleep(interval);
        if stopped.load(Ordering::Acquire) {
            debug!("Unauthorized poll stopped");
            return;
        }

        // The flag is cleared before the cycle lock is released, so a
        // watcher cycle that finds a new unauthorized device afterwards can
        // always start a fresh loop.
        let result = reconciler.run_cycle_then(|report| {
            if report.unauthorized_ids.is_empty() {
                flag.release();
            }
        });

        match result {
            Ok(report) if report.unauthorized_ids.is_empty() => {
                info!("No unauthorized devices left");
                return;
            }
            Ok(report) => {
                debug!("Still unauthorized: {:?}", report.unauthorized_ids);
            }
            Err(e) => {
                warn!("Enumeration cycle abandoned during poll: {}", e);
            }
        }
    }
}
