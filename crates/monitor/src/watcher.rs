//! Hotplug watcher
//!
//! Runs on its own thread, blocked on the hotplug channel. Each bus event is
//! turned into one reconcile cycle after a settle delay; events that arrive
//! during the delay are coalesced into the same cycle.

use crate::cycle::Reconciler;
use crate::poller::UnauthorizedPoller;
use crate::timing::Timings;
use common::{HotplugEvent, HotplugReceiver};
use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Turns bus events into reconcile cycles
pub struct HotplugWatcher {
    reconciler: Arc<Reconciler>,
    poller: UnauthorizedPoller,
    timings: Timings,
}

impl HotplugWatcher {
    pub fn new(reconciler: Arc<Reconciler>, poller: UnauthorizedPoller, timings: Timings) -> Self {
        Self {
            reconciler,
            poller,
            timings,
        }
    }

    /// Run until every event sender has been dropped
    ///
    /// Devices already attached at start-up are picked up by an initial
    /// cycle before the first event is awaited.
    pub fn run(self, events: HotplugReceiver) {
        info!("Hotplug watcher started");
        self.cycle();

        while let Ok(event) = events.recv_blocking() {
            debug!("Hotplug event: {:?}", event);
            let coalesced = self.settle(event, &events);
            if coalesced > 0 {
                debug!("Coalesced {} queued event(s)", coalesced);
            }
            self.cycle();
        }

        info!("Hotplug subscription closed, watcher stopping");
        self.poller.shutdown();
    }

    /// Sleep the settle delay for `event`, absorbing queued events
    ///
    /// An `Added` drained during a shorter remove settle extends the wait to
    /// the full add settle. Returns the number of absorbed events.
    fn settle(&self, event: HotplugEvent, events: &HotplugReceiver) -> usize {
        let mut required = self.timings.settle_for(event);
        let mut waited = Duration::ZERO;
        let mut absorbed = 0;

        loop {
            if required > waited {
                thread::sleep(required - waited);
                waited = required;
            }

            let queued = events.drain();
            if queued.is_empty() {
                return absorbed;
            }
            absorbed += queued.len();

            required = queued
                .into_iter()
                .map(|e| self.timings.settle_for(e))
                .fold(required, Duration::max);
            if required <= waited {
                return absorbed;
            }
        }
    }

    fn cycle(&self) {
        match self.reconciler.run_cycle() {
            Ok(report) => {
                self.poller.check(&report.unauthorized_ids);
            }
            Err(e) => warn!("Enumeration cycle abandoned: {}", e),
        }
    }
}

/// Start the watcher on a dedicated thread
pub fn spawn_watcher(watcher: HotplugWatcher, events: HotplugReceiver) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("hotplug-watcher".to_string())
        .spawn(move || watcher.run(events))
}
