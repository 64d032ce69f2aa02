//! Timing constants
//!
//! None of these come from a protocol guarantee. They are empirical tuning
//! values measured against real handsets and hubs, and every one of them can
//! be overridden from the configuration file.

use common::HotplugEvent;
use std::time::Duration;

/// Delay after a bus `add` before enumerating: adbd needs this long to list
/// a freshly attached device.
pub const ADD_SETTLE: Duration = Duration::from_secs(2);

/// Delay after a bus `remove` before enumerating.
pub const REMOVE_SETTLE: Duration = Duration::from_millis(200);

/// Interval between re-enumerations while a device waits for the user to
/// accept the host key. The authorization dialog takes about this long to
/// appear after plugging in.
pub const UNAUTHORIZED_POLL_INTERVAL: Duration = Duration::from_secs(3);

/// Pause between automation steps so screen transitions can finish.
pub const STEP_SETTLE: Duration = Duration::from_secs(1);

/// Upper bound on scroll gestures while looking for the profile label.
pub const MAX_SCROLL_ATTEMPTS: u32 = 10;

/// Watcher and poller delays
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timings {
    pub add_settle: Duration,
    pub remove_settle: Duration,
    pub poll_interval: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            add_settle: ADD_SETTLE,
            remove_settle: REMOVE_SETTLE,
            poll_interval: UNAUTHORIZED_POLL_INTERVAL,
        }
    }
}

impl Timings {
    /// How long to let the bus settle after `event`
    pub fn settle_for(&self, event: HotplugEvent) -> Duration {
        match event {
            HotplugEvent::Added => self.add_settle,
            HotplugEvent::Removed => self.remove_settle,
            HotplugEvent::Rescan => Duration::ZERO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settle_for_event() {
        let timings = Timings::default();
        assert_eq!(timings.settle_for(HotplugEvent::Added), ADD_SETTLE);
        assert_eq!(timings.settle_for(HotplugEvent::Removed), REMOVE_SETTLE);
        assert_eq!(timings.settle_for(HotplugEvent::Rescan), Duration::ZERO);
        assert!(ADD_SETTLE > REMOVE_SETTLE);
    }
}
