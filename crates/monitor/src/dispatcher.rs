//! Listener fan-out
//!
//! Listeners are registered once at startup and called in registration order
//! on the thread that ran the reconcile cycle. A failing or panicking
//! listener is logged and skipped; it never stops the remaining listeners or
//! the watcher loop.

use crate::error::{Result, panic_message};
use protocol::Device;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Observer of authorized-device transitions
pub trait DeviceListener: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// A device became authorized and connected
    fn on_device_added(&self, device: &Device) -> Result<()>;

    /// A previously authorized device disappeared
    fn on_device_removed(&self, device: &Device) -> Result<()>;
}

#[derive(Debug, Clone, Copy)]
enum Transition {
    Added,
    Removed,
}

/// Fixed, ordered collection of listeners
#[derive(Clone, Default)]
pub struct ListenerDispatcher {
    listeners: Vec<Arc<dyn DeviceListener>>,
}

impl ListenerDispatcher {
    pub fn new(listeners: Vec<Arc<dyn DeviceListener>>) -> Self {
        Self { listeners }
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Notify every listener that `device` was added
    ///
    /// Returns the number of listeners that failed.
    pub fn dispatch_added(&self, device: &Device) -> usize {
        self.notify(device, Transition::Added)
    }

    /// Notify every listener that `device` was removed
    ///
    /// Returns the number of listeners that failed.
    pub fn dispatch_removed(&self, device: &Device) -> usize {
        self.notify(device, Transition::Removed)
    }

    fn notify(&self, device: &Device, transition: Transition) -> usize {
        let mut failures = 0;

        for listener in &self.listeners {
            debug!(
                "Sending {:?} {} to listener {}",
                transition,
                device.serial_no,
                listener.name()
            );

            let outcome = catch_unwind(AssertUnwindSafe(|| match transition {
                Transition::Added => listener.on_device_added(device),
                Transition::Removed => listener.on_device_removed(device),
            }));

            match outcome {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    failures += 1;
                    warn!(
                        "Listener {} failed on {:?} {}: {}",
                        listener.name(),
                        transition,
                        device.serial_no,
                        e
                    );
                }
                Err(payload) => {
                    failures += 1;
                    error!(
                        "Listener {} panicked on {:?} {}: {}",
                        listener.name(),
                        transition,
                        device.serial_no,
                        panic_message(payload.as_ref())
                    );
                }
            }
        }

        failures
    }
}

/// Listener that records transitions in the log
pub struct LoggingListener;

impl DeviceListener for LoggingListener {
    fn name(&self) -> &str {
        "logging"
    }

    fn on_device_added(&self, device: &Device) -> Result<()> {
        info!(
            serial_no = %device.serial_no,
            model = device.model_name.as_deref().unwrap_or("unknown"),
            android = device.android_version.as_deref().unwrap_or("unknown"),
            "Device connected"
        );
        Ok(())
    }

    fn on_device_removed(&self, device: &Device) -> Result<()> {
        info!(serial_no = %device.serial_no, "Device disconnected");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{FailingListener, ListenerEvent, RecordingListener};
    use std::sync::Mutex;

    #[test]
    fn test_dispatch_in_registration_order() {
        let journal = Arc::new(Mutex::new(Vec::new()));
        let first = Arc::new(RecordingListener::with_journal("first", journal.clone()));
        let second = Arc::new(RecordingListener::with_journal("second", journal.clone()));
        let dispatcher = ListenerDispatcher::new(vec![first.clone(), second.clone()]);

        assert_eq!(dispatcher.dispatch_added(&Device::new("dev1")), 0);
        assert_eq!(dispatcher.dispatch_removed(&Device::new("dev1")), 0);

        let expected = vec![
            ListenerEvent::Added("dev1".to_string()),
            ListenerEvent::Removed("dev1".to_string()),
        ];
        assert_eq!(first.events(), expected);
        assert_eq!(second.events(), expected);
        assert_eq!(
            *journal.lock().unwrap(),
            vec!["first +dev1", "second +dev1", "first -dev1", "second -dev1"]
        );
    }

    #[test]
    fn test_failing_listener_does_not_stop_others() {
        let recorder = Arc::new(RecordingListener::new("recorder"));
        let dispatcher = ListenerDispatcher::new(vec![
            Arc::new(FailingListener::erroring()),
            Arc::new(FailingListener::panicking()),
            recorder.clone(),
        ]);

        assert_eq!(dispatcher.dispatch_added(&Device::new("dev1")), 2);
        assert_eq!(recorder.added(), vec!["dev1"]);
    }

    #[test]
    fn test_empty_dispatcher() {
        let dispatcher = ListenerDispatcher::default();
        assert!(dispatcher.is_empty());
        assert_eq!(dispatcher.dispatch_added(&Device::new("dev1")), 0);
    }
}
