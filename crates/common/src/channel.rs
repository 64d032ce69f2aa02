//! Channel bridge between the USB event thread and the device watcher
//!
//! The libusb callbacks run on the USB event thread and must never block, so
//! they push into a bounded channel with `try_send`. The watcher thread
//! blocks on the receiving end. Dropping every sender closes the channel,
//! which is how the watcher learns that the subscription was cancelled.

use async_channel::{Receiver, Sender, TryRecvError, TrySendError, bounded};

/// Bus-level event that should trigger a re-enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HotplugEvent {
    /// A device appeared on the bus
    Added,
    /// A device left the bus
    Removed,
    /// Periodic rescan request (used when hotplug is unsupported)
    Rescan,
}

/// Sending half, owned by the hotplug source
#[derive(Clone)]
pub struct HotplugSender {
    tx: Sender<HotplugEvent>,
}

impl HotplugSender {
    /// Queue an event without blocking
    ///
    /// Returns `Ok(false)` when the queue is full. A full queue already holds
    /// a pending re-enumeration, so the event can be dropped safely.
    pub fn try_send(&self, event: HotplugEvent) -> crate::Result<bool> {
        match self.tx.try_send(event) {
            Ok(()) => Ok(true),
            Err(TrySendError::Full(_)) => Ok(false),
            Err(TrySendError::Closed(_)) => {
                Err(crate::Error::Channel("hotplug channel closed".to_string()))
            }
        }
    }

    /// Queue an event, blocking while the queue is full
    pub fn send_blocking(&self, event: HotplugEvent) -> crate::Result<()> {
        self.tx
            .send_blocking(event)
            .map_err(|e| crate::Error::Channel(e.to_string()))
    }

    /// Whether the watcher side has gone away
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Receiving half, owned by the watcher
pub struct HotplugReceiver {
    rx: Receiver<HotplugEvent>,
}

impl HotplugReceiver {
    /// Block until the next event
    ///
    /// Fails once every sender has been dropped and the queue is drained.
    pub fn recv_blocking(&self) -> crate::Result<HotplugEvent> {
        self.rx
            .recv_blocking()
            .map_err(|e| crate::Error::Channel(e.to_string()))
    }

    /// Take the next queued event, if any
    pub fn try_recv(&self) -> Option<HotplugEvent> {
        match self.rx.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => None,
        }
    }

    /// Take every queued event without blocking
    pub fn drain(&self) -> Vec<HotplugEvent> {
        std::iter::from_fn(|| self.try_recv()).collect()
    }
}

/// Create the channel bridge between the USB thread and the watcher
///
/// Returns (HotplugSender for the USB thread, HotplugReceiver for the watcher)
pub fn create_hotplug_bridge() -> (HotplugSender, HotplugReceiver) {
    let (tx, rx) = bounded(256);
    (HotplugSender { tx }, HotplugReceiver { rx })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_bridge() {
        let (sender, receiver) = create_hotplug_bridge();

        let handle = std::thread::spawn(move || receiver.recv_blocking().unwrap());

        sender.send_blocking(HotplugEvent::Added).unwrap();
        assert_eq!(handle.join().unwrap(), HotplugEvent::Added);
    }

    #[test]
    fn test_drop_sender_closes_receiver() {
        let (sender, receiver) = create_hotplug_bridge();
        sender.try_send(HotplugEvent::Removed).unwrap();
        drop(sender);

        // Queued events are still delivered before the close is observed
        assert_eq!(receiver.recv_blocking().unwrap(), HotplugEvent::Removed);
        assert!(receiver.recv_blocking().is_err());
    }

    #[test]
    fn test_drain_collects_queued_events() {
        let (sender, receiver) = create_hotplug_bridge();
        sender.try_send(HotplugEvent::Added).unwrap();
        sender.try_send(HotplugEvent::Added).unwrap();
        sender.try_send(HotplugEvent::Removed).unwrap();

        assert_eq!(
            receiver.drain(),
            vec![
                HotplugEvent::Added,
                HotplugEvent::Added,
                HotplugEvent::Removed
            ]
        );
        assert!(receiver.drain().is_empty());
    }

    #[test]
    fn test_try_send_after_receiver_dropped() {
        let (sender, receiver) = create_hotplug_bridge();
        drop(receiver);
        assert!(sender.is_closed());
        assert!(sender.try_send(HotplugEvent::Added).is_err());
    }
}
