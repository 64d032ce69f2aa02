//! Hotplug Bridge Integration Tests
//!
//! Tests for the channel bridge between the USB event thread and the
//! device watcher thread.
//!
//! Run with: `cargo test -p common --test hotplug_bridge_tests`

use common::{HotplugEvent, create_hotplug_bridge};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::thread;
use std::time::Duration;

// ============================================================================
// Producer / Consumer Tests
// ============================================================================

#[test]
fn test_events_arrive_in_order() {
    let (sender, receiver) = create_hotplug_bridge();

    let producer = thread::spawn(move || {
        for event in [HotplugEvent::Added, HotplugEvent::Removed, HotplugEvent::Rescan] {
            sender.send_blocking(event).expect("Failed to send event");
        }
    });

    producer.join().expect("Producer panicked");

    assert_eq!(receiver.recv_blocking().unwrap(), HotplugEvent::Added);
    assert_eq!(receiver.recv_blocking().unwrap(), HotplugEvent::Removed);
    assert_eq!(receiver.recv_blocking().unwrap(), HotplugEvent::Rescan);
}

#[test]
fn test_consumer_loop_ends_when_producers_drop() {
    let (sender, receiver) = create_hotplug_bridge();
    let received = Arc::new(AtomicU32::new(0));
    let counter = received.clone();

    // Mirrors the watcher: block until the subscription is cancelled
    let consumer = thread::spawn(move || {
        while receiver.recv_blocking().is_ok() {
            counter.fetch_add(1, Ordering::SeqCst);
        }
    });

    let producers: Vec<_> = (0..4)
        .map(|_| {
            let sender = sender.clone();
            thread::spawn(move || {
                for _ in 0..10 {
                    sender.send_blocking(HotplugEvent::Added).unwrap();
                }
            })
        })
        .collect();

    for producer in producers {
        producer.join().unwrap();
    }
    drop(sender);

    consumer.join().expect("Consumer panicked");
    assert_eq!(received.load(Ordering::SeqCst), 40);
}

// ============================================================================
// Backpressure Tests
// ============================================================================

#[test]
fn test_full_queue_drops_instead_of_blocking() {
    let (sender, receiver) = create_hotplug_bridge();

    let mut accepted = 0;
    for _ in 0..300 {
        if sender.try_send(HotplugEvent::Added).unwrap() {
            accepted += 1;
        }
    }

    assert_eq!(accepted, 256);
    assert_eq!(receiver.drain().len(), 256);
    assert!(sender.try_send(HotplugEvent::Added).unwrap());
}

#[test]
fn test_try_recv_on_empty_queue() {
    let (_sender, receiver) = create_hotplug_bridge();
    assert!(receiver.try_recv().is_none());
}

#[test]
fn test_blocked_receiver_wakes_on_send() {
    let (sender, receiver) = create_hotplug_bridge();

    let consumer = thread::spawn(move || receiver.recv_blocking());

    thread::sleep(Duration::from_millis(50));
    sender.try_send(HotplugEvent::Removed).unwrap();

    assert_eq!(consumer.join().unwrap().unwrap(), HotplugEvent::Removed);
}
