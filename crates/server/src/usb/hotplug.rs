//! Hotplug event thread

use super::filter::DeviceFilter;
use common::{HotplugEvent, HotplugSender};
use rusb::{Context, Device, Hotplug, HotplugBuilder, UsbContext};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Upper bound on how long a stop request goes unnoticed
const EVENT_TIMEOUT: Duration = Duration::from_millis(100);

/// Running hotplug thread
///
/// The thread owns the only [`HotplugSender`]; stopping it closes the
/// hotplug channel, which in turn ends the watcher.
pub struct UsbHotplugSource {
    stop: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

impl UsbHotplugSource {
    /// Start the hotplug thread
    pub fn spawn(
        sender: HotplugSender,
        filters: Vec<DeviceFilter>,
        fallback_poll: Duration,
    ) -> std::io::Result<Self> {
        let stop = Arc::new(AtomicBool::new(false));
        let thread_stop = stop.clone();

        let handle = thread::Builder::new()
            .name("usb-hotplug".to_string())
            .spawn(move || {
                if !rusb::has_hotplug() {
                    warn!(
                        "libusb has no hotplug support, rescanning every {:?}",
                        fallback_poll
                    );
                    run_rescan_loop(&sender, fallback_poll, &thread_stop);
                } else if let Err(e) = run_hotplug_loop(&sender, filters, &thread_stop) {
                    error!("USB hotplug failed: {}, falling back to rescans", e);
                    run_rescan_loop(&sender, fallback_poll, &thread_stop);
                }
                info!("USB hotplug thread stopped");
            })?;

        Ok(Self { stop, handle })
    }

    /// Stop the thread and wait for it to exit
    pub fn stop(self) {
        self.stop.store(true, Ordering::Release);
        if let Err(e) = self.handle.join() {
            error!("USB hotplug thread panicked: {:?}", e);
        }
    }
}

fn run_hotplug_loop(
    sender: &HotplugSender,
    filters: Vec<DeviceFilter>,
    stop: &AtomicBool,
) -> Result<(), rusb::Error> {
    let context = Context::new()?;
    let callback = HotplugCallback {
        sender: sender.clone(),
        filters,
    };

    // Already-attached devices are picked up by the watcher's initial cycle
    let _registration: rusb::Registration<Context> = HotplugBuilder::new()
        .enumerate(false)
        .register(&context, Box::new(callback))?;
    info!("USB hotplug callbacks registered");

    while !stop.load(Ordering::Acquire) && !sender.is_closed() {
        match context.handle_events(Some(EVENT_TIMEOUT)) {
            Ok(()) => {}
            Err(rusb::Error::Interrupted) => {
                debug!("USB event handling interrupted");
            }
            Err(e) => {
                warn!("Error handling USB events: {}", e);
                thread::sleep(EVENT_TIMEOUT);
            }
        }
    }

    Ok(())
}

fn run_rescan_loop(sender: &HotplugSender, interval: Duration, stop: &AtomicBool) {
    let mut next = Instant::now() + interval;

    while !stop.load(Ordering::Acquire) {
        thread::sleep(EVENT_TIMEOUT.min(interval));
        if Instant::now() < next {
            continue;
        }
        next = Instant::now() + interval;

        match sender.try_send(HotplugEvent::Rescan) {
            Ok(true) => {}
            Ok(false) => debug!("Hotplug queue full, rescan already pending"),
            Err(_) => return,
        }
    }
}

/// Forwards bus events that pass the VID:PID filters
struct HotplugCallback {
    sender: HotplugSender,
    filters: Vec<DeviceFilter>,
}

impl HotplugCallback {
    fn forward<T: UsbContext>(&self, device: &Device<T>, event: HotplugEvent) {
        let Ok(desc) = device.device_descriptor() else {
            return;
        };
        if !DeviceFilter::admits(&self.filters, desc.vendor_id(), desc.product_id()) {
            return;
        }

        debug!(
            "Hot-plug {:?}: {:04x}:{:04x} (bus={}, addr={})",
            event,
            desc.vendor_id(),
            desc.product_id(),
            device.bus_number(),
            device.address()
        );

        match self.sender.try_send(event) {
            Ok(true) => {}
            Ok(false) => debug!("Hotplug queue full, dropping {:?}", event),
            Err(e) => debug!("Hotplug event not delivered: {}", e),
        }
    }
}

impl<T: UsbContext> Hotplug<T> for HotplugCallback {
    fn device_arrived(&mut self, device: Device<T>) {
        self.forward(&device, HotplugEvent::Added);
    }

    fn device_left(&mut self, device: Device<T>) {
        self.forward(&device, HotplugEvent::Removed);
    }
}

/// Attached USB devices that pass the filters, as `(vid, pid, bus, address)`
pub fn list_usb_devices(filters: &[DeviceFilter]) -> common::Result<Vec<(u16, u16, u8, u8)>> {
    let usb_error = |e: rusb::Error| common::Error::Usb(e.to_string());
    let context = Context::new().map_err(usb_error)?;
    let mut found = Vec::new();

    for device in context.devices().map_err(usb_error)?.iter() {
        let Ok(desc) = device.device_descriptor() else {
            continue;
        };
        if DeviceFilter::admits(filters, desc.vendor_id(), desc.product_id()) {
            found.push((
                desc.vendor_id(),
                desc.product_id(),
                device.bus_number(),
                device.address(),
            ));
        }
    }

    Ok(found)
}
