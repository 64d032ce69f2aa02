//! aurora
//!
//! Watches the USB bus for Android handsets, waits until each one has
//! authorized this host for adb, and customizes every newly authorized
//! device to its target profile through the on-device provisioning menu.

mod adb;
mod config;
mod profiles;
mod report;
mod usb;

use adb::{Adb, AdbAutomatorFactory, AdbQuery};
use anyhow::{Context, Result};
use clap::Parser;
use common::{create_hotplug_bridge, setup_logging_with_file};
use monitor::{
    CustomizationListener, DeviceEnumerator, DeviceListener, HotplugWatcher, ListenerDispatcher,
    LoggingListener, Reconciler, UnauthorizedPoller, spawn_watcher,
};
use profiles::ProfileTable;
use report::DailyTsvReportSink;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};
use usb::{UsbHotplugSource, list_usb_devices};

#[derive(Parser, Debug)]
#[command(name = "aurora")]
#[command(
    author,
    version,
    about = "aurora - Customize Android handsets as they are plugged in"
)]
#[command(long_about = "
Detects Android devices attached over USB, waits for each one to authorize
this host for adb, and drives the device's provisioning menu to install the
configured customization profile. Every outcome is appended to a daily TSV
report.

EXAMPLES:
    # Run with default config
    aurora

    # Run with custom config
    aurora --config /path/to/aurora.toml

    # Show attached devices without customizing anything
    aurora --list-devices

    # Run with debug logging
    aurora --log-level debug

CONFIGURATION:
    aurora looks for configuration files in the following order:
    1. Path specified with --config
    2. ~/.config/aurora/aurora.toml
    3. /etc/aurora/aurora.toml
    4. Built-in defaults
")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, value_name = "PATH")]
    config: Option<std::path::PathBuf>,

    /// Save default configuration to default location and exit
    #[arg(long)]
    save_config: bool,

    /// List attached devices and exit
    #[arg(long)]
    list_devices: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, value_name = "LEVEL")]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Handle --save-config flag early (before loading config)
    if args.save_config {
        let config = config::AuroraConfig::default();
        let path = config::AuroraConfig::default_path();
        config.save(&path).context("Failed to save configuration")?;
        println!("Configuration saved to: {}", path.display());
        return Ok(());
    }

    let config = if let Some(ref path) = args.config {
        config::AuroraConfig::load(Some(path.clone())).context("Failed to load configuration")?
    } else {
        config::AuroraConfig::load_or_default()
    };

    // Use CLI log level if specified, otherwise use config value
    let log_level = args
        .log_level
        .as_deref()
        .unwrap_or(&config.server.log_level);

    let log_file = config.log_file();
    setup_logging_with_file(log_level, log_file.as_deref()).context("Failed to setup logging")?;

    info!("aurora v{}", env!("CARGO_PKG_VERSION"));
    info!("Log level: {}", log_level);

    let adb = Adb::new(config.adb.path.clone());
    let enumerator = DeviceEnumerator::new(Arc::new(AdbQuery::new(adb.clone())));

    if args.list_devices {
        return list_devices_mode(&config, &enumerator);
    }

    run_daemon(config, adb, enumerator).await
}

/// Print USB and adb views of the attached devices, then exit
fn list_devices_mode(config: &config::AuroraConfig, enumerator: &DeviceEnumerator) -> Result<()> {
    let filters = config.usb_filters()?;
    match list_usb_devices(&filters) {
        Ok(devices) if devices.is_empty() => println!("No matching USB devices found.\n"),
        Ok(devices) => {
            println!("Found {} USB device(s):\n", devices.len());
            for (vid, pid, bus, address) in devices {
                println!("  {:04x}:{:04x}  Bus {:03} Device {:03}", vid, pid, bus, address);
            }
            println!();
        }
        Err(e) => warn!("Cannot list USB devices: {}", e),
    }

    let enumeration = enumerator
        .enumerate()
        .context("Failed to enumerate adb devices")?;

    if enumeration.authorized.is_empty() && enumeration.unauthorized_ids.is_empty() {
        println!("No adb devices found.");
        return Ok(());
    }

    for device in &enumeration.authorized {
        println!("  [authorized]   {}", device.serial_no);
        println!(
            "      Model: {}  Android: {}  IMEI: {}",
            device.model_name.as_deref().unwrap_or("unknown"),
            device.android_version.as_deref().unwrap_or("unknown"),
            device.imei.as_deref().unwrap_or("unknown")
        );
    }
    for serial_no in &enumeration.unauthorized_ids {
        println!("  [unauthorized] {}", serial_no);
    }

    Ok(())
}

/// Watch for devices until Ctrl+C
async fn run_daemon(
    config: config::AuroraConfig,
    adb: Adb,
    enumerator: DeviceEnumerator,
) -> Result<()> {
    let mut listeners: Vec<Arc<dyn DeviceListener>> = vec![Arc::new(LoggingListener)];

    let customization = if config.customization.enabled {
        let profiles = ProfileTable::new(
            config.customization.profiles.clone(),
            config.customization.default_profile.clone(),
        );
        if profiles.is_empty() {
            warn!("No customization profiles configured, devices will only be logged");
        }

        let report_dir = config.report_dir();
        info!("Writing reports to {}", report_dir.display());

        let listener = Arc::new(CustomizationListener::new(
            Arc::new(profiles),
            Arc::new(AdbAutomatorFactory::new(adb)),
            Arc::new(DailyTsvReportSink::new(report_dir)),
            config.workflow_settings(),
        ));
        listeners.push(listener.clone());
        Some(listener)
    } else {
        info!("Customization disabled");
        None
    };

    let reconciler = Arc::new(Reconciler::new(
        enumerator,
        ListenerDispatcher::new(listeners),
    ));
    let timings = config.timings();
    let poller = UnauthorizedPoller::new(reconciler.clone(), timings.poll_interval);

    let (sender, receiver) = create_hotplug_bridge();
    let hotplug = UsbHotplugSource::spawn(
        sender,
        config.usb_filters()?,
        config.timing.fallback_poll(),
    )
    .context("Failed to start USB hotplug thread")?;

    let watcher = spawn_watcher(HotplugWatcher::new(reconciler, poller, timings), receiver)
        .context("Failed to start hotplug watcher")?;

    info!("Press Ctrl+C to shutdown");

    match signal::ctrl_c().await {
        Ok(()) => {
            info!("Received Ctrl+C, shutting down gracefully...");
        }
        Err(e) => {
            error!("Error waiting for Ctrl+C: {}", e);
        }
    }

    // Stopping the hotplug thread closes the channel, which ends the watcher
    let stopped = tokio::task::spawn_blocking(move || {
        hotplug.stop();
        watcher.join()
    })
    .await
    .context("Shutdown task failed")?;
    if let Err(e) = stopped {
        error!("Hotplug watcher panicked: {:?}", e);
    }

    if let Some(customization) = customization {
        let abandoned = customization.shutdown();
        if abandoned > 0 {
            warn!("{} customization job(s) abandoned", abandoned);
        }
    }

    info!("aurora shutdown complete");
    Ok(())
}
