//! Listener that starts customization jobs

use super::active::ActiveJobRegistry;
use super::automation::AutomatorFactory;
use super::job::CustomizationJob;
use super::worker::{CustomizationWorker, WorkflowSettings};
use crate::dispatcher::DeviceListener;
use crate::error::Result;
use crate::report::ReportSink;
use protocol::Device;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use tracing::{debug, error, info, warn};

/// Decides which profile a device is customized to
pub trait ProfileLookup: Send + Sync {
    /// `None` when the device should be left alone
    fn target_profile(&self, device: &Device) -> Option<String>;
}

/// Starts one worker per newly authorized device
pub struct CustomizationListener {
    profiles: Arc<dyn ProfileLookup>,
    automators: Arc<dyn AutomatorFactory>,
    reports: Arc<dyn ReportSink>,
    settings: Arc<WorkflowSettings>,
    jobs: Arc<ActiveJobRegistry>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl CustomizationListener {
    pub fn new(
        profiles: Arc<dyn ProfileLookup>,
        automators: Arc<dyn AutomatorFactory>,
        reports: Arc<dyn ReportSink>,
        settings: WorkflowSettings,
    ) -> Self {
        Self {
            profiles,
            automators,
            reports,
            settings: Arc::new(settings),
            jobs: Arc::new(ActiveJobRegistry::new()),
            workers: Mutex::new(Vec::new()),
        }
    }

    /// Serials with a job in flight
    pub fn jobs(&self) -> &Arc<ActiveJobRegistry> {
        &self.jobs
    }

    /// Start a job for `device` unless one is already running
    ///
    /// Returns true when a worker was spawned.
    pub fn add_device(&self, device: &Device) -> bool {
        let Some(profile) = self.profiles.target_profile(device) else {
            warn!(
                serial_no = %device.serial_no,
                model = device.model_name.as_deref().unwrap_or("unknown"),
                "No target profile, skipping"
            );
            if let Err(e) = self.reports.job_skipped(device) {
                error!(serial_no = %device.serial_no, "Failed to report skipped device: {}", e);
            }
            return false;
        };

        let Some(claim) = self.jobs.try_begin(&device.serial_no) else {
            debug!(serial_no = %device.serial_no, "Job already running");
            return false;
        };

        let worker = CustomizationWorker::new(
            CustomizationJob::new(device.clone(), profile),
            claim,
            self.automators.clone(),
            self.reports.clone(),
            self.settings.clone(),
        );

        let spawned = thread::Builder::new()
            .name(format!("customize-{}", device.serial_no))
            .spawn(move || {
                worker.run();
            });

        match spawned {
            Ok(handle) => {
                let mut workers = self.workers.lock().unwrap_or_else(|e| e.into_inner());
                workers.retain(|h| !h.is_finished());
                workers.push(handle);
                true
            }
            Err(e) => {
                error!(serial_no = %device.serial_no, "Failed to spawn worker: {}", e);
                false
            }
        }
    }

    /// Workers are not cancelled when their device goes away
    pub fn remove_device(&self, device: &Device) {
        if self.jobs.contains(&device.serial_no) {
            warn!(
                serial_no = %device.serial_no,
                "Device removed while its job is running"
            );
        }
    }

    /// Number of workers still running; they are abandoned at exit
    pub fn shutdown(&self) -> usize {
        let mut workers = self.workers.lock().unwrap_or_else(|e| e.into_inner());
        workers.retain(|h| !h.is_finished());
        if !workers.is_empty() {
            info!(
                "Abandoning {} running job(s): {:?}",
                workers.len(),
                self.jobs.active_serials()
            );
        }
        workers.len()
    }
}

impl DeviceListener for CustomizationListener {
    fn name(&self) -> &str {
        "customization"
    }

    fn on_device_added(&self, device: &Device) -> Result<()> {
        self.add_device(device);
        Ok(())
    }

    fn on_device_removed(&self, device: &Device) -> Result<()> {
        self.remove_device(device);
        Ok(())
    }
}
