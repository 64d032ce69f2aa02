//! Job outcome reporting seam

use crate::customization::{CustomizationJob, JobStatus};
use crate::error::Result;
use chrono::{DateTime, Local};
use protocol::Device;

/// Outcome of one finished job
#[derive(Debug, Clone)]
pub struct JobReport {
    pub device: Device,
    pub status: JobStatus,
    pub target_profile: String,
    pub timestamp: DateTime<Local>,
}

impl JobReport {
    /// Report for `job` as of now
    pub fn from_job(job: &CustomizationJob) -> Self {
        Self {
            device: job.device.clone(),
            status: job.status(),
            target_profile: job.target_profile.clone(),
            timestamp: Local::now(),
        }
    }
}

/// Receives one record per finished job
pub trait ReportSink: Send + Sync {
    /// Called when a worker picks up a job
    fn job_started(&self, _job: &CustomizationJob) {}

    /// Called instead of starting a job when `device` has no target profile
    fn job_skipped(&self, _device: &Device) -> Result<()> {
        Ok(())
    }

    /// Persist the outcome of a finished job
    fn record(&self, report: &JobReport) -> Result<()>;
}
