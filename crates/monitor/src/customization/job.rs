//! Job record and its state machine

use crate::error::{MonitorError, Result};
use protocol::Device;
use std::fmt;

/// `Pending -> Running -> {Passed | Failed}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobStatus {
    Pending,
    Running,
    Passed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Passed | JobStatus::Failed)
    }

    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::Pending, JobStatus::Running)
                | (JobStatus::Running, JobStatus::Passed)
                | (JobStatus::Running, JobStatus::Failed)
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JobStatus::Pending => "PENDING",
            JobStatus::Running => "RUNNING",
            JobStatus::Passed => "PASSED",
            JobStatus::Failed => "FAILED",
        };
        f.write_str(name)
    }
}

/// One device being customized to one profile
#[derive(Debug, Clone)]
pub struct CustomizationJob {
    pub device: Device,
    pub target_profile: String,
    status: JobStatus,
}

impl CustomizationJob {
    pub fn new(device: Device, target_profile: impl Into<String>) -> Self {
        Self {
            device,
            target_profile: target_profile.into(),
            status: JobStatus::Pending,
        }
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    /// Move to `next`, refusing anything the state machine does not allow
    pub fn transition(&mut self, next: JobStatus) -> Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(MonitorError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }
}
