//! Customization workflow
//!
//! A worker owns one [`CustomizationJob`] from `Running` to a terminal
//! status. Every failure mode, panics included, ends in exactly one report
//! followed by the release of the device's [`ActiveJob`] claim.

use super::active::ActiveJob;
use super::automation::{AutomationError, Automator, AutomatorFactory, MatchMode};
use super::job::{CustomizationJob, JobStatus};
use crate::error::panic_message;
use crate::report::{JobReport, ReportSink};
use crate::timing::{MAX_SCROLL_ATTEMPTS, STEP_SETTLE};
use protocol::Attribute;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Samsung CSC menu; `{imei}` is replaced with the device IMEI
pub const DEFAULT_DIAL_TEMPLATE: &str = "*#272*{imei}#";

/// Labels, codes and delays used by the workflow
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowSettings {
    pub dial_template: String,
    pub match_mode: MatchMode,
    pub install_label: String,
    pub confirm_label: String,
    pub max_scroll_attempts: u32,
    pub step_settle: Duration,
}

impl Default for WorkflowSettings {
    fn default() -> Self {
        Self {
            dial_template: DEFAULT_DIAL_TEMPLATE.to_string(),
            match_mode: MatchMode::default(),
            install_label: "Install".to_string(),
            confirm_label: "OK".to_string(),
            max_scroll_attempts: MAX_SCROLL_ATTEMPTS,
            step_settle: STEP_SETTLE,
        }
    }
}

impl WorkflowSettings {
    /// Provisioning code for a device
    pub fn dial_code(&self, imei: &str) -> String {
        self.dial_template.replace("{imei}", imei)
    }
}

/// Workflow step, used to say where a job failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Connect,
    Unlock,
    OpenMenu,
    FindProfile,
    SelectProfile,
    Install,
    Confirm,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Step::Connect => "connect",
            Step::Unlock => "unlock",
            Step::OpenMenu => "open menu",
            Step::FindProfile => "find profile",
            Step::SelectProfile => "select profile",
            Step::Install => "install",
            Step::Confirm => "confirm",
        };
        f.write_str(name)
    }
}

#[derive(Debug)]
struct StepFailure {
    step: Step,
    error: AutomationError,
}

fn at(step: Step) -> impl FnOnce(AutomationError) -> StepFailure {
    move |error| StepFailure { step, error }
}

/// Runs one job to completion
pub struct CustomizationWorker {
    job: CustomizationJob,
    claim: ActiveJob,
    automators: Arc<dyn AutomatorFactory>,
    reports: Arc<dyn ReportSink>,
    settings: Arc<WorkflowSettings>,
}

impl CustomizationWorker {
    pub fn new(
        job: CustomizationJob,
        claim: ActiveJob,
        automators: Arc<dyn AutomatorFactory>,
        reports: Arc<dyn ReportSink>,
        settings: Arc<WorkflowSettings>,
    ) -> Self {
        Self {
            job,
            claim,
            automators,
            reports,
            settings,
        }
    }

    /// Run the workflow and report the outcome
    ///
    /// The device's claim is released after the report is recorded, on
    /// every path.
    pub fn run(mut self) -> JobStatus {
        let serial_no = self.job.device.serial_no.clone();

        if let Err(e) = self.job.transition(JobStatus::Running) {
            error!(serial_no = %serial_no, "Job not started: {}", e);
            return self.job.status();
        }
        info!(
            serial_no = %serial_no,
            profile = %self.job.target_profile,
            "Customization started"
        );
        self.reports.job_started(&self.job);

        let outcome = catch_unwind(AssertUnwindSafe(|| self.execute()));
        let status = match outcome {
            Ok(Ok(())) => {
                info!(serial_no = %serial_no, "Customization passed");
                JobStatus::Passed
            }
            Ok(Err(failure)) if failure.error.is_expected() => {
                warn!(
                    serial_no = %serial_no,
                    step = %failure.step,
                    "Customization failed: {}", failure.error
                );
                JobStatus::Failed
            }
            Ok(Err(failure)) => {
                error!(
                    serial_no = %serial_no,
                    step = %failure.step,
                    "Unexpected customization error: {}", failure.error
                );
                JobStatus::Failed
            }
            Err(payload) => {
                error!(
                    serial_no = %serial_no,
                    "Customization worker panicked: {}",
                    panic_message(payload.as_ref())
                );
                JobStatus::Failed
            }
        };

        if let Err(e) = self.job.transition(status) {
            error!(serial_no = %serial_no, "{}", e);
        }

        let report = JobReport::from_job(&self.job);
        if let Err(e) = self.reports.record(&report) {
            error!(serial_no = %serial_no, "Failed to record report: {}", e);
        }

        debug!(serial_no = %self.claim.serial_no(), "Releasing device");
        self.job.status()
    }

    fn execute(&self) -> Result<(), StepFailure> {
        let device = &self.job.device;
        let settings = &self.settings;
        let profile = self.job.target_profile.as_str();

        let automator = self.automators.connect(device).map_err(at(Step::Connect))?;
        let automator: &dyn Automator = automator.as_ref();

        if let Err(e) = automator.unlock() {
            debug!(serial_no = %device.serial_no, "Unlock failed ({}), swiping", e);
            automator.swipe_unlock().map_err(at(Step::Unlock))?;
        }
        self.settle();

        let imei = device
            .imei
            .as_deref()
            .ok_or(AutomationError::MissingAttribute(Attribute::Imei))
            .map_err(at(Step::OpenMenu))?;
        automator
            .dial(&settings.dial_code(imei))
            .map_err(at(Step::OpenMenu))?;
        self.settle();

        automator
            .scroll_to_text(profile, settings.match_mode, settings.max_scroll_attempts)
            .map_err(at(Step::FindProfile))?;
        automator
            .tap_by_text(profile, settings.match_mode)
            .map_err(at(Step::SelectProfile))?;
        self.settle();

        automator
            .tap_by_text(&settings.install_label, settings.match_mode)
            .map_err(at(Step::Install))?;
        self.settle();

        automator
            .tap_by_text(&settings.confirm_label, settings.match_mode)
            .map_err(at(Step::Confirm))?;

        Ok(())
    }

    fn settle(&self) {
        if !self.settings.step_settle.is_zero() {
            thread::sleep(self.settings.step_settle);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dial_code() {
        let settings = WorkflowSettings::default();
        assert_eq!(settings.dial_code("354567890123456"), "*#272*354567890123456#");

        let custom = WorkflowSettings {
            dial_template: "*#{imei}*#".to_string(),
            ..WorkflowSettings::default()
        };
        assert_eq!(custom.dial_code("1"), "*#1*#");
    }

    #[test]
    fn test_step_names() {
        assert_eq!(Step::SelectProfile.to_string(), "select profile");
        assert_eq!(Step::OpenMenu.to_string(), "open menu");
    }
}
