//! Per-device customization jobs
//!
//! The [`CustomizationListener`] turns every newly authorized device into a
//! [`CustomizationJob`] run by a [`CustomizationWorker`] on its own thread.
//! The [`ActiveJobRegistry`] keeps at most one job per serial in flight.

mod active;
mod automation;
mod job;
mod listener;
mod worker;

pub use active::{ActiveJob, ActiveJobRegistry};
pub use automation::{AutomationError, AutomationResult, Automator, AutomatorFactory, MatchMode};
pub use job::{CustomizationJob, JobStatus};
pub use listener::{CustomizationListener, ProfileLookup};
pub use worker::{CustomizationWorker, DEFAULT_DIAL_TEMPLATE, Step, WorkflowSettings};
