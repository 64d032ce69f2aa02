//! Device monitor core for aurora
//!
//! Detects devices attached over USB, separates the ones that authorized this
//! host from the ones still waiting for the user, and hands every newly
//! authorized device to the registered listeners exactly once. The
//! customization listener turns each device into a single automation job.
//!
//! Data flows one way:
//!
//! ```text
//! HotplugWatcher -> Reconciler { DeviceEnumerator -> DeviceRegistry -> ListenerDispatcher }
//!        |                                                                  |
//!        +-> UnauthorizedPoller                      CustomizationListener <+
//!                                                          |
//!                                  ActiveJobRegistry -> CustomizationWorker -> ReportSink
//! ```
//!
//! External facilities (`adb`, UI automation, report storage, profile
//! lookup) are consumed through traits so the core can run against scripted
//! fakes, see [`test_utils`].

pub mod customization;
pub mod cycle;
pub mod dispatcher;
pub mod enumerator;
pub mod error;
pub mod filter;
pub mod poller;
pub mod registry;
pub mod report;
pub mod test_utils;
pub mod timing;
pub mod watcher;

pub use customization::{
    ActiveJob, ActiveJobRegistry, AutomationError, AutomationResult, Automator,
    AutomatorFactory, CustomizationJob, CustomizationListener, CustomizationWorker,
    DEFAULT_DIAL_TEMPLATE, JobStatus, MatchMode, ProfileLookup, Step, WorkflowSettings,
};
pub use cycle::{CycleReport, Reconciler};
pub use dispatcher::{DeviceListener, ListenerDispatcher, LoggingListener};
pub use enumerator::{DeviceEnumerator, DeviceQuery, Enumeration};
pub use error::{MonitorError, QueryError, Result};
pub use filter::{AuthorizationFilter, Classification};
pub use poller::UnauthorizedPoller;
pub use protocol::Device;
pub use registry::{DeviceRegistry, DeviceSnapshot, SnapshotDiff};
pub use report::{JobReport, ReportSink};
pub use timing::Timings;
pub use watcher::{HotplugWatcher, spawn_watcher};
