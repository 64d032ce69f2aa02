//! Scripted fakes for the monitor's external seams
//!
//! Used by the unit tests in this crate, by `tests/`, and by the server
//! crate's tests.
//!
//! # Example
//!
//! ```
//! use monitor::test_utils::{ScriptedQuery, listing};
//! use monitor::DeviceEnumerator;
//! use std::sync::Arc;
//!
//! let query = Arc::new(ScriptedQuery::new());
//! query.push_listing(listing(&["dev1"], &["dev2"]));
//! query.set_full_attributes("dev1");
//!
//! let enumeration = DeviceEnumerator::new(query).enumerate().unwrap();
//! assert_eq!(enumeration.authorized.len(), 1);
//! assert!(enumeration.unauthorized_ids.contains("dev2"));
//! ```

use crate::customization::{
    AutomationError, AutomationResult, Automator, AutomatorFactory, CustomizationJob, MatchMode,
    ProfileLookup,
};
use crate::dispatcher::DeviceListener;
use crate::enumerator::DeviceQuery;
use crate::error::{MonitorError, QueryError, Result};
use crate::report::{JobReport, ReportSink};
use crate::timing::Timings;
use protocol::{Attribute, Device};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

/// Default test timeout (5 seconds)
pub const DEFAULT_TEST_TIMEOUT: Duration = Duration::from_secs(5);

pub const TEST_IMEI: &str = "354567890123456";
pub const TEST_ANDROID_VERSION: &str = "13";
pub const TEST_MODEL_NAME: &str = "SM-G991B";

/// Poll `condition` every 10ms until it holds or `timeout` elapses
pub fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        if condition() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        thread::sleep(Duration::from_millis(10));
    }
}

/// Millisecond-scale delays so tests don't wait on real settle times
pub fn fast_timings() -> Timings {
    Timings {
        add_settle: Duration::from_millis(20),
        remove_settle: Duration::from_millis(5),
        poll_interval: Duration::from_millis(10),
    }
}

/// `adb devices` output for the given serials
pub fn listing(authorized: &[&str], unauthorized: &[&str]) -> String {
    let mut output = String::from("List of devices attached\n");
    for serial in authorized {
        output.push_str(&format!("{}\tdevice\n", serial));
    }
    for serial in unauthorized {
        output.push_str(&format!("{}\tunauthorized\n", serial));
    }
    output
}

type Listing = std::result::Result<String, QueryError>;

/// Device-query facility that replays queued listings
///
/// Each `list_devices` call takes the next queued listing; once the queue is
/// exhausted the last one is repeated. With nothing queued it reports
/// [`QueryError::Empty`]. Attributes that were never set are absent.
#[derive(Default)]
pub struct ScriptedQuery {
    listings: Mutex<VecDeque<Listing>>,
    last: Mutex<Option<Listing>>,
    attributes: Mutex<HashMap<(String, Attribute), String>>,
    list_calls: AtomicUsize,
}

impl ScriptedQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_listing(&self, output: impl Into<String>) {
        self.push(Ok(output.into()));
    }

    pub fn fail_listing(&self, error: QueryError) {
        self.push(Err(error));
    }

    pub fn set_attribute(&self, serial_no: &str, attribute: Attribute, value: &str) {
        self.attributes
            .lock()
            .unwrap()
            .insert((serial_no.to_string(), attribute), value.to_string());
    }

    /// Give `serial_no` the standard test IMEI, version and model
    pub fn set_full_attributes(&self, serial_no: &str) {
        self.set_attribute(serial_no, Attribute::Imei, TEST_IMEI);
        self.set_attribute(serial_no, Attribute::AndroidVersion, TEST_ANDROID_VERSION);
        self.set_attribute(serial_no, Attribute::ModelName, TEST_MODEL_NAME);
    }

    /// Number of `list_devices` calls so far
    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    fn push(&self, listing: Listing) {
        self.listings.lock().unwrap().push_back(listing);
    }
}

impl DeviceQuery for ScriptedQuery {
    fn list_devices(&self) -> std::result::Result<String, QueryError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);

        let mut last = self.last.lock().unwrap();
        if let Some(next) = self.listings.lock().unwrap().pop_front() {
            *last = Some(next);
        }
        last.clone()
            .unwrap_or_else(|| Err(QueryError::Empty("adb devices".to_string())))
    }

    fn query_attribute(
        &self,
        serial_no: &str,
        attribute: Attribute,
    ) -> std::result::Result<String, QueryError> {
        self.attributes
            .lock()
            .unwrap()
            .get(&(serial_no.to_string(), attribute))
            .cloned()
            .ok_or_else(|| QueryError::Empty(format!("{} of {}", attribute, serial_no)))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListenerEvent {
    Added(String),
    Removed(String),
}

/// Listener that records every notification
pub struct RecordingListener {
    name: String,
    events: Mutex<Vec<ListenerEvent>>,
    journal: Option<Arc<Mutex<Vec<String>>>>,
}

impl RecordingListener {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            events: Mutex::new(Vec::new()),
            journal: None,
        }
    }

    /// Also append `"<name> +serial"` / `"<name> -serial"` to a journal
    /// shared between listeners, to observe cross-listener ordering
    pub fn with_journal(name: &str, journal: Arc<Mutex<Vec<String>>>) -> Self {
        Self {
            journal: Some(journal),
            ..Self::new(name)
        }
    }

    pub fn events(&self) -> Vec<ListenerEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn added(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ListenerEvent::Added(serial) => Some(serial),
                ListenerEvent::Removed(_) => None,
            })
            .collect()
    }

    pub fn removed(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ListenerEvent::Removed(serial) => Some(serial),
                ListenerEvent::Added(_) => None,
            })
            .collect()
    }

    fn record(&self, event: ListenerEvent) {
        if let Some(journal) = &self.journal {
            let entry = match &event {
                ListenerEvent::Added(serial) => format!("{} +{}", self.name, serial),
                ListenerEvent::Removed(serial) => format!("{} -{}", self.name, serial),
            };
            journal.lock().unwrap().push(entry);
        }
        self.events.lock().unwrap().push(event);
    }
}

impl DeviceListener for RecordingListener {
    fn name(&self) -> &str {
        &self.name
    }

    fn on_device_added(&self, device: &Device) -> Result<()> {
        self.record(ListenerEvent::Added(device.serial_no.clone()));
        Ok(())
    }

    fn on_device_removed(&self, device: &Device) -> Result<()> {
        self.record(ListenerEvent::Removed(device.serial_no.clone()));
        Ok(())
    }
}

/// Listener that fails every notification
pub struct FailingListener {
    panics: bool,
}

impl FailingListener {
    pub fn erroring() -> Self {
        Self { panics: false }
    }

    pub fn panicking() -> Self {
        Self { panics: true }
    }

    fn fail(&self, device: &Device) -> Result<()> {
        if self.panics {
            panic!("listener exploded on {}", device.serial_no);
        }
        Err(MonitorError::Listener {
            listener: self.name().to_string(),
            reason: format!("rejected {}", device.serial_no),
        })
    }
}

impl DeviceListener for FailingListener {
    fn name(&self) -> &str {
        if self.panics { "panicking" } else { "erroring" }
    }

    fn on_device_added(&self, device: &Device) -> Result<()> {
        self.fail(device)
    }

    fn on_device_removed(&self, device: &Device) -> Result<()> {
        self.fail(device)
    }
}

/// Automation primitive invoked on a [`ScriptedAutomator`]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Call {
    Connect(String),
    Unlock,
    SwipeUnlock,
    Dial(String),
    TapByText(String),
    ScrollToText(String),
}

#[derive(Debug, Clone)]
enum Scripted {
    Fail(AutomationError),
    Panic,
}

#[derive(Default)]
struct Script {
    calls: Mutex<Vec<Call>>,
    outcomes: Mutex<HashMap<Call, Scripted>>,
    scrolls_needed: Mutex<u32>,
    step_delay: Mutex<Duration>,
}

/// Automator factory whose sessions follow a script
///
/// Every primitive succeeds unless [`ScriptedAutomator::fail_on`] or
/// [`ScriptedAutomator::panic_on`] says otherwise. Calls from all sessions
/// land in one shared log.
#[derive(Clone, Default)]
pub struct ScriptedAutomator {
    script: Arc<Script>,
}

impl ScriptedAutomator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_on(&self, call: Call, error: AutomationError) {
        self.script
            .outcomes
            .lock()
            .unwrap()
            .insert(call, Scripted::Fail(error));
    }

    pub fn panic_on(&self, call: Call) {
        self.script
            .outcomes
            .lock()
            .unwrap()
            .insert(call, Scripted::Panic);
    }

    /// Scroll gestures needed before the profile label shows up
    pub fn set_scrolls_needed(&self, scrolls: u32) {
        *self.script.scrolls_needed.lock().unwrap() = scrolls;
    }

    /// Sleep this long in every primitive
    pub fn set_step_delay(&self, delay: Duration) {
        *self.script.step_delay.lock().unwrap() = delay;
    }

    pub fn calls(&self) -> Vec<Call> {
        self.script.calls.lock().unwrap().clone()
    }

    fn invoke(&self, call: Call) -> AutomationResult<()> {
        let delay = *self.script.step_delay.lock().unwrap();
        if !delay.is_zero() {
            thread::sleep(delay);
        }

        self.script.calls.lock().unwrap().push(call.clone());
        let outcome = self.script.outcomes.lock().unwrap().get(&call).cloned();
        match outcome {
            None => Ok(()),
            Some(Scripted::Fail(error)) => Err(error),
            Some(Scripted::Panic) => panic!("scripted panic on {:?}", call),
        }
    }
}

impl Automator for ScriptedAutomator {
    fn unlock(&self) -> AutomationResult<()> {
        self.invoke(Call::Unlock)
    }

    fn swipe_unlock(&self) -> AutomationResult<()> {
        self.invoke(Call::SwipeUnlock)
    }

    fn dial(&self, code: &str) -> AutomationResult<()> {
        self.invoke(Call::Dial(code.to_string()))
    }

    fn tap_by_text(&self, text: &str, _mode: MatchMode) -> AutomationResult<()> {
        self.invoke(Call::TapByText(text.to_string()))
    }

    fn scroll_to_text(&self, text: &str, _mode: MatchMode, max_attempts: u32) -> AutomationResult<()> {
        self.invoke(Call::ScrollToText(text.to_string()))?;
        let needed = *self.script.scrolls_needed.lock().unwrap();
        if needed > max_attempts {
            return Err(AutomationError::ElementNotFound(format!(
                "{} not visible after {} scrolls",
                text, max_attempts
            )));
        }
        Ok(())
    }
}

impl AutomatorFactory for ScriptedAutomator {
    fn connect(&self, device: &Device) -> AutomationResult<Box<dyn Automator>> {
        self.invoke(Call::Connect(device.serial_no.clone()))?;
        Ok(Box::new(self.clone()))
    }
}

/// Report sink that keeps everything in memory
#[derive(Default)]
pub struct MemoryReportSink {
    started: Mutex<Vec<String>>,
    skipped: Mutex<Vec<String>>,
    reports: Mutex<Vec<JobReport>>,
}

impl MemoryReportSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serials whose job was started
    pub fn started(&self) -> Vec<String> {
        self.started.lock().unwrap().clone()
    }

    /// Serials that were skipped for lack of a profile
    pub fn skipped(&self) -> Vec<String> {
        self.skipped.lock().unwrap().clone()
    }

    pub fn reports(&self) -> Vec<JobReport> {
        self.reports.lock().unwrap().clone()
    }
}

impl ReportSink for MemoryReportSink {
    fn job_started(&self, job: &CustomizationJob) {
        self.started.lock().unwrap().push(job.device.serial_no.clone());
    }

    fn job_skipped(&self, device: &Device) -> Result<()> {
        self.skipped.lock().unwrap().push(device.serial_no.clone());
        Ok(())
    }

    fn record(&self, report: &JobReport) -> Result<()> {
        self.reports.lock().unwrap().push(report.clone());
        Ok(())
    }
}

/// Same profile (or none) for every device
pub struct StaticProfiles(pub Option<String>);

impl StaticProfiles {
    pub fn new(profile: &str) -> Self {
        Self(Some(profile.to_string()))
    }

    pub fn none() -> Self {
        Self(None)
    }
}

impl ProfileLookup for StaticProfiles {
    fn target_profile(&self, _device: &Device) -> Option<String> {
        self.0.clone()
    }
}
