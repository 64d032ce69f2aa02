//! UI automation over `adb shell input`
//!
//! Elements are located in a uiautomator hierarchy dump and tapped at the
//! centre of their bounds. Scrolling swipes up inside the first scrollable
//! container, or across the whole screen when the dump has none.

use super::Adb;
use monitor::{AutomationError, AutomationResult, Automator, AutomatorFactory, MatchMode, QueryError};
use protocol::{Bounds, Device, ParseError, UiNode, parse_screen_size, parse_ui_nodes};
use tracing::{debug, trace};

/// Keyguard markers in `dumpsys window` across Android releases
const KEYGUARD_MARKERS: [&str; 2] = ["mDreamingLockscreen=true", "mShowingLockscreen=true"];

/// Swipe duration in milliseconds
const SWIPE_DURATION_MS: u32 = 300;

fn transport(e: QueryError) -> AutomationError {
    AutomationError::Transport(e.to_string())
}

fn bad_dump(e: ParseError) -> AutomationError {
    AutomationError::Transport(e.to_string())
}

/// Opens [`AdbAutomator`] sessions
pub struct AdbAutomatorFactory {
    adb: Adb,
}

impl AdbAutomatorFactory {
    pub fn new(adb: Adb) -> Self {
        Self { adb }
    }
}

impl AutomatorFactory for AdbAutomatorFactory {
    fn connect(&self, device: &Device) -> AutomationResult<Box<dyn Automator>> {
        let state = self
            .adb
            .run(&["-s", &device.serial_no, "get-state"])
            .map_err(transport)?;
        if state.trim() != "device" {
            return Err(AutomationError::Transport(format!(
                "{} is {}",
                device.serial_no,
                state.trim()
            )));
        }

        Ok(Box::new(AdbAutomator {
            adb: self.adb.clone(),
            serial_no: device.serial_no.clone(),
        }))
    }
}

/// Drives one handset
pub struct AdbAutomator {
    adb: Adb,
    serial_no: String,
}

impl AdbAutomator {
    fn shell(&self, args: &[&str]) -> AutomationResult<String> {
        self.adb.shell(&self.serial_no, args).map_err(transport)
    }

    fn dump(&self) -> AutomationResult<Vec<UiNode>> {
        let xml = self
            .adb
            .run(&["-s", &self.serial_no, "exec-out", "uiautomator", "dump", "/dev/tty"])
            .map_err(transport)?;
        parse_ui_nodes(&xml).map_err(bad_dump)
    }

    fn is_locked(&self) -> AutomationResult<bool> {
        let window = self.shell(&["dumpsys", "window"])?;
        Ok(KEYGUARD_MARKERS.iter().any(|m| window.contains(m)))
    }

    fn tap(&self, x: i32, y: i32) -> AutomationResult<()> {
        self.shell(&["input", "tap", &x.to_string(), &y.to_string()])
            .map(drop)
    }

    fn swipe(&self, (x1, y1): (i32, i32), (x2, y2): (i32, i32)) -> AutomationResult<()> {
        self.shell(&[
            "input",
            "swipe",
            &x1.to_string(),
            &y1.to_string(),
            &x2.to_string(),
            &y2.to_string(),
            &SWIPE_DURATION_MS.to_string(),
        ])
        .map(drop)
    }

    fn screen(&self) -> AutomationResult<Bounds> {
        let size = parse_screen_size(&self.shell(&["wm", "size"])?)
            .map_err(|e| AutomationError::Other(e.to_string()))?;
        Ok(Bounds {
            left: 0,
            top: 0,
            right: size.width as i32,
            bottom: size.height as i32,
        })
    }
}

impl Automator for AdbAutomator {
    fn unlock(&self) -> AutomationResult<()> {
        self.shell(&["input", "keyevent", "KEYCODE_WAKEUP"])?;
        self.shell(&["wm", "dismiss-keyguard"])?;
        if self.is_locked()? {
            return Err(AutomationError::ElementNotFound(
                "keyguard still showing".to_string(),
            ));
        }
        Ok(())
    }

    fn swipe_unlock(&self) -> AutomationResult<()> {
        let (from, to) = scroll_gesture(&self.screen()?);
        self.swipe(from, to)?;
        if self.is_locked()? {
            return Err(AutomationError::ElementNotFound(
                "keyguard still showing after swipe".to_string(),
            ));
        }
        Ok(())
    }

    fn dial(&self, code: &str) -> AutomationResult<()> {
        let uri = format!("'tel:{}'", encode_dial_code(code));
        debug!(serial_no = %self.serial_no, "Dialing {}", code);
        self.shell(&[
            "am",
            "start",
            "-a",
            "android.intent.action.DIAL",
            "-d",
            &uri,
        ])
        .map(drop)
    }

    fn tap_by_text(&self, text: &str, mode: MatchMode) -> AutomationResult<()> {
        let nodes = self.dump()?;
        let node = find_node(&nodes, text, mode)
            .ok_or_else(|| AutomationError::ElementNotFound(text.to_string()))?;
        let (x, y) = node.bounds.center();
        trace!(serial_no = %self.serial_no, "Tapping {:?} at ({}, {})", text, x, y);
        self.tap(x, y)
    }

    fn scroll_to_text(&self, text: &str, mode: MatchMode, max_attempts: u32) -> AutomationResult<()> {
        for attempt in 0..=max_attempts {
            let nodes = self.dump()?;
            if find_node(&nodes, text, mode).is_some() {
                return Ok(());
            }
            if attempt == max_attempts {
                break;
            }

            let area = match nodes.iter().find(|n| n.scrollable && n.bounds.is_visible()) {
                Some(container) => container.bounds,
                None => self.screen()?,
            };
            let (from, to) = scroll_gesture(&area);
            self.swipe(from, to)?;
        }

        Err(AutomationError::ElementNotFound(format!(
            "{} (after {} scrolls)",
            text, max_attempts
        )))
    }
}

/// First visible node whose text or description matches
fn find_node<'a>(nodes: &'a [UiNode], text: &str, mode: MatchMode) -> Option<&'a UiNode> {
    nodes.iter().find(|node| {
        node.bounds.is_visible()
            && (mode.matches(&node.text, text)
                || (!node.content_desc.is_empty() && mode.matches(&node.content_desc, text)))
    })
}

/// Upward swipe through the middle of `area`, from 75% to 25% of its height
fn scroll_gesture(area: &Bounds) -> ((i32, i32), (i32, i32)) {
    let x = (area.left + area.right) / 2;
    let height = area.bottom - area.top;
    (
        (x, area.top + height * 3 / 4),
        (x, area.top + height / 4),
    )
}

/// `#` would start a URI fragment, so it is sent percent-encoded
fn encode_dial_code(code: &str) -> String {
    code.replace('#', "%23")
}
