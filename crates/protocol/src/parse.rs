//! Parsers for `adb` text output
//!
//! Everything `adb` prints is line-oriented text meant for humans, so these
//! parsers are lenient: they skip what they don't recognise instead of
//! failing, and only report an error when nothing usable is left.

use crate::error::{ParseError, Result};
use crate::types::{Bounds, DeviceEntry, DeviceState, ScreenSize, UiNode};

/// Header printed by `adb devices` before the data lines
const LIST_HEADER: &str = "List of devices attached";

/// Parse the output of `adb devices`
///
/// The header line and the daemon start-up chatter (`* daemon not running;
/// starting now ...`) are discarded. Each remaining line is
/// `serial <whitespace> state [extra columns]`. Empty output is a normal
/// "no devices" listing and yields an empty vector.
pub fn parse_device_list(output: &str) -> Vec<DeviceEntry> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| !line.starts_with(LIST_HEADER))
        .filter(|line| !line.starts_with('*'))
        .filter_map(|line| {
            let mut columns = line.split_whitespace();
            let serial_no = columns.next()?;
            let state = columns.next()?;
            Some(DeviceEntry {
                serial_no: serial_no.to_string(),
                state: DeviceState::from_keyword(state),
            })
        })
        .collect()
}

/// Extract the IMEI from `service call iphonesubinfo 1`
///
/// The binder reply is a hex dump whose right-hand column shows the UTF-16
/// string as `'3.5.4.5.'`. The IMEI is every digit found inside the quoted
/// columns, in order.
///
/// ```text
/// Result: Parcel(
///   0x00000000: 00000000 0000000f 00350033 00340035 '........3.5.4.5.'
///   0x00000010: 00370036 00390038 00310030 00330032 '6.7.8.9.0.1.2.3.'
///   0x00000020: 00350034 00000036                   '4.5.6...        ')
/// ```
pub fn parse_imei_parcel(output: &str) -> Option<String> {
    let digits: String = output
        .lines()
        .filter_map(|line| {
            let start = line.find('\'')?;
            let end = line.rfind('\'')?;
            (end > start).then(|| &line[start + 1..end])
        })
        .flat_map(str::chars)
        .filter(char::is_ascii_digit)
        .collect();

    if digits.is_empty() { None } else { Some(digits) }
}

/// Parse the output of `wm size`
///
/// An `Override size` line wins over the `Physical size` line because it is
/// what the UI is laid out against.
pub fn parse_screen_size(output: &str) -> Result<ScreenSize> {
    if output.trim().is_empty() {
        return Err(ParseError::Empty);
    }

    let mut physical = None;
    let mut overridden = None;

    for line in output.lines() {
        let Some((label, value)) = line.split_once(':') else {
            continue;
        };
        let size = parse_dimensions(value.trim());
        match label.trim() {
            "Physical size" => physical = size,
            "Override size" => overridden = size,
            _ => {}
        }
    }

    overridden
        .or(physical)
        .ok_or_else(|| ParseError::InvalidScreenSize(output.trim().to_string()))
}

fn parse_dimensions(value: &str) -> Option<ScreenSize> {
    let (width, height) = value.split_once('x')?;
    Some(ScreenSize {
        width: width.trim().parse().ok()?,
        height: height.trim().parse().ok()?,
    })
}

/// Parse a uiautomator hierarchy dump into its nodes
///
/// Only the attributes needed to find and tap an element are kept. Nodes
/// with unparseable bounds are skipped.
pub fn parse_ui_nodes(xml: &str) -> Result<Vec<UiNode>> {
    if xml.trim().is_empty() {
        return Err(ParseError::Empty);
    }
    if !xml.contains("<hierarchy") {
        let preview: String = xml.trim().chars().take(80).collect();
        return Err(ParseError::InvalidHierarchy(preview));
    }

    let mut nodes = Vec::new();
    let mut rest = xml;

    while let Some(start) = rest.find("<node ") {
        let tag_start = &rest[start..];
        let end = tag_start.find('>').unwrap_or(tag_start.len());
        let tag = &tag_start[..end];

        if let Some(bounds) = attribute(tag, "bounds").and_then(|b| parse_bounds(b).ok()) {
            nodes.push(UiNode {
                text: attribute(tag, "text").map(unescape).unwrap_or_default(),
                content_desc: attribute(tag, "content-desc")
                    .map(unescape)
                    .unwrap_or_default(),
                scrollable: attribute(tag, "scrollable") == Some("true"),
                bounds,
            });
        }

        rest = &tag_start[end..];
    }

    Ok(nodes)
}

/// Parse a `bounds` attribute: `[left,top][right,bottom]`
pub fn parse_bounds(value: &str) -> Result<Bounds> {
    let invalid = || ParseError::InvalidBounds(value.to_string());

    let numbers: Vec<i32> = value
        .split(|c: char| c == '[' || c == ']' || c == ',')
        .filter(|part| !part.is_empty())
        .map(|part| part.trim().parse::<i32>().map_err(|_| invalid()))
        .collect::<Result<_>>()?;

    match numbers.as_slice() {
        [left, top, right, bottom] => Ok(Bounds {
            left: *left,
            top: *top,
            right: *right,
            bottom: *bottom,
        }),
        _ => Err(invalid()),
    }
}

/// Raw value of `name="..."` inside a start tag
fn attribute<'a>(tag: &'a str, name: &str) -> Option<&'a str> {
    let needle = format!(" {}=\"", name);
    let start = tag.find(&needle)? + needle.len();
    let len = tag[start..].find('"')?;
    Some(&tag[start..start + len])
}

fn unescape(value: &str) -> String {
    if !value.contains('&') {
        return value.to_string();
    }

    let mut out = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let entity = &rest[amp..];
        let Some(semi) = entity.find(';') else {
            out.push_str(entity);
            return out;
        };

        let decoded = match &entity[1..semi] {
            "amp" => Some('&'),
            "lt" => Some('<'),
            "gt" => Some('>'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            numeric => numeric
                .strip_prefix('#')
                .and_then(|n| match n.strip_prefix('x') {
                    Some(hex) => u32::from_str_radix(hex, 16).ok(),
                    None => n.parse().ok(),
                })
                .and_then(char::from_u32),
        };

        match decoded {
            Some(c) => out.push(c),
            None => out.push_str(&entity[..=semi]),
        }
        rest = &entity[semi + 1..];
    }

    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_list_skips_header_and_daemon_lines() {
        let output = "* daemon not running; starting now at tcp:5037\n\
                      * daemon started successfully\n\
                      List of devices attached\n\
                      R58M123ABC\tdevice\n\n";
        let entries = parse_device_list(output);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].serial_no, "R58M123ABC");
        assert_eq!(entries[0].state, DeviceState::Authorized);
    }

    #[test]
    fn test_device_list_empty_output() {
        assert!(parse_device_list("").is_empty());
        assert!(parse_device_list("List of devices attached\n").is_empty());
    }

    #[test]
    fn test_device_list_long_format() {
        let output = "List of devices attached\n\
                      ZY22 device usb:1-1 product:lake model:moto_g_7_plus transport_id:3\n";
        let entries = parse_device_list(output);
        assert_eq!(entries[0].serial_no, "ZY22");
        assert_eq!(entries[0].state, DeviceState::Authorized);
    }

    #[test]
    fn test_unescape_entities() {
        assert_eq!(unescape("A &amp; B"), "A & B");
        assert_eq!(unescape("&lt;Install&gt;"), "<Install>");
        assert_eq!(unescape("caf&#233;"), "café");
        assert_eq!(unescape("broken &amp"), "broken &amp");
    }

    #[test]
    fn test_blank_output() {
        assert_eq!(parse_screen_size("  \n"), Err(ParseError::Empty));
        assert_eq!(parse_ui_nodes(""), Err(ParseError::Empty));
    }

    #[test]
    fn test_parse_bounds() {
        let bounds = parse_bounds("[0,210][1080,2148]").unwrap();
        assert_eq!(bounds.left, 0);
        assert_eq!(bounds.bottom, 2148);
        assert!(parse_bounds("[0,210][1080]").is_err());
        assert!(parse_bounds("[a,b][c,d]").is_err());
    }
}
