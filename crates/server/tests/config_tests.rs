//! Integration tests for the shipped example configuration
//!
//! Checks that `aurora.example.toml` keeps the layout the daemon reads.

const EXAMPLE_CONFIG: &str = include_str!("../../../aurora.example.toml");

fn example() -> toml::Value {
    toml::from_str(EXAMPLE_CONFIG).unwrap()
}

#[test]
fn test_example_sections() {
    let config = example();
    for section in ["server", "adb", "usb", "timing", "customization", "reports"] {
        assert!(config.get(section).is_some(), "missing [{}]", section);
    }
}

#[test]
fn test_example_dial_template() {
    let config = example();
    let customization = config.get("customization").unwrap();
    let template = customization.get("dial_template").unwrap().as_str().unwrap();
    assert!(template.contains("{imei}"));
    assert!(
        customization.get("max_scroll_attempts").unwrap().as_integer().unwrap() > 0
    );
}

#[test]
fn test_example_profiles() {
    let config = example();
    let profiles = config
        .get("customization")
        .and_then(|c| c.get("profiles"))
        .and_then(|p| p.as_table())
        .unwrap();
    assert_eq!(profiles.get("SM-G991B").unwrap().as_str().unwrap(), "XSP");
    assert!(profiles.values().all(|v| !v.as_str().unwrap().is_empty()));
}

#[test]
fn test_example_filters() {
    let config = example();
    let filters = config
        .get("usb")
        .and_then(|u| u.get("filters"))
        .and_then(|f| f.as_array())
        .unwrap();
    assert!(!filters.is_empty());
    for filter in filters {
        let filter = filter.as_str().unwrap();
        let (vid, pid) = filter.split_once(':').unwrap();
        assert!(vid.starts_with("0x"));
        assert!(pid == "*" || pid.starts_with("0x"));
    }
}

#[test]
fn test_example_timing_in_milliseconds() {
    let config = example();
    let timing = config.get("timing").unwrap().as_table().unwrap();
    let add = timing["add_settle_ms"].as_integer().unwrap();
    let remove = timing["remove_settle_ms"].as_integer().unwrap();
    assert!(add > remove);
    assert!(timing.keys().all(|k| k.ends_with("_ms")));
}
