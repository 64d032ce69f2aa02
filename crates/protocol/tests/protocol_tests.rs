//! Integration tests for the adb output parsers
//!
//! Uses captured output from real devices where the exact layout matters
//! (binder parcels, uiautomator dumps).

use protocol::{
    DeviceState, ParseError, parse_device_list, parse_imei_parcel, parse_screen_size,
    parse_ui_nodes,
};

const IMEI_PARCEL: &str = "Result: Parcel(\n\
  0x00000000: 00000000 0000000f 00350033 00340035 '........3.5.4.5.'\n\
  0x00000010: 00370036 00390038 00310030 00330032 '6.7.8.9.0.1.2.3.'\n\
  0x00000020: 00350034 00000036                   '4.5.6...        ')\n";

const CSC_MENU_DUMP: &str = r#"<?xml version='1.0' encoding='UTF-8' standalone='yes' ?><hierarchy rotation="0"><node index="0" text="" resource-id="" class="android.widget.FrameLayout" package="com.samsung.android.cidmanager" content-desc="" checkable="false" checked="false" clickable="false" enabled="true" focusable="false" focused="false" scrollable="false" long-clickable="false" password="false" selected="false" bounds="[0,0][1080,2400]"><node index="0" text="" resource-id="android:id/list" class="android.widget.ListView" package="com.samsung.android.cidmanager" content-desc="" checkable="false" checked="false" clickable="false" enabled="true" focusable="true" focused="false" scrollable="true" long-clickable="false" password="false" selected="false" bounds="[0,210][1080,2148]"><node index="0" text="XSP (Singapore)" resource-id="android:id/text1" class="android.widget.CheckedTextView" package="com.samsung.android.cidmanager" content-desc="" checkable="true" checked="false" clickable="true" enabled="true" focusable="true" focused="false" scrollable="false" long-clickable="false" password="false" selected="false" bounds="[0,210][1080,354]" /><node index="1" text="XTC &amp; XTE" resource-id="android:id/text1" class="android.widget.CheckedTextView" package="com.samsung.android.cidmanager" content-desc="" checkable="true" checked="false" clickable="true" enabled="true" focusable="true" focused="false" scrollable="false" long-clickable="false" password="false" selected="false" bounds="[0,354][1080,498]" /></node><node index="1" text="Install" resource-id="android:id/button1" class="android.widget.Button" package="com.samsung.android.cidmanager" content-desc="Install" checkable="false" checked="false" clickable="true" enabled="true" focusable="true" focused="false" scrollable="false" long-clickable="false" password="false" selected="false" bounds="[540,2148][1080,2292]" /></node></hierarchy>UI hierchary dumped to: /dev/tty"#;

mod device_list {
    use super::*;

    #[test]
    fn test_mixed_states() {
        let output = "List of devices attached\n\
                      R58M123ABC\tdevice\n\
                      ZY22BQ\tunauthorized\n\
                      emulator-5554\toffline\n";
        let entries = parse_device_list(output);

        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].state, DeviceState::Authorized);
        assert_eq!(entries[1].serial_no, "ZY22BQ");
        assert_eq!(entries[1].state, DeviceState::Unauthorized);
        assert_eq!(entries[2].state, DeviceState::Other("offline".to_string()));
    }

    #[test]
    fn test_line_without_state_is_ignored() {
        let entries = parse_device_list("List of devices attached\nR58M123ABC\n");
        assert!(entries.is_empty());
    }

    #[test]
    fn test_crlf_line_endings() {
        let entries = parse_device_list("List of devices attached\r\nR58M\tdevice\r\n");
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].serial_no, "R58M");
    }
}

mod imei {
    use super::*;

    #[test]
    fn test_parcel_digits_in_order() {
        assert_eq!(
            parse_imei_parcel(IMEI_PARCEL).as_deref(),
            Some("354567890123456")
        );
    }

    #[test]
    fn test_parcel_without_string_payload() {
        // Returned on devices where the caller lacks READ_PRIVILEGED_PHONE_STATE
        let denied = "Result: Parcel(fffffffc ffffffff '........')";
        assert_eq!(parse_imei_parcel(denied), None);
        assert_eq!(parse_imei_parcel(""), None);
    }
}

mod screen_size {
    use super::*;

    #[test]
    fn test_physical_size() {
        let size = parse_screen_size("Physical size: 1080x2400\n").unwrap();
        assert_eq!(size.width, 1080);
        assert_eq!(size.height, 2400);
    }

    #[test]
    fn test_override_wins() {
        let size = parse_screen_size("Physical size: 1440x3200\nOverride size: 1080x2400\n").unwrap();
        assert_eq!(size.width, 1080);
        assert_eq!(size.height, 2400);
    }

    #[test]
    fn test_garbage_is_an_error() {
        assert!(matches!(
            parse_screen_size("error: closed"),
            Err(ParseError::InvalidScreenSize(_))
        ));
    }
}

mod ui_dump {
    use super::*;

    #[test]
    fn test_nodes_are_extracted() {
        let nodes = parse_ui_nodes(CSC_MENU_DUMP).unwrap();
        assert_eq!(nodes.len(), 5);

        let list = &nodes[1];
        assert!(list.scrollable);
        assert_eq!(list.bounds.top, 210);

        let first = &nodes[2];
        assert_eq!(first.text, "XSP (Singapore)");
        assert_eq!(first.bounds.center(), (540, 282));
    }

    #[test]
    fn test_entities_are_unescaped() {
        let nodes = parse_ui_nodes(CSC_MENU_DUMP).unwrap();
        assert!(nodes.iter().any(|n| n.text == "XTC & XTE"));
    }

    #[test]
    fn test_content_desc() {
        let nodes = parse_ui_nodes(CSC_MENU_DUMP).unwrap();
        let button = nodes.iter().find(|n| n.text == "Install").unwrap();
        assert_eq!(button.content_desc, "Install");
        assert_eq!(button.bounds.center(), (810, 2220));
    }

    #[test]
    fn test_not_a_dump() {
        let result = parse_ui_nodes("ERROR: could not get idle state.");
        assert!(matches!(result, Err(ParseError::InvalidHierarchy(_))));
    }
}
