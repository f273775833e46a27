//! Test utilities for usb-cmdb
//!
//! Fixture records shared by the unit and integration tests of every crate.
//!
//! # Example
//!
//! ```
//! use common::test_utils::{magtek_fixture, magtek_fixture_updated};
//!
//! let before = magtek_fixture();
//! let after = magtek_fixture_updated();
//! assert_ne!(before.software_id, after.software_id);
//! ```

use crate::record::{DeviceRecord, OBJECT_TYPE_GENERIC, OBJECT_TYPE_MAGTEK};

/// A SureSwipe card reader as a fully initialized record
pub fn magtek_fixture() -> DeviceRecord {
    DeviceRecord {
        host_name: "John-SurfacePro".to_string(),
        vendor_id: "0801".to_string(),
        product_id: "0001".to_string(),
        vendor_name: "Mag-Tek".to_string(),
        product_name: "USB Swipe Reader".to_string(),
        serial_num: "24F0014".to_string(),
        software_id: "21042818B01".to_string(),
        product_ver: String::new(),
        bus_number: 1,
        bus_address: 13,
        port_number: 1,
        buffer_size: 24,
        max_pkt_size: 8,
        usb_spec: "1.10".to_string(),
        usb_class: "per-interface".to_string(),
        usb_subclass: "per-interface".to_string(),
        usb_protocol: "0".to_string(),
        device_speed: "full".to_string(),
        device_ver: "1.00".to_string(),
        object_type: OBJECT_TYPE_MAGTEK.to_string(),
        device_sn: "24F0014".to_string(),
        factory_sn: String::new(),
        descriptor_sn: "24F0014".to_string(),
        changes: Vec::new(),
    }
}

/// [`magtek_fixture`] after a firmware update and a move to a USB 2.0 hub
///
/// Differs in software ID and USB spec, and sits at a different bus address.
pub fn magtek_fixture_updated() -> DeviceRecord {
    DeviceRecord {
        software_id: "21042818B02".to_string(),
        usb_spec: "2.00".to_string(),
        bus_address: 17,
        ..magtek_fixture()
    }
}

/// A generic USB keyboard with no vendor properties
pub fn generic_fixture() -> DeviceRecord {
    DeviceRecord {
        host_name: "John-SurfacePro".to_string(),
        vendor_id: "045e".to_string(),
        product_id: "07a5".to_string(),
        vendor_name: "Microsoft".to_string(),
        product_name: "Wireless Keyboard".to_string(),
        bus_number: 1,
        bus_address: 4,
        port_number: 2,
        max_pkt_size: 8,
        usb_spec: "2.00".to_string(),
        usb_class: "per-interface".to_string(),
        usb_subclass: "per-interface".to_string(),
        usb_protocol: "0".to_string(),
        device_speed: "full".to_string(),
        device_ver: "7.33".to_string(),
        object_type: OBJECT_TYPE_GENERIC.to_string(),
        ..Default::default()
    }
}

/// [`magtek_fixture`] as a persisted snapshot document
pub fn magtek_fixture_json() -> String {
    r#"{
        "host_name": "John-SurfacePro",
        "vendor_id": "0801",
        "product_id": "0001",
        "vendor_name": "Mag-Tek",
        "product_name": "USB Swipe Reader",
        "serial_num": "24F0014",
        "software_id": "21042818B01",
        "product_ver": "",
        "bus_number": 1,
        "bus_address": 13,
        "port_number": 1,
        "buffer_size": 24,
        "max_pkt_size": 8,
        "usb_spec": "1.10",
        "usb_class": "per-interface",
        "usb_subclass": "per-interface",
        "usb_protocol": "0",
        "device_speed": "full",
        "device_ver": "1.00",
        "object_type": "usbci::Magtek",
        "device_sn": "24F0014",
        "factory_sn": "",
        "descriptor_sn": "24F0014"
    }"#
    .to_string()
}
