//! Vendor protocol constants and USB control setup definitions
//!
//! The card readers carry vendor commands inside HID feature reports. Every
//! command is a write phase (SET_REPORT) followed by a read phase
//! (GET_REPORT) on the default control endpoint, both using the same
//! device-specific buffer size.

use serde::{Deserialize, Serialize};

/// MagTek USB vendor ID
pub const MAGTEK_VENDOR_ID: u16 = 0x0801;

/// Known product IDs
pub const SURESWIPE_KB_PID: u16 = 0x0001;
pub const SURESWIPE_HID_PID: u16 = 0x0002;
pub const MAGNESAFE_SWIPE_HID_PID: u16 = 0x0011;
pub const MAGNESAFE_INSERT_HID_PID: u16 = 0x0013;
pub const MAGNESAFE_WIRELESS_HID_PID: u16 = 0x0014;

/// SureSwipe command buffer size
pub const BUFFER_SIZE_SURESWIPE: usize = 24;
/// MagneSafe command buffer size
pub const BUFFER_SIZE_MAGNESAFE: usize = 60;

/// Candidate buffer sizes, in probe order
pub const BUFFER_SIZES: [usize; 2] = [BUFFER_SIZE_SURESWIPE, BUFFER_SIZE_MAGNESAFE];

/// Bytes taken by the command header of a set request
pub const COMMAND_HEADER_LEN: usize = 3;

/// Number of factory serial characters copied by default
pub const DEFAULT_SN_LENGTH: usize = 7;

/// Fixed device descriptor length
pub const DEVICE_DESCRIPTOR_LEN: usize = 18;
/// Fixed configuration descriptor length (header only)
pub const CONFIG_DESCRIPTOR_LEN: usize = 9;

/// Vendor command byte (offset 0 of a request)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Command {
    GetProperty = 0x00,
    SetProperty = 0x01,
    ResetDevice = 0x02,
}

/// Vendor property ID (offset 2 of a get/set request)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum PropertyId {
    /// Software ID, e.g. `21042818B01`
    SoftwareId = 0x00,
    /// Configurable device serial number
    DeviceSn = 0x01,
    /// Factory serial number (write-once)
    FactorySn = 0x03,
    /// Product/firmware version
    ProductVer = 0x04,
}

impl PropertyId {
    /// Human-readable property name used in logs and errors
    pub fn name(&self) -> &'static str {
        match self {
            PropertyId::SoftwareId => "SoftwareID",
            PropertyId::DeviceSn => "DeviceSN",
            PropertyId::FactorySn => "FactorySN",
            PropertyId::ProductVer => "ProductVer",
        }
    }
}

/// Result codes returned at offset 0 of a response
pub mod result_code {
    pub const SUCCESS: u8 = 0x00;
    pub const FAILURE: u8 = 0x01;
    pub const BAD_PARAMETER: u8 = 0x02;
    /// Returned when writing an already-programmed factory serial
    pub const ALREADY_SET: u8 = 0x07;
}

/// bmRequestType bits
pub mod request_type {
    pub const DIRECTION_OUT: u8 = 0x00;
    pub const DIRECTION_IN: u8 = 0x80;
    pub const TYPE_STANDARD: u8 = 0x00;
    pub const TYPE_CLASS: u8 = 0x20;
    pub const TYPE_VENDOR: u8 = 0x40;
    pub const RECIPIENT_DEVICE: u8 = 0x00;
    pub const RECIPIENT_INTERFACE: u8 = 0x01;
    pub const RECIPIENT_ENDPOINT: u8 = 0x02;
    pub const RECIPIENT_OTHER: u8 = 0x03;
}

/// bRequest codes
pub mod request {
    pub const GET_REPORT: u8 = 0x01;
    pub const SET_REPORT: u8 = 0x09;
    pub const GET_DESCRIPTOR: u8 = 0x06;
}

/// wValue codes
pub mod value {
    pub const DEVICE_DESCRIPTOR: u16 = 0x0100;
    pub const CONFIG_DESCRIPTOR: u16 = 0x0200;
    pub const HID_DESCRIPTOR: u16 = 0x2200;
    pub const FEATURE_REPORT: u16 = 0x0300;
}

/// Setup packet fields of a control transfer (everything but the data stage)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlSetup {
    /// bmRequestType (direction | type | recipient)
    pub request_type: u8,
    /// bRequest
    pub request: u8,
    /// wValue
    pub value: u16,
    /// wIndex
    pub index: u16,
}

impl ControlSetup {
    /// Write phase of a vendor command (HID SET_REPORT, feature report)
    pub const SET_FEATURE_REPORT: ControlSetup = ControlSetup {
        request_type: request_type::DIRECTION_OUT
            | request_type::TYPE_CLASS
            | request_type::RECIPIENT_DEVICE,
        request: request::SET_REPORT,
        value: value::FEATURE_REPORT,
        index: 0,
    };

    /// Read phase of a vendor command (HID GET_REPORT, feature report)
    pub const GET_FEATURE_REPORT: ControlSetup = ControlSetup {
        request_type: request_type::DIRECTION_IN
            | request_type::TYPE_CLASS
            | request_type::RECIPIENT_DEVICE,
        request: request::GET_REPORT,
        value: value::FEATURE_REPORT,
        index: 0,
    };

    /// Standard GET_DESCRIPTOR for the device descriptor
    pub const GET_DEVICE_DESCRIPTOR: ControlSetup = ControlSetup {
        request_type: request_type::DIRECTION_IN
            | request_type::TYPE_STANDARD
            | request_type::RECIPIENT_DEVICE,
        request: request::GET_DESCRIPTOR,
        value: value::DEVICE_DESCRIPTOR,
        index: 0,
    };

    /// Standard GET_DESCRIPTOR for the first configuration descriptor
    pub const GET_CONFIG_DESCRIPTOR: ControlSetup = ControlSetup {
        request_type: request_type::DIRECTION_IN
            | request_type::TYPE_STANDARD
            | request_type::RECIPIENT_DEVICE,
        request: request::GET_DESCRIPTOR,
        value: value::CONFIG_DESCRIPTOR,
        index: 0,
    };

    /// Direction bit of bmRequestType
    pub fn is_in(&self) -> bool {
        (self.request_type & request_type::DIRECTION_IN) != 0
    }
}

/// USB device speed
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum DeviceSpeed {
    /// Speed not reported by the host controller
    #[default]
    Unknown,
    /// Low speed - 1.5 Mbps (USB 1.0)
    Low,
    /// Full speed - 12 Mbps (USB 1.1)
    Full,
    /// High speed - 480 Mbps (USB 2.0)
    High,
    /// SuperSpeed - 5 Gbps (USB 3.0)
    Super,
    /// SuperSpeed+ - 10 Gbps (USB 3.1)
    SuperPlus,
}

impl std::fmt::Display for DeviceSpeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            DeviceSpeed::Unknown => "unknown",
            DeviceSpeed::Low => "low",
            DeviceSpeed::Full => "full",
            DeviceSpeed::High => "high",
            DeviceSpeed::Super => "super",
            DeviceSpeed::SuperPlus => "super-plus",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_report_setup_bytes() {
        assert_eq!(ControlSetup::SET_FEATURE_REPORT.request_type, 0x21);
        assert_eq!(ControlSetup::SET_FEATURE_REPORT.request, 0x09);
        assert_eq!(ControlSetup::GET_FEATURE_REPORT.request_type, 0xA1);
        assert_eq!(ControlSetup::GET_FEATURE_REPORT.request, 0x01);
        assert_eq!(ControlSetup::GET_FEATURE_REPORT.value, 0x0300);
        assert!(ControlSetup::GET_FEATURE_REPORT.is_in());
        assert!(!ControlSetup::SET_FEATURE_REPORT.is_in());
    }

    #[test]
    fn test_descriptor_setup_bytes() {
        assert_eq!(ControlSetup::GET_DEVICE_DESCRIPTOR.request_type, 0x80);
        assert_eq!(ControlSetup::GET_DEVICE_DESCRIPTOR.value, 0x0100);
        assert_eq!(ControlSetup::GET_CONFIG_DESCRIPTOR.value, 0x0200);
    }

    #[test]
    fn test_buffer_size_probe_order() {
        assert_eq!(BUFFER_SIZES, [24, 60]);
    }

    #[test]
    fn test_speed_display() {
        assert_eq!(DeviceSpeed::Full.to_string(), "full");
        assert_eq!(DeviceSpeed::High.to_string(), "high");
        assert_eq!(DeviceSpeed::default().to_string(), "unknown");
    }
}
