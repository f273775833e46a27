//! Standard USB descriptor parsing
//!
//! Decodes the raw buffers returned by a GET_DESCRIPTOR control transfer.
//! All multi-byte fields are little-endian [USB 2.0 §8.1].

use crate::error::{ProtocolError, Result};
use crate::types::{CONFIG_DESCRIPTOR_LEN, DEVICE_DESCRIPTOR_LEN};
use byteorder::{ByteOrder, LittleEndian};
use serde::{Deserialize, Serialize};

/// Device descriptor (18 bytes)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceDescriptor {
    /// bLength
    pub length: u8,
    /// bDescriptorType (0x01)
    pub descriptor_type: u8,
    /// bcdUSB
    pub usb_spec: u16,
    /// bDeviceClass
    pub device_class: u8,
    /// bDeviceSubClass
    pub device_subclass: u8,
    /// bDeviceProtocol
    pub device_protocol: u8,
    /// bMaxPacketSize0
    pub max_packet_size: u8,
    /// idVendor
    pub vendor_id: u16,
    /// idProduct
    pub product_id: u16,
    /// bcdDevice
    pub device_release: u16,
    /// iManufacturer
    pub manufacturer_index: u8,
    /// iProduct
    pub product_index: u8,
    /// iSerialNumber
    pub serial_index: u8,
    /// bNumConfigurations
    pub num_configurations: u8,
}

impl DeviceDescriptor {
    /// Parse a device descriptor from a GET_DESCRIPTOR buffer
    ///
    /// Extra trailing bytes are ignored.
    ///
    /// # Example
    /// ```
    /// use protocol::DeviceDescriptor;
    ///
    /// let raw = [
    ///     0x12, 0x01, 0x10, 0x01, 0x00, 0x00, 0x00, 0x08,
    ///     0x01, 0x08, 0x01, 0x00, 0x00, 0x01, 0x01, 0x02, 0x03, 0x01,
    /// ];
    /// let desc = DeviceDescriptor::parse(&raw).unwrap();
    /// assert_eq!(desc.vendor_id, 0x0801);
    /// assert_eq!(desc.usb_spec_string(), "1.10");
    /// ```
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < DEVICE_DESCRIPTOR_LEN {
            return Err(ProtocolError::MalformedDescriptor {
                kind: "device",
                needed: DEVICE_DESCRIPTOR_LEN,
                actual: data.len(),
            });
        }

        Ok(Self {
            length: data[0],
            descriptor_type: data[1],
            usb_spec: LittleEndian::read_u16(&data[2..4]),
            device_class: data[4],
            device_subclass: data[5],
            device_protocol: data[6],
            max_packet_size: data[7],
            vendor_id: LittleEndian::read_u16(&data[8..10]),
            product_id: LittleEndian::read_u16(&data[10..12]),
            device_release: LittleEndian::read_u16(&data[12..14]),
            manufacturer_index: data[14],
            product_index: data[15],
            serial_index: data[16],
            num_configurations: data[17],
        })
    }

    /// Index of the manufacturer string descriptor, if present
    pub fn manufacturer_string_index(&self) -> Option<u8> {
        non_zero(self.manufacturer_index)
    }

    /// Index of the product string descriptor, if present
    pub fn product_string_index(&self) -> Option<u8> {
        non_zero(self.product_index)
    }

    /// Index of the serial number string descriptor, if present
    pub fn serial_number_string_index(&self) -> Option<u8> {
        non_zero(self.serial_index)
    }

    /// USB specification release, e.g. `"2.00"`
    pub fn usb_spec_string(&self) -> String {
        bcd_version(self.usb_spec)
    }

    /// Device release number, e.g. `"1.00"`
    pub fn device_version_string(&self) -> String {
        bcd_version(self.device_release)
    }
}

/// Configuration descriptor header (9 bytes)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConfigDescriptor {
    /// bLength
    pub length: u8,
    /// bDescriptorType (0x02)
    pub descriptor_type: u8,
    /// wTotalLength (descriptor plus all interface/endpoint descriptors)
    pub total_length: u16,
    /// bNumInterfaces
    pub num_interfaces: u8,
    /// bConfigurationValue
    pub configuration_value: u8,
    /// iConfiguration
    pub configuration_index: u8,
    /// bmAttributes
    pub attributes: u8,
    /// bMaxPower, in 2 mA units
    pub max_power: u8,
}

impl ConfigDescriptor {
    /// Parse a configuration descriptor header
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < CONFIG_DESCRIPTOR_LEN {
            return Err(ProtocolError::MalformedDescriptor {
                kind: "configuration",
                needed: CONFIG_DESCRIPTOR_LEN,
                actual: data.len(),
            });
        }

        Ok(Self {
            length: data[0],
            descriptor_type: data[1],
            total_length: LittleEndian::read_u16(&data[2..4]),
            num_interfaces: data[4],
            configuration_value: data[5],
            configuration_index: data[6],
            attributes: data[7],
            max_power: data[8],
        })
    }

    /// Bit 6 of bmAttributes
    pub fn self_powered(&self) -> bool {
        (self.attributes & 0x40) != 0
    }

    /// Bit 5 of bmAttributes
    pub fn remote_wakeup(&self) -> bool {
        (self.attributes & 0x20) != 0
    }

    /// Maximum power draw in milliamps
    pub fn max_power_ma(&self) -> u16 {
        u16::from(self.max_power) * 2
    }
}

fn non_zero(index: u8) -> Option<u8> {
    match index {
        0 => None,
        n => Some(n),
    }
}

/// Render a BCD release number as `major.minor`
///
/// `0x0110` renders as `"1.10"`, `0x0200` as `"2.00"`.
pub fn bcd_version(bcd: u16) -> String {
    let [minor, major] = bcd.to_le_bytes();
    format!("{}.{:02}", decode_bcd(major), decode_bcd(minor))
}

fn decode_bcd(byte: u8) -> u32 {
    u32::from(byte >> 4) * 10 + u32::from(byte & 0x0f)
}

/// Render a 16-bit USB ID as four lowercase hex digits
pub fn hex_id(id: u16) -> String {
    format!("{:04x}", id)
}

/// Name of a USB class code, as reported in device records
pub fn class_name(class: u8) -> String {
    let name = match class {
        0x00 => "per-interface",
        0x01 => "audio",
        0x02 => "comm",
        0x03 => "hid",
        0x05 => "physical",
        0x06 => "image",
        0x07 => "printer",
        0x08 => "mass storage",
        0x09 => "hub",
        0x0a => "data",
        0x0b => "smart card",
        0x0d => "content security",
        0x0e => "video",
        0x0f => "personal healthcare",
        0x10 => "audio/video",
        0x11 => "billboard",
        0xdc => "diagnostic device",
        0xe0 => "wireless",
        0xef => "miscellaneous",
        0xfe => "application-specific",
        0xff => "vendor-specific",
        other => return format!("unknown class {:#04x}", other),
    };
    name.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SURESWIPE: [u8; 18] = [
        0x12, 0x01, 0x10, 0x01, 0x00, 0x00, 0x00, 0x08, 0x01, 0x08, 0x01, 0x00, 0x00, 0x01, 0x01,
        0x02, 0x03, 0x01,
    ];

    #[test]
    fn test_parse_device_descriptor() {
        let desc = DeviceDescriptor::parse(&SURESWIPE).unwrap();
        assert_eq!(desc.length, 18);
        assert_eq!(desc.descriptor_type, 0x01);
        assert_eq!(desc.usb_spec, 0x0110);
        assert_eq!(desc.max_packet_size, 8);
        assert_eq!(desc.vendor_id, 0x0801);
        assert_eq!(desc.product_id, 0x0001);
        assert_eq!(desc.device_release, 0x0100);
        assert_eq!(desc.manufacturer_string_index(), Some(1));
        assert_eq!(desc.product_string_index(), Some(2));
        assert_eq!(desc.serial_number_string_index(), Some(3));
        assert_eq!(desc.num_configurations, 1);
    }

    #[test]
    fn test_little_endian_reconstruction() {
        let mut raw = SURESWIPE;
        raw[8] = 0x01;
        raw[9] = 0x02;
        let desc = DeviceDescriptor::parse(&raw).unwrap();
        assert_eq!(desc.vendor_id, 0x0201);
    }

    #[test]
    fn test_short_device_descriptor() {
        let err = DeviceDescriptor::parse(&SURESWIPE[..17]).unwrap_err();
        assert_eq!(
            err,
            ProtocolError::MalformedDescriptor {
                kind: "device",
                needed: 18,
                actual: 17
            }
        );
    }

    #[test]
    fn test_missing_string_indices() {
        let mut raw = SURESWIPE;
        raw[14] = 0;
        raw[16] = 0;
        let desc = DeviceDescriptor::parse(&raw).unwrap();
        assert_eq!(desc.manufacturer_string_index(), None);
        assert_eq!(desc.serial_number_string_index(), None);
    }

    #[test]
    fn test_parse_config_descriptor() {
        let raw = [0x09, 0x02, 0x22, 0x00, 0x01, 0x01, 0x00, 0xa0, 0x32];
        let desc = ConfigDescriptor::parse(&raw).unwrap();
        assert_eq!(desc.total_length, 0x0022);
        assert_eq!(desc.num_interfaces, 1);
        assert_eq!(desc.configuration_value, 1);
        assert!(desc.remote_wakeup());
        assert!(!desc.self_powered());
        assert_eq!(desc.max_power_ma(), 100);
    }

    #[test]
    fn test_short_config_descriptor() {
        assert!(matches!(
            ConfigDescriptor::parse(&[0x09, 0x02]),
            Err(ProtocolError::MalformedDescriptor { needed: 9, .. })
        ));
    }

    #[test]
    fn test_bcd_version() {
        assert_eq!(bcd_version(0x0110), "1.10");
        assert_eq!(bcd_version(0x0200), "2.00");
        assert_eq!(bcd_version(0x0320), "3.20");
    }

    #[test]
    fn test_class_names() {
        assert_eq!(class_name(0x00), "per-interface");
        assert_eq!(class_name(0x03), "hid");
        assert_eq!(class_name(0x42), "unknown class 0x42");
    }

    #[test]
    fn test_hex_id() {
        assert_eq!(hex_id(0x0801), "0801");
        assert_eq!(hex_id(0x0acd), "0acd");
    }
}
