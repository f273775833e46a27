//! Test utilities for device sessions
//!
//! [`SimulatedCardReader`] is an in-memory [`Transport`] that answers
//! descriptor requests and vendor feature-report commands the way a MagTek
//! reader does, and records every transfer it sees.
//!
//! # Example
//!
//! ```
//! use device::MagtekDevice;
//! use device::test_utils::SimulatedCardReader;
//!
//! let (reader, _errors) = MagtekDevice::open(SimulatedCardReader::magnesafe(), "host").unwrap();
//! assert_eq!(reader.buffer_size(), 60);
//! ```

use crate::transport::{Location, Transport, TransportError};
use protocol::{Command, ControlSetup, DeviceSpeed, PropertyId, result_code};
use std::collections::HashMap;
use std::time::Duration;

/// One control transfer seen by the simulator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRecord {
    pub setup: ControlSetup,
    pub len: usize,
}

/// In-memory MagTek reader
#[derive(Debug, Clone)]
pub struct SimulatedCardReader {
    /// Only feature reports of exactly this size are accepted
    pub buffer_size: usize,
    /// NVRAM properties keyed by property ID
    pub properties: HashMap<u8, String>,
    /// Serial number served by the string descriptor; copied from NVRAM on
    /// reset
    pub descriptor_serial: String,
    pub manufacturer: String,
    pub product: String,
    /// Raw 18-byte device descriptor
    pub device_descriptor: Vec<u8>,
    /// Raw 9-byte configuration descriptor header
    pub config_descriptor: Vec<u8>,
    pub location: Location,
    pub speed: DeviceSpeed,
    /// String descriptor indices that fail with a stall
    pub unreadable_strings: Vec<u8>,
    /// Property IDs answered with a bad-parameter result code
    pub rejected_properties: Vec<u8>,
    /// Result code returned to a vendor reset
    pub reset_result: u8,
    /// Read phases return one byte less than requested
    pub short_reads: bool,
    /// Every feature-report transfer stalls, whatever its size
    pub stall_feature_reports: bool,
    /// Every transfer, in order
    pub log: Vec<TransferRecord>,
    /// Settle delays requested after resets
    pub settled: Vec<Duration>,
    pending: Option<Vec<u8>>,
}

/// Build an 18-byte device descriptor
///
/// String indices are 1 (manufacturer), 2 (product) and 3 (serial).
pub fn device_descriptor_bytes(
    usb_spec: u16,
    max_packet_size: u8,
    vendor_id: u16,
    product_id: u16,
    device_release: u16,
) -> Vec<u8> {
    let mut raw = vec![0x12, 0x01];
    raw.extend_from_slice(&usb_spec.to_le_bytes());
    raw.extend_from_slice(&[0x00, 0x00, 0x00, max_packet_size]);
    raw.extend_from_slice(&vendor_id.to_le_bytes());
    raw.extend_from_slice(&product_id.to_le_bytes());
    raw.extend_from_slice(&device_release.to_le_bytes());
    raw.extend_from_slice(&[0x01, 0x02, 0x03, 0x01]);
    raw
}

impl SimulatedCardReader {
    fn new(buffer_size: usize, product_id: u16, usb_spec: u16, product: &str) -> Self {
        Self {
            buffer_size,
            properties: HashMap::new(),
            descriptor_serial: String::new(),
            manufacturer: "Mag-Tek".to_string(),
            product: product.to_string(),
            device_descriptor: device_descriptor_bytes(
                usb_spec,
                8,
                protocol::MAGTEK_VENDOR_ID,
                product_id,
                0x0100,
            ),
            // bus powered, 100mA, one interface
            config_descriptor: vec![0x09, 0x02, 0x22, 0x00, 0x01, 0x01, 0x00, 0x80, 0x32],
            location: Location {
                bus: 1,
                address: 13,
                port: 1,
            },
            speed: DeviceSpeed::Full,
            unreadable_strings: Vec::new(),
            rejected_properties: Vec::new(),
            reset_result: result_code::SUCCESS,
            short_reads: false,
            stall_feature_reports: false,
            log: Vec::new(),
            settled: Vec::new(),
            pending: None,
        }
    }

    /// SureSwipe reader: 24-byte buffers, serial `24F0014`, no factory serial
    pub fn sureswipe() -> Self {
        let mut reader = Self::new(24, 0x0001, 0x0110, "USB Swipe Reader");
        reader.set(PropertyId::SoftwareId, "21042818B01");
        reader.set(PropertyId::DeviceSn, "24F0014");
        reader.descriptor_serial = "24F0014".to_string();
        reader
    }

    /// MagneSafe reader: 60-byte buffers, factory serial set, no
    /// configurable serial
    pub fn magnesafe() -> Self {
        let mut reader = Self::new(60, 0x0011, 0x0200, "USB Swipe Insert Reader");
        reader.set(PropertyId::SoftwareId, "21049405A02");
        reader.set(PropertyId::ProductVer, "V05");
        reader.set(PropertyId::FactorySn, "B164F78022713AA");
        reader
    }

    /// Store an NVRAM property directly
    pub fn set(&mut self, id: PropertyId, value: &str) {
        self.properties.insert(id as u8, value.to_string());
    }

    pub fn get(&self, id: PropertyId) -> &str {
        self.properties
            .get(&(id as u8))
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Buffer lengths of the feature-report transfers seen so far
    pub fn feature_report_sizes(&self) -> Vec<usize> {
        self.log
            .iter()
            .filter(|t| {
                t.setup == ControlSetup::SET_FEATURE_REPORT
                    || t.setup == ControlSetup::GET_FEATURE_REPORT
            })
            .map(|t| t.len)
            .collect()
    }

    /// Number of SET_REPORT transfers seen so far
    pub fn write_count(&self) -> usize {
        self.log
            .iter()
            .filter(|t| t.setup == ControlSetup::SET_FEATURE_REPORT)
            .count()
    }

    fn respond(&mut self, code: u8, value: &[u8]) {
        let mut response = vec![0u8; self.buffer_size];
        response[0] = code;
        if !value.is_empty() {
            response[1] = value.len() as u8;
            response[2..2 + value.len()].copy_from_slice(value);
        }
        self.pending = Some(response);
    }

    fn handle_command(&mut self, request: &[u8]) {
        let id = request[2];
        match request[0] {
            c if c == Command::GetProperty as u8 => {
                if self.rejected_properties.contains(&id) {
                    self.respond(result_code::BAD_PARAMETER, &[]);
                    return;
                }
                let value = self.properties.get(&id).cloned().unwrap_or_default();
                self.respond(result_code::SUCCESS, value.as_bytes());
            }
            c if c == Command::SetProperty as u8 => {
                let len = usize::from(request[1]).saturating_sub(1);
                let Some(value) = request.get(3..3 + len) else {
                    self.respond(result_code::BAD_PARAMETER, &[]);
                    return;
                };
                let value = String::from_utf8_lossy(value).into_owned();
                let locked = id == PropertyId::FactorySn as u8
                    && self.properties.get(&id).is_some_and(|v| !v.is_empty());
                if locked {
                    self.respond(result_code::ALREADY_SET, &[]);
                } else {
                    self.properties.insert(id, value);
                    self.respond(result_code::SUCCESS, &[]);
                }
            }
            c if c == Command::ResetDevice as u8 => {
                if self.reset_result == result_code::SUCCESS {
                    self.descriptor_serial = self.get(PropertyId::DeviceSn).to_string();
                }
                self.respond(self.reset_result, &[]);
            }
            _ => self.respond(result_code::FAILURE, &[]),
        }
    }
}

impl Transport for SimulatedCardReader {
    fn control_transfer(
        &mut self,
        setup: ControlSetup,
        buf: &mut [u8],
    ) -> Result<usize, TransportError> {
        self.log.push(TransferRecord {
            setup,
            len: buf.len(),
        });

        match setup {
            ControlSetup::GET_DEVICE_DESCRIPTOR => {
                let n = buf.len().min(self.device_descriptor.len());
                buf[..n].copy_from_slice(&self.device_descriptor[..n]);
                Ok(n)
            }
            ControlSetup::GET_CONFIG_DESCRIPTOR => {
                let n = buf.len().min(self.config_descriptor.len());
                buf[..n].copy_from_slice(&self.config_descriptor[..n]);
                Ok(n)
            }
            ControlSetup::SET_FEATURE_REPORT | ControlSetup::GET_FEATURE_REPORT
                if self.stall_feature_reports =>
            {
                Err(TransportError::Pipe)
            }
            ControlSetup::SET_FEATURE_REPORT => {
                if buf.len() != self.buffer_size {
                    return Err(TransportError::Pipe);
                }
                self.handle_command(buf);
                Ok(buf.len())
            }
            ControlSetup::GET_FEATURE_REPORT => {
                if buf.len() != self.buffer_size {
                    return Err(TransportError::Pipe);
                }
                let response = self
                    .pending
                    .take()
                    .unwrap_or_else(|| vec![0u8; self.buffer_size]);
                buf.copy_from_slice(&response);
                if self.short_reads {
                    Ok(buf.len() - 1)
                } else {
                    Ok(buf.len())
                }
            }
            _ => Err(TransportError::InvalidParam),
        }
    }

    fn string_descriptor(&mut self, index: u8) -> Result<String, TransportError> {
        if self.unreadable_strings.contains(&index) {
            return Err(TransportError::Pipe);
        }
        match index {
            1 => Ok(self.manufacturer.clone()),
            2 => Ok(self.product.clone()),
            3 => Ok(self.descriptor_serial.clone()),
            _ => Err(TransportError::NotFound),
        }
    }

    fn location(&self) -> Location {
        self.location
    }

    fn speed(&self) -> DeviceSpeed {
        self.speed
    }

    fn settle(&mut self, duration: Duration) {
        self.settled.push(duration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_with_overrunning_length_is_bad_parameter() {
        let mut reader = SimulatedCardReader::sureswipe();
        let mut request = vec![0u8; 24];
        request[0] = Command::SetProperty as u8;
        request[1] = 0xff;
        request[2] = PropertyId::DeviceSn as u8;

        assert_eq!(
            reader.control_transfer(ControlSetup::SET_FEATURE_REPORT, &mut request),
            Ok(24)
        );
        let mut response = vec![0u8; 24];
        reader
            .control_transfer(ControlSetup::GET_FEATURE_REPORT, &mut response)
            .unwrap();

        assert_eq!(response[0], result_code::BAD_PARAMETER);
        assert_eq!(reader.get(PropertyId::DeviceSn), "24F0014");
    }

    #[test]
    fn test_stalled_feature_reports() {
        let mut reader = SimulatedCardReader::sureswipe();
        reader.stall_feature_reports = true;
        let mut buf = vec![0u8; 24];

        assert_eq!(
            reader.control_transfer(ControlSetup::SET_FEATURE_REPORT, &mut buf),
            Err(TransportError::Pipe)
        );
        assert_eq!(
            reader.control_transfer(ControlSetup::GET_FEATURE_REPORT, &mut buf),
            Err(TransportError::Pipe)
        );
        assert_eq!(reader.log.len(), 2);
    }
}
