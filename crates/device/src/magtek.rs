//! MagTek card reader session
//!
//! Vendor commands travel in HID feature reports: each command is one
//! SET_REPORT (write phase) followed by one GET_REPORT (read phase), both
//! exactly the discovered buffer size. SureSwipe readers use 24-byte
//! buffers and MagneSafe readers 60; any other size stalls the endpoint, so
//! the size is found by probing before any property I/O.

use crate::error::{DeviceError, FieldErrors, Result};
use crate::generic::GenericDevice;
use crate::transport::Transport;
use common::{DeviceRecord, OBJECT_TYPE_MAGTEK};
use protocol::{
    BUFFER_SIZES, ControlSetup, PropertyId, get_property_request, parse_property, parse_status,
    reset_request, set_property_request,
};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Time the reader needs after a vendor reset before it answers again
pub const RESET_SETTLE_TIME: Duration = Duration::from_secs(5);

/// Find the vendor command buffer size by trial
///
/// Each candidate is probed with a get-software-ID command. A candidate is
/// accepted when the read phase returns exactly that many bytes; transport
/// errors move on to the next candidate.
pub fn discover_buffer_size<T: Transport>(transport: &mut T) -> Result<usize> {
    for candidate in BUFFER_SIZES {
        let mut probe = get_property_request(PropertyId::SoftwareId, candidate)?;

        if let Err(e) = transport.control_transfer(ControlSetup::SET_FEATURE_REPORT, &mut probe) {
            debug!("Buffer size {} rejected on write: {}", candidate, e);
            continue;
        }

        let mut response = vec![0u8; candidate];
        match transport.control_transfer(ControlSetup::GET_FEATURE_REPORT, &mut response) {
            Ok(n) if n == candidate => {
                debug!("Buffer size {} accepted", candidate);
                return Ok(candidate);
            }
            Ok(n) => debug!("Buffer size {} answered with {} bytes", candidate, n),
            Err(e) => debug!("Buffer size {} rejected on read: {}", candidate, e),
        }
    }

    Err(DeviceError::UnsupportedDevice)
}

/// Session with a MagTek card reader
///
/// Only exists once buffer-size discovery has succeeded.
pub struct MagtekDevice<T: Transport> {
    generic: GenericDevice<T>,
    buffer_size: usize,
}

impl<T: Transport> MagtekDevice<T> {
    /// Open a vendor session on `transport`
    ///
    /// Fails with [`DeviceError::UnsupportedDevice`] if no buffer size is
    /// accepted. Property read failures are collected, not fatal.
    pub fn open(transport: T, host_name: &str) -> Result<(Self, FieldErrors)> {
        let (mut generic, errors) = GenericDevice::open(transport, host_name)?;
        let buffer_size = discover_buffer_size(generic.transport_mut())?;
        Ok(Self::with_buffer_size(generic, buffer_size, errors))
    }

    /// Finish setup of a session whose buffer size is already known
    pub(crate) fn with_buffer_size(
        generic: GenericDevice<T>,
        buffer_size: usize,
        mut errors: FieldErrors,
    ) -> (Self, FieldErrors) {
        let mut device = Self {
            generic,
            buffer_size,
        };
        errors.extend(device.init());

        info!(
            "MagTek reader {} ready (buffer size {})",
            device.record().serial_num,
            buffer_size
        );
        if !errors.is_empty() {
            warn!("{}", errors);
        }

        (device, errors)
    }

    fn init(&mut self) -> FieldErrors {
        let mut errors = FieldErrors::new();

        let software_id = self.get_software_id();
        let product_ver = self.get_product_ver();
        let record = self.generic.record_mut();
        errors.collect("SoftwareID", &mut record.software_id, software_id);
        errors.collect("ProductVer", &mut record.product_ver, product_ver);

        errors.extend(self.read_serials());

        let buffer_size = self.buffer_size;
        let record = self.generic.record_mut();
        record.buffer_size = buffer_size;
        record.object_type = OBJECT_TYPE_MAGTEK.to_string();

        errors
    }

    fn read_serials(&mut self) -> FieldErrors {
        let mut errors = FieldErrors::new();

        let device_sn = self.get_device_sn();
        let factory_sn = self.get_factory_sn();
        let descriptor_sn = self.generic.serial_number();

        let record = self.generic.record_mut();
        errors.collect("DeviceSN", &mut record.device_sn, device_sn);
        errors.collect("FactorySN", &mut record.factory_sn, factory_sn);
        errors.collect("DescriptorSN", &mut record.descriptor_sn, descriptor_sn);
        record.serial_num = record.device_sn.clone();

        errors
    }

    /// Re-read the serial numbers
    ///
    /// The configurable serial number tracks the NVRAM value; the string
    /// descriptor copy only changes after a reset or power cycle.
    pub fn refresh(&mut self) -> FieldErrors {
        let mut errors = self.generic.refresh();
        errors.extend(self.read_serials());
        errors
    }

    /// One write phase and one read phase
    ///
    /// Both phases must move exactly one buffer; a short read carries no
    /// trustworthy result code.
    fn command(&mut self, mut request: Vec<u8>) -> Result<Vec<u8>> {
        let buffer_size = self.buffer_size;
        let transport = self.generic.transport_mut();

        let written = transport.control_transfer(ControlSetup::SET_FEATURE_REPORT, &mut request)?;
        debug!("SET_REPORT cmd={:#04x}: {} bytes", request[0], written);
        if written != buffer_size {
            return Err(DeviceError::MalformedResponse(format!(
                "SET_REPORT transferred {} of {} bytes",
                written, buffer_size
            )));
        }

        let mut response = vec![0u8; buffer_size];
        let read = transport.control_transfer(ControlSetup::GET_FEATURE_REPORT, &mut response)?;
        debug!("GET_REPORT rc={:#04x}: {} bytes", response[0], read);
        if read != buffer_size {
            return Err(DeviceError::MalformedResponse(format!(
                "GET_REPORT returned {} of {} bytes",
                read, buffer_size
            )));
        }

        Ok(response)
    }

    fn get_property(&mut self, id: PropertyId) -> Result<String> {
        let request = get_property_request(id, self.buffer_size)?;
        let response = self.command(request)?;
        Ok(parse_property(&response)?)
    }

    fn set_property(&mut self, id: PropertyId, value: &str) -> Result<()> {
        let request = set_property_request(id, value, self.buffer_size)?;
        let response = self.command(request)?;
        parse_status(&response)?;
        info!("Set {} to {:?}", id.name(), value);

        let errors = self.refresh();
        if !errors.is_empty() {
            warn!("Refresh after setting {}: {}", id.name(), errors);
        }
        Ok(())
    }

    pub fn get_software_id(&mut self) -> Result<String> {
        self.get_property(PropertyId::SoftwareId)
    }

    pub fn get_product_ver(&mut self) -> Result<String> {
        self.get_property(PropertyId::ProductVer)
    }

    /// Configurable serial number stored in NVRAM
    pub fn get_device_sn(&mut self) -> Result<String> {
        self.get_property(PropertyId::DeviceSn)
    }

    pub fn get_factory_sn(&mut self) -> Result<String> {
        self.get_property(PropertyId::FactorySn)
    }

    pub fn set_device_sn(&mut self, serial: &str) -> Result<()> {
        self.set_property(PropertyId::DeviceSn, serial)
    }

    pub fn erase_device_sn(&mut self) -> Result<()> {
        self.set_property(PropertyId::DeviceSn, "")
    }

    /// Write the factory serial number
    ///
    /// The reader refuses once a factory serial is set; that surfaces as
    /// [`DeviceError::CommandRejected`].
    pub fn set_factory_sn(&mut self, serial: &str) -> Result<()> {
        self.set_property(PropertyId::FactorySn, serial)
    }

    /// Copy the first `len` characters of the factory serial number into
    /// the configurable serial number
    pub fn copy_factory_sn(&mut self, len: usize) -> Result<()> {
        let factory_sn = self.get_factory_sn()?;
        if factory_sn.is_empty() {
            return Err(DeviceError::NoFactorySerial);
        }

        let serial: String = factory_sn.chars().take(len).collect();
        self.set_device_sn(&serial)
    }

    /// Vendor reset, then wait [`RESET_SETTLE_TIME`]
    pub fn reset(&mut self) -> Result<()> {
        let request = reset_request(self.buffer_size)?;
        let response = self.command(request)?;
        parse_status(&response)?;

        info!(
            "Reset issued, waiting {}s for the reader to settle",
            RESET_SETTLE_TIME.as_secs()
        );
        self.generic.transport_mut().settle(RESET_SETTLE_TIME);
        Ok(())
    }

    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    pub fn generic(&self) -> &GenericDevice<T> {
        &self.generic
    }

    pub fn record(&self) -> &DeviceRecord {
        self.generic.record()
    }

    pub fn record_mut(&mut self) -> &mut DeviceRecord {
        self.generic.record_mut()
    }

    pub fn into_record(self) -> DeviceRecord {
        self.generic.into_record()
    }

    pub fn transport(&self) -> &T {
        self.generic.transport()
    }

    pub fn transport_mut(&mut self) -> &mut T {
        self.generic.transport_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::SimulatedCardReader;
    use protocol::result_code;

    #[test]
    fn test_discovery_sureswipe() {
        let mut reader = SimulatedCardReader::sureswipe();
        assert_eq!(discover_buffer_size(&mut reader).unwrap(), 24);
        assert_eq!(reader.feature_report_sizes(), vec![24, 24]);
    }

    #[test]
    fn test_discovery_unsupported() {
        let mut reader = SimulatedCardReader::sureswipe();
        reader.buffer_size = 32;
        assert_eq!(
            discover_buffer_size(&mut reader).unwrap_err(),
            DeviceError::UnsupportedDevice
        );
    }

    #[test]
    fn test_discovery_rejects_short_read() {
        let mut reader = SimulatedCardReader::magnesafe();
        reader.short_reads = true;
        assert_eq!(
            discover_buffer_size(&mut reader).unwrap_err(),
            DeviceError::UnsupportedDevice
        );
    }

    #[test]
    fn test_open_populates_vendor_fields() {
        let (device, errors) =
            MagtekDevice::open(SimulatedCardReader::magnesafe(), "host").unwrap();
        assert!(errors.is_empty(), "{}", errors);

        let record = device.record();
        assert_eq!(record.object_type, OBJECT_TYPE_MAGTEK);
        assert_eq!(record.buffer_size, 60);
        assert_eq!(record.software_id, "21049405A02");
        assert_eq!(record.product_ver, "V05");
        assert_eq!(record.factory_sn, "B164F78022713AA");
        assert_eq!(record.serial_num, record.device_sn);
    }

    #[test]
    fn test_unreadable_property_is_collected() {
        let mut reader = SimulatedCardReader::sureswipe();
        reader.rejected_properties = vec![PropertyId::ProductVer as u8];
        let (device, errors) = MagtekDevice::open(reader, "host").unwrap();

        assert!(errors.contains("ProductVer"));
        assert_eq!(errors.len(), 1);
        assert_eq!(device.record().product_ver, "");
        assert_eq!(device.record().software_id, "21042818B01");
    }

    #[test]
    fn test_set_device_sn_refreshes_record() {
        let (mut device, _) = MagtekDevice::open(SimulatedCardReader::sureswipe(), "host").unwrap();
        device.set_device_sn("TESTING").unwrap();

        assert_eq!(device.record().device_sn, "TESTING");
        assert_eq!(device.record().serial_num, "TESTING");
        // string descriptor is cached until reset
        assert_eq!(device.record().descriptor_sn, "24F0014");
    }

    #[test]
    fn test_reset_updates_descriptor_serial() {
        let (mut device, _) = MagtekDevice::open(SimulatedCardReader::sureswipe(), "host").unwrap();
        device.set_device_sn("TESTING").unwrap();
        device.reset().unwrap();
        assert_eq!(device.transport().settled, vec![RESET_SETTLE_TIME]);

        assert!(device.refresh().is_empty());
        assert_eq!(device.record().descriptor_sn, "TESTING");
    }

    #[test]
    fn test_reset_rejected() {
        let mut reader = SimulatedCardReader::sureswipe();
        reader.reset_result = result_code::FAILURE;
        let (mut device, _) = MagtekDevice::open(reader, "host").unwrap();

        assert_eq!(
            device.reset().unwrap_err(),
            DeviceError::CommandRejected(result_code::FAILURE)
        );
        assert!(device.transport().settled.is_empty());
    }
}
