//! Generic USB device session
//!
//! Reads the standard descriptors and string descriptors of any device and
//! builds its [`DeviceRecord`]. Vendor sessions wrap this type.

use crate::error::{DeviceError, FieldErrors, Result};
use crate::transport::Transport;
use common::{DeviceRecord, OBJECT_TYPE_GENERIC};
use protocol::types::{CONFIG_DESCRIPTOR_LEN, DEVICE_DESCRIPTOR_LEN};
use protocol::{ConfigDescriptor, ControlSetup, DeviceDescriptor, class_name, hex_id};
use tracing::{debug, info, warn};

/// Session with one opened USB device
pub struct GenericDevice<T: Transport> {
    transport: T,
    descriptor: DeviceDescriptor,
    config: Option<ConfigDescriptor>,
    record: DeviceRecord,
}

impl<T: Transport> GenericDevice<T> {
    /// Read descriptors from `transport` and build the initial record
    ///
    /// A missing or malformed device descriptor aborts the session. String
    /// descriptor and configuration failures are returned in the
    /// [`FieldErrors`] list and leave the affected fields empty.
    pub fn open(mut transport: T, host_name: &str) -> Result<(Self, FieldErrors)> {
        let mut errors = FieldErrors::new();

        let raw = read_descriptor(
            &mut transport,
            ControlSetup::GET_DEVICE_DESCRIPTOR,
            DEVICE_DESCRIPTOR_LEN,
        )?;
        let descriptor = DeviceDescriptor::parse(&raw)?;

        let config = match read_descriptor(
            &mut transport,
            ControlSetup::GET_CONFIG_DESCRIPTOR,
            CONFIG_DESCRIPTOR_LEN,
        )
        .and_then(|raw| Ok(ConfigDescriptor::parse(&raw)?))
        {
            Ok(config) => {
                debug!(
                    "Configuration: {} interface(s), self_powered={}, max_power={}mA",
                    config.num_interfaces,
                    config.self_powered(),
                    config.max_power_ma()
                );
                Some(config)
            }
            Err(e) => {
                warn!("Failed to read configuration descriptor: {}", e);
                errors.add("ConfigDescriptor", e);
                None
            }
        };

        let location = transport.location();
        let record = DeviceRecord {
            host_name: host_name.to_string(),
            vendor_id: hex_id(descriptor.vendor_id),
            product_id: hex_id(descriptor.product_id),
            bus_number: location.bus,
            bus_address: location.address,
            port_number: location.port,
            max_pkt_size: descriptor.max_packet_size,
            usb_spec: descriptor.usb_spec_string(),
            usb_class: class_name(descriptor.device_class),
            usb_subclass: class_name(descriptor.device_subclass),
            usb_protocol: descriptor.device_protocol.to_string(),
            device_speed: transport.speed().to_string(),
            device_ver: descriptor.device_version_string(),
            object_type: OBJECT_TYPE_GENERIC.to_string(),
            ..Default::default()
        };

        let mut device = Self {
            transport,
            descriptor,
            config,
            record,
        };

        let vendor_name = device.manufacturer();
        errors.collect("VendorName", &mut device.record.vendor_name, vendor_name);
        let product_name = device.product();
        errors.collect("ProductName", &mut device.record.product_name, product_name);
        let serial_num = device.serial_number();
        errors.collect("SerialNum", &mut device.record.serial_num, serial_num);

        info!(
            "Opened {}:{} on bus {:03} address {:03}",
            device.record.vendor_id,
            device.record.product_id,
            device.record.bus_number,
            device.record.bus_address
        );

        Ok((device, errors))
    }

    /// Re-read fields whose underlying values may have changed
    pub fn refresh(&mut self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        let serial_num = self.serial_number();
        errors.collect("SerialNum", &mut self.record.serial_num, serial_num);
        errors
    }

    pub fn manufacturer(&mut self) -> Result<String> {
        self.string(self.descriptor.manufacturer_string_index())
    }

    pub fn product(&mut self) -> Result<String> {
        self.string(self.descriptor.product_string_index())
    }

    /// Serial number reported by the string descriptor
    pub fn serial_number(&mut self) -> Result<String> {
        self.string(self.descriptor.serial_number_string_index())
    }

    fn string(&mut self, index: Option<u8>) -> Result<String> {
        match index {
            Some(index) => Ok(self.transport.string_descriptor(index)?),
            None => Ok(String::new()),
        }
    }

    /// Set the record's serial number without touching the device
    pub fn set_serial(&mut self, serial: impl Into<String>) {
        self.record.serial_num = serial.into();
    }

    pub fn descriptor(&self) -> &DeviceDescriptor {
        &self.descriptor
    }

    pub fn config_descriptor(&self) -> Option<&ConfigDescriptor> {
        self.config.as_ref()
    }

    pub fn record(&self) -> &DeviceRecord {
        &self.record
    }

    pub fn record_mut(&mut self) -> &mut DeviceRecord {
        &mut self.record
    }

    pub fn into_record(self) -> DeviceRecord {
        self.record
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }
}

fn read_descriptor<T: Transport>(
    transport: &mut T,
    setup: ControlSetup,
    len: usize,
) -> Result<Vec<u8>> {
    let mut buf = vec![0u8; len];
    let n = transport.control_transfer(setup, &mut buf)?;
    debug!("GET_DESCRIPTOR {:#06x}: {} bytes", setup.value, n);
    if n < len {
        let kind = if setup.value == ControlSetup::GET_DEVICE_DESCRIPTOR.value {
            "device"
        } else {
            "configuration"
        };
        return Err(DeviceError::MalformedDescriptor {
            kind,
            needed: len,
            actual: n,
        });
    }
    Ok(buf)
}
