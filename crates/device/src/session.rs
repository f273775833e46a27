//! Session selection
//!
//! Opens the richest session a device supports: a vendor session for MagTek
//! readers whose buffer size can be discovered, a generic one otherwise.

use crate::error::{DeviceError, FieldErrors, Result};
use crate::generic::GenericDevice;
use crate::magtek::{MagtekDevice, discover_buffer_size};
use crate::transport::Transport;
use common::DeviceRecord;
use protocol::MAGTEK_VENDOR_ID;
use tracing::warn;

pub enum Session<T: Transport> {
    Generic(GenericDevice<T>),
    Magtek(MagtekDevice<T>),
}

impl<T: Transport> Session<T> {
    pub fn open(transport: T, host_name: &str) -> Result<(Self, FieldErrors)> {
        let (mut generic, errors) = GenericDevice::open(transport, host_name)?;

        if generic.descriptor().vendor_id != MAGTEK_VENDOR_ID {
            return Ok((Self::Generic(generic), errors));
        }

        match discover_buffer_size(generic.transport_mut()) {
            Ok(size) => {
                let (device, errors) = MagtekDevice::with_buffer_size(generic, size, errors);
                Ok((Self::Magtek(device), errors))
            }
            Err(DeviceError::UnsupportedDevice) => {
                warn!(
                    "{}:{} does not accept vendor commands, using generic session",
                    generic.record().vendor_id,
                    generic.record().product_id
                );
                Ok((Self::Generic(generic), errors))
            }
            Err(e) => Err(e),
        }
    }

    pub fn record(&self) -> &DeviceRecord {
        match self {
            Self::Generic(device) => device.record(),
            Self::Magtek(device) => device.record(),
        }
    }

    pub fn record_mut(&mut self) -> &mut DeviceRecord {
        match self {
            Self::Generic(device) => device.record_mut(),
            Self::Magtek(device) => device.record_mut(),
        }
    }

    pub fn into_record(self) -> DeviceRecord {
        match self {
            Self::Generic(device) => device.into_record(),
            Self::Magtek(device) => device.into_record(),
        }
    }

    pub fn refresh(&mut self) -> FieldErrors {
        match self {
            Self::Generic(device) => device.refresh(),
            Self::Magtek(device) => device.refresh(),
        }
    }

    /// The vendor session, if the device supports one
    pub fn magtek_mut(&mut self) -> Result<&mut MagtekDevice<T>> {
        match self {
            Self::Magtek(device) => Ok(device),
            Self::Generic(_) => Err(DeviceError::UnsupportedDevice),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{SimulatedCardReader, device_descriptor_bytes};
    use common::{OBJECT_TYPE_GENERIC, OBJECT_TYPE_MAGTEK};

    #[test]
    fn test_magtek_session() {
        let (mut session, _) = Session::open(SimulatedCardReader::sureswipe(), "host").unwrap();
        assert_eq!(session.record().object_type, OBJECT_TYPE_MAGTEK);
        assert!(session.magtek_mut().is_ok());
    }

    #[test]
    fn test_other_vendor_stays_generic() {
        let mut reader = SimulatedCardReader::sureswipe();
        reader.device_descriptor = device_descriptor_bytes(0x0200, 64, 0x045e, 0x07a5, 0x0733);
        let (mut session, _) = Session::open(reader, "host").unwrap();

        assert_eq!(session.record().object_type, OBJECT_TYPE_GENERIC);
        assert_eq!(session.record().device_ver, "7.33");
        assert_eq!(
            session.magtek_mut().err(),
            Some(DeviceError::UnsupportedDevice)
        );
    }

    #[test]
    fn test_unsupported_magtek_falls_back() {
        let mut reader = SimulatedCardReader::sureswipe();
        reader.buffer_size = 8;
        let (session, _) = Session::open(reader, "host").unwrap();
        assert_eq!(session.record().object_type, OBJECT_TYPE_GENERIC);
        assert_eq!(session.record().buffer_size, 0);
    }
}
