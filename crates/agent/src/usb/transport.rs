//! rusb-backed transport
//!
//! Opens a device, detaches any kernel driver from the configured interface
//! and claims it for the lifetime of the transport. Dropping the transport
//! releases the interface and gives it back to the kernel.

use device::{Location, Transport, TransportError};
use protocol::{ControlSetup, DeviceSpeed};
use rusb::{Context, Device, DeviceHandle, Language};
use std::time::Duration;
use tracing::{debug, warn};

pub struct RusbTransport {
    device: Device<Context>,
    handle: DeviceHandle<Context>,
    interface: u8,
    reattach: bool,
    timeout: Duration,
    language: Option<Language>,
}

impl RusbTransport {
    /// Open `device` and claim `interface`
    pub fn open(
        device: Device<Context>,
        interface: u8,
        timeout: Duration,
    ) -> Result<Self, TransportError> {
        let mut handle = device.open().map_err(|e| {
            warn!("Failed to open device: {}", e);
            map_rusb_error(e)
        })?;

        let bus = device.bus_number();
        let address = device.address();
        debug!("Opened device {:03}:{:03}", bus, address);

        // Detach kernel driver if active
        let mut reattach = false;
        match handle.kernel_driver_active(interface) {
            Ok(true) => {
                debug!(
                    "Detaching kernel driver from interface {} on {:03}:{:03}",
                    interface, bus, address
                );
                match handle.detach_kernel_driver(interface) {
                    Ok(()) => reattach = true,
                    Err(e) => warn!(
                        "Failed to detach kernel driver from interface {}: {}",
                        interface, e
                    ),
                }
            }
            Ok(false) => debug!("No kernel driver active on interface {}", interface),
            Err(e) => debug!(
                "Could not check kernel driver status for interface {}: {}",
                interface, e
            ),
        }

        if let Err(e) = handle.claim_interface(interface) {
            warn!("Failed to claim interface {}: {}", interface, e);
            if reattach {
                let _ = handle.attach_kernel_driver(interface);
            }
            return Err(map_rusb_error(e));
        }
        debug!("Claimed interface {} on {:03}:{:03}", interface, bus, address);

        let language = match handle.read_languages(timeout) {
            Ok(languages) => languages.first().copied(),
            Err(e) => {
                debug!("No string descriptor languages: {}", e);
                None
            }
        };

        Ok(Self {
            device,
            handle,
            interface,
            reattach,
            timeout,
            language,
        })
    }
}

impl Transport for RusbTransport {
    fn control_transfer(
        &mut self,
        setup: ControlSetup,
        buf: &mut [u8],
    ) -> Result<usize, TransportError> {
        debug!(
            "Control transfer: request_type={:#x}, request={:#x}, value={:#x}, index={:#x}, data_len={}",
            setup.request_type,
            setup.request,
            setup.value,
            setup.index,
            buf.len()
        );

        let result = if setup.is_in() {
            self.handle.read_control(
                setup.request_type,
                setup.request,
                setup.value,
                setup.index,
                buf,
                self.timeout,
            )
        } else {
            self.handle.write_control(
                setup.request_type,
                setup.request,
                setup.value,
                setup.index,
                buf,
                self.timeout,
            )
        };

        match result {
            Ok(len) => {
                debug!("Control transfer succeeded: {} bytes", len);
                Ok(len)
            }
            Err(e) => {
                debug!("Control transfer failed: {}", e);
                Err(map_rusb_error(e))
            }
        }
    }

    fn string_descriptor(&mut self, index: u8) -> Result<String, TransportError> {
        let result = match self.language {
            Some(language) => self
                .handle
                .read_string_descriptor(language, index, self.timeout),
            None => self.handle.read_string_descriptor_ascii(index),
        };
        result.map_err(map_rusb_error)
    }

    fn location(&self) -> Location {
        Location {
            bus: self.device.bus_number(),
            address: self.device.address(),
            port: self.device.port_number(),
        }
    }

    fn speed(&self) -> DeviceSpeed {
        map_device_speed(self.device.speed())
    }
}

impl Drop for RusbTransport {
    fn drop(&mut self) {
        if let Err(e) = self.handle.release_interface(self.interface) {
            warn!("Failed to release interface {}: {}", self.interface, e);
        }

        // Reattach kernel driver to restore device to kernel control
        if self.reattach {
            if let Err(e) = self.handle.attach_kernel_driver(self.interface) {
                debug!(
                    "Could not reattach kernel driver to interface {}: {}",
                    self.interface, e
                );
            } else {
                debug!("Reattached kernel driver to interface {}", self.interface);
            }
        }
    }
}

/// Map rusb error to transport error
pub fn map_rusb_error(err: rusb::Error) -> TransportError {
    match err {
        rusb::Error::Timeout => TransportError::Timeout,
        rusb::Error::Pipe => TransportError::Pipe,
        rusb::Error::NoDevice => TransportError::NoDevice,
        rusb::Error::NotFound => TransportError::NotFound,
        rusb::Error::Busy => TransportError::Busy,
        rusb::Error::Overflow => TransportError::Overflow,
        rusb::Error::Io => TransportError::Io,
        rusb::Error::InvalidParam => TransportError::InvalidParam,
        rusb::Error::Access => TransportError::Access,
        _ => TransportError::Other {
            message: err.to_string(),
        },
    }
}

/// Map rusb device speed to protocol DeviceSpeed
pub fn map_device_speed(speed: rusb::Speed) -> DeviceSpeed {
    match speed {
        rusb::Speed::Low => DeviceSpeed::Low,
        rusb::Speed::Full => DeviceSpeed::Full,
        rusb::Speed::High => DeviceSpeed::High,
        rusb::Speed::Super => DeviceSpeed::Super,
        rusb::Speed::SuperPlus => DeviceSpeed::SuperPlus,
        _ => DeviceSpeed::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_rusb_error() {
        assert_eq!(map_rusb_error(rusb::Error::Timeout), TransportError::Timeout);
        assert_eq!(map_rusb_error(rusb::Error::Pipe), TransportError::Pipe);
        assert_eq!(map_rusb_error(rusb::Error::NoDevice), TransportError::NoDevice);
        assert!(matches!(
            map_rusb_error(rusb::Error::NotSupported),
            TransportError::Other { .. }
        ));
    }

    #[test]
    fn test_map_device_speed() {
        assert_eq!(map_device_speed(rusb::Speed::Low), DeviceSpeed::Low);
        assert_eq!(map_device_speed(rusb::Speed::Full), DeviceSpeed::Full);
        assert_eq!(map_device_speed(rusb::Speed::High), DeviceSpeed::High);
        assert_eq!(map_device_speed(rusb::Speed::Super), DeviceSpeed::Super);
        assert_eq!(map_device_speed(rusb::Speed::Unknown), DeviceSpeed::Unknown);
    }
}
