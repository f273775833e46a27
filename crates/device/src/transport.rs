//! Transport abstraction
//!
//! A [`Transport`] carries control transfers to one opened device. Opening
//! and closing are the implementor's constructor and `Drop`.

use protocol::{ControlSetup, DeviceSpeed};
use std::time::Duration;
use thiserror::Error;

/// Failure reported by the host USB stack
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("Transfer timed out")]
    Timeout,

    /// Endpoint stalled. Vendor commands framed with the wrong buffer size
    /// end here.
    #[error("Pipe error (endpoint stalled)")]
    Pipe,

    #[error("Device disconnected")]
    NoDevice,

    #[error("Entity not found")]
    NotFound,

    #[error("Resource busy")]
    Busy,

    #[error("Buffer overflow")]
    Overflow,

    #[error("I/O error")]
    Io,

    #[error("Invalid parameter")]
    InvalidParam,

    #[error("Access denied")]
    Access,

    #[error("USB error: {message}")]
    Other { message: String },
}

/// Physical position of a device on the host
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Location {
    pub bus: u8,
    pub address: u8,
    pub port: u8,
}

/// Blocking access to one opened USB device
pub trait Transport {
    /// Run one control transfer
    ///
    /// For OUT setups `buf` is sent; for IN setups it receives the data
    /// stage. Returns the number of bytes transferred.
    fn control_transfer(
        &mut self,
        setup: ControlSetup,
        buf: &mut [u8],
    ) -> Result<usize, TransportError>;

    /// Read string descriptor `index` in the device's default language
    fn string_descriptor(&mut self, index: u8) -> Result<String, TransportError>;

    fn location(&self) -> Location;

    fn speed(&self) -> DeviceSpeed;

    /// Block while the device settles after a vendor reset
    fn settle(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn control_transfer(
        &mut self,
        setup: ControlSetup,
        buf: &mut [u8],
    ) -> Result<usize, TransportError> {
        (**self).control_transfer(setup, buf)
    }

    fn string_descriptor(&mut self, index: u8) -> Result<String, TransportError> {
        (**self).string_descriptor(index)
    }

    fn location(&self) -> Location {
        (**self).location()
    }

    fn speed(&self) -> DeviceSpeed {
        (**self).speed()
    }

    fn settle(&mut self, duration: Duration) {
        (**self).settle(duration)
    }
}
