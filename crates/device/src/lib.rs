//! Device sessions for usb-cmdb
//!
//! A session owns one opened [`Transport`] and the [`common::DeviceRecord`]
//! describing the device behind it. [`GenericDevice`] works with any USB
//! device; [`MagtekDevice`] wraps it with the card reader's vendor command
//! set (property get/set and reset) once the command buffer size is known.
//!
//! All operations block and take `&mut self`, so one session never has more
//! than one transfer in flight.

pub mod error;
pub mod generic;
pub mod magtek;
pub mod session;
pub mod test_utils;
pub mod transport;

pub use error::{DeviceError, FieldErrors, Result};
pub use generic::GenericDevice;
pub use magtek::{MagtekDevice, RESET_SETTLE_TIME, discover_buffer_size};
pub use session::Session;
pub use transport::{Location, Transport, TransportError};
