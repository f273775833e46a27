//! Protocol library for usb-cmdb
//!
//! This crate defines the device-facing wire format used by the card
//! readers: standard descriptor layouts, vendor command framing carried in
//! HID feature reports, and the constants that address properties and
//! commands. It performs no I/O.
//!
//! # Example
//!
//! ```
//! use protocol::{PropertyId, get_property_request, parse_property};
//!
//! // Request the software ID with a 24-byte buffer
//! let request = get_property_request(PropertyId::SoftwareId, 24).unwrap();
//! assert_eq!(request.len(), 24);
//!
//! // A device answers with [result code, length, value...]
//! let mut response = vec![0u8; 24];
//! response[1] = 11;
//! response[2..13].copy_from_slice(b"21042818B01");
//! assert_eq!(parse_property(&response).unwrap(), "21042818B01");
//! ```

pub mod descriptor;
pub mod error;
pub mod frame;
pub mod types;

pub use descriptor::{ConfigDescriptor, DeviceDescriptor, bcd_version, class_name, hex_id};
pub use error::{ProtocolError, Result};
pub use frame::{
    get_property_request, max_value_len, parse_property, parse_status, reset_request,
    set_property_request,
};
pub use types::{
    BUFFER_SIZES, Command, ControlSetup, DEFAULT_SN_LENGTH, DeviceSpeed, MAGTEK_VENDOR_ID,
    PropertyId, result_code,
};
