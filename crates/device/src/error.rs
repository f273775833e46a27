//! Device session errors

use crate::transport::TransportError;
use protocol::ProtocolError;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeviceError {
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// No candidate buffer size was accepted by the device
    #[error("Unsupported device: no vendor command buffer size accepted")]
    UnsupportedDevice,

    #[error("Command rejected by device: result code {0:#04x}")]
    CommandRejected(u8),

    #[error("Property value too long: {len} bytes (max: {max})")]
    ValueTooLong { len: usize, max: usize },

    #[error("Malformed {kind} descriptor: needed {needed} bytes, got {actual}")]
    MalformedDescriptor {
        kind: &'static str,
        needed: usize,
        actual: usize,
    },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("No factory serial number")]
    NoFactorySerial,
}

impl From<ProtocolError> for DeviceError {
    fn from(err: ProtocolError) -> Self {
        match err {
            ProtocolError::MalformedDescriptor {
                kind,
                needed,
                actual,
            } => Self::MalformedDescriptor {
                kind,
                needed,
                actual,
            },
            ProtocolError::ValueTooLong { len, max } => Self::ValueTooLong { len, max },
            ProtocolError::CommandRejected(code) => Self::CommandRejected(code),
            ProtocolError::MalformedResponse(msg) => Self::MalformedResponse(msg),
            // a buffer that cannot hold a command header was never accepted
            ProtocolError::BufferTooSmall { .. } => Self::UnsupportedDevice,
        }
    }
}

pub type Result<T> = std::result::Result<T, DeviceError>;

/// Ordered list of fields that could not be read, with their causes
///
/// Collected during session setup and refresh; a partial failure leaves the
/// field empty rather than aborting the session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors {
    entries: Vec<(&'static str, DeviceError)>,
}

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &'static str, cause: DeviceError) {
        self.entries.push((field, cause));
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.entries.iter().any(|(name, _)| *name == field)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &DeviceError)> {
        self.entries.iter().map(|(name, cause)| (*name, cause))
    }

    pub fn extend(&mut self, other: FieldErrors) {
        self.entries.extend(other.entries);
    }

    /// Store `result`'s value in `slot`, or record the failure under `field`
    pub(crate) fn collect(&mut self, field: &'static str, slot: &mut String, result: Result<String>) {
        match result {
            Ok(value) => *slot = value,
            Err(e) => self.add(field, e),
        }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("initialization failures:")?;
        for (name, cause) in &self.entries {
            write!(f, " {} ({})", name, cause)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_error_mapping() {
        assert_eq!(
            DeviceError::from(ProtocolError::CommandRejected(0x07)),
            DeviceError::CommandRejected(0x07)
        );
        assert_eq!(
            DeviceError::from(ProtocolError::ValueTooLong { len: 30, max: 21 }),
            DeviceError::ValueTooLong { len: 30, max: 21 }
        );
    }

    #[test]
    fn test_field_errors_keep_order() {
        let mut errors = FieldErrors::new();
        errors.add("VendorName", DeviceError::Transport(TransportError::Pipe));
        errors.add("SoftwareID", DeviceError::CommandRejected(0x02));

        let names: Vec<_> = errors.iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["VendorName", "SoftwareID"]);
        assert!(errors.contains("SoftwareID"));
        assert!(!errors.contains("ProductVer"));
        assert_eq!(
            errors.to_string(),
            "initialization failures: VendorName (Transport error: Pipe error (endpoint stalled)) \
             SoftwareID (Command rejected by device: result code 0x02)"
        );
    }

    #[test]
    fn test_collect() {
        let mut errors = FieldErrors::new();
        let mut slot = "stale".to_string();
        errors.collect("DeviceSN", &mut slot, Ok("24F0014".to_string()));
        assert_eq!(slot, "24F0014");

        errors.collect("FactorySN", &mut slot, Err(DeviceError::NoFactorySerial));
        assert_eq!(slot, "24F0014");
        assert_eq!(errors.len(), 1);
    }
}
