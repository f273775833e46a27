//! Protocol error types

use thiserror::Error;

/// Protocol-level errors
///
/// These are raised by pure framing and parsing code and never involve I/O.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// Descriptor buffer shorter than its fixed layout
    #[error("Malformed {kind} descriptor: needed {needed} bytes, got {actual}")]
    MalformedDescriptor {
        kind: &'static str,
        needed: usize,
        actual: usize,
    },

    /// Property value does not fit in the vendor command buffer
    #[error("Property value too long: {len} bytes (max: {max})")]
    ValueTooLong { len: usize, max: usize },

    /// Device answered a well-formed request with a non-zero result code
    #[error("Command rejected by device: result code {0:#04x}")]
    CommandRejected(u8),

    /// Response frame is truncated or its length byte overruns the buffer
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// Buffer size cannot hold a vendor command header
    #[error("Buffer too small: needed {needed}, got {available}")]
    BufferTooSmall { needed: usize, available: usize },
}

/// Type alias for protocol results
pub type Result<T> = std::result::Result<T, ProtocolError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ProtocolError::MalformedDescriptor {
            kind: "device",
            needed: 18,
            actual: 9,
        };
        let msg = format!("{}", err);
        assert!(msg.contains("device descriptor"));
        assert!(msg.contains("18"));
        assert!(msg.contains("9"));
    }

    #[test]
    fn test_command_rejected_shows_code() {
        let msg = ProtocolError::CommandRejected(0x07).to_string();
        assert!(msg.contains("0x07"));
    }
}
