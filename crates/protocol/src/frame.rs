//! Vendor command framing
//!
//! Builds and parses the fixed-size feature-report payloads exchanged with
//! the card reader. Every frame is exactly the session buffer size and is
//! zero-padded.
//!
//! # Frame Format
//!
//! ```text
//! Offset  Get request   Set request     Response
//! 0       0x00          0x01            result code (0 = success)
//! 1       0x01          len(value)+1    value length
//! 2       property ID   property ID     value bytes...
//! 3..     -             value bytes     -
//! ```

use crate::error::{ProtocolError, Result};
use crate::types::{COMMAND_HEADER_LEN, Command, PropertyId, result_code};

/// Largest value the one-byte length field can describe (it holds len + 1)
const MAX_ENCODED_VALUE_LEN: usize = u8::MAX as usize - 1;

/// Largest property value that fits in a set request of `buffer_size`
pub fn max_value_len(buffer_size: usize) -> usize {
    buffer_size
        .saturating_sub(COMMAND_HEADER_LEN)
        .min(MAX_ENCODED_VALUE_LEN)
}

fn frame(buffer_size: usize) -> Result<Vec<u8>> {
    if buffer_size < COMMAND_HEADER_LEN {
        return Err(ProtocolError::BufferTooSmall {
            needed: COMMAND_HEADER_LEN,
            available: buffer_size,
        });
    }
    Ok(vec![0u8; buffer_size])
}

/// Build a get-property request
///
/// # Example
/// ```
/// use protocol::{PropertyId, get_property_request};
///
/// let frame = get_property_request(PropertyId::SoftwareId, 24).unwrap();
/// assert_eq!(&frame[..3], &[0x00, 0x01, 0x00]);
/// assert_eq!(frame.len(), 24);
/// ```
pub fn get_property_request(id: PropertyId, buffer_size: usize) -> Result<Vec<u8>> {
    let mut data = frame(buffer_size)?;
    data[0] = Command::GetProperty as u8;
    data[1] = 0x01;
    data[2] = id as u8;
    Ok(data)
}

/// Build a set-property request
///
/// Fails with [`ProtocolError::ValueTooLong`] when the value does not fit
/// after the three header bytes.
pub fn set_property_request(id: PropertyId, value: &str, buffer_size: usize) -> Result<Vec<u8>> {
    let bytes = value.as_bytes();
    let max = max_value_len(buffer_size);
    if bytes.len() > max {
        return Err(ProtocolError::ValueTooLong {
            len: bytes.len(),
            max,
        });
    }

    let mut data = frame(buffer_size)?;
    data[0] = Command::SetProperty as u8;
    // bounded by max_value_len
    data[1] = (bytes.len() + 1) as u8;
    data[2] = id as u8;
    data[COMMAND_HEADER_LEN..COMMAND_HEADER_LEN + bytes.len()].copy_from_slice(bytes);
    Ok(data)
}

/// Build a vendor reset request
pub fn reset_request(buffer_size: usize) -> Result<Vec<u8>> {
    let mut data = frame(buffer_size)?;
    data[0] = Command::ResetDevice as u8;
    Ok(data)
}

fn check_result_code(data: &[u8]) -> Result<()> {
    match data.first() {
        None => Err(ProtocolError::MalformedResponse(
            "empty response".to_string(),
        )),
        Some(&result_code::SUCCESS) => Ok(()),
        Some(&code) => Err(ProtocolError::CommandRejected(code)),
    }
}

/// Parse the response to a set or reset command
///
/// Only the result code is meaningful.
pub fn parse_status(data: &[u8]) -> Result<()> {
    check_result_code(data)
}

/// Parse the response to a get-property command into its string value
///
/// Values of length 0 or 1 are the device's convention for "absent" and
/// are returned as an empty string.
///
/// # Example
/// ```
/// use protocol::parse_property;
///
/// let mut response = vec![0u8; 24];
/// response[1] = 3;
/// response[2..5].copy_from_slice(b"V05");
/// assert_eq!(parse_property(&response).unwrap(), "V05");
/// ```
pub fn parse_property(data: &[u8]) -> Result<String> {
    check_result_code(data)?;

    let len = match data.get(1) {
        Some(&len) => usize::from(len),
        None => {
            return Err(ProtocolError::MalformedResponse(
                "missing value length".to_string(),
            ));
        }
    };

    if len <= 1 {
        return Ok(String::new());
    }

    let value = data.get(2..2 + len).ok_or_else(|| {
        ProtocolError::MalformedResponse(format!(
            "value length {} overruns {}-byte buffer",
            len,
            data.len()
        ))
    })?;

    Ok(String::from_utf8_lossy(value).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(code: u8, value: &[u8], size: usize) -> Vec<u8> {
        let mut data = vec![0u8; size];
        data[0] = code;
        data[1] = value.len() as u8;
        data[2..2 + value.len()].copy_from_slice(value);
        data
    }

    #[test]
    fn test_get_request_layout() {
        let data = get_property_request(PropertyId::FactorySn, 60).unwrap();
        assert_eq!(data.len(), 60);
        assert_eq!(&data[..3], &[0x00, 0x01, 0x03]);
        assert!(data[3..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_set_request_layout() {
        let data = set_property_request(PropertyId::DeviceSn, "TESTING", 24).unwrap();
        assert_eq!(data.len(), 24);
        assert_eq!(&data[..3], &[0x01, 0x08, 0x01]);
        assert_eq!(&data[3..10], b"TESTING");
        assert!(data[10..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_erase_request_layout() {
        let data = set_property_request(PropertyId::DeviceSn, "", 24).unwrap();
        assert_eq!(&data[..3], &[0x01, 0x01, 0x01]);
    }

    #[test]
    fn test_set_value_too_long() {
        let value = "X".repeat(22);
        let err = set_property_request(PropertyId::DeviceSn, &value, 24).unwrap_err();
        assert_eq!(err, ProtocolError::ValueTooLong { len: 22, max: 21 });

        // exactly size - 3 fits
        assert!(set_property_request(PropertyId::DeviceSn, &value[..21], 24).is_ok());
    }

    #[test]
    fn test_oversized_buffer_length_byte_fits() {
        assert_eq!(max_value_len(60), 57);
        assert_eq!(max_value_len(512), 254);

        let value = "X".repeat(254);
        let data = set_property_request(PropertyId::DeviceSn, &value, 512).unwrap();
        assert_eq!(data.len(), 512);
        assert_eq!(data[1], 255);

        let err = set_property_request(PropertyId::DeviceSn, &"X".repeat(255), 512).unwrap_err();
        assert_eq!(err, ProtocolError::ValueTooLong { len: 255, max: 254 });
    }

    #[test]
    fn test_reset_request_layout() {
        let data = reset_request(24).unwrap();
        assert_eq!(data[0], 0x02);
        assert!(data[1..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_buffer_too_small() {
        assert!(matches!(
            reset_request(2),
            Err(ProtocolError::BufferTooSmall { needed: 3, available: 2 })
        ));
    }

    #[test]
    fn test_parse_property_value() {
        let data = response(0, b"21042818B01", 24);
        assert_eq!(parse_property(&data).unwrap(), "21042818B01");
    }

    #[test]
    fn test_parse_property_short_value_is_empty() {
        assert_eq!(parse_property(&response(0, b"", 24)).unwrap(), "");
        assert_eq!(parse_property(&response(0, b"\0", 24)).unwrap(), "");
    }

    #[test]
    fn test_parse_property_rejected() {
        let data = response(result_code::BAD_PARAMETER, b"", 24);
        assert_eq!(
            parse_property(&data).unwrap_err(),
            ProtocolError::CommandRejected(0x02)
        );
    }

    #[test]
    fn test_parse_property_overrun() {
        let mut data = vec![0u8; 24];
        data[1] = 30;
        assert!(matches!(
            parse_property(&data),
            Err(ProtocolError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_parse_status() {
        assert!(parse_status(&[0x00, 0x00]).is_ok());
        assert_eq!(
            parse_status(&[result_code::ALREADY_SET]).unwrap_err(),
            ProtocolError::CommandRejected(0x07)
        );
        assert!(matches!(
            parse_status(&[]),
            Err(ProtocolError::MalformedResponse(_))
        ));
    }
}
