//! Integration tests for vendor command framing and descriptor parsing
//!
//! Exercises the public API of the protocol crate the way the device engine
//! uses it: build a request, simulate the device's answer, parse it back.

use proptest::prelude::*;
use protocol::{
    BUFFER_SIZES, ConfigDescriptor, DeviceDescriptor, PropertyId, ProtocolError,
    get_property_request, max_value_len, parse_property, parse_status, reset_request,
    set_property_request,
};

fn device_answer(request: &[u8], stored: &str) -> Vec<u8> {
    let mut answer = vec![0u8; request.len()];
    answer[1] = stored.len() as u8;
    answer[2..2 + stored.len()].copy_from_slice(stored.as_bytes());
    answer
}

mod framing {
    use super::*;

    #[test]
    fn test_every_candidate_size_builds_probe() {
        for size in BUFFER_SIZES {
            let probe = get_property_request(PropertyId::SoftwareId, size).unwrap();
            assert_eq!(probe.len(), size);
            assert_eq!(&probe[..3], &[0x00, 0x01, 0x00]);
        }
    }

    #[test]
    fn test_get_and_parse() {
        let request = get_property_request(PropertyId::DeviceSn, 60).unwrap();
        let answer = device_answer(&request, "24F0014");
        assert_eq!(parse_property(&answer).unwrap(), "24F0014");
    }

    #[test]
    fn test_magnesafe_accepts_longer_values() {
        let value = "B164F78022713AA-EXTENDED-SERIAL";
        assert!(set_property_request(PropertyId::DeviceSn, value, 24).is_err());
        assert!(set_property_request(PropertyId::DeviceSn, value, 60).is_ok());
    }

    #[test]
    fn test_reset_acknowledgement() {
        let request = reset_request(60).unwrap();
        assert_eq!(request[0], 0x02);
        assert!(parse_status(&vec![0u8; 60]).is_ok());

        let mut nack = vec![0u8; 60];
        nack[0] = 0x01;
        assert_eq!(
            parse_status(&nack).unwrap_err(),
            ProtocolError::CommandRejected(0x01)
        );
    }
}

mod descriptors {
    use super::*;

    #[test]
    fn test_idtech_reader_descriptor() {
        let raw = [
            0x12, 0x01, 0x00, 0x02, 0x00, 0x00, 0x00, 0x08, 0xcd, 0x0a, 0x30, 0x20, 0x00, 0x01,
            0x01, 0x02, 0x00, 0x01,
        ];
        let desc = DeviceDescriptor::parse(&raw).unwrap();
        assert_eq!(desc.vendor_id, 0x0acd);
        assert_eq!(desc.product_id, 0x2030);
        assert_eq!(desc.usb_spec_string(), "2.00");
        assert_eq!(desc.device_version_string(), "1.00");
        assert_eq!(desc.serial_number_string_index(), None);
    }

    #[test]
    fn test_full_config_buffer_parses_header() {
        // header followed by an interface descriptor
        let raw = [
            0x09, 0x02, 0x22, 0x00, 0x01, 0x01, 0x00, 0x80, 0x32, 0x09, 0x04, 0x00, 0x00, 0x01,
            0x03, 0x00, 0x00, 0x00,
        ];
        let desc = ConfigDescriptor::parse(&raw).unwrap();
        assert_eq!(desc.num_interfaces, 1);
        assert_eq!(desc.attributes, 0x80);
    }
}

proptest! {
    #[test]
    fn prop_set_request_layout(value in "[A-Z0-9]{0,21}", size_ix in 0usize..2) {
        let size = BUFFER_SIZES[size_ix];
        let frame = set_property_request(PropertyId::DeviceSn, &value, size).unwrap();

        prop_assert_eq!(frame.len(), size);
        prop_assert_eq!(frame[0], 0x01);
        prop_assert_eq!(usize::from(frame[1]), value.len() + 1);
        prop_assert_eq!(frame[2], 0x01);
        prop_assert_eq!(&frame[3..3 + value.len()], value.as_bytes());
        prop_assert!(frame[3 + value.len()..].iter().all(|&b| b == 0));
    }

    #[test]
    fn prop_oversized_values_rejected(extra in 1usize..40, size_ix in 0usize..2) {
        let size = BUFFER_SIZES[size_ix];
        let value = "9".repeat(max_value_len(size) + extra);
        let is_value_too_long = matches!(
            set_property_request(PropertyId::FactorySn, &value, size),
            Err(ProtocolError::ValueTooLong { .. })
        );
        prop_assert!(is_value_too_long);
    }

    #[test]
    fn prop_short_descriptor_always_malformed(len in 0usize..18) {
        let raw = vec![0u8; len];
        let is_malformed = matches!(
            DeviceDescriptor::parse(&raw),
            Err(ProtocolError::MalformedDescriptor { .. })
        );
        prop_assert!(is_malformed);
    }
}
