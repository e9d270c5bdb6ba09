//! Integration tests for the portable-storage codec and the full
//! section -> bucket -> section path.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use levin_protocol::config::{FramerLimits, LEVIN_PACKET_REQUEST};
use levin_protocol::core::storage::{StorageReader, MAX_NESTING_DEPTH};
use levin_protocol::protocol::HandshakeRequest;
use levin_protocol::{
    decode_section, encode_section, read_bucket, Array, Bucket, ByteString, Command, Entry,
    Primitive, ProtocolError, Section, TypeTag,
};
use std::io::Cursor;

const HEADER: [u8; 9] = [0x01, 0x11, 0x01, 0x01, 0x01, 0x01, 0x02, 0x01, 0x01];

fn handshake_section() -> Section {
    let node_data = Section::new()
        .with("local_time", 1_716_000_000u64)
        .with("my_port", 0u32)
        .with("network_id", ByteString::from([0x12u8; 16]))
        .with("peer_id", 0xDEAD_BEEF_0BAD_F00Du64);
    let payload_data = Section::new()
        .with("cumulative_difficulty", 1u64)
        .with("current_height", 1u64)
        .with("top_id", ByteString::from([0x41u8; 32]))
        .with("top_version", 1u8);
    Section::new()
        .with("node_data", node_data)
        .with("payload_data", payload_data)
}

#[test]
fn test_handshake_end_to_end() {
    let section = handshake_section();
    let bytes = Bucket::request(Command::Handshake, &section)
        .unwrap()
        .to_bytes();

    let (header, decoded) = read_bucket(&mut Cursor::new(&bytes[..]), &FramerLimits::default()).unwrap();
    assert_eq!(header.command, Command::Handshake);
    assert!(header.is_request);
    assert_eq!(header.flags, LEVIN_PACKET_REQUEST);
    assert_eq!(decoded, section);

    let node = decoded.section("node_data").unwrap();
    assert_eq!(node.get("peer_id").unwrap().as_u64(), Some(0xDEAD_BEEF_0BAD_F00D));
    assert_eq!(node.get("my_port"), Some(&Entry::from(0u32)));
    let payload = decoded.section("payload_data").unwrap();
    assert_eq!(payload.get("top_id").unwrap().as_bytes().unwrap().len(), 32);
    assert_eq!(payload.get("top_version"), Some(&Entry::from(1u8)));
}

#[test]
fn test_handshake_builder_matches_hand_built_section() {
    let request = HandshakeRequest {
        local_time: 1_716_000_000,
        my_port: 0,
        network_id: [0x12; 16],
        peer_id: 0xDEAD_BEEF_0BAD_F00D,
        cumulative_difficulty: 1,
        current_height: 1,
        top_id: [0x41; 32],
        top_version: 1,
    };
    assert_eq!(request.to_section(), handshake_section());
    assert_eq!(
        encode_section(&request.to_section()).unwrap(),
        encode_section(&handshake_section()).unwrap()
    );
}

#[test]
fn test_every_scalar_type_roundtrips() {
    let section = Section::new()
        .with("i64", i64::MIN)
        .with("i32", -7i32)
        .with("i16", i16::MAX)
        .with("i8", -1i8)
        .with("u64", u64::MAX)
        .with("u32", 18080u32)
        .with("u16", 443u16)
        .with("u8", 255u8)
        .with("double", 2.5f64)
        .with("text", "hello")
        .with("raw", ByteString::from(vec![0xFF, 0x00, 0xFE]))
        .with("flag", true);

    let decoded = decode_section(&encode_section(&section).unwrap()).unwrap();
    assert_eq!(decoded, section);
    let keys: Vec<_> = decoded.keys().map(|k| k.as_str().unwrap().to_string()).collect();
    assert_eq!(keys[0], "i64");
    assert_eq!(keys[11], "flag");
    assert_eq!(
        decoded.get("i16").unwrap().as_primitive(),
        Some(&Primitive::Int16(i16::MAX))
    );
}

#[test]
fn test_arrays_roundtrip() {
    let mut ports = Array::new(TypeTag::UInt16);
    for port in [18080u16, 18081, 28080] {
        ports.push(port).unwrap();
    }
    let mut names = Array::new(TypeTag::String);
    names.push("a").unwrap();
    names.push(ByteString::from(vec![0u8; 70])).unwrap();
    let mut peers = Array::new(TypeTag::Object);
    peers.push(Section::new().with("id", 1u64)).unwrap();
    peers
        .push(Section::new().with("id", 2u64).with("inner", Section::new()))
        .unwrap();

    let section = Section::new()
        .with("ports", ports)
        .with("names", names)
        .with("peers", peers)
        .with("empty", Array::new(TypeTag::Int32));

    let decoded = decode_section(&encode_section(&section).unwrap()).unwrap();
    assert_eq!(decoded, section);
    let peers = decoded.get("peers").unwrap().as_array().unwrap();
    assert_eq!(peers.sections().count(), 2);
    assert!(decoded.get("empty").unwrap().as_array().unwrap().is_empty());
}

#[test]
fn test_uint32_array_layout() {
    let mut values = Array::new(TypeTag::UInt32);
    values.push(1u32).unwrap();
    values.push(2u32).unwrap();
    let bytes = encode_section(&Section::new().with("v", values)).unwrap();

    let mut expected = HEADER.to_vec();
    expected.extend_from_slice(&[
        0x04, 0x01, b'v', 0x86, // UInt32 | array flag
        0x08, // two elements
        0x01, 0x00, 0x00, 0x00, 0x02, 0x00, 0x00, 0x00,
    ]);
    assert_eq!(&bytes[..], &expected[..]);
}

#[test]
fn test_wrapped_array_with_flagged_element_is_malformed() {
    let mut bytes = HEADER.to_vec();
    bytes.extend_from_slice(&[0x04, 0x01, b'a', 0x0D, 0x86, 0x04, 0x01, 0x00, 0x00, 0x00]);
    assert!(matches!(
        decode_section(&bytes),
        Err(ProtocolError::MalformedArray(_))
    ));

    let mut bytes = HEADER.to_vec();
    bytes.extend_from_slice(&[0x04, 0x01, b'a', 0x8D, 0x04]);
    assert!(matches!(
        decode_section(&bytes),
        Err(ProtocolError::MalformedArray(_))
    ));
}

#[test]
fn test_trailing_bytes_ignored() {
    let section = Section::new().with("x", 1u8);
    let mut bytes = encode_section(&section).unwrap().to_vec();
    bytes.extend_from_slice(&[0xAB, 0xCD, 0xEF]);

    let mut reader = StorageReader::new(&bytes[..]);
    reader.read_header().unwrap();
    assert_eq!(reader.read_section().unwrap(), section);
    assert_eq!(reader.remaining(), 3);
}

#[test]
fn test_header_errors() {
    assert!(matches!(
        decode_section(&[0x01, 0x11, 0x01]),
        Err(ProtocolError::TruncatedInput { .. })
    ));

    let mut bad_sig = HEADER.to_vec();
    bad_sig[4] = 0xFF;
    bad_sig.push(0x00);
    assert!(matches!(
        decode_section(&bad_sig),
        Err(ProtocolError::BadSignature { .. })
    ));

    let mut bad_version = HEADER.to_vec();
    bad_version[8] = 2;
    bad_version.push(0x00);
    assert!(matches!(
        decode_section(&bad_version),
        Err(ProtocolError::UnsupportedVersion(2))
    ));
}

#[test]
fn test_truncated_body() {
    let bytes = encode_section(&handshake_section()).unwrap();
    for cut in [10, 20, bytes.len() / 2, bytes.len() - 1] {
        assert!(
            matches!(
                decode_section(&bytes[..cut]),
                Err(ProtocolError::TruncatedInput { .. })
            ),
            "cut at {cut}"
        );
    }
}

#[test]
fn test_unknown_tag() {
    let mut bytes = HEADER.to_vec();
    bytes.extend_from_slice(&[0x04, 0x01, b'x', 0x0E, 0x00]);
    assert!(matches!(
        decode_section(&bytes),
        Err(ProtocolError::UnknownType(0x0E))
    ));
}

#[test]
fn test_nesting_limit() {
    let mut section = Section::new();
    for _ in 0..MAX_NESTING_DEPTH + 1 {
        section = Section::new().with("n", section);
    }
    let bytes = encode_section(&section).unwrap();
    assert!(matches!(
        decode_section(&bytes),
        Err(ProtocolError::DepthLimitExceeded(MAX_NESTING_DEPTH))
    ));
}
