//! Fuzz target for frame header boundary conditions
//!
//! # Strategy
//!
//! - Type byte: every known type, first unknown (0x05), random
//! - Length: zero, one, at-max (65535), random
//! - Supplied payload: exact, short by some bytes, with trailing garbage
//!
//! # Invariants
//!
//! - Unknown type byte MUST return `ProtocolError::UnknownType`
//! - Fewer payload bytes than claimed MUST return `FrameTruncated`
//! - Trailing bytes past the claimed length are ignored
//! - Encoded size MUST equal 3 + length

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use natter_proto::{Frame, FrameHeader, PacketType, ProtocolError};

#[derive(Debug, Clone, Arbitrary)]
enum TypeByte {
    Known(u8),
    FirstUnknown,
    Random(u8),
}

#[derive(Debug, Clone, Arbitrary)]
enum Length {
    Zero,
    One,
    Max,
    Random(u16),
}

#[derive(Debug, Clone, Arbitrary)]
enum Body {
    Exact,
    Short(u16),
    Trailing(Vec<u8>),
}

#[derive(Debug, Clone, Arbitrary)]
struct BoundaryFrame {
    type_byte: TypeByte,
    length: Length,
    body: Body,
    fill: u8,
}

fuzz_target!(|input: BoundaryFrame| {
    let tag = match input.type_byte {
        TypeByte::Known(i) => PacketType::ALL[usize::from(i) % PacketType::ALL.len()].to_u8(),
        TypeByte::FirstUnknown => 0x05,
        TypeByte::Random(b) => b,
    };
    let length = match input.length {
        Length::Zero => 0,
        Length::One => 1,
        Length::Max => u16::MAX,
        Length::Random(n) => n,
    };

    let mut wire = vec![tag];
    wire.extend_from_slice(&length.to_be_bytes());

    let claimed = usize::from(length);
    let supplied = match &input.body {
        Body::Exact => claimed,
        Body::Short(n) => claimed.saturating_sub(usize::from(*n).max(1)),
        Body::Trailing(extra) => claimed + extra.len(),
    };
    wire.resize(FrameHeader::SIZE + supplied, input.fill);

    match Frame::decode(&wire) {
        Ok(frame) => {
            assert!(PacketType::from_u8(tag).is_some());
            assert!(supplied >= claimed);
            assert_eq!(frame.encoded_len(), FrameHeader::SIZE + claimed);
            assert_eq!(frame.to_vec(), wire[..FrameHeader::SIZE + claimed]);
        },
        Err(ProtocolError::UnknownType(byte)) => {
            assert_eq!(byte, tag);
            assert!(PacketType::from_u8(tag).is_none());
        },
        Err(ProtocolError::FrameTruncated { expected, actual }) => {
            assert_eq!(expected, claimed);
            assert_eq!(actual, supplied);
            assert!(actual < expected);
        },
        Err(e) => panic!("unexpected error: {e}"),
    }
});
