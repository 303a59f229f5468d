//! Fuzz target for Frame::decode and Payload::from_frame
//!
//! Arbitrary bytes are decoded as a frame, then the payload is decoded for
//! the frame's own type and for every other type (type confusion).
//!
//! The fuzzer should NEVER panic. All invalid inputs should return an error.

#![no_main]

use libfuzzer_sys::fuzz_target;
use natter_proto::{Frame, PacketType, Payload};

fuzz_target!(|data: &[u8]| {
    if let Ok(frame) = Frame::decode(data) {
        assert_eq!(frame.payload().len(), frame.header().payload_len());
        let _ = Payload::from_frame(&frame);
    }

    for packet_type in PacketType::ALL {
        if let Ok(payload) = Payload::decode(packet_type, data) {
            // Anything that decodes must re-encode to the same bytes
            let frame = payload.into_frame().expect("decoded payload re-encodes");
            assert_eq!(frame.payload().as_ref(), data);
        }
    }
});
