//! Wire format for the natter chat protocol.
//!
//! Every frame on the TCP stream is a fixed 3-byte header followed by a
//! variable-length payload:
//!
//! ```text
//! ┌────────────┬──────────────────┬──────────────────────┐
//! │ type: u8   │ length: u16 (BE) │ payload: length bytes │
//! └────────────┴──────────────────┴──────────────────────┘
//! ```
//!
//! The header is parsed with `zerocopy` so a reader can learn the payload kind
//! and size before touching the payload. Payloads are NUL-terminated strings
//! (config rooms, chat text) or a single heartbeat byte.
//!
//! This crate performs no I/O. The only failure path is malformed input,
//! reported as [`ProtocolError`].
#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod errors;
pub mod frame;
pub mod header;
pub mod packet_type;
pub mod payloads;

pub use errors::{ProtocolError, Result};
pub use frame::Frame;
pub use header::FrameHeader;
pub use packet_type::PacketType;
pub use payloads::{
    Payload,
    chat::ChatMessage,
    config::{Config, Room},
    heartbeat::Heartbeat,
};
