//! Liveness probe payload.

use bytes::BufMut;

use crate::{
    PacketType,
    errors::{ProtocolError, Result},
};

/// One-byte heartbeat value.
///
/// The server sends `Ping`, the client answers `Pong`. At most one is in
/// flight per connection.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Heartbeat {
    /// Probe, expects a `Pong` within one interval
    Ping = 0,
    /// Answer to the last `Ping`
    Pong = 1,
}

impl Heartbeat {
    /// Encoded size of a heartbeat payload.
    pub const SIZE: usize = 1;

    /// Parse the wire byte. `None` if out of range.
    #[must_use]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Ping),
            1 => Some(Self::Pong),
            _ => None,
        }
    }

    /// Wire byte.
    #[must_use]
    pub const fn to_u8(self) -> u8 {
        self as u8
    }

    /// Write the single value byte.
    pub fn encode(self, dst: &mut impl BufMut) {
        dst.put_u8(self.to_u8());
    }

    /// Decode an exactly one-byte payload.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::Malformed` if the payload is not exactly one byte, or
    ///   the byte is neither 0 nor 1
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let [value] = bytes else {
            return Err(ProtocolError::malformed(PacketType::Heartbeat, "expected 1 byte"));
        };

        Self::from_u8(*value)
            .ok_or_else(|| ProtocolError::malformed(PacketType::Heartbeat, "unknown value"))
    }
}
