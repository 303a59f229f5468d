//! Protocol errors.
//!
//! Every variant describes bad bytes, never bad I/O. The transport layer wraps
//! these alongside its own network failures.

use thiserror::Error;

use crate::PacketType;

/// Result alias for codec operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors produced while encoding or decoding frames.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// The type byte does not name any [`PacketType`].
    #[error("unknown packet type: {0:#04x}")]
    UnknownType(u8),

    /// Payload bytes do not form a valid value of the given type.
    #[error("malformed {packet_type:?} payload: {reason}")]
    Malformed {
        /// Packet type being decoded or encoded
        packet_type: PacketType,
        /// What was wrong with it
        reason: &'static str,
    },

    /// Fewer bytes than a full header.
    #[error("frame too short: expected {expected} bytes, got {actual}")]
    FrameTooShort {
        /// Bytes required
        expected: usize,
        /// Bytes available
        actual: usize,
    },

    /// Header promised more payload than the buffer holds.
    #[error("frame truncated: header claims {expected} payload bytes, got {actual}")]
    FrameTruncated {
        /// Payload length from the header
        expected: usize,
        /// Payload bytes available
        actual: usize,
    },

    /// Payload does not fit the 16-bit length field.
    #[error("payload too large: {size} bytes (max {max})")]
    PayloadTooLarge {
        /// Actual payload size
        size: usize,
        /// Maximum allowed size
        max: usize,
    },
}

impl ProtocolError {
    pub(crate) fn malformed(packet_type: PacketType, reason: &'static str) -> Self {
        Self::Malformed { packet_type, reason }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_type_byte() {
        assert_eq!(ProtocolError::UnknownType(0x2a).to_string(), "unknown packet type: 0x2a");
    }

    #[test]
    fn display_includes_malformed_reason() {
        let err = ProtocolError::malformed(PacketType::Heartbeat, "expected 1 byte");
        assert_eq!(err.to_string(), "malformed Heartbeat payload: expected 1 byte");
    }
}
