//! Frame type combining header and payload.
//!
//! A `Frame` is the transport-layer unit consisting of:
//! - 3-byte header (type + Big Endian length)
//! - Variable-length raw payload bytes (already encoded)
//!
//! This is a pure data holder. For typed values, see `Payload::into_frame()`
//! and `Payload::from_frame()`.

use bytes::{BufMut, Bytes};

use crate::{
    FrameHeader, PacketType,
    errors::{ProtocolError, Result},
};

/// Complete protocol frame.
///
/// Layout on the wire: `[FrameHeader: 3 bytes] + [payload: length bytes]`
///
/// # Invariants
///
/// - Size Consistency: `payload.len()` always equals `header.length()`. The
///   fields are private and every constructor derives the length from the
///   payload, so a mismatched frame cannot be built.
///
/// - Size Limit: `payload.len()` never exceeds
///   [`FrameHeader::MAX_PAYLOAD_SIZE`] (65535).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    header: FrameHeader,
    payload: Bytes,
}

impl Frame {
    /// Create a frame, computing the header length from the payload.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::PayloadTooLarge` if the payload exceeds 65535 bytes
    pub fn new(packet_type: PacketType, payload: impl Into<Bytes>) -> Result<Self> {
        let payload = payload.into();

        let length = u16::try_from(payload.len()).map_err(|_| ProtocolError::PayloadTooLarge {
            size: payload.len(),
            max: FrameHeader::MAX_PAYLOAD_SIZE,
        })?;

        Ok(Self { header: FrameHeader::new(packet_type, length), payload })
    }

    /// Reassemble a frame from a parsed header and the payload read after it.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::FrameTruncated` if `payload` is not exactly
    ///   `header.length()` bytes
    pub fn from_parts(header: FrameHeader, payload: impl Into<Bytes>) -> Result<Self> {
        let payload = payload.into();

        if payload.len() != header.payload_len() {
            return Err(ProtocolError::FrameTruncated {
                expected: header.payload_len(),
                actual: payload.len(),
            });
        }

        Ok(Self { header, payload })
    }

    /// Frame header.
    #[must_use]
    pub fn header(&self) -> &FrameHeader {
        &self.header
    }

    /// Kind of payload carried.
    #[must_use]
    pub fn packet_type(&self) -> PacketType {
        self.header.packet_type()
    }

    /// Raw payload bytes.
    #[must_use]
    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// Total bytes this frame occupies on the wire.
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        FrameHeader::SIZE + self.payload.len()
    }

    /// Encode frame into buffer.
    ///
    /// Writes: `[header (3 bytes)] + [payload (length bytes)]`
    pub fn encode(&self, dst: &mut impl BufMut) {
        debug_assert_eq!(self.payload.len(), self.header.payload_len());

        dst.put_slice(&self.header.to_bytes());
        dst.put_slice(&self.payload);
    }

    /// Encode into a freshly allocated buffer.
    #[must_use]
    pub fn to_vec(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.encoded_len());
        self.encode(&mut buf);
        buf
    }

    /// Decode frame from wire format.
    ///
    /// Returns a Frame with raw bytes (does NOT decode the payload). Trailing
    /// bytes beyond the declared length are ignored.
    ///
    /// # Errors
    ///
    /// - `ProtocolError` if header parsing fails (too short, unknown type)
    /// - `ProtocolError::FrameTruncated` if fewer payload bytes than the header
    ///   claims are present
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let header = FrameHeader::from_bytes(bytes)?;
        let total_size = FrameHeader::SIZE + header.payload_len();

        let Some(payload) = bytes.get(FrameHeader::SIZE..total_size) else {
            return Err(ProtocolError::FrameTruncated {
                expected: header.payload_len(),
                actual: bytes.len().saturating_sub(FrameHeader::SIZE),
            });
        };

        Ok(Self { header, payload: Bytes::copy_from_slice(payload) })
    }
}
