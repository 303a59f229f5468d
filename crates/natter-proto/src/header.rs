//! Frame header with zero-copy parsing.
//!
//! The header is a fixed 3-byte structure: one type byte followed by a
//! Big Endian payload length. A reader needs only these three bytes to know
//! how much more to read.

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::{
    PacketType,
    errors::{ProtocolError, Result},
};

/// Raw on-the-wire layout. All 3-byte patterns are valid here; semantic
/// validation happens in [`FrameHeader::from_bytes`].
#[repr(C)]
#[derive(Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
struct RawHeader {
    packet_type: u8,
    length: [u8; 2],
}

/// Validated frame header.
///
/// # Invariants
///
/// - `packet_type` is always a known [`PacketType`]. Unknown bytes are
///   rejected at parse time.
/// - `length` is at most [`FrameHeader::MAX_PAYLOAD_SIZE`] by construction
///   (it is a `u16`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    packet_type: PacketType,
    length: u16,
}

impl FrameHeader {
    /// Size of the serialized header (3 bytes)
    pub const SIZE: usize = 3;

    /// Maximum payload size. The length field is 16 bits wide, so a single
    /// frame never carries more than 65535 payload bytes.
    pub const MAX_PAYLOAD_SIZE: usize = u16::MAX as usize;

    /// Create a header for a payload of `length` bytes.
    #[must_use]
    pub const fn new(packet_type: PacketType, length: u16) -> Self {
        Self { packet_type, length }
    }

    /// Parse a header from the first [`Self::SIZE`] bytes of `bytes`.
    ///
    /// Trailing bytes are ignored.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::FrameTooShort` if fewer than 3 bytes are available
    /// - `ProtocolError::UnknownType` if the type byte is not recognized
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let (raw, _) = RawHeader::ref_from_prefix(bytes).map_err(|_| {
            ProtocolError::FrameTooShort { expected: Self::SIZE, actual: bytes.len() }
        })?;

        let packet_type = PacketType::from_u8(raw.packet_type)
            .ok_or(ProtocolError::UnknownType(raw.packet_type))?;

        Ok(Self { packet_type, length: u16::from_be_bytes(raw.length) })
    }

    /// Serialize header to bytes.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let raw = RawHeader {
            packet_type: self.packet_type.to_u8(),
            length: self.length.to_be_bytes(),
        };
        let mut arr = [0u8; Self::SIZE];
        arr.copy_from_slice(raw.as_bytes());
        arr
    }

    /// Kind of payload that follows.
    #[must_use]
    pub fn packet_type(&self) -> PacketType {
        self.packet_type
    }

    /// Payload length in bytes.
    #[must_use]
    pub fn length(&self) -> u16 {
        self.length
    }

    /// Payload length as a `usize`, for buffer sizing.
    #[must_use]
    pub fn payload_len(&self) -> usize {
        usize::from(self.length)
    }
}
