//! Typed frame payloads.
//!
//! The frame header's type byte already identifies the payload kind, so the
//! payload bytes carry no tag of their own. Text is NUL-terminated on the
//! wire.
//!
//! # Invariants
//!
//! Each payload variant maps to exactly one packet type (enforced by match
//! exhaustiveness). Decoding the encoding of a valid value yields the same
//! value.

pub mod chat;
pub mod config;
pub mod heartbeat;

use bytes::{BufMut, Bytes};

use crate::{
    Frame, FrameHeader, PacketType,
    errors::{ProtocolError, Result},
};

/// All possible frame payloads.
///
/// # Invariants
///
/// - Type Uniqueness: each variant corresponds to exactly one [`PacketType`].
///
/// - Exhaustive Matching: all methods use exhaustive `match` statements, so a
///   new packet type cannot be added without handling it here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// Room list
    Config(config::Config),
    /// Ping or Pong
    Heartbeat(heartbeat::Heartbeat),
    /// Chat text
    ChatMessage(chat::ChatMessage),
    /// Reserved media frame, carried opaquely
    AudioFrame(Bytes),
    /// Reserved media frame, carried opaquely
    VideoFrame(Bytes),
}

impl Payload {
    /// Packet type corresponding to this payload.
    #[must_use]
    pub const fn packet_type(&self) -> PacketType {
        match self {
            Self::Config(_) => PacketType::Config,
            Self::Heartbeat(_) => PacketType::Heartbeat,
            Self::ChatMessage(_) => PacketType::ChatMessage,
            Self::AudioFrame(_) => PacketType::AudioFrame,
            Self::VideoFrame(_) => PacketType::VideoFrame,
        }
    }

    /// Encode payload bytes (no header) into `dst`.
    ///
    /// Does not enforce the 65535-byte limit; [`Payload::into_frame`] does.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::Malformed` if a text field is empty where it must
    ///   not be, or contains an interior NUL
    pub fn encode(&self, dst: &mut impl BufMut) -> Result<()> {
        match self {
            Self::Config(inner) => inner.encode(dst),
            Self::Heartbeat(inner) => {
                inner.encode(dst);
                Ok(())
            },
            Self::ChatMessage(inner) => inner.encode(dst),
            Self::AudioFrame(bytes) | Self::VideoFrame(bytes) => {
                dst.put_slice(bytes);
                Ok(())
            },
        }
    }

    /// Decode payload bytes according to `packet_type`.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::PayloadTooLarge` if `bytes` exceeds 65535 bytes
    /// - `ProtocolError::Malformed` if the bytes are not a valid value
    pub fn decode(packet_type: PacketType, bytes: &[u8]) -> Result<Self> {
        if bytes.len() > FrameHeader::MAX_PAYLOAD_SIZE {
            return Err(ProtocolError::PayloadTooLarge {
                size: bytes.len(),
                max: FrameHeader::MAX_PAYLOAD_SIZE,
            });
        }

        let payload = match packet_type {
            PacketType::Config => Self::Config(config::Config::decode(bytes)?),
            PacketType::Heartbeat => Self::Heartbeat(heartbeat::Heartbeat::decode(bytes)?),
            PacketType::ChatMessage => Self::ChatMessage(chat::ChatMessage::decode(bytes)?),
            PacketType::AudioFrame => Self::AudioFrame(Bytes::copy_from_slice(bytes)),
            PacketType::VideoFrame => Self::VideoFrame(Bytes::copy_from_slice(bytes)),
        };

        Ok(payload)
    }

    /// Convert payload into a transport frame.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::Malformed` if the value cannot be encoded
    /// - `ProtocolError::PayloadTooLarge` if the encoding exceeds 65535 bytes
    pub fn into_frame(self) -> Result<Frame> {
        let mut buf = Vec::new();
        self.encode(&mut buf)?;
        Frame::new(self.packet_type(), buf)
    }

    /// Parse payload from a raw transport frame.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::Malformed` if the payload bytes are invalid
    pub fn from_frame(frame: &Frame) -> Result<Self> {
        Self::decode(frame.packet_type(), frame.payload())
    }
}

impl From<config::Config> for Payload {
    fn from(config: config::Config) -> Self {
        Self::Config(config)
    }
}

impl From<heartbeat::Heartbeat> for Payload {
    fn from(heartbeat: heartbeat::Heartbeat) -> Self {
        Self::Heartbeat(heartbeat)
    }
}

impl From<chat::ChatMessage> for Payload {
    fn from(message: chat::ChatMessage) -> Self {
        Self::ChatMessage(message)
    }
}

/// Write `text` followed by a NUL terminator.
fn put_cstr(
    dst: &mut impl BufMut,
    text: &str,
    packet_type: PacketType,
    field: &'static str,
) -> Result<()> {
    if text.as_bytes().contains(&0) {
        return Err(ProtocolError::malformed(packet_type, field));
    }

    dst.put_slice(text.as_bytes());
    dst.put_u8(0);
    Ok(())
}

/// Split one NUL-terminated UTF-8 string off the front of `input`.
///
/// Returns the string (without terminator) and the remaining bytes.
fn take_cstr(input: &[u8], packet_type: PacketType) -> Result<(&str, &[u8])> {
    let Some(nul) = input.iter().position(|&b| b == 0) else {
        return Err(ProtocolError::malformed(packet_type, "string is not NUL-terminated"));
    };

    let (text, rest) = input.split_at(nul);
    let text = std::str::from_utf8(text)
        .map_err(|_| ProtocolError::malformed(packet_type, "string is not valid UTF-8"))?;

    Ok((text, &rest[1..]))
}
