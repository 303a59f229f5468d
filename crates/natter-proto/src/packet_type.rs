//! Packet type tag.
//!
//! The first byte of every frame. The set is closed: a byte outside it is a
//! protocol error, never a silent no-op.

/// Kind of payload carried by a frame.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PacketType {
    /// Room list pushed by the server right after accept
    Config = 0x00,
    /// Ping/Pong liveness probe
    Heartbeat = 0x01,
    /// Chat text
    ChatMessage = 0x02,
    /// Reserved, never produced
    AudioFrame = 0x03,
    /// Reserved, never produced
    VideoFrame = 0x04,
}

impl PacketType {
    /// All packet types in wire order.
    pub const ALL: [Self; 5] =
        [Self::Config, Self::Heartbeat, Self::ChatMessage, Self::AudioFrame, Self::VideoFrame];

    /// Parse a type byte. `None` if unrecognized.
    #[must_use]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x00 => Some(Self::Config),
            0x01 => Some(Self::Heartbeat),
            0x02 => Some(Self::ChatMessage),
            0x03 => Some(Self::AudioFrame),
            0x04 => Some(Self::VideoFrame),
            _ => None,
        }
    }

    /// Wire byte for this type.
    #[must_use]
    pub const fn to_u8(self) -> u8 {
        self as u8
    }

    /// Reserved types are accepted on the wire but carry nothing we handle.
    #[must_use]
    pub const fn is_reserved(self) -> bool {
        matches!(self, Self::AudioFrame | Self::VideoFrame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_type_maps_back_to_itself() {
        for packet_type in PacketType::ALL {
            assert_eq!(PacketType::from_u8(packet_type.to_u8()), Some(packet_type));
        }
    }

    #[test]
    fn bytes_past_video_frame_are_unknown() {
        for byte in 0x05..=u8::MAX {
            assert_eq!(PacketType::from_u8(byte), None);
        }
    }

    #[test]
    fn only_media_types_are_reserved() {
        assert!(PacketType::AudioFrame.is_reserved());
        assert!(PacketType::VideoFrame.is_reserved());
        assert!(!PacketType::Config.is_reserved());
        assert!(!PacketType::Heartbeat.is_reserved());
        assert!(!PacketType::ChatMessage.is_reserved());
    }
}
