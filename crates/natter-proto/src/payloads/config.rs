//! Room list pushed from server to client right after accept.
//!
//! Wire layout: `{name NUL}{description NUL}` repeated until the payload is
//! exhausted. An empty payload is an empty room list.

use bytes::BufMut;

use super::{put_cstr, take_cstr};
use crate::{
    PacketType,
    errors::{ProtocolError, Result},
};

/// One chat room advertised by the server.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Room {
    /// Room name, non-empty
    pub name: String,
    /// Human readable description, non-empty
    pub description: String,
}

impl Room {
    /// Create a room entry.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self { name: name.into(), description: description.into() }
    }
}

/// Ordered room list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    /// Rooms in the order the server listed them
    pub rooms: Vec<Room>,
}

impl Config {
    /// Create a config from an ordered room list.
    #[must_use]
    pub fn new(rooms: Vec<Room>) -> Self {
        Self { rooms }
    }

    /// Encode all rooms as alternating NUL-terminated strings.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::Malformed` if any field is empty or contains NUL
    pub fn encode(&self, dst: &mut impl BufMut) -> Result<()> {
        for room in &self.rooms {
            if room.name.is_empty() {
                return Err(ProtocolError::malformed(PacketType::Config, "empty room name"));
            }
            if room.description.is_empty() {
                return Err(ProtocolError::malformed(
                    PacketType::Config,
                    "empty room description",
                ));
            }

            put_cstr(dst, &room.name, PacketType::Config, "room name contains NUL")?;
            put_cstr(
                dst,
                &room.description,
                PacketType::Config,
                "room description contains NUL",
            )?;
        }

        Ok(())
    }

    /// Decode a room list, consuming every byte of `bytes`.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::Malformed` if a string is unterminated, empty, not
    ///   UTF-8, or a name has no description after it
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let mut rooms = Vec::new();
        let mut rest = bytes;

        while !rest.is_empty() {
            let (name, after_name) = take_cstr(rest, PacketType::Config)?;
            if name.is_empty() {
                return Err(ProtocolError::malformed(PacketType::Config, "empty room name"));
            }

            if after_name.is_empty() {
                return Err(ProtocolError::malformed(
                    PacketType::Config,
                    "room name without description",
                ));
            }

            let (description, after_description) = take_cstr(after_name, PacketType::Config)?;
            if description.is_empty() {
                return Err(ProtocolError::malformed(
                    PacketType::Config,
                    "empty room description",
                ));
            }

            rooms.push(Room::new(name, description));
            rest = after_description;
        }

        Ok(Self { rooms })
    }
}
