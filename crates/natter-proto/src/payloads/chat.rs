//! Chat text payload.

use bytes::BufMut;

use super::{put_cstr, take_cstr};
use crate::{
    PacketType,
    errors::{ProtocolError, Result},
};

/// A line of chat text.
///
/// On the wire the text is followed by exactly one NUL and contains no
/// other. Empty text is allowed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChatMessage {
    /// Message body
    pub text: String,
}

impl ChatMessage {
    /// Wrap text as a chat message.
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    /// Write the text and its terminator.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::Malformed` if the text contains NUL
    pub fn encode(&self, dst: &mut impl BufMut) -> Result<()> {
        put_cstr(dst, &self.text, PacketType::ChatMessage, "text contains NUL")
    }

    /// Decode a payload that is exactly one NUL-terminated string.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::Malformed` if the terminator is missing, bytes follow
    ///   it, or the text is not UTF-8
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let (text, rest) = take_cstr(bytes, PacketType::ChatMessage)?;
        if !rest.is_empty() {
            return Err(ProtocolError::malformed(
                PacketType::ChatMessage,
                "bytes after terminator",
            ));
        }

        Ok(Self::new(text))
    }
}

impl From<&str> for ChatMessage {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_layout() {
        let mut buf = Vec::new();
        ChatMessage::new("hello").encode(&mut buf).expect("no NUL");
        assert_eq!(buf, b"hello\0");
    }

    #[test]
    fn empty_text_is_a_lone_terminator() {
        assert_eq!(ChatMessage::decode(&[0]), Ok(ChatMessage::new("")));
    }

    #[test]
    fn reject_missing_terminator() {
        assert!(ChatMessage::decode(b"hello").is_err());
        assert!(ChatMessage::decode(&[]).is_err());
    }

    #[test]
    fn reject_interior_nul() {
        assert_eq!(
            ChatMessage::decode(b"hel\0lo\0"),
            Err(ProtocolError::malformed(PacketType::ChatMessage, "bytes after terminator"))
        );
    }
}
