//! Server error types.

use std::fmt;

use natter_core::SessionError;

/// Errors that can occur in the server.
#[derive(Debug)]
pub enum ServerError {
    /// Configuration error (malformed room, bad bind address, etc.).
    ///
    /// Fatal at startup. Fix the arguments and restart.
    Config(String),

    /// Listener or socket error.
    ///
    /// Fatal only when binding the listener; accept failures are logged and
    /// the server keeps running.
    Transport(String),

    /// A session could not be started for an accepted connection.
    ///
    /// Affects that connection only.
    Session(SessionError),
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "configuration error: {msg}"),
            Self::Transport(msg) => write!(f, "transport error: {msg}"),
            Self::Session(err) => write!(f, "session error: {err}"),
        }
    }
}

impl std::error::Error for ServerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Session(err) => Some(err),
            _ => None,
        }
    }
}

impl From<SessionError> for ServerError {
    fn from(err: SessionError) -> Self {
        Self::Session(err)
    }
}

impl From<std::io::Error> for ServerError {
    fn from(err: std::io::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

impl From<natter_proto::ProtocolError> for ServerError {
    fn from(err: natter_proto::ProtocolError) -> Self {
        Self::Config(err.to_string())
    }
}
