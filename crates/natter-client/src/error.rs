//! Client error types.

use natter_core::{SessionError, TransportError};
use thiserror::Error;

/// Errors from connecting to and talking with a server.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Could not reach the server.
    #[error("connection failed: {0}")]
    Connection(String),

    /// Session could not be started on the connected socket.
    #[error("session error: {0}")]
    Session(#[from] SessionError),

    /// Sending a frame failed.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The server closed the connection.
    #[error("disconnected from server")]
    Disconnected,
}
