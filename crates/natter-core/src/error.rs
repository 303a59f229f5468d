//! Error types for transport and session layers.
//!
//! `TransportError` covers a single send or receive. `SessionError` is what a
//! finished session reports: the transport failure that ended it, or a
//! heartbeat timeout.
//!
//! Orderly peer shutdown is not an error at either layer. It is reported as
//! `Ok(None)` by the reader and `SendOutcome::PeerClosed` by the writer.

use std::{io, time::Duration};

use natter_proto::ProtocolError;
use thiserror::Error;

/// Errors from a single frame send or receive.
#[derive(Error, Debug)]
pub enum TransportError {
    /// Socket read or write failed.
    #[error("network error: {0}")]
    Network(#[from] io::Error),

    /// Bytes on the wire did not form a valid frame.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Could not allocate a buffer for the incoming payload.
    #[error("cannot allocate {requested} byte frame buffer")]
    Resource {
        /// Payload length announced by the header
        requested: usize,
    },
}

/// Reason a session ended abnormally.
#[derive(Error, Debug)]
pub enum SessionError {
    /// Socket failure while the session was running.
    #[error("network error: {0}")]
    Network(#[source] io::Error),

    /// Peer sent bytes that are not a valid frame or payload.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Peer did not answer a Ping within one heartbeat interval.
    #[error("no pong within {interval:?}")]
    Timeout {
        /// Heartbeat interval that elapsed
        interval: Duration,
    },

    /// Frame buffer allocation failed.
    #[error("cannot allocate {requested} byte frame buffer")]
    Resource {
        /// Payload length announced by the header
        requested: usize,
    },
}

impl SessionError {
    /// Returns true if the peer could reasonably reconnect and carry on.
    ///
    /// Network failures and missed heartbeats are transient. A protocol
    /// violation means a broken peer, and reconnecting will not fix it.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Timeout { .. })
    }
}

impl From<TransportError> for SessionError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Network(err) => Self::Network(err),
            TransportError::Protocol(err) => Self::Protocol(err),
            TransportError::Resource { requested } => Self::Resource { requested },
        }
    }
}
