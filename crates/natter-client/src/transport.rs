//! TCP connection to a natter server.
//!
//! [`connect`] opens the socket and starts a client-side [`Session`], which
//! answers the server's Pings and surfaces Config and chat values as
//! [`SessionEvent`]s. [`ConnectedClient`] is the handle the caller keeps.

use natter_core::{
    SendOutcome, Session, SessionConfig, SessionEvent, SessionSummary, env::Environment,
};
use natter_proto::{ChatMessage, Payload};
use tokio::{net::TcpStream, sync::mpsc};

use crate::error::ClientError;

/// Buffered events before new ones are dropped.
const EVENT_BUFFER: usize = 32;

/// Handle to a connected client.
#[derive(Debug)]
pub struct ConnectedClient {
    session: Session,
    events: mpsc::Receiver<SessionEvent>,
}

impl ConnectedClient {
    /// Session id used in log output.
    pub fn session_id(&self) -> u64 {
        self.session.id()
    }

    /// Send one line of chat text.
    ///
    /// # Errors
    ///
    /// - `ClientError::Transport` if the text contains NUL or the write fails
    /// - `ClientError::Disconnected` if the server closed the connection
    pub async fn send_chat(&self, text: impl Into<String>) -> Result<(), ClientError> {
        let payload = Payload::ChatMessage(ChatMessage::new(text));
        match self.session.writer().send(payload).await? {
            SendOutcome::Sent(_) => Ok(()),
            SendOutcome::PeerClosed => Err(ClientError::Disconnected),
        }
    }

    /// Next value from the server. `None` once the session has ended and all
    /// events were drained.
    pub async fn next_event(&mut self) -> Option<SessionEvent> {
        self.events.recv().await
    }

    /// Close the connection. Pending events can still be drained.
    ///
    /// # Errors
    ///
    /// - `ClientError::Connection` if the socket shutdown fails
    pub fn disconnect(&self) -> Result<(), ClientError> {
        self.session.close().map_err(|e| ClientError::Connection(format!("shutdown failed: {e}")))
    }

    /// Wait for the session to finish.
    ///
    /// # Errors
    ///
    /// - `ClientError::Connection` if the session task panicked
    pub async fn join(self) -> Result<SessionSummary, ClientError> {
        self.session
            .join()
            .await
            .map_err(|e| ClientError::Connection(format!("session task failed: {e}")))
    }
}

/// Connect to a natter server.
///
/// # Errors
///
/// - `ClientError::Connection` if the server cannot be reached
/// - `ClientError::Session` if the session cannot be started
pub async fn connect<E: Environment>(
    server_addr: &str,
    env: E,
) -> Result<ConnectedClient, ClientError> {
    let stream = TcpStream::connect(server_addr)
        .await
        .map_err(|e| ClientError::Connection(format!("connect to {server_addr} failed: {e}")))?;
    let stream = stream
        .into_std()
        .map_err(|e| ClientError::Connection(format!("socket handoff failed: {e}")))?;

    let (events_tx, events) = mpsc::channel(EVENT_BUFFER);
    let session = Session::spawn(stream, SessionConfig::client(), events_tx, env)?;

    tracing::info!(session_id = session.id(), "connected to {}", server_addr);

    Ok(ConnectedClient { session, events })
}
