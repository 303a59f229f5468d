//! Per-connection session: dispatcher loop plus optional heartbeat task.
//!
//! A session owns one TCP stream. The dispatcher reads frames and routes
//! them: Pongs go to the liveness flag, Pings get a Pong, chat and config
//! values go to the caller's event channel. When the read side ends, for any
//! reason, the dispatcher cancels the heartbeat, closes the socket, and waits
//! for the heartbeat task before reporting a [`SessionSummary`].
//!
//! Routing decisions are made by [`route`], a pure function over the decoded
//! payload, so the policy is testable without a socket.
//!
//! Events never block the read loop. If the consumer falls behind and the
//! channel is full, the event is logged and dropped; Pongs keep being
//! recorded either way.

use std::{io, net::SocketAddr, sync::Arc, time::Duration};

use natter_proto::{ChatMessage, Config, Heartbeat, Payload};
use tokio::{
    io::{AsyncRead, AsyncWrite},
    net::tcp::OwnedWriteHalf,
    sync::{
        mpsc::{self, error::TrySendError},
        watch,
    },
    task::{JoinError, JoinHandle},
};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::{
    env::Environment,
    error::SessionError,
    heartbeat::{HeartbeatContext, Liveness, MonitorExit, MonitorState, run_heartbeat},
    transport::{ConnectionCloser, Disconnect, FrameReader, FrameWriter, SendOutcome},
};

/// Heartbeat interval used by the server unless configured otherwise.
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(5);

/// Which end of the connection this session is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Accepted connection; sends Config and Pings
    Server,
    /// Outgoing connection; receives Config and answers Pings
    Client,
}

/// Session configuration.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Which end of the connection this is
    pub role: Role,
    /// Ping interval. `None` runs no heartbeat task.
    pub heartbeat_interval: Option<Duration>,
    /// Room list pushed to the peer before anything else
    pub greeting: Option<Config>,
}

impl SessionConfig {
    /// Server end: heartbeat every [`DEFAULT_HEARTBEAT_INTERVAL`].
    pub fn server() -> Self {
        Self {
            role: Role::Server,
            heartbeat_interval: Some(DEFAULT_HEARTBEAT_INTERVAL),
            greeting: None,
        }
    }

    /// Client end: no heartbeat of its own, only Pong replies.
    pub fn client() -> Self {
        Self { role: Role::Client, heartbeat_interval: None, greeting: None }
    }

    /// Push `config` to the peer right after the session starts.
    #[must_use]
    pub fn with_greeting(mut self, config: Config) -> Self {
        self.greeting = Some(config);
        self
    }

    /// Override the heartbeat interval.
    #[must_use]
    pub fn with_heartbeat_interval(mut self, interval: Option<Duration>) -> Self {
        self.heartbeat_interval = interval;
        self
    }
}

/// Values handed to the layer above the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Session started
    Connected {
        /// Session id used in log output
        session_id: u64,
        /// Remote address, if known
        peer: Option<SocketAddr>,
    },
    /// Room list received (client end)
    Config {
        /// Session id used in log output
        session_id: u64,
        /// Received rooms
        config: Config,
    },
    /// Chat text received
    ChatMessage {
        /// Session id used in log output
        session_id: u64,
        /// Received message
        message: ChatMessage,
    },
    /// Session ended and its socket is closed
    Disconnected {
        /// Session id used in log output
        session_id: u64,
    },
}

/// What the dispatcher does with one decoded payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchAction {
    /// Mark the last Ping as answered
    RecordPong,
    /// Answer the peer's Ping
    ReplyPong,
    /// Hand the event to the caller
    Deliver(SessionEvent),
    /// Drop the payload; it was read only to keep the stream aligned
    Discard {
        /// Why it was dropped
        reason: &'static str,
    },
}

/// Decide how a session in `role` handles `payload`.
pub fn route(role: Role, session_id: u64, payload: Payload) -> DispatchAction {
    match payload {
        Payload::Heartbeat(Heartbeat::Pong) => DispatchAction::RecordPong,
        Payload::Heartbeat(Heartbeat::Ping) => DispatchAction::ReplyPong,
        Payload::ChatMessage(message) => {
            DispatchAction::Deliver(SessionEvent::ChatMessage { session_id, message })
        },
        Payload::Config(config) => match role {
            Role::Client => DispatchAction::Deliver(SessionEvent::Config { session_id, config }),
            Role::Server => DispatchAction::Discard { reason: "config is server-to-client only" },
        },
        Payload::AudioFrame(_) | Payload::VideoFrame(_) => {
            DispatchAction::Discard { reason: "reserved packet type" }
        },
    }
}

/// Outcome of a finished session.
#[derive(Debug)]
pub struct SessionSummary {
    /// Session id used in log output
    pub session_id: u64,
    /// Time from spawn until both tasks finished
    pub duration: Duration,
    /// Frames decoded by the dispatcher
    pub frames_received: u64,
    /// How the heartbeat task ended, if one ran
    pub monitor: Option<MonitorExit>,
    /// Why the session ended abnormally. `None` for an orderly close.
    pub error: Option<SessionError>,
}

/// Handle to a running session.
#[derive(Debug)]
pub struct Session {
    id: u64,
    writer: FrameWriter<OwnedWriteHalf>,
    closer: Arc<ConnectionCloser<std::net::TcpStream>>,
    monitor_state: Option<watch::Receiver<MonitorState>>,
    task: JoinHandle<SessionSummary>,
}

impl Session {
    /// Start the dispatcher (and heartbeat, if configured) for `stream`.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// - `SessionError::Network` if the stream cannot be cloned or
    ///   registered with the runtime
    pub fn spawn<E: Environment>(
        stream: std::net::TcpStream,
        config: SessionConfig,
        events: mpsc::Sender<SessionEvent>,
        env: E,
    ) -> Result<Self, SessionError> {
        let session_id = env.random_u64();
        let peer = stream.peer_addr().ok();

        let shutdown_handle = stream.try_clone().map_err(SessionError::Network)?;
        stream.set_nonblocking(true).map_err(SessionError::Network)?;
        let stream = tokio::net::TcpStream::from_std(stream).map_err(SessionError::Network)?;
        let (read, write) = stream.into_split();

        let link = SessionLink {
            session_id,
            role: config.role,
            writer: FrameWriter::new(write),
            closer: Arc::new(ConnectionCloser::new(shutdown_handle)),
            liveness: Arc::new(Liveness::new()),
            cancel: CancellationToken::new(),
            events,
        };

        let writer = link.writer.clone();
        let closer = Arc::clone(&link.closer);

        let (state_tx, state_rx) = watch::channel(MonitorState::Idle);
        let monitor_state = config.heartbeat_interval.map(|_| state_rx);

        let span = tracing::info_span!("session", session_id, role = ?config.role);
        let task = tokio::spawn(
            run_session(link, FrameReader::new(read), config, state_tx, peer, env).instrument(span),
        );

        Ok(Self { id: session_id, writer, closer, monitor_state, task })
    }

    /// Session id used in log output.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Write path shared with the session's own tasks.
    pub fn writer(&self) -> &FrameWriter<OwnedWriteHalf> {
        &self.writer
    }

    /// Heartbeat state, if a heartbeat task runs.
    pub fn monitor_state(&self) -> Option<watch::Receiver<MonitorState>> {
        self.monitor_state.clone()
    }

    /// Close the connection locally. The session then winds down on its own.
    ///
    /// # Errors
    ///
    /// Propagates socket shutdown failures.
    pub fn close(&self) -> std::io::Result<()> {
        self.closer.close().map(|_| ())
    }

    /// Wait for both tasks to finish.
    ///
    /// # Errors
    ///
    /// Returns the `JoinError` if the session task panicked.
    pub async fn join(self) -> Result<SessionSummary, JoinError> {
        self.task.await
    }
}

/// State shared by the dispatcher and heartbeat of one session.
struct SessionLink<W, D> {
    session_id: u64,
    role: Role,
    writer: FrameWriter<W>,
    closer: Arc<ConnectionCloser<D>>,
    liveness: Arc<Liveness>,
    cancel: CancellationToken,
    events: mpsc::Sender<SessionEvent>,
}

impl<W, D> SessionLink<W, D>
where
    W: AsyncWrite + Unpin + Send + 'static,
    D: Disconnect,
{
    fn emit(&self, event: SessionEvent) {
        match self.events.try_send(event) {
            Ok(()) => {},
            Err(TrySendError::Full(event)) => {
                tracing::warn!(?event, "event consumer is behind, dropping event");
            },
            Err(TrySendError::Closed(_)) => tracing::debug!("event receiver dropped"),
        }
    }

    /// Push the room list ahead of any other frame.
    async fn greet(&self, greeting: Config) -> Result<(), SessionError> {
        match self.writer.send(Payload::Config(greeting)).await? {
            SendOutcome::Sent(_) => {
                tracing::debug!("config sent");
                Ok(())
            },
            SendOutcome::PeerClosed => Err(SessionError::Network(io::Error::new(
                io::ErrorKind::WriteZero,
                "peer closed before config was sent",
            ))),
        }
    }
}

async fn run_session<R, W, D, E>(
    link: SessionLink<W, D>,
    mut reader: FrameReader<R>,
    config: SessionConfig,
    state_tx: watch::Sender<MonitorState>,
    peer: Option<SocketAddr>,
    env: E,
) -> SessionSummary
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
    D: Disconnect,
    E: Environment,
{
    let started = env.now();
    tracing::info!(?peer, "session started");
    link.emit(SessionEvent::Connected { session_id: link.session_id, peer });

    let greeted = match config.greeting {
        Some(greeting) => link.greet(greeting).await,
        None => Ok(()),
    };

    let mut frames_received = 0;
    let (heartbeat, mut error) = match greeted {
        Ok(()) => {
            let heartbeat = config.heartbeat_interval.map(|interval| {
                let ctx = HeartbeatContext {
                    writer: link.writer.clone(),
                    liveness: Arc::clone(&link.liveness),
                    closer: Arc::clone(&link.closer),
                    cancel: link.cancel.clone(),
                    state: state_tx,
                };
                let handle =
                    tokio::spawn(run_heartbeat(ctx, interval, env.clone()).in_current_span());
                (interval, handle)
            });
            (heartbeat, dispatch(&link, &mut reader, &mut frames_received).await.err())
        },
        Err(e) => {
            tracing::error!("failed to send config: {}", e);
            (None, Some(e))
        },
    };

    link.cancel.cancel();
    if let Err(e) = link.closer.close() {
        tracing::error!("failed to close connection: {}", e);
    }

    let mut monitor = None;
    if let Some((interval, handle)) = heartbeat {
        match handle.await {
            Ok(exit) => {
                if exit == MonitorExit::TimedOut {
                    error = Some(SessionError::Timeout { interval });
                }
                monitor = Some(exit);
            },
            Err(e) => tracing::error!("heartbeat task failed: {}", e),
        }
    }

    link.emit(SessionEvent::Disconnected { session_id: link.session_id });

    let duration = env.now() - started;
    match &error {
        None => tracing::info!(?duration, frames_received, "session ended"),
        Some(e) => tracing::info!(?duration, frames_received, "session ended: {}", e),
    }

    SessionSummary { session_id: link.session_id, duration, frames_received, monitor, error }
}

/// Read and route frames until the peer closes or something fails.
async fn dispatch<R, W, D>(
    link: &SessionLink<W, D>,
    reader: &mut FrameReader<R>,
    frames_received: &mut u64,
) -> Result<(), SessionError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
    D: Disconnect,
{
    loop {
        let frame = match reader.recv_frame().await {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                tracing::debug!("peer closed connection");
                return Ok(());
            },
            Err(e) => {
                let e = SessionError::from(e);
                if e.is_transient() {
                    tracing::error!("receive failed: {}", e);
                } else {
                    tracing::warn!("protocol violation: {}", e);
                }
                return Err(e);
            },
        };

        *frames_received += 1;
        tracing::debug!(
            packet_type = ?frame.packet_type(),
            len = frame.payload().len(),
            "frame received"
        );

        let payload = Payload::from_frame(&frame).map_err(|e| {
            tracing::warn!("protocol violation: {}", e);
            SessionError::Protocol(e)
        })?;

        match route(link.role, link.session_id, payload) {
            DispatchAction::RecordPong => link.liveness.record_pong(),
            DispatchAction::ReplyPong => {
                match link.writer.send(Payload::Heartbeat(Heartbeat::Pong)).await? {
                    SendOutcome::Sent(_) => {},
                    SendOutcome::PeerClosed => return Ok(()),
                }
            },
            DispatchAction::Deliver(event) => link.emit(event),
            DispatchAction::Discard { reason } => {
                tracing::warn!(packet_type = ?frame.packet_type(), "discarding frame: {}", reason);
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use natter_proto::Room;

    use super::*;

    #[test]
    fn pong_updates_liveness() {
        let action = route(Role::Server, 1, Payload::Heartbeat(Heartbeat::Pong));
        assert_eq!(action, DispatchAction::RecordPong);
    }

    #[test]
    fn ping_gets_a_reply() {
        let action = route(Role::Client, 1, Payload::Heartbeat(Heartbeat::Ping));
        assert_eq!(action, DispatchAction::ReplyPong);
    }

    #[test]
    fn chat_is_delivered_on_both_ends() {
        for role in [Role::Server, Role::Client] {
            let action = route(role, 7, Payload::ChatMessage(ChatMessage::new("hello world")));
            assert_eq!(
                action,
                DispatchAction::Deliver(SessionEvent::ChatMessage {
                    session_id: 7,
                    message: ChatMessage::new("hello world"),
                })
            );
        }
    }

    #[test]
    fn config_is_only_delivered_to_clients() {
        let config = Config::new(vec![Room::new("General", "Default room")]);

        let action = route(Role::Client, 3, Payload::Config(config.clone()));
        assert_eq!(
            action,
            DispatchAction::Deliver(SessionEvent::Config { session_id: 3, config: config.clone() })
        );

        let action = route(Role::Server, 3, Payload::Config(config));
        assert!(matches!(action, DispatchAction::Discard { .. }));
    }

    #[test]
    fn reserved_frames_are_discarded() {
        let action = route(Role::Client, 1, Payload::AudioFrame(Bytes::from_static(b"pcm")));
        assert_eq!(action, DispatchAction::Discard { reason: "reserved packet type" });
    }

    #[test]
    fn server_config_pings_by_default() {
        let config = SessionConfig::server();
        assert_eq!(config.role, Role::Server);
        assert_eq!(config.heartbeat_interval, Some(DEFAULT_HEARTBEAT_INTERVAL));

        let config = SessionConfig::client();
        assert_eq!(config.heartbeat_interval, None);
    }
}
