//! natter chat server.
//!
//! Accepts TCP connections, pushes the configured room list to each new
//! client, and runs one [`Session`] per connection with a heartbeat. Incoming
//! chat messages are logged; nothing is routed between clients.
//!
//! # Components
//!
//! - [`Server`]: listener and accept loop
//! - [`ServerRuntimeConfig`]: bind address, rooms, heartbeat interval
//! - [`SystemEnv`]: production environment (real time, crypto RNG)

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod system_env;

use std::{net::SocketAddr, time::Duration};

pub use error::ServerError;
use natter_core::{DEFAULT_HEARTBEAT_INTERVAL, Session, SessionConfig, SessionEvent};
use natter_proto::{Config, Payload, Room};
pub use system_env::SystemEnv;
use tokio::{net::TcpListener, sync::mpsc};

/// Port the server listens on unless told otherwise.
pub const DEFAULT_PORT: u16 = 5000;

/// Buffered session events before new ones are dropped.
const EVENT_BUFFER: usize = 256;

/// Server configuration for the production runtime.
#[derive(Debug, Clone)]
pub struct ServerRuntimeConfig {
    /// Address to bind to (e.g., "0.0.0.0:5000")
    pub bind_address: String,
    /// Room list pushed to every client after accept
    pub rooms: Config,
    /// Ping interval, also the time allowed for each Pong
    pub heartbeat_interval: Duration,
}

impl Default for ServerRuntimeConfig {
    fn default() -> Self {
        Self {
            bind_address: format!("0.0.0.0:{DEFAULT_PORT}"),
            rooms: Config::new(vec![Room::new("General", "Default room")]),
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
        }
    }
}

/// Parse a `NAME=DESCRIPTION` room argument.
///
/// # Errors
///
/// - `ServerError::Config` if there is no `=`, or either side is empty or
///   contains NUL
pub fn parse_room(spec: &str) -> Result<Room, ServerError> {
    let Some((name, description)) = spec.split_once('=') else {
        return Err(ServerError::Config(format!("expected NAME=DESCRIPTION, got {spec:?}")));
    };

    let (name, description) = (name.trim(), description.trim());
    if name.is_empty() || description.is_empty() {
        return Err(ServerError::Config(format!(
            "room name and description must be non-empty: {spec:?}"
        )));
    }
    if name.contains('\0') || description.contains('\0') {
        return Err(ServerError::Config(format!("room contains NUL: {spec:?}")));
    }

    Ok(Room::new(name, description))
}

/// Production natter server.
#[derive(Debug)]
pub struct Server {
    listener: TcpListener,
    config: ServerRuntimeConfig,
    env: SystemEnv,
}

impl Server {
    /// Validate the room list and bind the listener.
    ///
    /// # Errors
    ///
    /// - `ServerError::Config` if the room list cannot be encoded as one frame
    /// - `ServerError::Transport` if the address cannot be bound
    pub async fn bind(config: ServerRuntimeConfig) -> Result<Self, ServerError> {
        Payload::Config(config.rooms.clone()).into_frame()?;

        let listener = TcpListener::bind(&config.bind_address).await.map_err(|e| {
            ServerError::Transport(format!("failed to bind {}: {e}", config.bind_address))
        })?;

        Ok(Self { listener, config, env: SystemEnv::new() })
    }

    /// Local address the server is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.listener.local_addr()?)
    }

    /// Run the server, logging chat messages as they arrive.
    ///
    /// Runs until the task is dropped. Accept failures are logged, not
    /// returned.
    pub async fn run(self) -> Result<(), ServerError> {
        let (events_tx, events_rx) = mpsc::channel(EVENT_BUFFER);
        tokio::spawn(log_events(events_rx));
        self.run_with_events(events_tx).await
    }

    /// Run the server, forwarding every session event to `events`.
    ///
    /// Sessions never wait on `events`: while it is full, new events are
    /// logged and dropped.
    pub async fn run_with_events(
        self,
        events: mpsc::Sender<SessionEvent>,
    ) -> Result<(), ServerError> {
        tracing::info!("Server listening on {}", self.local_addr()?);

        let session_config = SessionConfig::server()
            .with_heartbeat_interval(Some(self.config.heartbeat_interval))
            .with_greeting(self.config.rooms.clone());

        loop {
            match self.listener.accept().await {
                Ok((stream, peer)) => {
                    if let Err(e) = self.start_session(stream, &session_config, events.clone()) {
                        tracing::error!(%peer, "failed to start session: {}", e);
                    }
                },
                Err(e) => {
                    tracing::error!("Accept error: {}", e);
                },
            }
        }
    }

    fn start_session(
        &self,
        stream: tokio::net::TcpStream,
        config: &SessionConfig,
        events: mpsc::Sender<SessionEvent>,
    ) -> Result<(), ServerError> {
        let stream = stream.into_std()?;
        let session = Session::spawn(stream, config.clone(), events, self.env.clone())?;
        let session_id = session.id();

        tokio::spawn(async move {
            match session.join().await {
                Ok(summary) => match summary.error {
                    Some(e) if e.is_transient() => {
                        tracing::info!(session_id, "client dropped: {}", e);
                    },
                    Some(e) => tracing::warn!(session_id, "client misbehaved: {}", e),
                    None => tracing::debug!(session_id, "client disconnected"),
                },
                Err(e) => tracing::error!(session_id, "session task failed: {}", e),
            }
        });

        Ok(())
    }
}

/// Default event consumer: chat is logged, nothing is forwarded.
async fn log_events(mut events: mpsc::Receiver<SessionEvent>) {
    while let Some(event) = events.recv().await {
        match event {
            SessionEvent::Connected { session_id, peer } => {
                tracing::info!(session_id, ?peer, "connected to client");
            },
            SessionEvent::ChatMessage { session_id, message } => {
                tracing::info!(session_id, text = %message.text, "received chat message");
            },
            SessionEvent::Config { session_id, .. } => {
                tracing::debug!(session_id, "ignoring config event");
            },
            SessionEvent::Disconnected { session_id } => {
                tracing::info!(session_id, "client disconnected");
            },
        }
    }
}
