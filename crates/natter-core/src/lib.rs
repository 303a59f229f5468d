//! Connection runtime for the natter chat protocol.
//!
//! Builds on the pure codec in [`natter_proto`] with the pieces that touch a
//! socket:
//!
//! - [`transport`]: frame reader and mutex-guarded frame writer over split
//!   stream halves, tolerant of partial reads and writes
//! - [`heartbeat`]: Ping/Pong liveness state machine and its async driver
//! - [`session`]: the per-connection dispatcher that ties them together
//!
//! # Concurrency
//!
//! Each session runs two tasks. The dispatcher owns the read half. The
//! heartbeat task shares only the write path and an atomic liveness flag with
//! it. The dispatcher cancels the heartbeat through a `CancellationToken` when
//! the connection ends; the heartbeat ends the connection by shutting the
//! socket down, which the dispatcher observes as end of stream.
//!
//! Time and randomness come from an [`Environment`](env::Environment), so
//! tests can substitute their own.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod env;
pub mod error;
pub mod heartbeat;
pub mod session;
pub mod transport;

pub use error::{SessionError, TransportError};
pub use heartbeat::{
    HeartbeatAction, HeartbeatMonitor, Liveness, MonitorExit, MonitorState, run_heartbeat,
};
pub use session::{
    DEFAULT_HEARTBEAT_INTERVAL, DispatchAction, Role, Session, SessionConfig, SessionEvent,
    SessionSummary, route,
};
pub use transport::{ConnectionCloser, Disconnect, FrameReader, FrameWriter, SendOutcome};
