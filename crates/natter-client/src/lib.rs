//! natter chat client.
//!
//! Connects to a server, receives the room list, answers heartbeats, and
//! sends chat text. Rendering and input editing belong to the caller; this
//! crate only exchanges typed values with it.
//!
//! # Components
//!
//! - [`connect`]: open a connection and start the client session
//! - [`ConnectedClient`]: send chat, receive [`SessionEvent`]s, disconnect
//! - [`ClientError`]: connection and send failures

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod error;
pub mod transport;

pub use error::ClientError;
pub use natter_core::{SessionEvent, SessionSummary, env::Environment};
pub use transport::{ConnectedClient, connect};
