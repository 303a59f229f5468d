//! natter client binary.
//!
//! Reads chat lines from stdin and sends each as a message. Rooms and
//! incoming chat are reported through the log.
//!
//! # Usage
//!
//! ```bash
//! natter-client --server 127.0.0.1:5000
//! ```

use clap::Parser;
use natter_client::{SessionEvent, connect};
use natter_server::SystemEnv;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// natter chat client
#[derive(Parser, Debug)]
#[command(name = "natter-client")]
#[command(about = "Chat client with length-prefixed frames and heartbeat liveness")]
#[command(version)]
struct Args {
    /// Server address
    #[arg(short, long, default_value = "127.0.0.1:5000")]
    server: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    let mut client = connect(&args.server, SystemEnv::new()).await?;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    loop {
        tokio::select! {
            line = lines.next_line(), if stdin_open => match line? {
                Some(text) if text.trim().is_empty() => {},
                Some(text) => client.send_chat(text).await?,
                None => {
                    stdin_open = false;
                    client.disconnect()?;
                },
            },
            event = client.next_event() => match event {
                Some(SessionEvent::Config { config, .. }) => {
                    for room in &config.rooms {
                        tracing::info!(name = %room.name, description = %room.description, "room");
                    }
                },
                Some(SessionEvent::ChatMessage { message, .. }) => {
                    tracing::info!(text = %message.text, "chat message");
                },
                Some(SessionEvent::Connected { .. }) => {},
                Some(SessionEvent::Disconnected { .. }) | None => break,
            },
        }
    }

    let summary = client.join().await?;
    match summary.error {
        Some(e) => tracing::warn!("disconnected: {}", e),
        None => tracing::info!(duration = ?summary.duration, "disconnected"),
    }

    Ok(())
}
