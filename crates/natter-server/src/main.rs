//! natter server binary.
//!
//! # Usage
//!
//! ```bash
//! # Listen on the default port with the default "General" room
//! natter-server
//!
//! # Custom rooms and a faster heartbeat
//! natter-server --bind 127.0.0.1:6000 --room "General=Default room" \
//!     --room "Rust=Ownership questions" --heartbeat-secs 2
//! ```

use std::time::Duration;

use clap::Parser;
use natter_proto::{Config, Room};
use natter_server::{Server, ServerRuntimeConfig, parse_room};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// natter chat server
#[derive(Parser, Debug)]
#[command(name = "natter-server")]
#[command(about = "Chat server with length-prefixed frames and heartbeat liveness")]
#[command(version)]
struct Args {
    /// Address to bind to
    #[arg(short, long, default_value_t = ServerRuntimeConfig::default().bind_address)]
    bind: String,

    /// Room to advertise, as NAME=DESCRIPTION (repeatable)
    #[arg(short, long = "room", value_parser = room_arg)]
    rooms: Vec<Room>,

    /// Seconds between pings; a client must answer within one interval
    #[arg(long, default_value = "5", value_parser = clap::value_parser!(u64).range(1..))]
    heartbeat_secs: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn room_arg(spec: &str) -> Result<Room, String> {
    parse_room(spec).map_err(|e| e.to_string())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    tracing::info!("natter server starting");
    tracing::info!("Binding to {}", args.bind);

    let mut config = ServerRuntimeConfig {
        bind_address: args.bind,
        heartbeat_interval: Duration::from_secs(args.heartbeat_secs),
        ..Default::default()
    };
    if !args.rooms.is_empty() {
        config.rooms = Config::new(args.rooms);
    }

    for room in &config.rooms.rooms {
        tracing::info!(name = %room.name, description = %room.description, "advertising room");
    }

    let server = Server::bind(config).await?;
    server.run().await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use natter_server::DEFAULT_PORT;

    use super::*;

    #[test]
    fn bind_defaults_to_the_default_port() {
        let args = Args::try_parse_from(["natter-server"]).expect("no arguments needed");
        assert_eq!(args.bind, format!("0.0.0.0:{DEFAULT_PORT}"));
        assert!(args.rooms.is_empty());
        assert_eq!(args.heartbeat_secs, 5);
    }
}
