//! End-to-end scenarios against a running server on localhost.
//!
//! The client side is driven by hand with `FrameReader`/`FrameWriter` so each
//! test controls exactly which frames go back to the server.

use std::time::Duration;

use natter_core::{FrameReader, FrameWriter, SessionEvent};
use natter_proto::{ChatMessage, Config, Heartbeat, Payload, Room};
use natter_server::{Server, ServerRuntimeConfig};
use tokio::{
    net::{
        TcpStream,
        tcp::{OwnedReadHalf, OwnedWriteHalf},
    },
    sync::mpsc,
};

const INTERVAL: Duration = Duration::from_millis(100);

struct Peer {
    reader: FrameReader<OwnedReadHalf>,
    writer: FrameWriter<OwnedWriteHalf>,
}

impl Peer {
    async fn next(&mut self) -> Option<Payload> {
        let frame = tokio::time::timeout(Duration::from_secs(2), self.reader.recv_frame())
            .await
            .expect("frame within deadline")
            .expect("read");
        frame.map(|frame| Payload::from_frame(&frame).expect("valid payload"))
    }

    async fn send(&self, payload: Payload) {
        self.writer.send(payload).await.expect("send");
    }
}

async fn start_server(rooms: Config) -> (Peer, mpsc::Receiver<SessionEvent>) {
    start_server_with_buffer(rooms, 64).await
}

async fn start_server_with_buffer(
    rooms: Config,
    event_buffer: usize,
) -> (Peer, mpsc::Receiver<SessionEvent>) {
    let config = ServerRuntimeConfig {
        bind_address: "127.0.0.1:0".to_string(),
        rooms,
        heartbeat_interval: INTERVAL,
    };
    let server = Server::bind(config).await.expect("bind");
    let addr = server.local_addr().expect("local addr");

    let (events_tx, events) = mpsc::channel(event_buffer);
    tokio::spawn(server.run_with_events(events_tx));

    let stream = TcpStream::connect(addr).await.expect("connect");
    let (read, write) = stream.into_split();
    (Peer { reader: FrameReader::new(read), writer: FrameWriter::new(write) }, events)
}

fn general() -> Config {
    Config::new(vec![Room::new("General", "Default room")])
}

async fn next_event(events: &mut mpsc::Receiver<SessionEvent>) -> SessionEvent {
    tokio::time::timeout(Duration::from_secs(2), events.recv())
        .await
        .expect("event within deadline")
        .expect("server running")
}

#[tokio::test]
async fn config_is_the_first_frame() {
    let (mut peer, _events) = start_server(general()).await;

    let Some(Payload::Config(config)) = peer.next().await else {
        panic!("expected config");
    };
    assert_eq!(config.rooms.len(), 1);
    assert_eq!(config.rooms[0].name, "General");
    assert_eq!(config.rooms[0].description, "Default room");
}

#[tokio::test]
async fn chat_reaches_the_server_unchanged() {
    let (peer, mut events) = start_server(general()).await;

    assert!(matches!(next_event(&mut events).await, SessionEvent::Connected { .. }));

    peer.send(Payload::ChatMessage(ChatMessage::new("hello world"))).await;

    let SessionEvent::ChatMessage { message, .. } = next_event(&mut events).await else {
        panic!("expected chat message");
    };
    assert_eq!(message.text, "hello world");
}

#[tokio::test]
async fn answered_pings_keep_the_connection_open() {
    let (mut peer, _events) = start_server(general()).await;

    assert!(matches!(peer.next().await, Some(Payload::Config(_))));

    for _ in 0..3 {
        assert_eq!(peer.next().await, Some(Payload::Heartbeat(Heartbeat::Ping)));
        peer.send(Payload::Heartbeat(Heartbeat::Pong)).await;
    }

    // A fourth ping proves the server kept the connection after three cycles
    assert_eq!(peer.next().await, Some(Payload::Heartbeat(Heartbeat::Ping)));
}

#[tokio::test]
async fn silent_client_is_disconnected() {
    let (mut peer, mut events) = start_server(general()).await;

    assert!(matches!(peer.next().await, Some(Payload::Config(_))));
    assert_eq!(peer.next().await, Some(Payload::Heartbeat(Heartbeat::Ping)));

    // No pong: the server shuts the connection down after one interval
    assert_eq!(peer.next().await, None);

    assert!(matches!(next_event(&mut events).await, SessionEvent::Connected { .. }));
    assert!(matches!(next_event(&mut events).await, SessionEvent::Disconnected { .. }));
}

#[tokio::test]
async fn each_client_gets_its_own_session() {
    let config = ServerRuntimeConfig {
        bind_address: "127.0.0.1:0".to_string(),
        rooms: general(),
        heartbeat_interval: INTERVAL,
    };
    let server = Server::bind(config).await.expect("bind");
    let addr = server.local_addr().expect("local addr");
    let (events_tx, mut events) = mpsc::channel(64);
    tokio::spawn(server.run_with_events(events_tx));

    let _first = TcpStream::connect(addr).await.expect("connect");
    let _second = TcpStream::connect(addr).await.expect("connect");

    let SessionEvent::Connected { session_id: a, .. } = next_event(&mut events).await else {
        panic!("expected connect");
    };
    let SessionEvent::Connected { session_id: b, .. } = next_event(&mut events).await else {
        panic!("expected connect");
    };
    assert_ne!(a, b);
}

#[tokio::test]
async fn undrained_events_do_not_disconnect_a_live_client() {
    // The receiver is held but never read
    let (mut peer, _events) = start_server_with_buffer(general(), 4).await;

    assert!(matches!(peer.next().await, Some(Payload::Config(_))));

    for i in 0..8 {
        peer.send(Payload::ChatMessage(ChatMessage::new(format!("message {i}")))).await;
    }

    for _ in 0..3 {
        assert_eq!(peer.next().await, Some(Payload::Heartbeat(Heartbeat::Ping)));
        peer.send(Payload::Heartbeat(Heartbeat::Pong)).await;
    }

    assert_eq!(peer.next().await, Some(Payload::Heartbeat(Heartbeat::Ping)));
}
