//! Heartbeat driver tests over an in-memory duplex stream.
//!
//! The peer end is read with a plain `FrameReader`; a mock disconnect handle
//! records whether the monitor shut the connection down.

use std::{
    io,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::{Duration, Instant},
};

use natter_core::{
    ConnectionCloser, Disconnect, FrameReader, FrameWriter, Liveness, MonitorExit, MonitorState,
    env::Environment,
    heartbeat::{HeartbeatContext, run_heartbeat},
};
use natter_proto::{Heartbeat, Payload};
use tokio::{
    io::{DuplexStream, ReadHalf, WriteHalf},
    sync::watch,
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;

#[derive(Clone)]
struct TestEnv;

impl Environment for TestEnv {
    type Instant = Instant;

    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send {
        tokio::time::sleep(duration)
    }

    fn random_bytes(&self, buffer: &mut [u8]) {
        for (i, byte) in buffer.iter_mut().enumerate() {
            *byte = i as u8;
        }
    }
}

struct RecordingHandle(Arc<AtomicUsize>);

impl Disconnect for RecordingHandle {
    fn disconnect(&self) -> io::Result<()> {
        self.0.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct Harness {
    monitor: JoinHandle<MonitorExit>,
    peer: FrameReader<ReadHalf<DuplexStream>>,
    _peer_writer: WriteHalf<DuplexStream>,
    liveness: Arc<Liveness>,
    closer: Arc<ConnectionCloser<RecordingHandle>>,
    cancel: CancellationToken,
    state: watch::Receiver<MonitorState>,
    shutdowns: Arc<AtomicUsize>,
}

fn start(interval: Duration) -> Harness {
    let (local, remote) = tokio::io::duplex(1024);
    let (_local_reader, local_writer) = tokio::io::split(local);
    let (remote_reader, remote_writer) = tokio::io::split(remote);

    let shutdowns = Arc::new(AtomicUsize::new(0));
    let liveness = Arc::new(Liveness::new());
    let closer = Arc::new(ConnectionCloser::new(RecordingHandle(Arc::clone(&shutdowns))));
    let cancel = CancellationToken::new();
    let (state_tx, state) = watch::channel(MonitorState::Idle);

    let ctx = HeartbeatContext {
        writer: FrameWriter::new(local_writer),
        liveness: Arc::clone(&liveness),
        closer: Arc::clone(&closer),
        cancel: cancel.clone(),
        state: state_tx,
    };
    let monitor = tokio::spawn(run_heartbeat(ctx, interval, TestEnv));

    Harness {
        monitor,
        peer: FrameReader::new(remote_reader),
        _peer_writer: remote_writer,
        liveness,
        closer,
        cancel,
        state,
        shutdowns,
    }
}

async fn next_heartbeat(peer: &mut FrameReader<ReadHalf<DuplexStream>>) -> Heartbeat {
    let frame = tokio::time::timeout(Duration::from_secs(2), peer.recv_frame())
        .await
        .expect("ping within deadline")
        .expect("read")
        .expect("stream open");

    match Payload::from_frame(&frame).expect("valid payload") {
        Payload::Heartbeat(value) => value,
        other => panic!("expected heartbeat, got {other:?}"),
    }
}

#[tokio::test]
async fn answered_pings_keep_the_monitor_alive() {
    let mut h = start(Duration::from_millis(50));

    for _ in 0..4 {
        assert_eq!(next_heartbeat(&mut h.peer).await, Heartbeat::Ping);
        h.liveness.record_pong();
    }

    // Four pings means three full intervals passed with a Pong each time
    assert_eq!(h.shutdowns.load(Ordering::SeqCst), 0);
    assert!(matches!(*h.state.borrow(), MonitorState::Idle | MonitorState::AwaitingPong));

    h.cancel.cancel();
    let exit = tokio::time::timeout(Duration::from_secs(1), h.monitor)
        .await
        .expect("monitor stops")
        .expect("join");
    assert_eq!(exit, MonitorExit::Cancelled);
    assert_eq!(*h.state.borrow(), MonitorState::Closed);
}

#[tokio::test]
async fn missed_pong_shuts_the_connection_down() {
    let interval = Duration::from_millis(50);
    let mut h = start(interval);
    let started = Instant::now();

    assert_eq!(next_heartbeat(&mut h.peer).await, Heartbeat::Ping);

    let exit = tokio::time::timeout(Duration::from_secs(2), h.monitor)
        .await
        .expect("monitor stops")
        .expect("join");

    assert_eq!(exit, MonitorExit::TimedOut);
    assert!(started.elapsed() >= interval);
    assert_eq!(h.shutdowns.load(Ordering::SeqCst), 1);
    assert!(h.closer.is_disconnected());
    assert_eq!(*h.state.borrow(), MonitorState::Closed);
}

#[tokio::test]
async fn cancellation_interrupts_the_wait() {
    let mut h = start(Duration::from_secs(30));

    assert_eq!(next_heartbeat(&mut h.peer).await, Heartbeat::Ping);

    let cancelled_at = Instant::now();
    h.cancel.cancel();

    let exit = tokio::time::timeout(Duration::from_millis(500), h.monitor)
        .await
        .expect("cancel wakes the monitor well before the interval")
        .expect("join");

    assert_eq!(exit, MonitorExit::Cancelled);
    assert!(cancelled_at.elapsed() < Duration::from_millis(500));
    assert_eq!(h.shutdowns.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn already_closed_connection_is_not_shut_down_twice() {
    let mut h = start(Duration::from_millis(50));

    assert_eq!(next_heartbeat(&mut h.peer).await, Heartbeat::Ping);
    assert!(h.closer.close().expect("close"));

    let exit = tokio::time::timeout(Duration::from_secs(2), h.monitor)
        .await
        .expect("monitor stops")
        .expect("join");

    assert_eq!(exit, MonitorExit::TimedOut);
    assert_eq!(h.shutdowns.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn dropped_peer_fails_the_send() {
    let h = start(Duration::from_millis(20));
    drop(h.peer);
    drop(h._peer_writer);

    let exit = tokio::time::timeout(Duration::from_secs(2), h.monitor)
        .await
        .expect("monitor stops")
        .expect("join");

    assert!(matches!(exit, MonitorExit::SendFailed | MonitorExit::PeerClosed));
    assert_eq!(h.shutdowns.load(Ordering::SeqCst), 0);
}
