//! Ping/Pong liveness monitor.
//!
//! The monitor and the dispatcher share two things: the connection's write
//! path and a [`Liveness`] flag. Each cycle the monitor marks the flag as
//! awaiting, sends `Ping`, and sleeps one interval. The dispatcher records the
//! peer's `Pong` in the flag. If the flag still reads awaiting when the sleep
//! ends, the peer is considered dead and the socket is shut down.
//!
//! # State Machine
//!
//! ```text
//!            Ping sent            Pong seen
//! ┌──────┐ ──────────> ┌──────────────┐ ───────> ┌──────┐
//! │ Idle │             │ AwaitingPong │          │ Idle │ ...
//! └──────┘             └──────────────┘          └──────┘
//!    │                        │ interval elapsed, no Pong
//!    │ cancel                 ↓
//!    │                  ┌──────────┐  shutdown  ┌────────┐
//!    └────────────────> │ TimedOut │ ─────────> │ Closed │
//!                       └──────────┘            └────────┘
//! ```
//!
//! Cancellation reaches `Closed` from any state. The pure transitions live in
//! [`HeartbeatMonitor`]; [`run_heartbeat`] drives them with real I/O.

use std::{
    sync::{
        Arc,
        atomic::{AtomicU8, Ordering},
    },
    time::Duration,
};

use natter_proto::{Heartbeat, Payload};
use tokio::{io::AsyncWrite, sync::watch};
use tokio_util::sync::CancellationToken;

use crate::{
    env::Environment,
    transport::{ConnectionCloser, Disconnect, FrameWriter, SendOutcome},
};

/// Last heartbeat value seen on a connection.
///
/// Written by the monitor (`Ping`, before sending one) and the dispatcher
/// (`Pong`, on receipt). Starts out answered.
#[derive(Debug)]
pub struct Liveness(AtomicU8);

impl Liveness {
    /// New flag in the answered state.
    pub fn new() -> Self {
        Self(AtomicU8::new(Heartbeat::Pong.to_u8()))
    }

    /// Record that a Ping is about to go out.
    pub fn mark_awaiting(&self) {
        self.record(Heartbeat::Ping);
    }

    /// Record the peer's Pong.
    pub fn record_pong(&self) {
        self.record(Heartbeat::Pong);
    }

    /// Store a heartbeat value.
    pub fn record(&self, value: Heartbeat) {
        self.0.store(value.to_u8(), Ordering::Release);
    }

    /// Most recently stored value.
    pub fn last(&self) -> Heartbeat {
        Heartbeat::from_u8(self.0.load(Ordering::Acquire)).unwrap_or(Heartbeat::Ping)
    }

    /// True if the last Ping has been answered.
    pub fn is_answered(&self) -> bool {
        self.last() == Heartbeat::Pong
    }
}

impl Default for Liveness {
    fn default() -> Self {
        Self::new()
    }
}

/// Monitor lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    /// Between cycles, last Ping answered
    Idle,
    /// Ping sent, waiting one interval for the Pong
    AwaitingPong,
    /// Interval elapsed without a Pong
    TimedOut,
    /// Monitor finished
    Closed,
}

/// Actions returned by the monitor state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeartbeatAction {
    /// Send a Ping to the peer
    SendPing,
    /// Peer missed its Pong; shut the socket down
    Shutdown,
}

/// Why the monitor task finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorExit {
    /// The session ended and cancelled the monitor
    Cancelled,
    /// A Ping went unanswered and the socket was shut down
    TimedOut,
    /// A Ping write accepted zero bytes
    PeerClosed,
    /// A Ping write failed
    SendFailed,
}

/// Pure heartbeat state machine.
///
/// No I/O and no clock: the driver reports when an interval elapsed and what
/// the liveness flag held at that point.
#[derive(Debug, Clone)]
pub struct HeartbeatMonitor {
    state: MonitorState,
    interval: Duration,
    cycles: u64,
}

impl HeartbeatMonitor {
    /// Create an idle monitor.
    pub fn new(interval: Duration) -> Self {
        Self { state: MonitorState::Idle, interval, cycles: 0 }
    }

    /// Current state.
    pub fn state(&self) -> MonitorState {
        self.state
    }

    /// Time allowed for each Pong.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Number of Pings answered in time.
    pub fn completed_cycles(&self) -> u64 {
        self.cycles
    }

    /// Start a cycle. Only an idle monitor sends a Ping.
    pub fn begin_cycle(&mut self) -> Option<HeartbeatAction> {
        if self.state != MonitorState::Idle {
            return None;
        }

        self.state = MonitorState::AwaitingPong;
        Some(HeartbeatAction::SendPing)
    }

    /// The interval since the last Ping elapsed; `last` is the liveness flag.
    pub fn interval_elapsed(&mut self, last: Heartbeat) -> Option<HeartbeatAction> {
        if self.state != MonitorState::AwaitingPong {
            return None;
        }

        match last {
            Heartbeat::Pong => {
                self.state = MonitorState::Idle;
                self.cycles += 1;
                None
            },
            Heartbeat::Ping => {
                self.state = MonitorState::TimedOut;
                Some(HeartbeatAction::Shutdown)
            },
        }
    }

    /// Finish the monitor. Idempotent.
    pub fn close(&mut self) {
        self.state = MonitorState::Closed;
    }
}

/// Everything the heartbeat task needs from its session.
#[derive(Debug)]
pub struct HeartbeatContext<W, D> {
    /// Shared write path
    pub writer: FrameWriter<W>,
    /// Flag the dispatcher records Pongs in
    pub liveness: Arc<Liveness>,
    /// Used to force the socket closed on timeout
    pub closer: Arc<ConnectionCloser<D>>,
    /// Cancelled by the dispatcher when the session ends
    pub cancel: CancellationToken,
    /// Publishes every state change
    pub state: watch::Sender<MonitorState>,
}

/// Run the heartbeat loop until cancelled or the peer stops answering.
///
/// Every wait is raced against `ctx.cancel`, so cancellation returns
/// promptly instead of after the remaining interval.
pub async fn run_heartbeat<W, D, E>(
    ctx: HeartbeatContext<W, D>,
    interval: Duration,
    env: E,
) -> MonitorExit
where
    W: AsyncWrite + Unpin + Send,
    D: Disconnect,
    E: Environment,
{
    let mut monitor = HeartbeatMonitor::new(interval);

    let exit = loop {
        if ctx.cancel.is_cancelled() {
            break MonitorExit::Cancelled;
        }

        if monitor.begin_cycle() != Some(HeartbeatAction::SendPing) {
            break MonitorExit::Cancelled;
        }
        ctx.state.send_replace(monitor.state());

        ctx.liveness.mark_awaiting();

        let sent = tokio::select! {
            biased;
            () = ctx.cancel.cancelled() => break MonitorExit::Cancelled,
            sent = ctx.writer.send(Payload::Heartbeat(Heartbeat::Ping)) => sent,
        };

        match sent {
            Ok(SendOutcome::Sent(_)) => tracing::debug!("ping sent"),
            Ok(SendOutcome::PeerClosed) => break MonitorExit::PeerClosed,
            Err(e) => {
                tracing::error!("failed to send ping: {}", e);
                break MonitorExit::SendFailed;
            },
        }

        tokio::select! {
            biased;
            () = ctx.cancel.cancelled() => break MonitorExit::Cancelled,
            () = env.sleep(interval) => {},
        }

        if monitor.interval_elapsed(ctx.liveness.last()) == Some(HeartbeatAction::Shutdown) {
            ctx.state.send_replace(monitor.state());
            tracing::warn!(?interval, "peer did not answer last ping");

            if ctx.closer.is_disconnected() {
                tracing::debug!("connection already closed");
            } else if let Err(e) = ctx.closer.close() {
                tracing::error!("failed to shut down connection: {}", e);
            }

            break MonitorExit::TimedOut;
        }

        ctx.state.send_replace(monitor.state());
    };

    monitor.close();
    ctx.state.send_replace(monitor.state());

    tracing::debug!(?exit, cycles = monitor.completed_cycles(), "heartbeat stopped");
    exit
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn answered_cycles_return_to_idle() {
        let mut monitor = HeartbeatMonitor::new(Duration::from_secs(5));

        for _ in 0..3 {
            assert_eq!(monitor.begin_cycle(), Some(HeartbeatAction::SendPing));
            assert_eq!(monitor.state(), MonitorState::AwaitingPong);
            assert_eq!(monitor.interval_elapsed(Heartbeat::Pong), None);
            assert_eq!(monitor.state(), MonitorState::Idle);
        }

        assert_eq!(monitor.completed_cycles(), 3);
    }

    #[test]
    fn missed_pong_times_out() {
        let mut monitor = HeartbeatMonitor::new(Duration::from_secs(5));

        monitor.begin_cycle();
        assert_eq!(monitor.interval_elapsed(Heartbeat::Ping), Some(HeartbeatAction::Shutdown));
        assert_eq!(monitor.state(), MonitorState::TimedOut);

        // No further pings once timed out
        assert_eq!(monitor.begin_cycle(), None);

        monitor.close();
        assert_eq!(monitor.state(), MonitorState::Closed);
    }

    #[test]
    fn closed_monitor_ignores_events() {
        let mut monitor = HeartbeatMonitor::new(Duration::from_secs(5));
        monitor.close();

        assert_eq!(monitor.begin_cycle(), None);
        assert_eq!(monitor.interval_elapsed(Heartbeat::Ping), None);
        assert_eq!(monitor.state(), MonitorState::Closed);
    }

    #[test]
    fn elapsed_without_ping_is_ignored() {
        let mut monitor = HeartbeatMonitor::new(Duration::from_secs(5));
        assert_eq!(monitor.interval_elapsed(Heartbeat::Ping), None);
        assert_eq!(monitor.state(), MonitorState::Idle);
    }

    #[test]
    fn liveness_flag_round_trip() {
        let liveness = Liveness::new();
        assert!(liveness.is_answered());

        liveness.mark_awaiting();
        assert_eq!(liveness.last(), Heartbeat::Ping);
        assert!(!liveness.is_answered());

        liveness.record_pong();
        assert!(liveness.is_answered());
    }
}
