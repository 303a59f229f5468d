//! Production Environment implementation using system time and RNG.
//!
//! `SystemEnv` uses real monotonic time, tokio's timer for sleeping, and the
//! OS RNG (getrandom) for session ids. Behaviour is non-deterministic; tests
//! supply their own environment.

use std::time::Duration;

use natter_core::env::Environment;

/// Production environment using system time and cryptographic RNG.
///
/// # Panics
///
/// Panics if the OS RNG fails. RNG failure indicates an OS-level problem and
/// the process cannot produce session ids without it.
#[derive(Debug, Clone, Default)]
pub struct SystemEnv;

impl SystemEnv {
    /// Create a new system environment.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Environment for SystemEnv {
    type Instant = std::time::Instant;

    fn now(&self) -> Self::Instant {
        std::time::Instant::now()
    }

    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send {
        tokio::time::sleep(duration)
    }

    #[allow(clippy::expect_used)]
    fn random_bytes(&self, buffer: &mut [u8]) {
        getrandom::fill(buffer).expect("invariant: OS RNG failure is unrecoverable");
    }
}
