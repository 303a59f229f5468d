//! Environment abstraction for time and randomness.
//!
//! Session and heartbeat code never reads the clock or the OS RNG directly.
//! Production passes a system-backed implementation; tests pass their own,
//! typically with fixed random bytes so session ids are predictable.

use std::time::Duration;

/// Abstract environment providing time, randomness, and async sleeping.
///
/// # Invariants
///
/// Implementations MUST guarantee:
///
/// - `now()` never goes backwards
/// - `random_bytes()` uses cryptographically secure entropy in production
pub trait Environment: Clone + Send + Sync + 'static {
    /// The instant type used by this environment.
    type Instant: Copy + Ord + Send + Sync + std::ops::Sub<Output = Duration>;

    /// Current time (monotonic).
    fn now(&self) -> Self::Instant;

    /// Sleeps for the specified duration.
    ///
    /// The heartbeat driver races this against its cancellation token, so the
    /// returned future must be safe to drop before completion.
    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send;

    /// Fills the provided buffer with random bytes.
    fn random_bytes(&self, buffer: &mut [u8]);

    /// Generates a random `u64`.
    ///
    /// Used for session ids in log output.
    fn random_u64(&self) -> u64 {
        let mut bytes = [0u8; 8];
        self.random_bytes(&mut bytes);
        u64::from_be_bytes(bytes)
    }
}
