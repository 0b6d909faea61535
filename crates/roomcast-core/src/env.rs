//! Environment abstraction for deterministic testing.
//!
//! Decouples relay logic from system resources (time, randomness). Tests
//! drive the relay with a virtual clock and a seeded RNG; production uses the
//! system clock and OS entropy.

/// Abstract environment providing time and randomness.
///
/// # Invariants
///
/// - `now()` never goes backwards
/// - Given the same seed, a simulated environment yields the same sequence of
///   random bytes and timestamps
pub trait Environment: Clone + Send + Sync + 'static {
    /// The instant type used by this environment.
    type Instant: Copy + Ord + Send + Sync + std::fmt::Debug;

    /// Current monotonic time.
    fn now(&self) -> Self::Instant;

    /// Milliseconds since the Unix epoch, used for message timestamps.
    fn wall_clock_millis(&self) -> i64;

    /// Fills the provided buffer with random bytes.
    fn random_bytes(&self, buffer: &mut [u8]);

    /// Sixteen random bytes, enough for a v4 UUID.
    fn random_id_bytes(&self) -> [u8; 16] {
        let mut bytes = [0u8; 16];
        self.random_bytes(&mut bytes);
        bytes
    }
}
