//! Seeded, virtual-time environment.

use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use roomcast_core::Environment;

/// Wall clock at virtual time zero: 2024-01-01T00:00:00Z.
const EPOCH_MILLIS: i64 = 1_704_067_200_000;

struct SimState {
    rng: ChaCha8Rng,
    elapsed: Duration,
}

/// Deterministic environment for tests.
///
/// Time only moves when [`advance`](Self::advance) is called. Clones share
/// the same clock and RNG, so a driver and the test that owns it observe the
/// same state.
#[derive(Clone)]
pub struct SimEnv {
    state: Arc<Mutex<SimState>>,
}

impl SimEnv {
    /// Environment seeded with 0.
    pub fn new() -> Self {
        Self::with_seed(0)
    }

    /// Environment with a specific RNG seed.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            state: Arc::new(Mutex::new(SimState {
                rng: ChaCha8Rng::seed_from_u64(seed),
                elapsed: Duration::ZERO,
            })),
        }
    }

    /// Move the virtual clock forward.
    pub fn advance(&self, by: Duration) {
        self.lock().elapsed += by;
    }

    fn lock(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for SimEnv {
    fn default() -> Self {
        Self::new()
    }
}

impl Environment for SimEnv {
    type Instant = Duration;

    fn now(&self) -> Duration {
        self.lock().elapsed
    }

    fn wall_clock_millis(&self) -> i64 {
        EPOCH_MILLIS + self.lock().elapsed.as_millis() as i64
    }

    fn random_bytes(&self, buffer: &mut [u8]) {
        self.lock().rng.fill_bytes(buffer);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_bytes() {
        let a = SimEnv::with_seed(7);
        let b = SimEnv::with_seed(7);

        assert_eq!(a.random_id_bytes(), b.random_id_bytes());
    }

    #[test]
    fn clones_share_the_clock() {
        let env = SimEnv::new();
        let clone = env.clone();

        env.advance(Duration::from_millis(1500));

        assert_eq!(clone.now(), Duration::from_millis(1500));
        assert_eq!(clone.wall_clock_millis(), EPOCH_MILLIS + 1500);
    }
}
