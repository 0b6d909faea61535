//! Production Environment implementation using system time and RNG.
//!
//! `SystemEnv` reads the monotonic clock for log timestamps, the wall clock
//! for message timestamps, and OS entropy for message IDs. Nothing about it is
//! reproducible; tests use the simulation harness instead.

use roomcast_core::Environment;

/// Production environment using system time and OS randomness.
///
/// # Panics
///
/// Panics if the OS RNG fails. Message IDs depend on it, and RNG failure
/// indicates an OS-level problem the relay cannot work around.
#[derive(Clone, Default)]
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

    #[allow(clippy::disallowed_methods)]
    fn now(&self) -> Self::Instant {
        std::time::Instant::now()
    }

    #[allow(clippy::disallowed_methods)]
    fn wall_clock_millis(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }

    #[allow(clippy::expect_used)]
    fn random_bytes(&self, buffer: &mut [u8]) {
        getrandom::fill(buffer).expect("invariant: OS RNG failure is unrecoverable");
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    #[allow(clippy::disallowed_methods)]
    fn system_env_time_advances() {
        let env = SystemEnv::new();

        let t1 = env.now();
        std::thread::sleep(Duration::from_millis(10));
        let t2 = env.now();

        assert!(t2 > t1, "Time should advance");
    }

    #[test]
    fn system_env_wall_clock_is_after_2020() {
        let env = SystemEnv::new();

        assert!(env.wall_clock_millis() > 1_577_836_800_000);
    }

    #[test]
    fn system_env_random_ids_differ() {
        let env = SystemEnv::new();

        assert_ne!(env.random_id_bytes(), env.random_id_bytes(), "Random bytes should differ");
    }
}
