//! Rate limiting utilities

use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use std::collections::HashSet;
use std::num::NonZeroU32;
use std::sync::Arc;

/// Rate limiter type alias
pub type Limiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Create a rate limiter with the specified requests per second
pub fn create_limiter(requests_per_second: u32) -> Arc<Limiter> {
    let quota = Quota::per_second(NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN));
    Arc::new(RateLimiter::direct(quota))
}

/// Default cap on auto-repeated key presses per connection; two players share it
pub const DEFAULT_INPUT_RATE_LIMIT: u32 = 60;

/// Per-connection rate limiter state
#[derive(Clone)]
pub struct ConnectionRateLimiter {
    input_limiter: Arc<Limiter>,
}

impl ConnectionRateLimiter {
    pub fn new(input_per_second: u32) -> Self {
        Self {
            input_limiter: create_limiter(input_per_second),
        }
    }

    /// Check if an input message is allowed (returns true if allowed)
    pub fn check_input(&self) -> bool {
        self.input_limiter.check().is_ok()
    }
}

impl Default for ConnectionRateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_INPUT_RATE_LIMIT)
    }
}

/// Key filter for one connection.
///
/// A press of a key that is not down and every release always pass, so the
/// fight never misses a change in which keys are held. Only auto-repeats of a
/// key that is already down are charged against the quota.
pub struct KeyRepeatThrottle {
    held: HashSet<String>,
    repeats: ConnectionRateLimiter,
}

impl KeyRepeatThrottle {
    pub fn new(repeats_per_second: u32) -> Self {
        Self {
            held: HashSet::new(),
            repeats: ConnectionRateLimiter::new(repeats_per_second),
        }
    }

    /// Returns false only for a repeat over the quota
    pub fn admit_key_down(&mut self, code: &str) -> bool {
        if !self.held.contains(code) {
            self.held.insert(code.to_string());
            return true;
        }
        self.repeats.check_input()
    }

    pub fn key_up(&mut self, code: &str) {
        self.held.remove(code);
    }

    /// Forget held keys, e.g. when a new fight starts
    pub fn reset(&mut self) {
        self.held.clear();
    }
}

impl Default for KeyRepeatThrottle {
    fn default() -> Self {
        Self::new(DEFAULT_INPUT_RATE_LIMIT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_burst_is_capped() {
        let limiter = ConnectionRateLimiter::new(3);
        let allowed = (0..10).filter(|_| limiter.check_input()).count();
        assert_eq!(allowed, 3);
    }

    #[test]
    fn test_fresh_press_after_repeat_burst_passes() {
        let mut throttle = KeyRepeatThrottle::default();
        let forwarded = (0..200)
            .filter(|i| throttle.admit_key_down(if i % 2 == 0 { "KeyD" } else { "KeyL" }))
            .count();
        assert!(forwarded < 200);

        // Quota is spent, yet a new key and a re-press after release still pass
        assert!(!throttle.admit_key_down("KeyD"));
        assert!(throttle.admit_key_down("KeyA"));
        throttle.key_up("KeyD");
        assert!(throttle.admit_key_down("KeyD"));
    }

    #[test]
    fn test_reset_forgets_held_keys() {
        let mut throttle = KeyRepeatThrottle::new(1);
        assert!(throttle.admit_key_down("KeyA"));
        assert!(throttle.admit_key_down("KeyA"));
        assert!(!throttle.admit_key_down("KeyA"));

        throttle.reset();
        assert!(throttle.admit_key_down("KeyA"));
    }

    #[test]
    fn test_zero_rate_still_allows_one() {
        let limiter = ConnectionRateLimiter::new(0);
        assert!(limiter.check_input());
    }
}
