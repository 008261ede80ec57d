//! Reconnect pacing for the push subscription.
//!
//! The browser `EventSource` retries dropped connections on its own; outside
//! a browser the policy has to be explicit. This is capped exponential
//! backoff with jitter: each failed attempt doubles the ceiling up to `max`,
//! and the actual delay is drawn uniformly from the upper half of the
//! ceiling so a fleet of monitors does not reconnect in lockstep.

use rand::Rng;
use std::time::Duration;

#[derive(Debug)]
pub struct Backoff {
    base: Duration,
    max: Duration,
    attempt: u32,
}

impl Backoff {
    pub fn new(base: Duration, max: Duration) -> Self {
        Self {
            base,
            max,
            attempt: 0,
        }
    }

    /// Forgets past failures. Called after a successful connect so the next
    /// drop retries quickly again.
    pub fn reset(&mut self) {
        self.attempt = 0;
    }

    /// Delay to wait before the next attempt; advances the attempt counter.
    pub fn next_delay(&mut self) -> Duration {
        // Cap the shift so the multiplier cannot overflow long before
        // `max` kicks in anyway.
        let shift = self.attempt.min(16);
        let ceiling = self
            .base
            .saturating_mul(1u32 << shift)
            .min(self.max);
        self.attempt = self.attempt.saturating_add(1);

        let factor = rand::thread_rng().gen_range(0.5..=1.0);
        ceiling.mul_f64(factor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_delay_is_within_half_of_base() {
        let mut backoff = Backoff::new(Duration::from_millis(100), Duration::from_secs(30));
        let delay = backoff.next_delay();
        assert!(delay >= Duration::from_millis(50));
        assert!(delay <= Duration::from_millis(100));
    }

    #[test]
    fn test_ceiling_never_exceeds_max() {
        let mut backoff = Backoff::new(Duration::from_millis(500), Duration::from_secs(5));
        for _ in 0..40 {
            assert!(backoff.next_delay() <= Duration::from_secs(5));
        }
    }

    #[test]
    fn test_reset_returns_to_base_range() {
        let mut backoff = Backoff::new(Duration::from_millis(100), Duration::from_secs(30));
        for _ in 0..6 {
            backoff.next_delay();
        }
        backoff.reset();
        assert!(backoff.next_delay() <= Duration::from_millis(100));
    }
}
