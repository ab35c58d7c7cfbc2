// Slew rate limiter
// Caps how fast a signal may change so violent stick movements turn into smooth ramps.
// Acceleration and deceleration share the same limit.

use std::time::Instant;

use crate::config::ConfigError;

/// Bounds the change of a signal to `max_rate` units per second
#[derive(Debug, Clone)]
pub struct RateLimiter {
    max_rate: f64,
    previous: f64,
    last_timestamp: Instant,
}

impl RateLimiter {
    /// Create a limiter starting at 0, timed from `now`
    ///
    /// `max_rate` must be finite and positive.
    pub fn new(max_rate: f64, now: Instant) -> Result<Self, ConfigError> {
        if !max_rate.is_finite() || max_rate <= 0.0 {
            return Err(ConfigError::NonPositive {
                name: "max_rate",
                value: max_rate,
            });
        }

        Ok(Self {
            max_rate,
            previous: 0.0,
            last_timestamp: now,
        })
    }

    /// Step towards `target`, moving at most `max_rate * dt` since the last call
    ///
    /// State is updated on every call. A zero (or negative) `dt` leaves the output unchanged.
    pub fn compute(&mut self, target: f64, now: Instant) -> f64 {
        let dt = now
            .checked_duration_since(self.last_timestamp)
            .map_or(0.0, |d| d.as_secs_f64());
        let max_delta = self.max_rate * dt;

        self.previous += (target - self.previous).clamp(-max_delta, max_delta);
        self.last_timestamp = now;
        self.previous
    }

    /// Re-seed the limiter to `value` at `now`
    pub fn reset(&mut self, value: f64, now: Instant) {
        self.previous = value;
        self.last_timestamp = now;
    }

    /// Last output value
    pub fn last_value(&self) -> f64 {
        self.previous
    }
}
