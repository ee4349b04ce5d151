//! Flood attack simulation.
//! Simulates high-rate traffic to assess the Token Bucket rate limit policy.

use std::time::Instant;

/// Simulated Token Bucket Rate Limiter as specified in §6.1 of the rate limit policy.
pub struct RateLimiter {
    pub capacity: f64,
    pub tokens: f64,
    pub refill_rate: f64,
    pub last_update: Instant,
}

impl RateLimiter {
    /// Create a new rate limiter with a defined rate (requests per second).
    /// The bucket capacity (burst allowance) is 2x the rate limit.
    pub fn new(rate_limit_per_second: f64, initial_time: Instant) -> Self {
        let capacity = rate_limit_per_second * 2.0;
        Self {
            capacity,
            tokens: capacity, // Start fully filled
            refill_rate: rate_limit_per_second,
            last_update: initial_time,
        }
    }

    /// Tests if a request is allowed at the given instant.
    pub fn allow_request(&mut self, now: Instant) -> bool {
        let elapsed = now.duration_since(self.last_update).as_secs_f64();
        
        // Refill tokens based on elapsed time
        self.tokens = f64::min(
            self.capacity,
            self.tokens + elapsed * self.refill_rate
        );
        self.last_update = now;
        
        // Consume token if available
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}
