//! Reconnect backoff: exponential delay with optional jitter.
//!
//! Attempts are unbounded; the transport keeps trying for as long as the
//! session holds it open.

use std::time::Duration;

use solarops_config::ReconnectConfig;

#[derive(Debug, Clone, PartialEq)]
pub struct ReconnectBackoff {
    /// Delay before the first retry in milliseconds.
    pub base_delay_ms: u64,
    /// Multiplier for each subsequent wait.
    pub backoff_factor: f64,
    /// Maximum delay cap in milliseconds.
    pub max_delay_ms: u64,
    /// Add ±25% random jitter so a backend restart does not see every
    /// client at once.
    pub jitter: bool,
}

impl Default for ReconnectBackoff {
    fn default() -> Self {
        Self::from(&ReconnectConfig::default())
    }
}

impl From<&ReconnectConfig> for ReconnectBackoff {
    fn from(config: &ReconnectConfig) -> Self {
        Self {
            base_delay_ms: config.base_delay_ms(),
            backoff_factor: config.backoff_factor(),
            max_delay_ms: config.max_delay_ms(),
            jitter: config.jitter(),
        }
    }
}

impl ReconnectBackoff {
    /// Delay before reconnect attempt `attempt` (1-indexed).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let exponent = (attempt - 1).min(32) as i32;
        let delay_ms = self.base_delay_ms as f64 * self.backoff_factor.powi(exponent);
        let delay_ms = delay_ms.min(self.max_delay_ms as f64) as u64;

        let delay_ms = if self.jitter {
            let spread = (delay_ms / 4) as i64;
            let offset = if spread > 0 {
                (rand_offset() % (spread as u64 * 2)) as i64 - spread
            } else {
                0
            };
            (delay_ms as i64 + offset).max(0) as u64
        } else {
            delay_ms
        };

        Duration::from_millis(delay_ms)
    }
}

/// xorshift64; jitter does not need a real RNG.
fn rand_offset() -> u64 {
    use std::sync::atomic::{AtomicU64, Ordering};
    static SEED: AtomicU64 = AtomicU64::new(0x9e37_79b9_7f4a_7c15);
    let x = SEED.load(Ordering::Relaxed);
    let x = x ^ (x << 13);
    let x = x ^ (x >> 7);
    let x = x ^ (x << 17);
    SEED.store(x, Ordering::Relaxed);
    x
}
