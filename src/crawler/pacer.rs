//! Human-like pacing between automated actions

use crate::config::TimingConfig;
use rand::Rng;
use std::time::Duration;

/// Sleeps a random duration drawn from `[min, max)` milliseconds
///
/// A degenerate range (`min == max`) always yields `min`, which lets tests
/// run with no delay at all.
#[derive(Debug, Clone, Copy)]
pub struct Pacer {
    min_ms: u64,
    max_ms: u64,
}

impl Pacer {
    pub fn new(min_ms: u64, max_ms: u64) -> Self {
        Self {
            min_ms,
            max_ms: max_ms.max(min_ms),
        }
    }

    pub fn from_timing(timing: &TimingConfig) -> Self {
        Self::new(timing.human_delay_min_ms, timing.human_delay_max_ms)
    }

    pub fn next_delay(&self) -> Duration {
        let ms = if self.max_ms > self.min_ms {
            rand::thread_rng().gen_range(self.min_ms..self.max_ms)
        } else {
            self.min_ms
        };
        Duration::from_millis(ms)
    }

    /// Waits a fresh random delay
    pub async fn pause(&self) {
        let delay = self.next_delay();
        if delay.is_zero() {
            return;
        }
        tracing::trace!("Pausing for {:?}", delay);
        tokio::time::sleep(delay).await;
    }
}
