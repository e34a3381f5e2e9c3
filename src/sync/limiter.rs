//! Pacing between instrument batches
//!
//! The provider throttles sustained request streams, so the loop pauses for
//! a fixed duration after every `batch_size`-th instrument. The pause counts
//! instruments, not calls; the final batch never triggers one.

use std::time::Duration;

use tracing::debug;

use crate::sync::clock::Clock;

#[derive(Debug, Clone, Copy)]
pub struct PaceLimiter {
    pub batch_size: usize,
    pub pause: Duration,
}

impl PaceLimiter {
    pub fn new(batch_size: usize, pause: Duration) -> Self {
        Self { batch_size, pause }
    }

    /// Called after the instrument at zero-based `index` completes
    pub async fn pause_after(&self, clock: &dyn Clock, index: usize, total: usize) {
        let done = index + 1;
        if self.batch_size == 0 || done % self.batch_size != 0 || done >= total {
            return;
        }

        debug!(
            "Processed {}/{} instruments, pausing {:?}",
            done, total, self.pause
        );
        clock.sleep(self.pause).await;
    }
}
