// src/dev_utils.rs

use std::time::{Duration, Instant};

/// RAII stage timer for the expansion pipeline.
///
/// Logs `stage '<name>' took <n> µs` at debug level when dropped, so the cost
/// of config loading and the flag passes shows up under `--pae-debug`.
#[derive(Debug)]
pub struct BlockTimer {
    stage: &'static str,
    started: Instant,
}

impl BlockTimer {
    /// Starts timing `stage`.
    pub fn new(stage: &'static str) -> Self {
        Self {
            stage,
            started: Instant::now(),
        }
    }

    /// Time since the timer was started.
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

impl Drop for BlockTimer {
    fn drop(&mut self) {
        log::debug!("stage '{}' took {} µs", self.stage, self.elapsed().as_micros());
    }
}
