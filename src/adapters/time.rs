//! Monotonic time adapter.
//!
//! Every pipeline timestamp is microseconds since the pipeline's clock was
//! created. Edge sources that stamp their own edges must use the same clock
//! (see [`EdgeInjector::now_us`](crate::pipeline::EdgeInjector::now_us)).

use std::time::Instant;

#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    start: Instant,
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Microseconds since the clock started (monotonic).
    pub fn uptime_us(&self) -> u64 {
        self.start.elapsed().as_micros() as u64
    }
}
