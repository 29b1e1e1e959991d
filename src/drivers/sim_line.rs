//! Simulated input line.
//!
//! An [`InputPin`] whose level is set by software, for host runs and
//! tests. Clones share the same line, so one clone can be owned by a
//! pipeline while another drives the level and injects read faults.

use core::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use embedded_hal::digital::{ErrorKind, ErrorType, InputPin};

/// Read failure injected with [`SimLine::set_failing`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimLineError;

impl embedded_hal::digital::Error for SimLineError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

#[derive(Debug, Default)]
struct LineState {
    level: AtomicBool,
    failing: AtomicBool,
    reads: AtomicU64,
}

#[derive(Debug, Clone, Default)]
pub struct SimLine {
    inner: Arc<LineState>,
}

impl SimLine {
    pub fn new(level: bool) -> Self {
        let line = Self::default();
        line.set_level(level);
        line
    }

    pub fn set_level(&self, level: bool) {
        self.inner.level.store(level, Ordering::Release);
    }

    /// Flip the level and return the new one.
    pub fn toggle(&self) -> bool {
        !self.inner.level.fetch_xor(true, Ordering::AcqRel)
    }

    pub fn level(&self) -> bool {
        self.inner.level.load(Ordering::Acquire)
    }

    /// Make every subsequent read fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.inner.failing.store(failing, Ordering::Release);
    }

    /// Number of reads attempted through [`InputPin`].
    pub fn reads(&self) -> u64 {
        self.inner.reads.load(Ordering::Acquire)
    }
}

impl ErrorType for SimLine {
    type Error = SimLineError;
}

impl InputPin for SimLine {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        self.inner.reads.fetch_add(1, Ordering::AcqRel);
        if self.inner.failing.load(Ordering::Acquire) {
            return Err(SimLineError);
        }
        Ok(self.level())
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        self.is_high().map(|high| !high)
    }
}
