//! Pipeline health monitor.
//!
//! Accumulates a [`PipelineFault`] bitmask. Raising a fault never logs:
//! the urgent context may raise one while holding the pipeline lock.
//! Newly raised faults are remembered as *unreported* until a deferred
//! caller drains them with [`HealthMonitor::take_unreported`] and hands
//! the mask to [`report`] outside the lock.
//!
//! ## Fault lifecycle
//!
//! 1. A condition raises a fault (e.g. a handler error).
//! 2. The bit is set in `faults` and in `unreported`.
//! 3. A snapshot or the worker logs the unreported bits once.
//! 4. `LevelReadFailed` and `HandlerFailed` clear on the next successful
//!    deferred run. `TimerUnavailable` stays latched.

use heapless::String;
use log::error;

use crate::error::PipelineFault;

/// Capacity of the stored error message.
pub const ERROR_MSG_CAP: usize = 64;

#[derive(Debug, Default)]
pub struct HealthMonitor {
    faults: u8,
    unreported: u8,
    last_error: String<ERROR_MSG_CAP>,
}

impl HealthMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a fault bit. Allocation-free and silent.
    pub fn raise(&mut self, fault: PipelineFault) {
        if self.faults & fault.mask() == 0 {
            self.unreported |= fault.mask();
        }
        self.faults |= fault.mask();
    }

    /// Set a fault bit and keep a (truncated) description of the cause.
    pub fn fail(&mut self, fault: PipelineFault, msg: &str) {
        self.raise(fault);
        self.last_error = truncated(msg);
    }

    /// Clear a fault bit. Returns whether it was set.
    pub fn clear(&mut self, fault: PipelineFault) -> bool {
        let was_set = self.faults & fault.mask() != 0;
        self.faults &= !fault.mask();
        self.unreported &= !fault.mask();
        was_set
    }

    /// Current fault bitmask.
    pub fn faults(&self) -> u8 {
        self.faults
    }

    /// True if no fault is active.
    pub fn is_healthy(&self) -> bool {
        self.faults == 0
    }

    /// Check if a specific fault is active.
    pub fn has_fault(&self, fault: PipelineFault) -> bool {
        self.faults & fault.mask() != 0
    }

    pub fn last_error(&self) -> &String<ERROR_MSG_CAP> {
        &self.last_error
    }

    /// Faults raised since the last call.
    pub fn take_unreported(&mut self) -> u8 {
        core::mem::take(&mut self.unreported)
    }
}

/// Log every fault in `mask`. Call outside the pipeline lock.
pub fn report(source_id: u32, mask: u8) {
    for fault in PipelineFault::ALL {
        if mask & fault.mask() != 0 {
            error!("pipeline[{}]: FAULT SET: {}", source_id, fault);
        }
    }
}

/// Copy at most `ERROR_MSG_CAP` bytes of `msg`, cut on a char boundary.
fn truncated(msg: &str) -> String<ERROR_MSG_CAP> {
    let mut end = msg.len().min(ERROR_MSG_CAP);
    while !msg.is_char_boundary(end) {
        end -= 1;
    }
    let mut s = String::new();
    let _ = s.push_str(&msg[..end]);
    s
}
