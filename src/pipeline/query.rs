//! Read-only view of a pipeline.
//!
//! A [`PipelineSnapshot`] is copied out of the shared state inside a
//! single critical section, so counters, level and phase always belong to
//! the same instant.

use serde::Serialize;

use crate::debounce::{EventCounters, WindowPhase};
use crate::error::PipelineFault;
use crate::health::ERROR_MSG_CAP;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineSnapshot {
    pub source_id: u32,
    /// Last settled level (initial sample until the first delivery).
    pub level: bool,
    pub window_us: u64,
    pub phase: WindowPhase,
    pub last_edge_us: Option<u64>,
    pub counters: EventCounters,
    /// A deferred task is waiting for the worker.
    pub deferred_queued: bool,
    /// [`PipelineFault`] bitmask.
    pub faults: u8,
    pub healthy: bool,
    /// False once teardown has started.
    pub running: bool,
    pub last_error: heapless::String<ERROR_MSG_CAP>,
}

impl PipelineSnapshot {
    pub fn raw_edge_count(&self) -> u64 {
        self.counters.raw_edge_count
    }

    pub fn processed_count(&self) -> u64 {
        self.counters.processed_count
    }

    pub fn has_fault(&self, fault: PipelineFault) -> bool {
        self.faults & fault.mask() != 0
    }

    /// Every closed window is processed, failed, coalesced, cancelled or
    /// still queued. Holds at any quiescent point.
    pub fn windows_accounted(&self) -> bool {
        let c = &self.counters;
        let settled = c.processed_count
            + c.failed_dispatches
            + c.coalesced_dispatches
            + c.cancelled_dispatches
            + u64::from(self.deferred_queued);
        settled == c.windows_closed
    }
}
