//! Outbound settled events.
//!
//! The deferred processor hands one [`SettledEvent`] to the
//! [`EventHandler`](super::ports::EventHandler) per delivered window.

use serde::Serialize;

use crate::debounce::WindowReport;

/// A debounced edge, read after its window closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SettledEvent {
    pub source_id: u32,
    /// Settled level of the line (true = high).
    pub level: bool,
    /// `processed_count` after this delivery, starting at 1.
    pub sequence: u64,
    /// When the deferred processor read the level.
    pub settled_us: u64,
    /// The window this event closes.
    pub window: WindowReport,
}

impl SettledEvent {
    /// First edge of the window to settled read.
    pub fn latency_us(&self) -> u64 {
        self.settled_us.saturating_sub(self.window.opened_us)
    }
}
