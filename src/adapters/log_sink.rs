//! Log-based event handler adapter.
//!
//! Implements [`EventHandler`] by writing each settled event to the `log`
//! facade. A notification or state-propagation adapter would implement the
//! same trait.

use log::info;

use crate::app::events::SettledEvent;
use crate::app::ports::EventHandler;

/// Adapter that logs every [`SettledEvent`].
#[derive(Debug, Default)]
pub struct LogEventHandler;

impl LogEventHandler {
    pub fn new() -> Self {
        Self
    }
}

impl EventHandler for LogEventHandler {
    fn on_settled(&mut self, event: &SettledEvent) -> anyhow::Result<()> {
        info!(
            "SETTLED | source={} level={} | seq={} | edges={} raw={} | latency={}us",
            event.source_id,
            if event.level { "HIGH" } else { "LOW" },
            event.sequence,
            event.window.edges,
            event.window.raw_edge_count,
            event.latency_us(),
        );
        Ok(())
    }
}
