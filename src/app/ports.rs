//! Port traits between the pipeline and the consumer domain.
//!
//! ```text
//!   Deferred processor ──▶ EventHandler ──▶ adapter (log, notify, ...)
//! ```

use super::events::SettledEvent;

/// Downstream action run in the deferred context for every settled event.
///
/// Implementations may block and allocate. An `Err` (or a panic) is
/// recorded as a `HandlerFailed` fault on the pipeline; it never reaches
/// the edge producer and never rolls back the delivery count.
pub trait EventHandler {
    fn on_settled(&mut self, event: &SettledEvent) -> anyhow::Result<()>;
}

impl<F> EventHandler for F
where
    F: FnMut(&SettledEvent) -> anyhow::Result<()>,
{
    fn on_settled(&mut self, event: &SettledEvent) -> anyhow::Result<()> {
        self(event)
    }
}
