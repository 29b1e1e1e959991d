//! Deferred event processor.
//!
//! A single worker thread per pipeline, so two deferred runs for the same
//! source can never overlap. It owns the [`EdgeSource`] and the handler;
//! both stay off the urgent path. The source is handed back when the
//! worker stops so teardown can release it last.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use embedded_hal::digital::InputPin;
use log::{debug, warn};

use crate::app::ports::EventHandler;
use crate::debounce::WindowReport;
use crate::health;
use crate::source::EdgeSource;

use super::shared::{Job, Shared};

pub(crate) fn run<P, H>(shared: Arc<Shared>, mut source: EdgeSource<P>, mut handler: H) -> EdgeSource<P>
where
    P: InputPin,
    H: EventHandler,
{
    debug!("worker[{}]: started", source.id());

    loop {
        futures_lite::future::block_on(shared.deferred.wait());
        match shared.with_state(|s| s.take_job()) {
            Job::Stop => break,
            Job::Nothing => {}
            Job::Run(report) => process(&shared, &mut source, &mut handler, report),
        }
    }

    debug!("worker[{}]: stopped", source.id());
    source
}

fn process<P, H>(shared: &Shared, source: &mut EdgeSource<P>, handler: &mut H, report: WindowReport)
where
    P: InputPin,
    H: EventHandler,
{
    let level = match source.read_level() {
        Ok(level) => level,
        Err(e) => {
            let msg = format!("level read failed: {e:?}");
            warn!("worker[{}]: {}", source.id(), msg);
            shared.with_state(|s| s.record_level_failure(&msg));
            flush_faults(shared, source.id());
            return;
        }
    };

    let now = shared.clock.uptime_us();
    let event = shared.with_state(|s| s.record_settled(level, report, now));

    let result = match panic::catch_unwind(AssertUnwindSafe(|| handler.on_settled(&event))) {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(format!("{e:#}")),
        Err(payload) => Err(format!("handler panicked: {}", panic_reason(payload.as_ref()))),
    };

    if let Err(msg) = &result {
        warn!("worker[{}]: event #{} failed: {}", source.id(), event.sequence, msg);
    }
    let result = result.as_ref().map(|_| ()).map_err(String::as_str);
    shared.with_state(|s| s.record_handler_result(result));
    flush_faults(shared, source.id());
}

fn flush_faults(shared: &Shared, source_id: u32) {
    let unreported = shared.with_state(|s| s.take_unreported());
    if unreported != 0 {
        health::report(source_id, unreported);
    }
}

fn panic_reason(payload: &(dyn Any + Send)) -> &str {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        *msg
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.as_str()
    } else {
        "unknown panic"
    }
}
