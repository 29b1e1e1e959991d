//! Debounce/dispatch pipeline.
//!
//! Splits edge handling into an urgent half and a deferred half:
//!
//! ```text
//! ┌──────────────┐ on_edge  ┌────────────────┐ unpark ┌──────────────┐
//! │ Edge source  │────────▶│ Shared state   │───────▶│ Timer thread │
//! │ (urgent ctx) │          │ (CS mutex)     │◀───────│ (deadline)   │
//! └──────────────┘          └────────────────┘ expire └──────┬───────┘
//!                                   ▲                        │ Signal
//!                                   │ settled level,         ▼
//!                                   │ processed_count  ┌──────────────┐
//!                                   └──────────────────│ Worker       │──▶ EventHandler
//!                                                      │ (deferred)   │
//!                                                      └──────────────┘
//! ```
//!
//! The urgent half ([`EdgeInjector::on_edge`]) only takes the
//! critical-section lock, updates counters, and may unpark the timer. The
//! deferred half reads the line and runs the handler, and may block.
//!
//! ## Teardown order
//!
//! 1. Disarm under the lock: later edges are ignored, the armed deadline
//!    is cancelled.
//! 2. Wake and join the timer thread.
//! 3. Wake the worker: a queued task is cancelled, a running one finishes;
//!    join it.
//! 4. Drop the returned [`EdgeSource`](crate::source::EdgeSource), which
//!    releases the source id.

mod query;
mod shared;
mod timer;
mod worker;

pub use query::PipelineSnapshot;

use core::cell::RefCell;
use std::sync::Arc;
use std::thread::JoinHandle;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embedded_hal::digital::InputPin;
use log::{error, info};

use crate::app::ports::EventHandler;
use crate::config::PipelineConfig;
use crate::debounce::EdgeOutcome;
use crate::drivers::task::spawn_task;
use crate::error::Result;
use crate::source::EdgeSource;

use self::shared::Shared;

const TIMER_TASK: &str = "edge-timer";
const WORKER_TASK: &str = "edge-deferred";

/// Handle for whoever owns edge registration. Cheap to clone, `Send + Sync`.
#[derive(Clone)]
pub struct EdgeInjector {
    shared: Arc<Shared>,
}

impl EdgeInjector {
    /// Report one physical edge stamped at `timestamp_us` on the pipeline
    /// clock. Safe to call from any thread at any rate; never blocks on
    /// the consumer and never allocates.
    pub fn on_edge(&self, timestamp_us: u64) -> EdgeOutcome {
        self.shared.on_edge(timestamp_us)
    }

    /// Report one physical edge stamped now.
    pub fn on_edge_now(&self) -> EdgeOutcome {
        self.shared.on_edge(self.shared.clock.uptime_us())
    }

    /// Current time on the pipeline clock (microseconds).
    pub fn now_us(&self) -> u64 {
        self.shared.clock.uptime_us()
    }

    /// See [`Pipeline::snapshot`].
    pub fn snapshot(&self) -> PipelineSnapshot {
        self.shared.snapshot()
    }
}

struct Tasks<P> {
    timer: JoinHandle<()>,
    worker: JoinHandle<EdgeSource<P>>,
}

/// One running debounce pipeline for one edge source.
pub struct Pipeline<P>
where
    P: InputPin + Send + 'static,
{
    source_id: u32,
    shared: Arc<Shared>,
    tasks: Mutex<CriticalSectionRawMutex, RefCell<Option<Tasks<P>>>>,
}

impl<P> Pipeline<P>
where
    P: InputPin + Send + 'static,
{
    /// Claim the source, sample it, and start the timer and worker.
    ///
    /// On failure everything acquired so far is released in reverse order
    /// before the error is returned.
    pub fn new<H>(config: PipelineConfig, pin: P, handler: H) -> Result<Self>
    where
        H: EventHandler + Send + 'static,
    {
        config.validate()?;
        Self::start(&config, pin, handler)
    }

    fn start<H>(config: &PipelineConfig, pin: P, handler: H) -> Result<Self>
    where
        H: EventHandler + Send + 'static,
    {
        let source_id = config.source_id;

        let (source, level) = EdgeSource::acquire(source_id, pin)?;
        let shared = Arc::new(Shared::new(source_id, config.window_us(), level));

        let worker = {
            let shared = Arc::clone(&shared);
            spawn_task(WORKER_TASK, config.worker_stack_kb, move || {
                worker::run(shared, source, handler)
            })?
        };

        let timer = {
            let shared = Arc::clone(&shared);
            spawn_task(TIMER_TASK, config.timer_stack_kb, move || timer::run(shared))
        };
        let timer = match timer {
            Ok(timer) => timer,
            Err(e) => {
                shared.with_state(|s| s.disarm());
                shared.deferred.signal(());
                if worker.join().is_err() {
                    error!("pipeline[{}]: worker panicked during rollback", source_id);
                }
                return Err(e.into());
            }
        };
        shared.attach_timer(timer.thread().clone());

        info!(
            "pipeline[{}]: started (window={}ms, level={})",
            source_id,
            config.window_ms,
            if level { "HIGH" } else { "LOW" }
        );

        Ok(Self {
            source_id,
            shared,
            tasks: Mutex::new(RefCell::new(Some(Tasks { timer, worker }))),
        })
    }

    pub fn source_id(&self) -> u32 {
        self.source_id
    }

    /// A handle the edge source can keep, independent of this value.
    pub fn injector(&self) -> EdgeInjector {
        EdgeInjector {
            shared: Arc::clone(&self.shared),
        }
    }

    /// See [`EdgeInjector::on_edge`].
    pub fn on_edge(&self, timestamp_us: u64) -> EdgeOutcome {
        self.shared.on_edge(timestamp_us)
    }

    /// See [`EdgeInjector::on_edge_now`].
    pub fn on_edge_now(&self) -> EdgeOutcome {
        self.shared.on_edge(self.shared.clock.uptime_us())
    }

    pub fn now_us(&self) -> u64 {
        self.shared.clock.uptime_us()
    }

    // ── Query ────────────────────────────────────────────────

    /// Consistent copy of the pipeline state. Faults raised since the last
    /// report are logged once as a side effect; nothing in the snapshot
    /// itself changes.
    pub fn snapshot(&self) -> PipelineSnapshot {
        self.shared.snapshot()
    }

    pub fn raw_edge_count(&self) -> u64 {
        self.snapshot().raw_edge_count()
    }

    pub fn processed_count(&self) -> u64 {
        self.snapshot().processed_count()
    }

    /// Last settled level of the line.
    pub fn level(&self) -> bool {
        self.snapshot().level
    }

    pub fn is_healthy(&self) -> bool {
        self.snapshot().healthy
    }

    pub fn is_running(&self) -> bool {
        self.snapshot().running
    }

    // ── Teardown ─────────────────────────────────────────────

    /// Ordered, synchronous shutdown. Safe to call more than once; later
    /// calls return immediately.
    pub fn shutdown(&self) {
        let Some(tasks) = self.tasks.lock(|t| t.borrow_mut().take()) else {
            return;
        };

        let was_pending = self.shared.with_state(|s| s.disarm());
        info!(
            "pipeline[{}]: shutting down{}",
            self.source_id,
            if was_pending { " (pending window cancelled)" } else { "" }
        );

        self.shared.wake_timer();
        if tasks.timer.join().is_err() {
            error!("pipeline[{}]: timer task panicked", self.source_id);
        }

        self.shared.deferred.signal(());
        match tasks.worker.join() {
            Ok(source) => drop(source),
            Err(_) => error!("pipeline[{}]: worker task panicked", self.source_id),
        }

        let snap = self.snapshot();
        info!(
            "pipeline[{}]: stopped | raw={} processed={} coalesced={} cancelled={}",
            self.source_id,
            snap.counters.raw_edge_count,
            snap.counters.processed_count,
            snap.counters.coalesced_dispatches,
            snap.counters.cancelled_dispatches,
        );
    }
}

impl<P> Drop for Pipeline<P>
where
    P: InputPin + Send + 'static,
{
    fn drop(&mut self) {
        self.shutdown();
    }
}
