//! State shared between the urgent and deferred contexts.
//!
//! Everything mutable sits in one [`PipelineState`] behind a
//! critical-section mutex. Sections are short and never park, join, read
//! the line, or call the handler. The two handoffs out of the lock are
//! non-blocking: `Thread::unpark` wakes the timer service and a
//! single-slot [`Signal`] wakes the deferred worker.
//!
//! ```text
//!  on_edge ──lock──▶ Debouncer ──unpark──▶ timer ──lock──▶ DeferredSlot
//!                                                   │
//!                                          Signal ◀─┘──▶ worker ──lock──▶ counters
//! ```

use core::cell::RefCell;
use core::sync::atomic::{AtomicBool, Ordering};
use std::sync::OnceLock;
use std::thread::Thread;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;

use crate::adapters::time::MonotonicClock;
use crate::app::events::SettledEvent;
use crate::debounce::{Debouncer, EdgeOutcome, TimerStep, WindowReport};
use crate::error::{ArmError, PipelineFault};
use crate::health::{self, HealthMonitor};

use super::query::PipelineSnapshot;

/// The single outstanding deferred task, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DeferredSlot {
    Empty,
    Queued(WindowReport),
}

/// What the worker should do after a wake-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Job {
    Run(WindowReport),
    Nothing,
    Stop,
}

#[derive(Debug)]
pub(crate) struct PipelineState {
    source_id: u32,
    debouncer: Debouncer,
    level: bool,
    health: HealthMonitor,
    deferred: DeferredSlot,
}

impl PipelineState {
    pub(crate) fn new(source_id: u32, window_us: u64, level: bool) -> Self {
        Self {
            source_id,
            debouncer: Debouncer::new(window_us),
            level,
            health: HealthMonitor::new(),
            deferred: DeferredSlot::Empty,
        }
    }

    pub(crate) fn on_edge<F>(&mut self, now_us: u64, arm: F) -> EdgeOutcome
    where
        F: FnOnce(u64) -> Result<(), ArmError>,
    {
        let outcome = self.debouncer.on_edge(now_us, arm);
        if outcome == EdgeOutcome::Degraded {
            self.health.raise(PipelineFault::TimerUnavailable);
        }
        outcome
    }

    /// Evaluate the deadline; a closed window is queued for the worker.
    pub(crate) fn poll_timer(&mut self, now_us: u64) -> TimerStep {
        let step = self.debouncer.poll(now_us);
        if let TimerStep::Expired(report) = step {
            if let DeferredSlot::Queued(_) = self.deferred {
                self.debouncer.counters_mut().coalesced_dispatches += 1;
            }
            self.deferred = DeferredSlot::Queued(report);
        }
        step
    }

    pub(crate) fn take_job(&mut self) -> Job {
        let slot = core::mem::replace(&mut self.deferred, DeferredSlot::Empty);
        if self.debouncer.is_disarmed() {
            if let DeferredSlot::Queued(_) = slot {
                self.debouncer.counters_mut().cancelled_dispatches += 1;
            }
            return Job::Stop;
        }
        match slot {
            DeferredSlot::Queued(report) => Job::Run(report),
            DeferredSlot::Empty => Job::Nothing,
        }
    }

    /// Store the settled level and count the delivery.
    pub(crate) fn record_settled(
        &mut self,
        level: bool,
        window: WindowReport,
        now_us: u64,
    ) -> SettledEvent {
        self.level = level;
        let sequence = self.debouncer.record_delivery();
        self.health.clear(PipelineFault::LevelReadFailed);
        SettledEvent {
            source_id: self.source_id,
            level,
            sequence,
            settled_us: now_us,
            window,
        }
    }

    pub(crate) fn record_level_failure(&mut self, msg: &str) {
        self.debouncer.counters_mut().failed_dispatches += 1;
        self.health.fail(PipelineFault::LevelReadFailed, msg);
    }

    pub(crate) fn record_handler_result(&mut self, result: Result<(), &str>) {
        match result {
            Ok(()) => {
                self.health.clear(PipelineFault::HandlerFailed);
            }
            Err(msg) => self.health.fail(PipelineFault::HandlerFailed, msg),
        }
    }

    /// Enter the terminal state. Returns whether a window was open.
    pub(crate) fn disarm(&mut self) -> bool {
        self.debouncer.disarm()
    }

    pub(crate) fn take_unreported(&mut self) -> u8 {
        self.health.take_unreported()
    }

    pub(crate) fn snapshot(&self) -> PipelineSnapshot {
        PipelineSnapshot {
            source_id: self.source_id,
            level: self.level,
            window_us: self.debouncer.window_us(),
            phase: self.debouncer.phase(),
            last_edge_us: self.debouncer.last_edge_us(),
            counters: *self.debouncer.counters(),
            deferred_queued: matches!(self.deferred, DeferredSlot::Queued(_)),
            faults: self.health.faults(),
            healthy: self.health.is_healthy(),
            running: !self.debouncer.is_disarmed(),
            last_error: self.health.last_error().clone(),
        }
    }
}

pub(crate) struct Shared {
    state: Mutex<CriticalSectionRawMutex, RefCell<PipelineState>>,
    pub(crate) clock: MonotonicClock,
    /// Timer → worker handoff. Coalesces repeated signals.
    pub(crate) deferred: Signal<CriticalSectionRawMutex, ()>,
    timer_thread: OnceLock<Thread>,
    timer_online: AtomicBool,
}

impl Shared {
    pub(crate) fn new(source_id: u32, window_us: u64, level: bool) -> Self {
        Self {
            state: Mutex::new(RefCell::new(PipelineState::new(source_id, window_us, level))),
            clock: MonotonicClock::new(),
            deferred: Signal::new(),
            timer_thread: OnceLock::new(),
            timer_online: AtomicBool::new(false),
        }
    }

    /// Run `f` inside the critical section.
    pub(crate) fn with_state<R>(&self, f: impl FnOnce(&mut PipelineState) -> R) -> R {
        self.state.lock(|cell| f(&mut cell.borrow_mut()))
    }

    /// Urgent-context entry point. Bounded, allocation-free, never parks.
    pub(crate) fn on_edge(&self, now_us: u64) -> EdgeOutcome {
        self.with_state(|s| s.on_edge(now_us, |_deadline| self.arm_timer()))
    }

    /// Wake the timer service so it picks up a newly armed deadline.
    fn arm_timer(&self) -> Result<(), ArmError> {
        if !self.timer_online.load(Ordering::Acquire) {
            return Err(ArmError::TimerOffline);
        }
        let thread = self.timer_thread.get().ok_or(ArmError::TimerOffline)?;
        thread.unpark();
        Ok(())
    }

    pub(crate) fn attach_timer(&self, thread: Thread) {
        let _ = self.timer_thread.set(thread);
        self.timer_online.store(true, Ordering::Release);
    }

    pub(crate) fn detach_timer(&self) {
        self.timer_online.store(false, Ordering::Release);
    }

    pub(crate) fn wake_timer(&self) {
        if let Some(thread) = self.timer_thread.get() {
            thread.unpark();
        }
    }

    /// Consistent snapshot. Faults raised since the last report are logged
    /// once; the fault mask and counters are left as they are.
    pub(crate) fn snapshot(&self) -> PipelineSnapshot {
        let (snap, unreported) = self.with_state(|s| (s.snapshot(), s.take_unreported()));
        if unreported != 0 {
            health::report(snap.source_id, unreported);
        }
        snap
    }
}
