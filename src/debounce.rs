//! Fixed-window debounce state machine.
//!
//! Pure logic, no threads and no clock: every transition takes the
//! timestamp it should be evaluated at (microseconds on the pipeline's
//! monotonic clock). The pipeline runs it under its lock; tests drive it
//! with synthetic time.
//!
//! ## States
//!
//! | Phase      | Edge                                   | Deadline reached        |
//! |------------|----------------------------------------|-------------------------|
//! | `Idle`     | count, open window, arm deadline       | -                       |
//! | `Pending`  | count only (window is not restarted)   | close window, report    |
//! | `Disarmed` | ignored, nothing counted               | -                       |
//!
//! Windows are half-open: `[opened, opened + window)`. An edge stamped at or
//! after the deadline, seen before the timer got to run, belongs to the
//! next window. It is counted immediately and the window it opens is armed
//! as soon as the closing one has been reported.

use serde::Serialize;

use crate::error::ArmError;

/// Where the debounce window currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum WindowPhase {
    /// No window open.
    Idle,
    /// Window open; a single deadline is armed.
    Pending { opened_us: u64, deadline_us: u64 },
    /// Torn down. Terminal.
    Disarmed,
}

/// Monotonic event counters plus inter-edge interval statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EventCounters {
    /// Every physical transition accepted, debounced or not.
    pub raw_edge_count: u64,
    /// Settled events delivered to the consumer.
    pub processed_count: u64,
    /// Debounce windows that reached their deadline.
    pub windows_closed: u64,
    /// Closed windows merged into a deferred task that was still queued.
    pub coalesced_dispatches: u64,
    /// Queued deferred tasks dropped by teardown before they ran.
    pub cancelled_dispatches: u64,
    /// Deferred tasks that could not read the settled level.
    pub failed_dispatches: u64,
    /// Edges that found the timer unavailable and opened no window.
    pub arm_failures: u64,
    /// Shortest gap between two consecutive edges.
    pub min_interval_us: Option<u64>,
    /// Longest gap between two consecutive edges.
    pub max_interval_us: Option<u64>,
}

/// What an edge did to the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeOutcome {
    /// Counted and opened a new window closing at `deadline_us`.
    WindowOpened { deadline_us: u64 },
    /// Counted inside an already open window.
    Absorbed,
    /// Counted at or past the open window's deadline; opens the next one.
    CarriedOver,
    /// Counted, but the deadline could not be armed.
    Degraded,
    /// Pipeline torn down; nothing recorded.
    Ignored,
}

/// Summary of a closed window, handed to the deferred context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WindowReport {
    pub opened_us: u64,
    pub deadline_us: u64,
    /// Edges that fell inside this window.
    pub edges: u64,
    /// `raw_edge_count` at the instant the window closed.
    pub raw_edge_count: u64,
}

/// What the timer service should do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerStep {
    /// Pipeline disarmed; the timer service exits.
    Stop,
    /// Nothing armed; sleep until woken.
    Idle,
    /// Sleep for this many microseconds, then poll again.
    Wait(u64),
    /// The window closed; dispatch its report.
    Expired(WindowReport),
}

/// Edges seen at or past the deadline of the still-open window.
#[derive(Debug, Clone, Copy)]
struct CarryOver {
    first_us: u64,
    edges: u64,
}

#[derive(Debug, Clone)]
pub struct Debouncer {
    window_us: u64,
    phase: WindowPhase,
    last_edge_us: Option<u64>,
    window_edges: u64,
    carry_over: Option<CarryOver>,
    counters: EventCounters,
}

impl Debouncer {
    pub fn new(window_us: u64) -> Self {
        Self {
            window_us,
            phase: WindowPhase::Idle,
            last_edge_us: None,
            window_edges: 0,
            carry_over: None,
            counters: EventCounters::default(),
        }
    }

    pub fn window_us(&self) -> u64 {
        self.window_us
    }

    pub fn phase(&self) -> WindowPhase {
        self.phase
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.phase, WindowPhase::Pending { .. })
    }

    pub fn is_disarmed(&self) -> bool {
        self.phase == WindowPhase::Disarmed
    }

    pub fn counters(&self) -> &EventCounters {
        &self.counters
    }

    pub(crate) fn counters_mut(&mut self) -> &mut EventCounters {
        &mut self.counters
    }

    pub fn last_edge_us(&self) -> Option<u64> {
        self.last_edge_us
    }

    /// Record one physical edge.
    ///
    /// `arm` is invoked at most once, only when this edge opens a window,
    /// with the new deadline. It must not block.
    pub fn on_edge<F>(&mut self, now_us: u64, arm: F) -> EdgeOutcome
    where
        F: FnOnce(u64) -> Result<(), ArmError>,
    {
        if self.is_disarmed() {
            return EdgeOutcome::Ignored;
        }

        self.counters.raw_edge_count += 1;
        self.track_interval(now_us);

        match self.phase {
            WindowPhase::Idle => {
                let deadline_us = now_us.saturating_add(self.window_us);
                match arm(deadline_us) {
                    Ok(()) => {
                        self.phase = WindowPhase::Pending {
                            opened_us: now_us,
                            deadline_us,
                        };
                        self.window_edges = 1;
                        EdgeOutcome::WindowOpened { deadline_us }
                    }
                    Err(_) => {
                        self.counters.arm_failures += 1;
                        EdgeOutcome::Degraded
                    }
                }
            }
            WindowPhase::Pending { deadline_us, .. } if now_us >= deadline_us => {
                let carry = self.carry_over.get_or_insert(CarryOver {
                    first_us: now_us,
                    edges: 0,
                });
                carry.edges += 1;
                EdgeOutcome::CarriedOver
            }
            WindowPhase::Pending { .. } => {
                self.window_edges += 1;
                EdgeOutcome::Absorbed
            }
            WindowPhase::Disarmed => EdgeOutcome::Ignored,
        }
    }

    /// Evaluate the armed deadline at `now_us`.
    ///
    /// Closes the window when due. If edges were carried over, the next
    /// window is opened from the first of them before returning.
    pub fn poll(&mut self, now_us: u64) -> TimerStep {
        match self.phase {
            WindowPhase::Disarmed => TimerStep::Stop,
            WindowPhase::Idle => TimerStep::Idle,
            WindowPhase::Pending { deadline_us, .. } if now_us < deadline_us => {
                TimerStep::Wait(deadline_us - now_us)
            }
            WindowPhase::Pending {
                opened_us,
                deadline_us,
            } => {
                let carried = self.carry_over.map_or(0, |c| c.edges);
                let report = WindowReport {
                    opened_us,
                    deadline_us,
                    edges: self.window_edges,
                    raw_edge_count: self.counters.raw_edge_count - carried,
                };
                self.counters.windows_closed += 1;
                self.phase = WindowPhase::Idle;
                self.window_edges = 0;

                if let Some(carry) = self.carry_over.take() {
                    self.phase = WindowPhase::Pending {
                        opened_us: carry.first_us,
                        deadline_us: carry.first_us.saturating_add(self.window_us),
                    };
                    self.window_edges = carry.edges;
                }

                TimerStep::Expired(report)
            }
        }
    }

    /// Count one settled event delivered to the consumer.
    pub fn record_delivery(&mut self) -> u64 {
        self.counters.processed_count += 1;
        debug_assert!(self.counters.processed_count <= self.counters.raw_edge_count);
        self.counters.processed_count
    }

    /// Enter the terminal state. Returns whether a window was open.
    pub fn disarm(&mut self) -> bool {
        let was_pending = self.is_pending();
        self.phase = WindowPhase::Disarmed;
        self.carry_over = None;
        self.window_edges = 0;
        was_pending
    }

    fn track_interval(&mut self, now_us: u64) {
        if let Some(last) = self.last_edge_us {
            let gap = now_us.saturating_sub(last);
            if gap > 0 {
                let c = &mut self.counters;
                c.min_interval_us = Some(c.min_interval_us.map_or(gap, |m| m.min(gap)));
                c.max_interval_us = Some(c.max_interval_us.map_or(gap, |m| m.max(gap)));
            }
        }
        self.last_edge_us = Some(now_us);
    }
}
