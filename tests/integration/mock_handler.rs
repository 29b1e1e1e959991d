//! Recording event handler for integration tests.
//!
//! Keeps every settled event, detects overlapping invocations, and can be
//! told to run slowly, fail, or panic.

use edgebounce::{EventHandler, SettledEvent};
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Mode {
    Succeed = 0,
    Fail = 1,
    Panic = 2,
}

#[derive(Default)]
struct Shared {
    events: Mutex<Vec<SettledEvent>>,
    in_flight: AtomicBool,
    overlaps: AtomicU32,
    started: AtomicU32,
    completed: AtomicU32,
    mode: AtomicU8,
}

/// Assertion side of a [`RecordingHandler`].
#[derive(Clone, Default)]
pub struct Recorder {
    shared: Arc<Shared>,
}

#[allow(dead_code)]
impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// A handler reporting into this recorder, sleeping `delay` per event.
    pub fn handler(&self, delay: Duration) -> RecordingHandler {
        RecordingHandler {
            shared: Arc::clone(&self.shared),
            delay,
        }
    }

    pub fn set_mode(&self, mode: Mode) {
        self.shared.mode.store(mode as u8, Ordering::SeqCst);
    }

    pub fn events(&self) -> Vec<SettledEvent> {
        self.shared.events.lock().unwrap().clone()
    }

    pub fn count(&self) -> usize {
        self.shared.events.lock().unwrap().len()
    }

    pub fn started(&self) -> u32 {
        self.shared.started.load(Ordering::SeqCst)
    }

    pub fn completed(&self) -> u32 {
        self.shared.completed.load(Ordering::SeqCst)
    }

    pub fn in_flight(&self) -> bool {
        self.shared.in_flight.load(Ordering::SeqCst)
    }

    pub fn overlaps(&self) -> u32 {
        self.shared.overlaps.load(Ordering::SeqCst)
    }
}

pub struct RecordingHandler {
    shared: Arc<Shared>,
    delay: Duration,
}

impl EventHandler for RecordingHandler {
    fn on_settled(&mut self, event: &SettledEvent) -> anyhow::Result<()> {
        if self.shared.in_flight.swap(true, Ordering::SeqCst) {
            self.shared.overlaps.fetch_add(1, Ordering::SeqCst);
        }
        self.shared.started.fetch_add(1, Ordering::SeqCst);
        self.shared.events.lock().unwrap().push(*event);

        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }

        self.shared.completed.fetch_add(1, Ordering::SeqCst);
        self.shared.in_flight.store(false, Ordering::SeqCst);

        match self.shared.mode.load(Ordering::SeqCst) {
            1 => anyhow::bail!("downstream rejected event #{}", event.sequence),
            2 => panic!("handler blew up on event #{}", event.sequence),
            _ => Ok(()),
        }
    }
}

/// Poll `cond` every millisecond until it holds or `timeout` elapses.
pub fn wait_until(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        if cond() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        std::thread::sleep(Duration::from_millis(1));
    }
}

/// Generous upper bound for anything the pipeline should finish.
pub const SETTLE: Duration = Duration::from_secs(5);
