//! Debounce timer service.
//!
//! One thread per pipeline sleeps until the armed deadline, closes the
//! window under the lock, and signals the deferred worker. Arming is an
//! `unpark` from the edge path, so the thread re-polls whenever a window
//! opens; spurious wake-ups just poll again. Disarming the pipeline makes
//! the next poll return [`TimerStep::Stop`].

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use log::{debug, trace};

use crate::debounce::TimerStep;

use super::shared::Shared;

/// Marks the timer offline however the loop exits, panics included.
struct OfflineOnExit<'a>(&'a Shared);

impl Drop for OfflineOnExit<'_> {
    fn drop(&mut self) {
        self.0.detach_timer();
    }
}

pub(crate) fn run(shared: Arc<Shared>) {
    let _offline = OfflineOnExit(&shared);
    debug!("timer: started");

    loop {
        let now = shared.clock.uptime_us();
        match shared.with_state(|s| s.poll_timer(now)) {
            TimerStep::Stop => break,
            TimerStep::Idle => thread::park(),
            TimerStep::Wait(us) => thread::park_timeout(Duration::from_micros(us)),
            TimerStep::Expired(report) => {
                trace!(
                    "timer: window {}..{}us closed ({} edges)",
                    report.opened_us, report.deadline_us, report.edges
                );
                shared.deferred.signal(());
            }
        }
    }

    debug!("timer: stopped");
}
