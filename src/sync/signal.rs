//! Binary "work happened" signal.

use portable_atomic::{AtomicBool, Ordering};

use crate::platform::Clock;
use crate::time::Deadline;

/// Binary semaphore released after every dispatch pass.
///
/// Starts empty. Multiple releases before an acquire collapse into one.
#[derive(Debug, Default)]
pub struct WorkSignal {
    permit: AtomicBool,
}

impl WorkSignal {
    /// Create an empty signal.
    pub const fn new() -> Self {
        Self {
            permit: AtomicBool::new(false),
        }
    }

    /// Drop any pending permit.
    pub fn reset(&self) {
        self.permit.store(false, Ordering::Release);
    }

    /// Make one permit available and wake waiters.
    pub fn release(&self, clock: &impl Clock) {
        self.permit.store(true, Ordering::Release);
        clock.send_event();
    }

    /// Take the permit without waiting.
    pub fn try_acquire(&self) -> bool {
        self.permit.swap(false, Ordering::AcqRel)
    }

    /// Wait for the permit until `deadline`. Returns `true` if taken.
    pub fn acquire_until(&self, clock: &impl Clock, deadline: Deadline) -> bool {
        loop {
            if self.try_acquire() {
                return true;
            }
            if deadline.is_reached(clock.now()) {
                return false;
            }
            clock.wait_for_event_until(deadline);
        }
    }
}
