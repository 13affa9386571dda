//! Blocking time source used by the scanner, the motion controller and the
//! supervisor.
//!
//! Production code sleeps the calling thread via [`SystemClock`]. Tests use
//! [`ManualClock`], which returns immediately and records every requested
//! sleep so that timing (servo settle, ramp steps, emergency hold) can be
//! asserted exactly.

use std::cell::RefCell;
use std::time::Duration;

/// Something that can block the caller for a bounded duration.
pub trait Clock {
    fn sleep(&self, duration: Duration);
}

impl<C: Clock + ?Sized> Clock for &C {
    fn sleep(&self, duration: Duration) {
        (**self).sleep(duration)
    }
}

/// Wall-clock sleeping with [`std::thread::sleep`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            std::thread::sleep(duration);
        }
    }
}

/// Non-blocking clock that only records what it was asked to do.
#[derive(Debug, Default)]
pub struct ManualClock {
    slept: RefCell<Vec<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every sleep requested so far, in order.
    pub fn sleeps(&self) -> Vec<Duration> {
        self.slept.borrow().clone()
    }

    /// Sum of all requested sleeps.
    pub fn total(&self) -> Duration {
        self.slept.borrow().iter().sum()
    }

    pub fn reset(&self) {
        self.slept.borrow_mut().clear();
    }
}

impl Clock for ManualClock {
    fn sleep(&self, duration: Duration) {
        self.slept.borrow_mut().push(duration);
    }
}
