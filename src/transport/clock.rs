use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use crate::micros::Micros;

/// The transport's notion of "now".
///
/// Injected so the drive loop can run against the real monotonic clock in
/// production and against a hand-advanced clock in tests, where pulses and
/// elapsed time are controlled exactly.
pub trait Clock {
    /// Monotonic time since some fixed origin.
    fn now(&self) -> Micros;
}

/// The real monotonic clock.
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Micros {
        Micros::new(self.origin.elapsed().as_micros() as u64)
    }
}

/// A clock that only moves when told to.
///
/// Cloning shares the underlying time source, so a test can hold one copy,
/// hand the other to the transport, and advance between pulses.
#[derive(Clone, Default)]
pub struct ManualClock {
    micros: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move time forward.
    pub fn advance(&self, by: Micros) {
        self.micros.fetch_add(by.us(), Ordering::SeqCst);
    }

    /// Jump to an absolute reading.
    pub fn set(&self, to: Micros) {
        self.micros.store(to.us(), Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Micros {
        Micros::new(self.micros.load(Ordering::SeqCst))
    }
}
