//! Data semaphore bounding in-flight event count and bytes

use parking_lot::{Condvar, Mutex};
use std::time::{Duration, Instant};
use tracing::warn;

/// A (count, size) resource measure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Metric {
    /// Number of events
    pub num: usize,
    /// Total size in bytes
    pub size: u64,
}

impl Metric {
    /// Zero measure
    pub fn zero() -> Self {
        Metric::default()
    }

    /// True if `self` fits into `cap`
    pub fn fits(&self, cap: &Metric) -> bool {
        self.num <= cap.num && self.size <= cap.size
    }

    /// Component-wise saturating sum
    pub fn add(&self, other: &Metric) -> Metric {
        Metric {
            num: self.num.saturating_add(other.num),
            size: self.size.saturating_add(other.size),
        }
    }
}

struct State {
    used: Metric,
    max: Metric,
}

/// Semaphore over a `(num, size)` pair.
///
/// `acquire` blocks on a condition variable with a deadline; `release`
/// broadcasts. Over-releasing indicates an accounting bug upstream: it
/// fires the warning callback and resets the counters to zero rather than
/// terminating the process.
pub struct DataSemaphore {
    state: Mutex<State>,
    cond: Condvar,
    warn_cb: Box<dyn Fn(&str) + Send + Sync>,
}

impl DataSemaphore {
    /// Create a semaphore with capacity `max`
    pub fn new(max: Metric, warn_cb: Box<dyn Fn(&str) + Send + Sync>) -> Self {
        DataSemaphore {
            state: Mutex::new(State {
                used: Metric::zero(),
                max,
            }),
            cond: Condvar::new(),
            warn_cb,
        }
    }

    /// Create with a warning callback that logs through tracing
    pub fn with_default_warning(max: Metric) -> Self {
        Self::new(
            max,
            Box::new(|msg| warn!(target: "dag::semaphore", "{msg}")),
        )
    }

    /// Acquire `want`, waiting up to `timeout`.
    ///
    /// Returns false if the deadline passes, the request can never fit the
    /// capacity, or the semaphore is terminated while waiting.
    pub fn acquire(&self, want: Metric, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock();
        loop {
            if !want.fits(&state.max) {
                return false;
            }
            if want.fits(&available(&state)) {
                state.used = state.used.add(&want);
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            // Re-check on wakeup or timeout; the loop exits via the
            // deadline test above.
            let _ = self.cond.wait_until(&mut state, deadline);
        }
    }

    /// Acquire without blocking
    pub fn try_acquire(&self, want: Metric) -> bool {
        let mut state = self.state.lock();
        if want.fits(&state.max) && want.fits(&available(&state)) {
            state.used = state.used.add(&want);
            true
        } else {
            false
        }
    }

    /// Return previously acquired resources and wake all waiters
    pub fn release(&self, amount: Metric) {
        let mut state = self.state.lock();
        if amount.num > state.used.num || amount.size > state.used.size {
            (self.warn_cb)("data semaphore was over-released, resetting counters");
            state.used = Metric::zero();
        } else {
            state.used.num -= amount.num;
            state.used.size -= amount.size;
        }
        self.cond.notify_all();
    }

    /// Set the capacity to zero and wake all waiters, making every pending
    /// and future non-empty acquire fail
    pub fn terminate(&self) {
        let mut state = self.state.lock();
        state.max = Metric::zero();
        self.cond.notify_all();
    }

    /// Currently acquired measure
    pub fn used(&self) -> Metric {
        self.state.lock().used
    }
}

fn available(state: &State) -> Metric {
    Metric {
        num: state.max.num.saturating_sub(state.used.num),
        size: state.max.size.saturating_sub(state.used.size),
    }
}
