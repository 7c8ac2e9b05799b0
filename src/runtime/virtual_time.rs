//! Deterministic virtual-clock scheduler for tests.
//!
//! Nothing runs until the test advances the clock. Items due at the same
//! instant run in scheduling order, and work scheduled while the clock is
//! advancing runs in the same pass if it is already due.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;

use crate::core::disposable::{Handle, SerialDisposable};
use crate::core::error::ReactiveError;
use crate::core::scheduler::{run_work, Scheduler, Work};

struct QueueState {
    now: SystemTime,
    seq: u64,
    queue: BTreeMap<(SystemTime, u64), (Arc<SerialDisposable>, Work)>,
    faults: Vec<ReactiveError>,
}

/// Scheduler driven by an explicit virtual clock.
pub struct VirtualTimeScheduler {
    state: Mutex<QueueState>,
}

impl VirtualTimeScheduler {
    /// Create a scheduler whose clock starts at the Unix epoch.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Self::starting_at(UNIX_EPOCH)
    }

    /// Create a scheduler whose clock starts at `start`.
    #[must_use]
    pub fn starting_at(start: SystemTime) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(QueueState {
                now: start,
                seq: 0,
                queue: BTreeMap::new(),
                faults: Vec::new(),
            }),
        })
    }

    fn enqueue(&self, due: SystemTime, work: Work) -> Handle {
        let slot = Arc::new(SerialDisposable::new());
        let mut state = self.state.lock();
        let due = due.max(state.now);
        let seq = state.seq;
        state.seq += 1;
        state.queue.insert((due, seq), (Arc::clone(&slot), work));
        slot
    }

    fn pop_due(&self, limit: SystemTime) -> Option<(Arc<SerialDisposable>, Work)> {
        let mut state = self.state.lock();
        let key = *state.queue.keys().next()?;
        if key.0 > limit {
            return None;
        }
        if key.0 > state.now {
            state.now = key.0;
        }
        state.queue.remove(&key)
    }

    /// Run everything due at the current virtual time.
    pub fn run_until_idle(&self) {
        let now = self.state.lock().now;
        self.advance_to(now);
    }

    /// Advance the clock to `target`, running each item as its due time is reached.
    pub fn advance_to(&self, target: SystemTime) {
        while let Some((slot, work)) = self.pop_due(target) {
            run_work(&slot, work);
        }
        let mut state = self.state.lock();
        if target > state.now {
            state.now = target;
        }
    }

    /// Advance the clock by `delta`.
    pub fn advance_by(&self, delta: Duration) {
        let target = self.state.lock().now + delta;
        self.advance_to(target);
    }

    /// Run every queued item, advancing the clock as far as needed.
    pub fn flush(&self) {
        loop {
            let next = self.state.lock().queue.keys().next().map(|k| k.0);
            match next {
                Some(due) => self.advance_to(due),
                None => break,
            }
        }
    }

    /// Number of queued items, including disposed ones not yet reached.
    pub fn pending(&self) -> usize {
        self.state.lock().queue.len()
    }

    /// Faults reported through [`Scheduler::report_fault`], oldest first.
    pub fn faults(&self) -> Vec<ReactiveError> {
        self.state.lock().faults.clone()
    }
}

impl Scheduler for VirtualTimeScheduler {
    fn now(&self) -> SystemTime {
        self.state.lock().now
    }

    fn schedule(&self, work: Work) -> Handle {
        let now = self.state.lock().now;
        self.enqueue(now, work)
    }

    fn schedule_after(&self, delay: Duration, work: Work) -> Handle {
        let due = self.state.lock().now + delay;
        self.enqueue(due, work)
    }

    fn schedule_at(&self, due: SystemTime, work: Work) -> Handle {
        self.enqueue(due, work)
    }

    fn report_fault(&self, fault: &ReactiveError) {
        tracing::debug!(error = %fault, "virtual scheduler captured fault");
        self.state.lock().faults.push(fault.clone());
    }
}
