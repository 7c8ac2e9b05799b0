//! Scheduler that runs work inline on the calling thread.

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use crate::core::disposable::{Handle, SerialDisposable};
use crate::core::scheduler::{run_work, Scheduler, SchedulerRef, Work};

/// Runs each work item synchronously inside `schedule`.
///
/// Delayed work blocks the calling thread for the delay. Futures driven on
/// this scheduler resume on whichever thread wakes them.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImmediateScheduler;

impl ImmediateScheduler {
    /// Shared instance as a [`SchedulerRef`].
    #[must_use]
    pub fn shared() -> SchedulerRef {
        Arc::new(Self)
    }
}

impl Scheduler for ImmediateScheduler {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }

    fn schedule(&self, work: Work) -> Handle {
        let slot = Arc::new(SerialDisposable::new());
        run_work(&slot, work);
        slot
    }

    fn schedule_after(&self, delay: Duration, work: Work) -> Handle {
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }
        self.schedule(work)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::disposable::{self, Disposable};
    use std::sync::atomic::{AtomicBool, Ordering};

    #[test]
    fn test_runs_inline_and_owns_result() {
        let ran = Arc::new(AtomicBool::new(false));
        let released = Arc::new(AtomicBool::new(false));
        let (r, rel) = (Arc::clone(&ran), Arc::clone(&released));

        let handle = ImmediateScheduler.schedule(Box::new(move || {
            r.store(true, Ordering::SeqCst);
            Arc::new(disposable::ActionDisposable::new(move || {
                rel.store(true, Ordering::SeqCst);
            }))
        }));

        assert!(ran.load(Ordering::SeqCst));
        assert!(!released.load(Ordering::SeqCst));
        handle.dispose();
        assert!(released.load(Ordering::SeqCst));
    }
}
