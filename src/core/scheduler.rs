//! Scheduler contract and the future driver built on it.
//!
//! A [`Scheduler`] accepts work items to run now, after a delay or at an
//! absolute time. Work returns a [`Handle`]; schedulers install that handle
//! into the item's slot so disposing the schedule handle also releases
//! whatever the work produced.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use async_task::Runnable;

use super::disposable::{self, Disposable, Handle, SerialDisposable};
use super::error::ReactiveError;
use crate::util::clock;

/// A unit of scheduled work.
pub type Work = Box<dyn FnOnce() -> Handle + Send + 'static>;

/// Backing-agnostic work queue.
///
/// Implementations must eventually run each item unless its handle was
/// disposed first, and must preserve FIFO order for items due at the same
/// time.
pub trait Scheduler: Send + Sync + 'static {
    /// Current time as seen by this scheduler.
    fn now(&self) -> SystemTime;

    /// Run `work` as soon as possible.
    fn schedule(&self, work: Work) -> Handle;

    /// Run `work` after `delay`.
    fn schedule_after(&self, delay: Duration, work: Work) -> Handle;

    /// Run `work` at `due`; a due time in the past runs as soon as possible.
    fn schedule_at(&self, due: SystemTime, work: Work) -> Handle {
        self.schedule_after(clock::until(self.now(), due), work)
    }

    /// Host-level policy for faults nobody else is observing.
    ///
    /// Called from work scheduled on this scheduler. The default logs the fault.
    fn report_fault(&self, fault: &ReactiveError) {
        tracing::error!(error = %fault, "unobserved fault in scheduled task");
    }
}

/// Shared scheduler reference.
pub type SchedulerRef = Arc<dyn Scheduler>;

/// When a work item should run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Due {
    /// As soon as possible.
    #[default]
    Now,
    /// After a relative delay.
    After(Duration),
    /// At an absolute time.
    At(SystemTime),
}

impl Due {
    /// Schedule `work` on `scheduler` according to this due time.
    pub fn schedule_on(self, scheduler: &dyn Scheduler, work: Work) -> Handle {
        match self {
            Self::Now => scheduler.schedule(work),
            Self::After(delay) => scheduler.schedule_after(delay, work),
            Self::At(due) => scheduler.schedule_at(due, work),
        }
    }
}

impl From<Duration> for Due {
    fn from(delay: Duration) -> Self {
        Self::After(delay)
    }
}

impl From<SystemTime> for Due {
    fn from(due: SystemTime) -> Self {
        Self::At(due)
    }
}

/// Run a dequeued work item against its slot.
///
/// Skips the work when the slot was disposed before the item ran; otherwise
/// the handle returned by the work becomes the slot's occupant.
pub fn run_work(slot: &SerialDisposable, work: Work) {
    if slot.is_disposed() {
        return;
    }
    slot.replace(Some(work()));
}

/// Drive `future` to completion with every poll dispatched onto `scheduler`.
///
/// Each wake-up schedules one poll; the future therefore only ever resumes
/// on the given scheduler. If the scheduler drops a pending poll (its item
/// was disposed) the future is dropped with it.
pub fn spawn_on<F>(scheduler: &SchedulerRef, future: F)
where
    F: Future<Output = ()> + Send + 'static,
{
    let target = Arc::clone(scheduler);
    let schedule = move |runnable: Runnable| {
        target.schedule(Box::new(move || {
            runnable.run();
            disposable::empty()
        }));
    };
    let (runnable, task) = async_task::spawn(future, schedule);
    task.detach();
    runnable.schedule();
}
