//! Cooperative async work on a scheduler, and futures bridged from it.
//!
//! [`SchedulerExt::schedule_task`] and its variants run an async builder on
//! the scheduler. The builder receives a [`CancellationToken`] tied to the
//! returned handle, so disposing the handle is the way to stop the work at
//! its next cooperative check.
//!
//! Outcomes are routed as follows:
//!
//! - success clears the task's slot (plain shape) or installs the produced
//!   handle into it (resource shape);
//! - cancellation clears the slot and is not reported;
//! - any other fault is re-raised by a work item scheduled on the same
//!   scheduler, which hands it to
//!   [`Scheduler::report_fault`](super::scheduler::Scheduler::report_fault).
//!
//! The re-raise occupies the task's own slot; disposing the handle before it
//! runs suppresses it.

use std::future::Future;
use std::sync::Arc;

use uuid::Uuid;

use super::cancellation::CancellationToken;
use super::completion::{Completion, CompletionFuture};
use super::disposable::{
    self, CancellationDisposable, Disposable, Handle, SerialDisposable, SingleAssignmentDisposable,
};
use super::error::{Outcome, ReactiveError};
use super::scheduler::{spawn_on, Due, SchedulerRef};

/// How a successful task result lands in the task's slot.
type Install<R> = fn(&SerialDisposable, R);

fn clear_slot(slot: &SerialDisposable, (): ()) {
    slot.replace(None);
}

fn install_resource(slot: &SerialDisposable, resource: Handle) {
    slot.replace(Some(resource));
}

/// Scheduler-bound cooperative tasks and scheduler-to-future bridges.
pub trait SchedulerExt {
    /// Run `builder` as soon as possible.
    fn schedule_task<F, Fut>(&self, builder: F) -> Handle
    where
        F: FnOnce(CancellationToken, SchedulerRef) -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), ReactiveError>> + Send + 'static;

    /// Run `builder` after a delay or at an absolute time.
    fn schedule_task_at<D, F, Fut>(&self, due: D, builder: F) -> Handle
    where
        D: Into<Due>,
        F: FnOnce(CancellationToken, SchedulerRef) -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), ReactiveError>> + Send + 'static;

    /// Run `builder` at `due`, handing it `state`.
    fn schedule_task_with_state<S, F, Fut>(&self, state: S, due: Due, builder: F) -> Handle
    where
        S: Send + 'static,
        F: FnOnce(CancellationToken, SchedulerRef, S) -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), ReactiveError>> + Send + 'static;

    /// Run a resource-producing `builder` as soon as possible.
    ///
    /// The produced handle is owned by the returned handle; a resource that
    /// arrives after the returned handle was disposed is disposed on arrival.
    fn schedule_resource_task<F, Fut>(&self, builder: F) -> Handle
    where
        F: FnOnce(CancellationToken, SchedulerRef) -> Fut + Send + 'static,
        Fut: Future<Output = Result<Handle, ReactiveError>> + Send + 'static;

    /// Run a resource-producing `builder` after a delay or at an absolute time.
    fn schedule_resource_task_at<D, F, Fut>(&self, due: D, builder: F) -> Handle
    where
        D: Into<Due>,
        F: FnOnce(CancellationToken, SchedulerRef) -> Fut + Send + 'static,
        Fut: Future<Output = Result<Handle, ReactiveError>> + Send + 'static;

    /// Run a resource-producing `builder` at `due`, handing it `state`.
    fn schedule_resource_task_with_state<S, F, Fut>(
        &self,
        state: S,
        due: Due,
        builder: F,
    ) -> Handle
    where
        S: Send + 'static,
        F: FnOnce(CancellationToken, SchedulerRef, S) -> Fut + Send + 'static,
        Fut: Future<Output = Result<Handle, ReactiveError>> + Send + 'static;

    /// Run async work on the scheduler and observe its result as a future.
    ///
    /// Cancelling `token` resolves the future as canceled and disposes the
    /// in-flight task. Exactly one of value, fault or canceled is delivered.
    fn run<T, F, Fut>(&self, builder: F, token: &CancellationToken) -> CompletionFuture<T>
    where
        T: Send + 'static,
        F: FnOnce(CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, ReactiveError>> + Send + 'static;

    /// Run a synchronous function on the scheduler and observe its result.
    ///
    /// A cancellation that lands before the work item runs prevents `func`
    /// from being invoked at all.
    fn run_fn<T, F>(&self, func: F, token: &CancellationToken) -> CompletionFuture<T>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T, ReactiveError> + Send + 'static;

    /// Run a synchronous action on the scheduler.
    fn run_action<F>(&self, action: F, token: &CancellationToken) -> CompletionFuture<()>
    where
        F: FnOnce() -> Result<(), ReactiveError> + Send + 'static,
    {
        self.run_fn(action, token)
    }
}

impl SchedulerExt for SchedulerRef {
    fn schedule_task<F, Fut>(&self, builder: F) -> Handle
    where
        F: FnOnce(CancellationToken, SchedulerRef) -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), ReactiveError>> + Send + 'static,
    {
        self.schedule_task_with_state((), Due::Now, move |ct, s, ()| builder(ct, s))
    }

    fn schedule_task_at<D, F, Fut>(&self, due: D, builder: F) -> Handle
    where
        D: Into<Due>,
        F: FnOnce(CancellationToken, SchedulerRef) -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), ReactiveError>> + Send + 'static,
    {
        self.schedule_task_with_state((), due.into(), move |ct, s, ()| builder(ct, s))
    }

    fn schedule_task_with_state<S, F, Fut>(&self, state: S, due: Due, builder: F) -> Handle
    where
        S: Send + 'static,
        F: FnOnce(CancellationToken, SchedulerRef, S) -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), ReactiveError>> + Send + 'static,
    {
        schedule_cooperative(self, state, due, builder, clear_slot)
    }

    fn schedule_resource_task<F, Fut>(&self, builder: F) -> Handle
    where
        F: FnOnce(CancellationToken, SchedulerRef) -> Fut + Send + 'static,
        Fut: Future<Output = Result<Handle, ReactiveError>> + Send + 'static,
    {
        self.schedule_resource_task_with_state((), Due::Now, move |ct, s, ()| builder(ct, s))
    }

    fn schedule_resource_task_at<D, F, Fut>(&self, due: D, builder: F) -> Handle
    where
        D: Into<Due>,
        F: FnOnce(CancellationToken, SchedulerRef) -> Fut + Send + 'static,
        Fut: Future<Output = Result<Handle, ReactiveError>> + Send + 'static,
    {
        self.schedule_resource_task_with_state((), due.into(), move |ct, s, ()| builder(ct, s))
    }

    fn schedule_resource_task_with_state<S, F, Fut>(
        &self,
        state: S,
        due: Due,
        builder: F,
    ) -> Handle
    where
        S: Send + 'static,
        F: FnOnce(CancellationToken, SchedulerRef, S) -> Fut + Send + 'static,
        Fut: Future<Output = Result<Handle, ReactiveError>> + Send + 'static,
    {
        schedule_cooperative(self, state, due, builder, install_resource)
    }

    fn run<T, F, Fut>(&self, builder: F, token: &CancellationToken) -> CompletionFuture<T>
    where
        T: Send + 'static,
        F: FnOnce(CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, ReactiveError>> + Send + 'static,
    {
        let (completion, future) = Completion::new();
        let in_flight = Arc::new(SingleAssignmentDisposable::new());
        let registration = completion.cancel_with(token, Arc::clone(&in_flight) as Handle);

        let handle = self.schedule_task(move |ct, _scheduler| async move {
            let outcome = Outcome::from_result(builder(ct).await);
            completion.try_resolve(outcome);
            registration.dispose();
            Ok(())
        });
        in_flight.set(handle);
        future
    }

    fn run_fn<T, F>(&self, func: F, token: &CancellationToken) -> CompletionFuture<T>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T, ReactiveError> + Send + 'static,
    {
        let (completion, future) = Completion::new();
        let in_flight = Arc::new(SingleAssignmentDisposable::new());
        let registration = completion.cancel_with(token, Arc::clone(&in_flight) as Handle);

        let guard = Arc::clone(&in_flight);
        let handle = self.schedule(Box::new(move || {
            if guard.is_disposed() {
                tracing::debug!("scheduled body skipped; canceled before it ran");
                return disposable::empty();
            }
            completion.try_resolve(Outcome::from_result(func()));
            registration.dispose();
            disposable::empty()
        }));
        in_flight.set(handle);
        future
    }
}

fn schedule_cooperative<S, F, Fut, R>(
    scheduler: &SchedulerRef,
    state: S,
    due: Due,
    builder: F,
    install: Install<R>,
) -> Handle
where
    S: Send + 'static,
    R: Send + 'static,
    F: FnOnce(CancellationToken, SchedulerRef, S) -> Fut + Send + 'static,
    Fut: Future<Output = Result<R, ReactiveError>> + Send + 'static,
{
    let target = Arc::clone(scheduler);
    due.schedule_on(
        &**scheduler,
        Box::new(move || invoke_task(target, state, builder, install)),
    )
}

fn invoke_task<S, F, Fut, R>(
    scheduler: SchedulerRef,
    state: S,
    builder: F,
    install: Install<R>,
) -> Handle
where
    S: Send + 'static,
    R: Send + 'static,
    F: FnOnce(CancellationToken, SchedulerRef, S) -> Fut + Send + 'static,
    Fut: Future<Output = Result<R, ReactiveError>> + Send + 'static,
{
    let task_id = Uuid::new_v4();
    let subscriptions = Arc::new(SerialDisposable::new());
    let cancellation = Arc::new(CancellationDisposable::new());
    let token = cancellation.token();
    subscriptions.replace(Some(cancellation));

    tracing::debug!(%task_id, "scheduled task started");
    let work = builder(token, Arc::clone(&scheduler), state);

    let slot = Arc::clone(&subscriptions);
    let reporter = Arc::clone(&scheduler);
    spawn_on(&scheduler, async move {
        match work.await {
            Ok(result) => {
                tracing::debug!(%task_id, "scheduled task completed");
                install(&slot, result);
            }
            Err(error) if error.is_cancellation() => {
                tracing::debug!(%task_id, "scheduled task canceled");
                slot.replace(None);
            }
            Err(fault) => {
                tracing::warn!(%task_id, error = %fault, "scheduled task faulted; re-raising on scheduler");
                let target = Arc::clone(&reporter);
                let rethrow = reporter.schedule(Box::new(move || {
                    target.report_fault(&fault);
                    disposable::empty()
                }));
                slot.replace(Some(rethrow));
            }
        }
    });

    subscriptions
}
