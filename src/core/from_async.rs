//! Task-stream bridge: a cancellable async factory exposed as a stream.
//!
//! Every subscription invokes the factory afresh with its own
//! [`CancellationToken`], then emits exactly one value followed by
//! completion, or a single error. Notifications are issued by the driving
//! future itself, so with a scheduler supplied they are delivered on that
//! scheduler rather than on whatever thread resolved the awaited work.

use std::future::Future;
use std::sync::Arc;

use super::cancellation::CancellationToken;
use super::disposable::{self, CancellationDisposable, CompositeDisposable, Handle};
use super::error::ReactiveError;
use super::observable::{create, ObserverRef, Stream};
use super::scheduler::{spawn_on, SchedulerRef};
use crate::runtime::ImmediateScheduler;

/// Wrap `factory` into a cold stream of at most one value.
///
/// Without a scheduler the factory is invoked and polled on the subscribing
/// thread and resumes wherever it is woken. With a scheduler, the invocation
/// and every subsequent poll are dispatched onto it.
///
/// Disposing the subscription cancels the token passed to the factory and
/// suppresses any later notification; it does not wait for the factory to
/// acknowledge. Side-effect-only work uses `T = ()`.
pub fn from_async<T, F, Fut>(factory: F, scheduler: Option<SchedulerRef>) -> Stream<T>
where
    T: Send + 'static,
    F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, ReactiveError>> + Send + 'static,
{
    let factory = Arc::new(factory);
    create(move |observer: ObserverRef<T>| {
        let cancellation = Arc::new(CancellationDisposable::new());
        let token = cancellation.token();
        let factory = Arc::clone(&factory);

        let work = async move {
            let result = factory(token.clone()).await;
            if token.is_cancelled() {
                tracing::trace!("async result discarded after disposal");
                return;
            }
            match result {
                Ok(value) => {
                    observer.on_next(value);
                    observer.on_completed();
                }
                Err(error) => observer.on_error(error),
            }
        };

        match &scheduler {
            Some(scheduler) => {
                let target = Arc::clone(scheduler);
                let dispatch = scheduler.schedule(Box::new(move || {
                    spawn_on(&target, work);
                    disposable::empty()
                }));
                Arc::new(CompositeDisposable::new(vec![cancellation, dispatch])) as Handle
            }
            None => {
                spawn_on(&ImmediateScheduler::shared(), work);
                cancellation
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::disposable::Disposable;
    use crate::core::test_support::{Event, Recorder};
    use crate::runtime::VirtualTimeScheduler;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::oneshot;

    #[test]
    fn test_each_subscription_invokes_factory() {
        let calls = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&calls);
        let stream = from_async(
            move |_ct| {
                let n = c.fetch_add(1, Ordering::SeqCst);
                async move { Ok(n) }
            },
            None,
        );

        let first = Recorder::new();
        let second = Recorder::new();
        let _a = stream.subscribe(first.observer());
        let _b = stream.subscribe(second.observer());

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(first.events(), vec![Event::Next(0), Event::Completed]);
        assert_eq!(second.events(), vec![Event::Next(1), Event::Completed]);
    }

    #[test]
    fn test_fault_becomes_stream_error() {
        let stream = from_async(
            |_ct| async { Err::<u8, _>(ReactiveError::msg("factory failed")) },
            None,
        );
        let recorder = Recorder::new();
        let _sub = stream.subscribe(recorder.observer());
        assert_eq!(
            recorder.events(),
            vec![Event::Error("operation failed: factory failed".into())]
        );
    }

    #[test]
    fn test_dispose_before_resolution_cancels_and_silences() {
        let pending: Arc<Mutex<Option<oneshot::Sender<u8>>>> = Arc::new(Mutex::new(None));
        let seen_token: Arc<Mutex<Option<CancellationToken>>> = Arc::new(Mutex::new(None));
        let (p, t) = (Arc::clone(&pending), Arc::clone(&seen_token));

        let stream = from_async(
            move |ct| {
                let (tx, rx) = oneshot::channel();
                *p.lock() = Some(tx);
                *t.lock() = Some(ct);
                async move { rx.await.map_err(ReactiveError::operation) }
            },
            None,
        );

        let recorder = Recorder::new();
        let sub = stream.subscribe(recorder.observer());
        sub.dispose();

        assert!(seen_token.lock().as_ref().unwrap().is_cancelled());
        let _ = pending.lock().take().unwrap().send(9);
        assert!(recorder.events().is_empty());
    }

    #[test]
    fn test_scheduler_dispatches_invocation_and_delivery() {
        let scheduler = VirtualTimeScheduler::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let pending: Arc<Mutex<Option<oneshot::Sender<u8>>>> = Arc::new(Mutex::new(None));
        let (c, p) = (Arc::clone(&calls), Arc::clone(&pending));

        let stream = from_async(
            move |_ct| {
                c.fetch_add(1, Ordering::SeqCst);
                let (tx, rx) = oneshot::channel();
                *p.lock() = Some(tx);
                async move { rx.await.map_err(ReactiveError::operation) }
            },
            Some(scheduler.clone() as SchedulerRef),
        );

        let recorder = Recorder::new();
        let _sub = stream.subscribe(recorder.observer());
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        scheduler.run_until_idle();
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let _ = pending.lock().take().unwrap().send(4);
        assert!(recorder.events().is_empty());

        scheduler.run_until_idle();
        assert_eq!(recorder.events(), vec![Event::Next(4), Event::Completed]);
    }

    #[test]
    fn test_dispose_before_dispatch_never_invokes_factory() {
        let scheduler = VirtualTimeScheduler::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&calls);
        let stream = from_async(
            move |_ct| {
                c.fetch_add(1, Ordering::SeqCst);
                async { Ok(()) }
            },
            Some(scheduler.clone() as SchedulerRef),
        );

        let recorder = Recorder::new();
        stream.subscribe(recorder.observer()).dispose();
        scheduler.flush();

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(recorder.events().is_empty());
    }
}
