//! Method-style access to the combinators, plus their async-selector forms.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use super::cancellation::CancellationToken;
use super::completion::CompletionFuture;
use super::disposable::Handle;
use super::dispose_previous::select_many_dispose_previous;
use super::error::ReactiveError;
use super::first_value::first_value;
use super::from_async::from_async;
use super::observable::{AnonymousObserver, Stream};
use super::scheduler::SchedulerRef;
use super::skip_while_busy::skip_while_select_many;

/// Async work started for one trigger.
///
/// Implemented for any `Fn(S, CancellationToken) -> impl Future` closure.
/// The token is cancelled when the inner subscription running the work is
/// disposed.
#[async_trait]
pub trait TriggerHandler<S, R>: Send + Sync + 'static {
    /// Run the work for `trigger`.
    async fn handle(&self, trigger: S, token: CancellationToken) -> Result<R, ReactiveError>;
}

#[async_trait]
impl<S, R, F, Fut> TriggerHandler<S, R> for F
where
    S: Send + 'static,
    R: Send + 'static,
    F: Fn(S, CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R, ReactiveError>> + Send + 'static,
{
    async fn handle(&self, trigger: S, token: CancellationToken) -> Result<R, ReactiveError> {
        (self)(trigger, token).await
    }
}

/// Wrap `handler` as a selector that bridges each trigger through [`from_async`].
fn bridge<S, R, H>(
    handler: H,
    scheduler: Option<SchedulerRef>,
) -> impl Fn(S) -> Stream<R> + Send + Sync + 'static
where
    S: Clone + Send + Sync + 'static,
    R: Send + 'static,
    H: TriggerHandler<S, R>,
{
    let handler = Arc::new(handler);
    move |trigger: S| {
        let handler = Arc::clone(&handler);
        from_async(
            move |token| {
                let handler = Arc::clone(&handler);
                let trigger = trigger.clone();
                async move { handler.handle(trigger, token).await }
            },
            scheduler.clone(),
        )
    }
}

/// Combinators available on every [`Stream`].
pub trait StreamExt<T: Send + 'static> {
    /// Subscribe with three closures.
    fn subscribe_with<N, E, C>(&self, on_next: N, on_error: E, on_completed: C) -> Handle
    where
        N: Fn(T) + Send + Sync + 'static,
        E: Fn(ReactiveError) + Send + Sync + 'static,
        C: Fn() + Send + Sync + 'static;

    /// See [`select_many_dispose_previous`].
    fn select_many_dispose_previous<R, F>(&self, selector: F) -> Stream<R>
    where
        R: Send + 'static,
        F: Fn(T) -> Stream<R> + Send + Sync + 'static;

    /// Dispose-previous flattening over async work.
    ///
    /// Each trigger starts `handler` through the task-stream bridge; a new
    /// trigger cancels the token handed to the previous run. With a
    /// scheduler, invocation and delivery happen on it.
    fn select_many_dispose_previous_async<R, H>(
        &self,
        handler: H,
        scheduler: Option<SchedulerRef>,
    ) -> Stream<R>
    where
        T: Clone + Sync,
        R: Send + 'static,
        H: TriggerHandler<T, R>;

    /// See [`skip_while_select_many`].
    fn skip_while_select_many<R, F>(&self, selector: F, include_pending: bool) -> Stream<R>
    where
        R: Send + 'static,
        F: Fn(T) -> Stream<R> + Send + Sync + 'static;

    /// Skip-while-busy flattening over async work.
    fn skip_while_select_many_async<R, H>(&self, handler: H, include_pending: bool) -> Stream<R>
    where
        T: Clone + Sync,
        R: Send + 'static,
        H: TriggerHandler<T, R>;

    /// See [`first_value`].
    fn first_value(&self, token: &CancellationToken) -> CompletionFuture<T>;
}

impl<T: Send + 'static> StreamExt<T> for Stream<T> {
    fn subscribe_with<N, E, C>(&self, on_next: N, on_error: E, on_completed: C) -> Handle
    where
        N: Fn(T) + Send + Sync + 'static,
        E: Fn(ReactiveError) + Send + Sync + 'static,
        C: Fn() + Send + Sync + 'static,
    {
        self.subscribe(AnonymousObserver::new(on_next, on_error, on_completed))
    }

    fn select_many_dispose_previous<R, F>(&self, selector: F) -> Stream<R>
    where
        R: Send + 'static,
        F: Fn(T) -> Stream<R> + Send + Sync + 'static,
    {
        select_many_dispose_previous(self, selector)
    }

    fn select_many_dispose_previous_async<R, H>(
        &self,
        handler: H,
        scheduler: Option<SchedulerRef>,
    ) -> Stream<R>
    where
        T: Clone + Sync,
        R: Send + 'static,
        H: TriggerHandler<T, R>,
    {
        select_many_dispose_previous(self, bridge(handler, scheduler))
    }

    fn skip_while_select_many<R, F>(&self, selector: F, include_pending: bool) -> Stream<R>
    where
        R: Send + 'static,
        F: Fn(T) -> Stream<R> + Send + Sync + 'static,
    {
        skip_while_select_many(self, selector, include_pending)
    }

    fn skip_while_select_many_async<R, H>(&self, handler: H, include_pending: bool) -> Stream<R>
    where
        T: Clone + Sync,
        R: Send + 'static,
        H: TriggerHandler<T, R>,
    {
        skip_while_select_many(self, bridge(handler, None), include_pending)
    }

    fn first_value(&self, token: &CancellationToken) -> CompletionFuture<T> {
        first_value(self, token)
    }
}
