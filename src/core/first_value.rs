//! Reduce a stream to a future of its first value.

use std::sync::Arc;

use super::cancellation::CancellationToken;
use super::completion::{Completion, CompletionFuture};
use super::disposable::{Disposable, Handle, SingleAssignmentDisposable};
use super::error::ReactiveError;
use super::observable::{AnonymousObserver, Stream};

/// Resolve with the first value `source` emits, then unsubscribe.
///
/// An error before any value resolves the future with that error; completion
/// without a value resolves it with [`ReactiveError::EmptySequence`].
/// Cancelling `token` disposes the subscription and resolves as canceled.
pub fn first_value<T>(source: &Stream<T>, token: &CancellationToken) -> CompletionFuture<T>
where
    T: Send + 'static,
{
    let (completion, future) = Completion::new();
    let subscription = Arc::new(SingleAssignmentDisposable::new());
    let registration = completion.cancel_with(token, Arc::clone(&subscription) as Handle);

    let settle = {
        let subscription = Arc::clone(&subscription);
        move |resolved: bool| {
            if resolved {
                registration.dispose();
            }
            subscription.dispose();
        }
    };
    let settle = Arc::new(settle);

    let (on_next, on_error, on_completed) = (completion.clone(), completion.clone(), completion);
    let (settle_next, settle_error, settle_completed) =
        (Arc::clone(&settle), Arc::clone(&settle), settle);
    let observer = AnonymousObserver::new(
        move |value| (*settle_next)(on_next.try_set_value(value)),
        move |error| (*settle_error)(on_error.try_set_fault(error)),
        move || (*settle_completed)(on_completed.try_set_fault(ReactiveError::EmptySequence)),
    );

    subscription.set(source.subscribe(observer));
    future
}
