//! Core abstractions: resource handles, cancellation, streams, schedulers and
//! the combinators that bridge streams with async work.

pub mod cancellation;
pub mod completion;
pub mod disposable;
pub mod dispose_previous;
pub mod error;
pub mod first_value;
pub mod from_async;
pub mod observable;
pub mod operators;
pub mod scheduler;
pub mod skip_while_busy;
pub mod task_runner;

#[cfg(test)]
pub(crate) mod test_support;

pub use cancellation::{CancellationRegistration, CancellationToken};
pub use completion::{Completion, CompletionFuture};
pub use disposable::{
    ActionDisposable, BooleanDisposable, CancellationDisposable, CompositeDisposable, Disposable,
    Handle, SerialDisposable, SingleAssignmentDisposable,
};
pub use dispose_previous::select_many_dispose_previous;
pub use error::{Outcome, ReactiveError};
pub use first_value::first_value;
pub use from_async::from_async;
pub use observable::{create, AnonymousObserver, Observable, Observer, ObserverRef, Stream, Subject};
pub use operators::{StreamExt, TriggerHandler};
pub use scheduler::{spawn_on, Due, Scheduler, SchedulerRef, Work};
pub use skip_while_busy::skip_while_select_many;
pub use task_runner::SchedulerExt;
