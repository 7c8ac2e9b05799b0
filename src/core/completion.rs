//! Single-resolution completion source and its awaitable side.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use parking_lot::Mutex;
use tokio::sync::oneshot;

use super::cancellation::CancellationToken;
use super::disposable::{self, Handle};
use super::error::{Outcome, ReactiveError};

/// Write side of a single-resolution future.
///
/// Clones share the same target; the first `try_*` call wins and every
/// later attempt returns `false` without effect.
pub struct Completion<T> {
    sender: Arc<Mutex<Option<oneshot::Sender<Outcome<T>>>>>,
}

impl<T> Clone for Completion<T> {
    fn clone(&self) -> Self {
        Self {
            sender: Arc::clone(&self.sender),
        }
    }
}

impl<T> Completion<T> {
    /// Create an unresolved completion and the future observing it.
    #[must_use]
    pub fn new() -> (Self, CompletionFuture<T>) {
        let (tx, rx) = oneshot::channel();
        (
            Self {
                sender: Arc::new(Mutex::new(Some(tx))),
            },
            CompletionFuture { receiver: rx },
        )
    }

    /// Resolve with `outcome` unless already resolved.
    pub fn try_resolve(&self, outcome: Outcome<T>) -> bool {
        let sender = self.sender.lock().take();
        match sender {
            Some(tx) => {
                // A dropped receiver still counts as resolution.
                let _ = tx.send(outcome);
                true
            }
            None => false,
        }
    }

    /// Resolve with a value.
    pub fn try_set_value(&self, value: T) -> bool {
        self.try_resolve(Outcome::Value(value))
    }

    /// Resolve with a fault.
    pub fn try_set_fault(&self, fault: ReactiveError) -> bool {
        self.try_resolve(Outcome::Fault(fault))
    }

    /// Resolve as canceled.
    pub fn try_set_canceled(&self) -> bool {
        self.try_resolve(Outcome::Canceled)
    }

    /// Whether some writer has already resolved this completion.
    pub fn is_resolved(&self) -> bool {
        self.sender.lock().is_none()
    }
}

impl<T: Send + 'static> Completion<T> {
    /// Resolve as canceled and dispose `in_flight` when `token` is cancelled.
    ///
    /// Returns the registration so the caller can release it once the
    /// completion resolves by some other route; tokens that can never be
    /// cancelled yield an inert handle.
    pub fn cancel_with(&self, token: &CancellationToken, in_flight: Handle) -> Handle {
        if !token.can_be_canceled() {
            return disposable::empty();
        }
        let completion = self.clone();
        Arc::new(token.register(move || {
            completion.try_set_canceled();
            in_flight.dispose();
        }))
    }
}

/// Awaitable side of a [`Completion`].
///
/// Resolves to [`Outcome::Fault`] with [`ReactiveError::Abandoned`] if every
/// writer is dropped without resolving.
#[must_use = "futures do nothing unless awaited"]
pub struct CompletionFuture<T> {
    receiver: oneshot::Receiver<Outcome<T>>,
}

impl<T> CompletionFuture<T> {
    /// Block the current thread until resolution.
    ///
    /// Must not be called from within an async runtime thread.
    pub fn blocking_wait(self) -> Outcome<T> {
        self.receiver
            .blocking_recv()
            .unwrap_or(Outcome::Fault(ReactiveError::Abandoned))
    }

    /// Return the outcome if already resolved, without waiting.
    pub fn try_outcome(&mut self) -> Option<Outcome<T>> {
        match self.receiver.try_recv() {
            Ok(outcome) => Some(outcome),
            Err(oneshot::error::TryRecvError::Empty) => None,
            Err(oneshot::error::TryRecvError::Closed) => {
                Some(Outcome::Fault(ReactiveError::Abandoned))
            }
        }
    }
}

impl<T> Future for CompletionFuture<T> {
    type Output = Outcome<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.receiver)
            .poll(cx)
            .map(|received| received.unwrap_or(Outcome::Fault(ReactiveError::Abandoned)))
    }
}
