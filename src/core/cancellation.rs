//! Cooperative cancellation signal threaded through asynchronous boundaries.
//!
//! A [`CancellationToken`] is cancelled at most once. Callbacks registered on
//! it run exactly once, either when the token is cancelled or immediately on
//! registration if it already was. Async code can instead await
//! [`CancellationToken::cancelled`].

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::Notify;

use super::disposable::Disposable;

type Callback = Box<dyn FnOnce() + Send + 'static>;

struct Callbacks {
    next_id: u64,
    entries: Vec<(u64, Callback)>,
}

struct TokenState {
    cancelled: AtomicBool,
    callbacks: Mutex<Callbacks>,
    notify: Notify,
}

/// Cancellation signal shared by cloning.
///
/// [`CancellationToken::none`] yields a token that can never be cancelled;
/// registering on it is a no-op.
#[derive(Clone)]
pub struct CancellationToken {
    state: Option<Arc<TokenState>>,
}

impl CancellationToken {
    /// Create a new, cancelable token.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Some(Arc::new(TokenState {
                cancelled: AtomicBool::new(false),
                callbacks: Mutex::new(Callbacks {
                    next_id: 0,
                    entries: Vec::new(),
                }),
                notify: Notify::new(),
            })),
        }
    }

    /// A token that can never be cancelled.
    #[must_use]
    pub const fn none() -> Self {
        Self { state: None }
    }

    /// Whether this token can ever transition to cancelled.
    #[must_use]
    pub const fn can_be_canceled(&self) -> bool {
        self.state.is_some()
    }

    /// Whether cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.state
            .as_ref()
            .is_some_and(|s| s.cancelled.load(Ordering::Acquire))
    }

    /// Request cancellation. Only the first call runs the registered callbacks.
    pub fn cancel(&self) {
        let Some(state) = &self.state else {
            return;
        };

        let entries = {
            let mut callbacks = state.callbacks.lock();
            if state.cancelled.swap(true, Ordering::AcqRel) {
                return;
            }
            std::mem::take(&mut callbacks.entries)
        };

        state.notify.notify_waiters();

        // Callbacks run outside the lock; they commonly dispose handles that
        // re-enter other tokens.
        for (_, callback) in entries {
            callback();
        }
    }

    /// Register a callback to run on cancellation.
    ///
    /// If the token is already cancelled the callback runs synchronously
    /// before this returns. Disposing the returned registration unregisters
    /// a callback that has not run yet.
    pub fn register<F>(&self, callback: F) -> CancellationRegistration
    where
        F: FnOnce() + Send + 'static,
    {
        let Some(state) = &self.state else {
            return CancellationRegistration { target: None };
        };

        let mut callbacks = state.callbacks.lock();
        if state.cancelled.load(Ordering::Acquire) {
            drop(callbacks);
            callback();
            return CancellationRegistration { target: None };
        }

        let id = callbacks.next_id;
        callbacks.next_id += 1;
        callbacks.entries.push((id, Box::new(callback)));

        CancellationRegistration {
            target: Some((Arc::downgrade(state), id)),
        }
    }

    /// Wait until the token is cancelled. Never resolves for [`CancellationToken::none`].
    pub async fn cancelled(&self) {
        let Some(state) = &self.state else {
            return std::future::pending().await;
        };
        let notified = state.notify.notified();
        if state.cancelled.load(Ordering::Acquire) {
            return;
        }
        notified.await;
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CancellationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancellationToken")
            .field("can_be_canceled", &self.can_be_canceled())
            .field("is_cancelled", &self.is_cancelled())
            .finish()
    }
}

/// Handle to a callback registered with [`CancellationToken::register`].
pub struct CancellationRegistration {
    target: Option<(std::sync::Weak<TokenState>, u64)>,
}

impl CancellationRegistration {
    /// Unregister the callback if it has not run yet.
    pub fn unregister(&self) {
        let Some((weak, id)) = &self.target else {
            return;
        };
        if let Some(state) = weak.upgrade() {
            let mut callbacks = state.callbacks.lock();
            callbacks.entries.retain(|(entry_id, _)| entry_id != id);
        }
    }
}

impl Disposable for CancellationRegistration {
    fn dispose(&self) {
        self.unregister();
    }

    fn is_disposed(&self) -> bool {
        match &self.target {
            None => true,
            Some((weak, id)) => weak
                .upgrade()
                .is_none_or(|state| !state.callbacks.lock().entries.iter().any(|(e, _)| e == id)),
        }
    }
}
