//! Dispose-previous flattening: each trigger replaces the running inner stream.
//!
//! A new trigger disposes the current inner subscription before the next one
//! is created, so at most one inner stream is ever live. The combined stream
//! completes once the source has completed and no inner stream is active;
//! both completion paths are reconciled under one gate.

use std::sync::Arc;

use parking_lot::{Mutex, ReentrantMutex};

use super::disposable::{CompositeDisposable, Disposable, Handle, SerialDisposable};
use super::error::ReactiveError;
use super::observable::{create, AnonymousObserver, ObserverRef, Stream};

/// Per-subscription bookkeeping, mutated only under the gate.
#[derive(Debug, Default)]
pub(crate) struct DisposePreviousState {
    active: Option<u64>,
    generation: u64,
    source_completed: bool,
    terminated: bool,
}

impl DisposePreviousState {
    /// Admit a trigger. Returns the generation for its inner stream, or
    /// `None` once the combined stream has terminated.
    pub(crate) fn on_trigger(&mut self) -> Option<u64> {
        if self.terminated {
            return None;
        }
        self.generation += 1;
        self.active = Some(self.generation);
        Some(self.generation)
    }

    /// Whether `generation` is still the live inner stream.
    pub(crate) fn is_current(&self, generation: u64) -> bool {
        !self.terminated && self.active == Some(generation)
    }

    /// An inner stream completed. Returns `true` when the combined stream
    /// must complete now.
    pub(crate) fn on_inner_completed(&mut self, generation: u64) -> bool {
        if self.active != Some(generation) {
            return false;
        }
        self.active = None;
        self.finish_if_drained()
    }

    /// The source completed. Returns `true` when the combined stream must
    /// complete now.
    pub(crate) fn on_source_completed(&mut self) -> bool {
        self.source_completed = true;
        self.finish_if_drained()
    }

    /// A terminal error arrived. Returns `true` if it is the first terminal.
    pub(crate) fn on_error(&mut self) -> bool {
        !std::mem::replace(&mut self.terminated, true)
    }

    /// An inner stream failed. Only the live inner stream may terminate the
    /// combined stream.
    pub(crate) fn on_inner_error(&mut self, generation: u64) -> bool {
        self.is_current(generation) && self.on_error()
    }

    fn finish_if_drained(&mut self) -> bool {
        if self.terminated || !self.source_completed || self.active.is_some() {
            return false;
        }
        self.terminated = true;
        true
    }
}

struct Shared<S, R> {
    gate: Mutex<DisposePreviousState>,
    // Serializes admission of a trigger against delivery of inner values.
    delivery: ReentrantMutex<()>,
    inner: Arc<SerialDisposable>,
    observer: ObserverRef<R>,
    selector: Arc<dyn Fn(S) -> Stream<R> + Send + Sync>,
}

impl<S: Send + 'static, R: Send + 'static> Shared<S, R> {
    fn on_trigger(self: &Arc<Self>, trigger: S) {
        let (generation, previous) = {
            let _delivery = self.delivery.lock();
            let mut gate = self.gate.lock();
            let Some(generation) = gate.on_trigger() else {
                return;
            };
            (generation, self.inner.swap(None))
        };
        // The previous inner is gone before the next one subscribes.
        if let Some(previous) = previous {
            previous.dispose();
        }

        let projected = (self.selector)(trigger);
        let subscription = projected.subscribe(self.inner_observer(generation));

        let displaced = {
            let gate = self.gate.lock();
            if gate.is_current(generation) {
                self.inner.swap(Some(subscription))
            } else {
                Some(subscription)
            }
        };
        if let Some(displaced) = displaced {
            displaced.dispose();
        }
    }

    fn inner_observer(self: &Arc<Self>, generation: u64) -> ObserverRef<R> {
        let (on_next, on_error, on_completed) =
            (Arc::clone(self), Arc::clone(self), Arc::clone(self));
        AnonymousObserver::new(
            move |value| {
                let _delivery = on_next.delivery.lock();
                let current = on_next.gate.lock().is_current(generation);
                if current {
                    on_next.observer.on_next(value);
                }
            },
            move |error| {
                let _delivery = on_error.delivery.lock();
                let first = on_error.gate.lock().on_inner_error(generation);
                if first {
                    on_error.observer.on_error(error);
                    on_error.inner.dispose();
                } else {
                    tracing::trace!(generation, "error from replaced inner stream ignored");
                }
            },
            move || {
                let complete = on_completed.gate.lock().on_inner_completed(generation);
                if complete {
                    tracing::debug!("inner stream drained after source completion");
                    on_completed.observer.on_completed();
                }
            },
        )
    }

    fn on_source_completed(&self) {
        let complete = self.gate.lock().on_source_completed();
        if complete {
            self.observer.on_completed();
        } else {
            tracing::trace!("source completed; waiting for active inner stream");
        }
    }

    fn fail(&self, error: ReactiveError) {
        let first = self.gate.lock().on_error();
        if first {
            self.observer.on_error(error);
            self.inner.dispose();
        }
    }
}

/// Project each trigger to an inner stream, disposing the previous inner
/// subscription before subscribing to the next.
///
/// Values from a replaced inner stream never reach the combined stream once
/// the replacement has been admitted. Errors from the source or the active
/// inner stream terminate the combined stream.
pub fn select_many_dispose_previous<S, R, F>(source: &Stream<S>, selector: F) -> Stream<R>
where
    S: Send + 'static,
    R: Send + 'static,
    F: Fn(S) -> Stream<R> + Send + Sync + 'static,
{
    let source = Arc::clone(source);
    let selector: Arc<dyn Fn(S) -> Stream<R> + Send + Sync> = Arc::new(selector);
    create(move |observer: ObserverRef<R>| {
        let shared = Arc::new(Shared {
            gate: Mutex::new(DisposePreviousState::default()),
            delivery: ReentrantMutex::new(()),
            inner: Arc::new(SerialDisposable::new()),
            observer,
            selector: Arc::clone(&selector),
        });

        let (on_next, on_error, on_completed) =
            (Arc::clone(&shared), Arc::clone(&shared), Arc::clone(&shared));
        let upstream = source.subscribe(AnonymousObserver::new(
            move |trigger| on_next.on_trigger(trigger),
            move |error| on_error.fail(error),
            move || on_completed.on_source_completed(),
        ));

        let inner: Handle = Arc::clone(&shared.inner) as Handle;
        Arc::new(CompositeDisposable::new(vec![upstream, inner]))
    })
}
