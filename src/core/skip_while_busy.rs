//! Skip-while-busy flattening: at most one inner stream runs at a time.
//!
//! Triggers that arrive while an inner stream is running are either dropped
//! or, with `include_pending`, kept as a single pending trigger that starts as
//! soon as the running inner stream completes. Only the most recent pending
//! trigger survives; superseded ones are discarded silently.
//!
//! Admission is a plain state machine whose transitions return the effect
//! to perform. Transitions run under the gate; effects run after it is
//! released.

use std::sync::Arc;

use parking_lot::Mutex;

use super::disposable::{CompositeDisposable, Disposable, Handle, SerialDisposable};
use super::error::ReactiveError;
use super::observable::{create, AnonymousObserver, ObserverRef, Stream};

/// Admission state.
#[derive(Debug)]
pub(crate) enum Admission<S> {
    /// No inner stream is running.
    Idle,
    /// An inner stream is running.
    Busy,
    /// An inner stream is running and `S` will start after it.
    BusyWithPending(S),
}

/// Effect of a trigger arrival.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum TriggerEffect<S> {
    /// Start an inner stream for the trigger under the given generation.
    Start(S, u64),
    /// The trigger was discarded.
    Dropped,
    /// The trigger became the pending trigger.
    Recorded,
    /// The trigger replaced an earlier pending trigger.
    Superseded,
}

/// Effect of an inner stream completing.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum InnerEffect<S> {
    /// The completion belongs to an inner stream that is no longer current.
    Stale,
    /// Start the pending trigger under the given generation.
    Start(S, u64),
    /// Nothing left to run; `true` when the combined stream must complete.
    Idle(bool),
}

/// Per-subscription state machine, mutated only under the gate.
#[derive(Debug)]
pub(crate) struct SkipWhileBusy<S> {
    admission: Admission<S>,
    include_pending: bool,
    generation: u64,
    source_completed: bool,
    terminated: bool,
}

impl<S> SkipWhileBusy<S> {
    pub(crate) fn new(include_pending: bool) -> Self {
        Self {
            admission: Admission::Idle,
            include_pending,
            generation: 0,
            source_completed: false,
            terminated: false,
        }
    }

    fn start(&mut self, trigger: S) -> (S, u64) {
        self.admission = Admission::Busy;
        self.generation += 1;
        (trigger, self.generation)
    }

    pub(crate) fn on_trigger(&mut self, trigger: S) -> TriggerEffect<S> {
        if self.terminated {
            return TriggerEffect::Dropped;
        }
        match std::mem::replace(&mut self.admission, Admission::Idle) {
            Admission::Idle => {
                let (trigger, generation) = self.start(trigger);
                TriggerEffect::Start(trigger, generation)
            }
            busy if !self.include_pending => {
                self.admission = busy;
                TriggerEffect::Dropped
            }
            Admission::Busy => {
                self.admission = Admission::BusyWithPending(trigger);
                TriggerEffect::Recorded
            }
            Admission::BusyWithPending(_) => {
                self.admission = Admission::BusyWithPending(trigger);
                TriggerEffect::Superseded
            }
        }
    }

    pub(crate) fn on_inner_completed(&mut self, generation: u64) -> InnerEffect<S> {
        if generation != self.generation || matches!(self.admission, Admission::Idle) {
            return InnerEffect::Stale;
        }
        match std::mem::replace(&mut self.admission, Admission::Idle) {
            Admission::BusyWithPending(pending) if !self.terminated => {
                let (trigger, generation) = self.start(pending);
                InnerEffect::Start(trigger, generation)
            }
            _ => InnerEffect::Idle(self.finish_if_drained()),
        }
    }

    pub(crate) fn on_source_completed(&mut self) -> bool {
        self.source_completed = true;
        self.finish_if_drained()
    }

    pub(crate) fn on_error(&mut self) -> bool {
        !std::mem::replace(&mut self.terminated, true)
    }

    pub(crate) fn is_current(&self, generation: u64) -> bool {
        !self.terminated
            && generation == self.generation
            && !matches!(self.admission, Admission::Idle)
    }

    pub(crate) fn is_idle(&self) -> bool {
        matches!(self.admission, Admission::Idle)
    }

    fn finish_if_drained(&mut self) -> bool {
        if self.terminated || !self.source_completed || !self.is_idle() {
            return false;
        }
        self.terminated = true;
        true
    }
}

struct Shared<S, R> {
    gate: Mutex<SkipWhileBusy<S>>,
    inner: Arc<SerialDisposable>,
    observer: ObserverRef<R>,
    selector: Arc<dyn Fn(S) -> Stream<R> + Send + Sync>,
}

impl<S: Send + 'static, R: Send + 'static> Shared<S, R> {
    fn on_trigger(self: &Arc<Self>, trigger: S) {
        let effect = self.gate.lock().on_trigger(trigger);
        match effect {
            TriggerEffect::Start(trigger, generation) => self.start(trigger, generation),
            TriggerEffect::Dropped => tracing::trace!("trigger dropped while busy"),
            TriggerEffect::Recorded => tracing::trace!("trigger recorded as pending"),
            TriggerEffect::Superseded => tracing::trace!("pending trigger superseded"),
        }
    }

    fn start(self: &Arc<Self>, trigger: S, generation: u64) {
        tracing::trace!(generation, "starting inner stream");
        let projected = (self.selector)(trigger);
        let subscription = projected.subscribe(self.inner_observer(generation));

        // The inner stream may already have completed and handed over to the
        // pending trigger, possibly on another thread. Only the current
        // generation may take the slot, decided under the gate.
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
            move |value| on_next.observer.on_next(value),
            move |error| on_error.fail(error),
            move || on_completed.on_inner_completed(generation),
        )
    }

    fn on_inner_completed(self: &Arc<Self>, generation: u64) {
        let effect = self.gate.lock().on_inner_completed(generation);
        match effect {
            InnerEffect::Start(trigger, next) => self.start(trigger, next),
            InnerEffect::Idle(true) => self.observer.on_completed(),
            InnerEffect::Idle(false) | InnerEffect::Stale => {}
        }
    }

    fn on_source_completed(&self) {
        let complete = self.gate.lock().on_source_completed();
        if complete {
            self.observer.on_completed();
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

/// Project triggers to inner streams, running at most one at a time.
///
/// With `include_pending` set, the latest trigger that arrived while busy
/// starts once the running inner stream completes; otherwise such triggers
/// are dropped. The combined stream completes when the source has completed
/// and no inner stream is running or pending.
pub fn skip_while_select_many<S, R, F>(
    source: &Stream<S>,
    selector: F,
    include_pending: bool,
) -> Stream<R>
where
    S: Send + 'static,
    R: Send + 'static,
    F: Fn(S) -> Stream<R> + Send + Sync + 'static,
{
    let source = Arc::clone(source);
    let selector: Arc<dyn Fn(S) -> Stream<R> + Send + Sync> = Arc::new(selector);
    create(move |observer: ObserverRef<R>| {
        let shared = Arc::new(Shared {
            gate: Mutex::new(SkipWhileBusy::new(include_pending)),
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
