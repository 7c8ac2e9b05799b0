//! Push-based stream contract and the handful of primitives the combinators compose.
//!
//! A stream delivers any number of `on_next` calls followed by at most one
//! terminal notification. Streams built with [`create`] enforce that
//! grammar, serialize notifications across threads and stop delivering once
//! their subscription handle is disposed.

use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, ReentrantMutex};

use super::disposable::{self, ActionDisposable, CompositeDisposable, Disposable, Handle};
use super::error::ReactiveError;

/// Receiver of stream notifications.
pub trait Observer<T>: Send + Sync {
    /// A value was produced.
    fn on_next(&self, value: T);
    /// The stream terminated with an error.
    fn on_error(&self, error: ReactiveError);
    /// The stream terminated successfully.
    fn on_completed(&self);
}

/// Shared observer reference.
pub type ObserverRef<T> = Arc<dyn Observer<T>>;

/// A subscribable push sequence.
pub trait Observable<T>: Send + Sync {
    /// Subscribe `observer`; disposing the returned handle stops delivery.
    fn subscribe(&self, observer: ObserverRef<T>) -> Handle;
}

/// Shared stream reference.
pub type Stream<T> = Arc<dyn Observable<T>>;

type NextFn<T> = Box<dyn Fn(T) + Send + Sync>;
type ErrorFn = Box<dyn Fn(ReactiveError) + Send + Sync>;
type CompletedFn = Box<dyn Fn() + Send + Sync>;

/// Observer assembled from three closures.
pub struct AnonymousObserver<T> {
    on_next: NextFn<T>,
    on_error: ErrorFn,
    on_completed: CompletedFn,
}

impl<T: 'static> AnonymousObserver<T> {
    /// Build an observer from closures.
    pub fn new<N, E, C>(on_next: N, on_error: E, on_completed: C) -> ObserverRef<T>
    where
        N: Fn(T) + Send + Sync + 'static,
        E: Fn(ReactiveError) + Send + Sync + 'static,
        C: Fn() + Send + Sync + 'static,
    {
        Arc::new(Self {
            on_next: Box::new(on_next),
            on_error: Box::new(on_error),
            on_completed: Box::new(on_completed),
        })
    }
}

impl<T> Observer<T> for AnonymousObserver<T> {
    fn on_next(&self, value: T) {
        (self.on_next)(value);
    }

    fn on_error(&self, error: ReactiveError) {
        (self.on_error)(error);
    }

    fn on_completed(&self) {
        (self.on_completed)();
    }
}

/// Enforces the notification grammar for one subscription and detaches on disposal.
struct SafeObserver<T> {
    inner: ObserverRef<T>,
    stopped: AtomicBool,
    gate: ReentrantMutex<()>,
}

impl<T> SafeObserver<T> {
    fn new(inner: ObserverRef<T>) -> Self {
        Self {
            inner,
            stopped: AtomicBool::new(false),
            gate: ReentrantMutex::new(()),
        }
    }
}

impl<T> Observer<T> for SafeObserver<T> {
    fn on_next(&self, value: T) {
        let _guard = self.gate.lock();
        if !self.stopped.load(Ordering::Acquire) {
            self.inner.on_next(value);
        }
    }

    fn on_error(&self, error: ReactiveError) {
        let _guard = self.gate.lock();
        if !self.stopped.swap(true, Ordering::AcqRel) {
            self.inner.on_error(error);
        }
    }

    fn on_completed(&self) {
        let _guard = self.gate.lock();
        if !self.stopped.swap(true, Ordering::AcqRel) {
            self.inner.on_completed();
        }
    }
}

impl<T> Disposable for SafeObserver<T> {
    fn dispose(&self) {
        self.stopped.store(true, Ordering::Release);
    }

    fn is_disposed(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }
}

struct AnonymousObservable<T, F> {
    subscribe: F,
    _marker: PhantomData<fn(T)>,
}

impl<T, F> Observable<T> for AnonymousObservable<T, F>
where
    T: Send + 'static,
    F: Fn(ObserverRef<T>) -> Handle + Send + Sync,
{
    fn subscribe(&self, observer: ObserverRef<T>) -> Handle {
        let safe = Arc::new(SafeObserver::new(observer));
        let inner = (self.subscribe)(Arc::clone(&safe) as ObserverRef<T>);
        Arc::new(CompositeDisposable::new(vec![safe as Handle, inner]))
    }
}

/// Build a stream from a subscribe function.
///
/// `subscribe` runs once per subscription and receives a guarded observer.
pub fn create<T, F>(subscribe: F) -> Stream<T>
where
    T: Send + 'static,
    F: Fn(ObserverRef<T>) -> Handle + Send + Sync + 'static,
{
    Arc::new(AnonymousObservable {
        subscribe,
        _marker: PhantomData,
    })
}

/// A stream that completes immediately.
pub fn empty<T: Send + 'static>() -> Stream<T> {
    create(|observer: ObserverRef<T>| {
        observer.on_completed();
        disposable::empty()
    })
}

/// A stream that never notifies.
pub fn never<T: Send + 'static>() -> Stream<T> {
    create(|_observer: ObserverRef<T>| disposable::empty())
}

/// A stream that fails immediately with `error`.
pub fn throw<T: Send + 'static>(error: ReactiveError) -> Stream<T> {
    create(move |observer: ObserverRef<T>| {
        observer.on_error(error.clone());
        disposable::empty()
    })
}

/// A stream that emits `value` once, then completes.
pub fn just<T: Clone + Send + Sync + 'static>(value: T) -> Stream<T> {
    from_iter(vec![value])
}

/// A stream that emits `values` in order, then completes.
pub fn from_iter<T: Clone + Send + Sync + 'static>(values: Vec<T>) -> Stream<T> {
    create(move |observer: ObserverRef<T>| {
        for value in &values {
            observer.on_next(value.clone());
        }
        observer.on_completed();
        disposable::empty()
    })
}

enum Terminal {
    Completed,
    Failed(ReactiveError),
}

struct SubjectState<T> {
    next_id: u64,
    observers: Vec<(u64, ObserverRef<T>)>,
    terminal: Option<Terminal>,
}

/// Hot multicast stream that is also an observer.
///
/// Late subscribers after termination receive the terminal notification only.
pub struct Subject<T> {
    state: Arc<Mutex<SubjectState<T>>>,
}

impl<T: Clone + Send + 'static> Subject<T> {
    /// Create a subject with no observers.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(SubjectState {
                next_id: 0,
                observers: Vec::new(),
                terminal: None,
            })),
        }
    }

    /// Number of currently subscribed observers.
    pub fn observer_count(&self) -> usize {
        self.state.lock().observers.len()
    }

    fn snapshot(&self) -> Vec<ObserverRef<T>> {
        let state = self.state.lock();
        if state.terminal.is_some() {
            return Vec::new();
        }
        state.observers.iter().map(|(_, o)| Arc::clone(o)).collect()
    }

    fn terminate(&self, terminal: Terminal) -> Vec<ObserverRef<T>> {
        let mut state = self.state.lock();
        if state.terminal.is_some() {
            return Vec::new();
        }
        state.terminal = Some(terminal);
        std::mem::take(&mut state.observers)
            .into_iter()
            .map(|(_, o)| o)
            .collect()
    }
}

impl<T: Clone + Send + 'static> Default for Subject<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + Send + 'static> Observer<T> for Subject<T> {
    fn on_next(&self, value: T) {
        for observer in self.snapshot() {
            observer.on_next(value.clone());
        }
    }

    fn on_error(&self, error: ReactiveError) {
        for observer in self.terminate(Terminal::Failed(error.clone())) {
            observer.on_error(error.clone());
        }
    }

    fn on_completed(&self) {
        for observer in self.terminate(Terminal::Completed) {
            observer.on_completed();
        }
    }
}

impl<T: Clone + Send + 'static> Observable<T> for Subject<T> {
    fn subscribe(&self, observer: ObserverRef<T>) -> Handle {
        let mut state = self.state.lock();
        let replay = match &state.terminal {
            Some(Terminal::Completed) => Some(None),
            Some(Terminal::Failed(error)) => Some(Some(error.clone())),
            None => None,
        };
        if let Some(failure) = replay {
            drop(state);
            match failure {
                Some(error) => observer.on_error(error),
                None => observer.on_completed(),
            }
            return disposable::empty();
        }

        let id = state.next_id;
        state.next_id += 1;
        state.observers.push((id, observer));
        drop(state);

        let weak: Weak<Mutex<SubjectState<T>>> = Arc::downgrade(&self.state);
        Arc::new(ActionDisposable::new(move || {
            if let Some(state) = weak.upgrade() {
                state.lock().observers.retain(|(entry, _)| *entry != id);
            }
        }))
    }
}
