//! Recording observer shared by unit tests.

use std::sync::Arc;

use parking_lot::Mutex;

use super::observable::{AnonymousObserver, ObserverRef};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Event<T> {
    Next(T),
    Error(String),
    Completed,
}

#[derive(Clone)]
pub(crate) struct Recorder<T> {
    events: Arc<Mutex<Vec<Event<T>>>>,
}

impl<T: Clone + Send + 'static> Recorder<T> {
    pub(crate) fn new() -> Self {
        Self {
            events: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub(crate) fn observer(&self) -> ObserverRef<T> {
        let (n, e, c) = (
            Arc::clone(&self.events),
            Arc::clone(&self.events),
            Arc::clone(&self.events),
        );
        AnonymousObserver::new(
            move |v| n.lock().push(Event::Next(v)),
            move |err| e.lock().push(Event::Error(err.to_string())),
            move || c.lock().push(Event::Completed),
        )
    }

    pub(crate) fn events(&self) -> Vec<Event<T>> {
        self.events.lock().clone()
    }

    pub(crate) fn values(&self) -> Vec<T> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                Event::Next(v) => Some(v.clone()),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn is_completed(&self) -> bool {
        self.events.lock().iter().any(|e| matches!(e, Event::Completed))
    }
}
