//! Randomized interleavings of triggers and inner completions for the
//! skip-while-busy combinator, checked against a sequential model.

use std::sync::Arc;

use parking_lot::Mutex;
use prometheus_reactive::core::observable::create;
use prometheus_reactive::core::{
    ActionDisposable, Handle, Observer, ObserverRef, Stream, StreamExt, Subject,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[derive(Default)]
struct Probe {
    started: Vec<u32>,
    running: Vec<(u32, ObserverRef<u32>)>,
    max_running: usize,
}

/// Sequential reference for the admission rules.
struct Model {
    include_pending: bool,
    busy: bool,
    pending: Option<u32>,
    started: Vec<u32>,
}

impl Model {
    fn trigger(&mut self, value: u32) {
        if !self.busy {
            self.busy = true;
            self.started.push(value);
        } else if self.include_pending {
            self.pending = Some(value);
        }
    }

    fn complete(&mut self) {
        match self.pending.take() {
            Some(next) => self.started.push(next),
            None => self.busy = false,
        }
    }
}

fn run_scenario(seed: u64, include_pending: bool) {
    let mut rng = StdRng::seed_from_u64(seed);
    let probe = Arc::new(Mutex::new(Probe::default()));
    let subject: Arc<Subject<u32>> = Arc::new(Subject::new());
    let source = Arc::clone(&subject) as Stream<u32>;

    let p = Arc::clone(&probe);
    let combined = source.skip_while_select_many(
        move |value: u32| {
            let p = Arc::clone(&p);
            create(move |observer: ObserverRef<u32>| {
                {
                    let mut probe = p.lock();
                    probe.started.push(value);
                    probe.running.push((value, observer));
                    probe.max_running = probe.max_running.max(probe.running.len());
                }
                let p = Arc::clone(&p);
                Arc::new(ActionDisposable::new(move || {
                    p.lock().running.retain(|(v, _)| *v != value);
                })) as Handle
            })
        },
        include_pending,
    );

    let completed = Arc::new(Mutex::new(false));
    let done = Arc::clone(&completed);
    let sub = combined.subscribe_with(|_| {}, |_| {}, move || *done.lock() = true);

    let mut model = Model {
        include_pending,
        busy: false,
        pending: None,
        started: Vec::new(),
    };
    let mut next_trigger = 0_u32;

    for _ in 0..200 {
        if rng.random_bool(0.6) {
            subject.on_next(next_trigger);
            model.trigger(next_trigger);
            next_trigger += 1;
        } else {
            let running = probe.lock().running.first().map(|(_, o)| Arc::clone(o));
            if let Some(observer) = running {
                probe.lock().running.remove(0);
                observer.on_completed();
                model.complete();
            }
        }
        assert!(probe.lock().max_running <= 1, "seed {seed}: two inners active");
    }

    assert_eq!(probe.lock().started, model.started, "seed {seed}");

    subject.on_completed();
    loop {
        let next = {
            let mut guard = probe.lock();
            if guard.running.is_empty() {
                None
            } else {
                Some(guard.running.remove(0))
            }
        };
        let Some((_, observer)) = next else {
            break;
        };
        assert!(!*completed.lock(), "seed {seed}: completed while busy");
        observer.on_completed();
        model.complete();
    }
    assert!(*completed.lock(), "seed {seed}: never completed");
    assert_eq!(probe.lock().started, model.started, "seed {seed}");

    sub.dispose();
}

#[test]
fn test_random_interleavings_with_pending() {
    for seed in 0..64 {
        run_scenario(seed, true);
    }
}

#[test]
fn test_random_interleavings_without_pending() {
    for seed in 0..64 {
        run_scenario(seed, false);
    }
}
