//! Tests for resource handles

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use prometheus_reactive::core::{
    ActionDisposable, CancellationDisposable, CompositeDisposable, Disposable, Handle,
    SerialDisposable,
};

fn counting() -> (Handle, Arc<AtomicUsize>) {
    let count = Arc::new(AtomicUsize::new(0));
    let c = Arc::clone(&count);
    let handle: Handle = Arc::new(ActionDisposable::new(move || {
        c.fetch_add(1, Ordering::SeqCst);
    }));
    (handle, count)
}

#[test]
fn test_concurrent_dispose_releases_once() {
    let (handle, count) = counting();
    let composite: Handle = Arc::new(CompositeDisposable::new(vec![handle]));

    let threads: Vec<_> = (0..8)
        .map(|_| {
            let composite = Arc::clone(&composite);
            thread::spawn(move || composite.dispose())
        })
        .collect();
    for t in threads {
        t.join().unwrap();
    }

    assert_eq!(count.load(Ordering::SeqCst), 1);
}

#[test]
fn test_concurrent_serial_replace_keeps_single_occupant() {
    let serial = Arc::new(SerialDisposable::new());
    let counts: Vec<Arc<AtomicUsize>> = (0..64).map(|_| Arc::new(AtomicUsize::new(0))).collect();

    let threads: Vec<_> = counts
        .chunks(16)
        .map(|chunk| {
            let serial = Arc::clone(&serial);
            let chunk: Vec<_> = chunk.to_vec();
            thread::spawn(move || {
                for count in chunk {
                    let c = Arc::clone(&count);
                    serial.replace(Some(Arc::new(ActionDisposable::new(move || {
                        c.fetch_add(1, Ordering::SeqCst);
                    }))));
                }
            })
        })
        .collect();
    for t in threads {
        t.join().unwrap();
    }

    let released: usize = counts.iter().map(|c| c.load(Ordering::SeqCst)).sum();
    assert_eq!(released, 63);
    assert!(serial.is_occupied());

    serial.dispose();
    let released: usize = counts.iter().map(|c| c.load(Ordering::SeqCst)).sum();
    assert_eq!(released, 64);
    assert!(counts.iter().all(|c| c.load(Ordering::SeqCst) <= 1));
}

#[test]
fn test_cancellation_disposable_through_composite() {
    let cancellation = Arc::new(CancellationDisposable::new());
    let token = cancellation.token();
    let composite = CompositeDisposable::new(vec![cancellation as Handle]);

    composite.dispose();
    assert!(token.is_cancelled());
}
