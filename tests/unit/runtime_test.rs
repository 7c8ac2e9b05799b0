//! Tests for scheduler backends

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, UNIX_EPOCH};

use prometheus_reactive::core::{disposable, Scheduler, SchedulerRef};
use prometheus_reactive::runtime::{ImmediateScheduler, TokioScheduler, VirtualTimeScheduler};

fn counter_work(counter: &Arc<AtomicUsize>) -> prometheus_reactive::core::Work {
    let counter = Arc::clone(counter);
    Box::new(move || {
        counter.fetch_add(1, Ordering::SeqCst);
        disposable::empty()
    })
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_tokio_scheduler_spawn() {
    let scheduler: SchedulerRef = Arc::new(TokioScheduler::current().unwrap());

    let (tx, rx) = tokio::sync::oneshot::channel();
    scheduler.schedule(Box::new(move || {
        tx.send(123).unwrap();
        disposable::empty()
    }));

    let result = rx.await.expect("oneshot result");
    assert_eq!(result, 123);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_tokio_scheduler_absolute_due_time() {
    let scheduler: SchedulerRef = Arc::new(TokioScheduler::current().unwrap());
    let (tx, rx) = tokio::sync::oneshot::channel();
    let due = scheduler.now() + Duration::from_millis(20);

    scheduler.schedule_at(
        due,
        Box::new(move || {
            let _ = tx.send(std::time::SystemTime::now());
            disposable::empty()
        }),
    );

    let ran_at = rx.await.unwrap();
    assert!(ran_at + Duration::from_millis(5) >= due);
}

#[test]
fn test_tokio_scheduler_outside_runtime_fails() {
    assert!(TokioScheduler::current().is_err());
}

#[test]
fn test_immediate_scheduler_past_due_runs_now() {
    let counter = Arc::new(AtomicUsize::new(0));
    let scheduler = ImmediateScheduler::shared();
    scheduler.schedule_at(UNIX_EPOCH, counter_work(&counter));
    assert_eq!(counter.load(Ordering::SeqCst), 1);
}

#[test]
fn test_virtual_time_holds_work_until_advanced() {
    let counter = Arc::new(AtomicUsize::new(0));
    let scheduler = VirtualTimeScheduler::new();

    scheduler.schedule_after(Duration::from_secs(1), counter_work(&counter));
    let cancelled = scheduler.schedule_after(Duration::from_secs(1), counter_work(&counter));
    cancelled.dispose();
    assert_eq!(scheduler.pending(), 2);

    scheduler.advance_by(Duration::from_millis(999));
    assert_eq!(counter.load(Ordering::SeqCst), 0);

    scheduler.advance_by(Duration::from_millis(1));
    assert_eq!(counter.load(Ordering::SeqCst), 1);
    assert_eq!(scheduler.pending(), 0);
}
