//! Tests for builder modules

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use prometheus_reactive::builders::build_scheduler;
use prometheus_reactive::config::{SchedulerBackendConfig, SchedulerConfig};
use prometheus_reactive::core::{disposable, ReactiveError};

#[test]
fn test_build_immediate_scheduler_runs_inline() {
    let config = SchedulerConfig {
        backend: SchedulerBackendConfig::Immediate,
        ..SchedulerConfig::default()
    };
    let scheduler = build_scheduler(&config).unwrap();

    let ran = Arc::new(AtomicBool::new(false));
    let r = Arc::clone(&ran);
    let _handle = scheduler.schedule(Box::new(move || {
        r.store(true, Ordering::SeqCst);
        disposable::empty()
    }));
    assert!(ran.load(Ordering::SeqCst));
}

#[test]
fn test_build_rejects_invalid_config() {
    let config = SchedulerConfig {
        worker_threads: 0,
        ..SchedulerConfig::default()
    };
    assert!(matches!(
        build_scheduler(&config),
        Err(ReactiveError::InvalidConfig(_))
    ));
}

#[test]
fn test_build_tokio_scheduler_owns_runtime() {
    let config = SchedulerConfig {
        worker_threads: 1,
        ..SchedulerConfig::default()
    };
    let scheduler = build_scheduler(&config).unwrap();

    let (tx, rx) = std::sync::mpsc::channel();
    let _handle = scheduler.schedule(Box::new(move || {
        let _ = tx.send(std::thread::current().name().map(str::to_string));
        disposable::empty()
    }));

    let name = rx.recv_timeout(std::time::Duration::from_secs(5)).unwrap();
    assert_eq!(name.as_deref(), Some("prometheus-reactive"));
}
