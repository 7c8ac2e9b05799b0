//! Tests for configuration validation

use std::collections::HashMap;

use prometheus_reactive::config::scheduler::{
    ENV_BACKEND, ENV_FAULT_POLICY, ENV_THREAD_NAME, ENV_WORKER_THREADS,
};
use prometheus_reactive::config::{FaultPolicy, SchedulerBackendConfig, SchedulerConfig};

fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect();
    move |key| map.get(key).cloned()
}

#[test]
fn test_default_config_is_valid() {
    let config = SchedulerConfig::default();
    assert!(config.validate().is_ok());
    assert_eq!(config.backend, SchedulerBackendConfig::Tokio);
    assert_eq!(config.fault_policy, FaultPolicy::Log);
    assert!(config.worker_threads > 0);
}

#[test]
fn test_zero_worker_threads_invalid() {
    let invalid = SchedulerConfig {
        worker_threads: 0,
        ..SchedulerConfig::default()
    };
    assert!(invalid.validate().is_err());
}

#[test]
fn test_zero_worker_threads_fine_for_immediate() {
    let config = SchedulerConfig {
        backend: SchedulerBackendConfig::Immediate,
        worker_threads: 0,
        ..SchedulerConfig::default()
    };
    assert!(config.validate().is_ok());
}

#[test]
fn test_blank_thread_name_invalid() {
    let invalid = SchedulerConfig {
        thread_name: "  ".to_string(),
        ..SchedulerConfig::default()
    };
    assert!(invalid.validate().is_err());
}

#[test]
fn test_scheduler_config_from_json() {
    let json = r#"{
        "backend": "immediate",
        "fault_policy": "panic"
    }"#;

    let config = SchedulerConfig::from_json_str(json).unwrap();
    assert_eq!(config.backend, SchedulerBackendConfig::Immediate);
    assert_eq!(config.fault_policy, FaultPolicy::Panic);
    assert_eq!(config.thread_name, "prometheus-reactive");
}

#[test]
fn test_scheduler_config_from_json_rejects_unknown_backend() {
    let json = r#"{ "backend": "gpu" }"#;
    assert!(SchedulerConfig::from_json_str(json).is_err());
}

#[test]
fn test_config_from_lookup() {
    let config = SchedulerConfig::from_lookup(lookup(&[
        (ENV_BACKEND, "Tokio"),
        (ENV_WORKER_THREADS, "3"),
        (ENV_THREAD_NAME, "reactive-worker"),
        (ENV_FAULT_POLICY, "panic"),
    ]))
    .unwrap();

    assert_eq!(config.backend, SchedulerBackendConfig::Tokio);
    assert_eq!(config.worker_threads, 3);
    assert_eq!(config.thread_name, "reactive-worker");
    assert_eq!(config.fault_policy, FaultPolicy::Panic);
}

#[test]
fn test_config_from_lookup_rejects_bad_values() {
    assert!(SchedulerConfig::from_lookup(lookup(&[(ENV_WORKER_THREADS, "many")])).is_err());
    assert!(SchedulerConfig::from_lookup(lookup(&[(ENV_FAULT_POLICY, "ignore")])).is_err());
    assert!(SchedulerConfig::from_lookup(lookup(&[(ENV_WORKER_THREADS, "0")])).is_err());
}
