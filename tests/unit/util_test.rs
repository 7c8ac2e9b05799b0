//! Tests for utility functions

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use prometheus_reactive::util::{init_tracing_with_default, until};

#[test]
fn test_until_future_and_past() {
    let now = SystemTime::now();
    assert_eq!(until(now, now + Duration::from_millis(250)), Duration::from_millis(250));
    assert_eq!(until(now, UNIX_EPOCH), Duration::ZERO);
}

#[test]
fn test_init_tracing_is_idempotent() {
    init_tracing_with_default("prometheus_reactive=debug");
    init_tracing_with_default("prometheus_reactive=trace");
    tracing::debug!("tracing initialized twice without panicking");
}
