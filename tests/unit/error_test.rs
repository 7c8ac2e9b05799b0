//! Tests for error types

use prometheus_reactive::core::{Outcome, ReactiveError};

#[test]
fn test_canceled_error() {
    let err = ReactiveError::Canceled;
    assert_eq!(format!("{}", err), "operation canceled");
    assert!(err.is_cancellation());
}

#[test]
fn test_empty_sequence_error() {
    let err = ReactiveError::EmptySequence;
    assert_eq!(format!("{}", err), "sequence contains no elements");
    assert!(!err.is_cancellation());
}

#[test]
fn test_operation_error_from_anyhow() {
    let err: ReactiveError = anyhow::anyhow!("connection failed").into();
    assert_eq!(format!("{}", err), "operation failed: connection failed");
}

#[test]
fn test_scheduler_error() {
    let err = ReactiveError::Scheduler("runtime stopped".to_string());
    assert_eq!(format!("{}", err), "scheduler error: runtime stopped");
}

#[test]
fn test_fault_outcome_keeps_error() {
    let outcome: Outcome<u8> = Outcome::from_result(Err(ReactiveError::EmptySequence));
    assert!(outcome.is_fault());
    assert!(matches!(
        outcome.into_result(),
        Err(ReactiveError::EmptySequence)
    ));
}
