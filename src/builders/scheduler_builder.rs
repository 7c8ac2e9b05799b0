//! Builders to construct schedulers from configuration.

use std::sync::Arc;

use crate::config::{SchedulerBackendConfig, SchedulerConfig};
use crate::core::{ReactiveError, SchedulerRef};
use crate::runtime::ImmediateScheduler;

/// Build a scheduler from configuration.
///
/// # Errors
///
/// Returns `ReactiveError::InvalidConfig` for invalid settings and
/// `ReactiveError::Scheduler` when the backend cannot start.
pub fn build_scheduler(cfg: &SchedulerConfig) -> Result<SchedulerRef, ReactiveError> {
    cfg.validate().map_err(ReactiveError::InvalidConfig)?;

    match cfg.backend {
        SchedulerBackendConfig::Immediate => {
            tracing::debug!("building immediate scheduler");
            Ok(Arc::new(ImmediateScheduler))
        }
        SchedulerBackendConfig::Tokio => build_tokio(cfg),
    }
}

#[cfg(feature = "tokio-runtime")]
fn build_tokio(cfg: &SchedulerConfig) -> Result<SchedulerRef, ReactiveError> {
    let scheduler = crate::runtime::TokioScheduler::from_config(cfg)?;
    Ok(Arc::new(scheduler))
}

#[cfg(not(feature = "tokio-runtime"))]
fn build_tokio(_cfg: &SchedulerConfig) -> Result<SchedulerRef, ReactiveError> {
    Err(ReactiveError::InvalidConfig(
        "tokio backend requires the `tokio-runtime` feature".into(),
    ))
}
