//! Configuration models for scheduler backends.

pub mod scheduler;

pub use scheduler::{FaultPolicy, SchedulerBackendConfig, SchedulerConfig};
