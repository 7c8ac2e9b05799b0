//! Scheduler backends: tokio adapter, inline execution and a virtual clock.

pub mod immediate;
#[cfg(feature = "tokio-runtime")]
pub mod tokio_scheduler;
pub mod virtual_time;

pub use immediate::ImmediateScheduler;
#[cfg(feature = "tokio-runtime")]
pub use tokio_scheduler::TokioScheduler;
pub use virtual_time::VirtualTimeScheduler;
