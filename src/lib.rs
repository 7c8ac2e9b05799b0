//! # Prometheus Reactive
//!
//! A bridging core between push-based streams and single-resolution async
//! work, with flow-control combinators for work triggered by stream elements.
//!
//! Reactive pipelines that kick off async work per element have a handful of
//! recurring hazards: completions delivered on arbitrary threads, stale work
//! still running after its trigger was superseded, faults that nobody is
//! observing any more, and teardown racing late results. This crate keeps the
//! bookkeeping for those cases in one place.
//!
//! ## Core Pieces
//!
//! - **Resource handles**: idempotent [`core::Disposable`] handles, including
//!   a serial slot with atomic replace-and-dispose and a composite set
//! - **Cancellation**: an explicit [`core::CancellationToken`] threaded
//!   through every async boundary
//! - **Task-stream bridge**: [`core::from_async`] turns a cancellable async
//!   factory into a cold stream of one value
//! - **Scheduler-task runner**: [`core::SchedulerExt`] runs cooperative async
//!   work on any [`core::Scheduler`] and bridges results back into futures
//! - **Combinators**: dispose-previous and skip-while-busy flattening, plus
//!   a first-value adapter, available through [`core::StreamExt`]
//!
//! ## Scheduling
//!
//! Everything is written against the [`core::Scheduler`] trait. The
//! `runtime` module provides a tokio-backed scheduler (feature
//! `tokio-runtime`), an inline scheduler and a virtual-time scheduler for
//! deterministic tests.
//!
//! ```rust,ignore
//! use prometheus_reactive::builders::build_scheduler;
//! use prometheus_reactive::config::SchedulerConfig;
//! use prometheus_reactive::core::{CancellationToken, SchedulerExt, StreamExt};
//!
//! let scheduler = build_scheduler(&SchedulerConfig::from_env()?)?;
//!
//! // Search as the user types; each keystroke cancels the previous lookup.
//! let results = queries.select_many_dispose_previous_async(
//!     |query: String, ct: CancellationToken| async move { search(&query, ct).await },
//!     Some(scheduler.clone()),
//! );
//!
//! // Await a value computed on the scheduler.
//! let answer = scheduler
//!     .run(|ct| async move { compute(ct).await }, &CancellationToken::none())
//!     .await
//!     .into_result()?;
//! ```
//!
//! For complete examples, see:
//! - `tests/combinators_test.rs` - Combinator behaviour end to end
//! - `tests/task_runner_test.rs` - Scheduler-bound tasks on tokio

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Resource handles, cancellation, streams, schedulers and combinators.
pub mod core;
/// Configuration models for scheduler backends.
pub mod config;
/// Builders to construct schedulers from configuration.
pub mod builders;
/// Scheduler backends: tokio, inline and virtual time.
pub mod runtime;
/// Shared utilities.
pub mod util;
