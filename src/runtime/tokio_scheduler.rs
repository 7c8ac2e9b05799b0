//! Tokio runtime scheduler implementation.

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use crate::config::{FaultPolicy, SchedulerConfig};
use crate::core::disposable::{ActionDisposable, CompositeDisposable, Handle, SerialDisposable};
use crate::core::error::ReactiveError;
use crate::core::scheduler::{run_work, Scheduler, Work};

/// Tokio-based scheduler that runs each work item as a spawned task.
///
/// Disposing a schedule handle before the item runs aborts the task; after
/// it ran, disposal releases the handle the work returned.
#[derive(Clone)]
pub struct TokioScheduler {
    handle: tokio::runtime::Handle,
    fault_policy: FaultPolicy,
    // Keeps an owned runtime alive for as long as any clone exists.
    _runtime: Option<Arc<OwnedRuntime>>,
}

/// Runtime owned by a scheduler; shut down without blocking when the last
/// clone goes away, which may happen on one of its own worker threads.
struct OwnedRuntime(Option<tokio::runtime::Runtime>);

impl Drop for OwnedRuntime {
    fn drop(&mut self) {
        if let Some(runtime) = self.0.take() {
            runtime.shutdown_background();
        }
    }
}

impl TokioScheduler {
    /// Create a `TokioScheduler` from a tokio runtime handle.
    #[must_use]
    pub const fn new(handle: tokio::runtime::Handle) -> Self {
        Self {
            handle,
            fault_policy: FaultPolicy::Log,
            _runtime: None,
        }
    }

    /// Create a `TokioScheduler` on the runtime of the current context.
    ///
    /// # Errors
    ///
    /// Returns `ReactiveError::Scheduler` when called outside a tokio runtime.
    pub fn current() -> Result<Self, ReactiveError> {
        tokio::runtime::Handle::try_current()
            .map(Self::new)
            .map_err(|e| ReactiveError::Scheduler(e.to_string()))
    }

    /// Create a `TokioScheduler` owning a new multi-threaded runtime.
    ///
    /// # Errors
    ///
    /// Returns `ReactiveError::Scheduler` if the runtime cannot be built.
    pub fn with_worker_threads(worker_threads: usize) -> Result<Self, ReactiveError> {
        Self::from_config(&SchedulerConfig {
            worker_threads,
            ..SchedulerConfig::default()
        })
    }

    /// Create a `TokioScheduler` owning a runtime shaped by `cfg`.
    ///
    /// # Errors
    ///
    /// Returns `ReactiveError::Scheduler` if the runtime cannot be built.
    pub fn from_config(cfg: &SchedulerConfig) -> Result<Self, ReactiveError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(cfg.worker_threads)
            .thread_name(cfg.thread_name.clone())
            .enable_all()
            .build()
            .map_err(|e| ReactiveError::Scheduler(format!("failed to build runtime: {e}")))?;
        tracing::info!(
            worker_threads = cfg.worker_threads,
            thread_name = %cfg.thread_name,
            "tokio scheduler runtime started"
        );
        Ok(Self {
            handle: runtime.handle().clone(),
            fault_policy: cfg.fault_policy,
            _runtime: Some(Arc::new(OwnedRuntime(Some(runtime)))),
        })
    }

    /// Override how unobserved faults are surfaced.
    #[must_use]
    pub fn with_fault_policy(mut self, fault_policy: FaultPolicy) -> Self {
        self.fault_policy = fault_policy;
        self
    }

    fn spawn_item(&self, delay: Option<Duration>, work: Work) -> Handle {
        let slot = Arc::new(SerialDisposable::new());
        let item = Arc::clone(&slot);
        let join = self.handle.spawn(async move {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            run_work(&item, work);
        });
        Arc::new(CompositeDisposable::new(vec![
            Arc::new(ActionDisposable::new(move || join.abort())),
            slot,
        ]))
    }
}

impl Scheduler for TokioScheduler {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }

    fn schedule(&self, work: Work) -> Handle {
        self.spawn_item(None, work)
    }

    fn schedule_after(&self, delay: Duration, work: Work) -> Handle {
        if delay.is_zero() {
            return self.spawn_item(None, work);
        }
        self.spawn_item(Some(delay), work)
    }

    fn report_fault(&self, fault: &ReactiveError) {
        match self.fault_policy {
            FaultPolicy::Log => {
                tracing::error!(error = %fault, "unobserved fault in scheduled task");
            }
            FaultPolicy::Panic => panic!("unobserved fault in scheduled task: {fault}"),
        }
    }
}
