//! Scheduler backend configuration.

use serde::{Deserialize, Serialize};

/// Environment variable selecting the backend (`tokio` or `immediate`).
pub const ENV_BACKEND: &str = "PROMETHEUS_REACTIVE_BACKEND";
/// Environment variable for the tokio worker thread count.
pub const ENV_WORKER_THREADS: &str = "PROMETHEUS_REACTIVE_WORKER_THREADS";
/// Environment variable for the tokio worker thread name.
pub const ENV_THREAD_NAME: &str = "PROMETHEUS_REACTIVE_THREAD_NAME";
/// Environment variable selecting the fault policy (`log` or `panic`).
pub const ENV_FAULT_POLICY: &str = "PROMETHEUS_REACTIVE_FAULT_POLICY";

/// Scheduler backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerBackendConfig {
    /// Multi-threaded tokio runtime.
    Tokio,
    /// Inline execution on the calling thread.
    Immediate,
}

/// How a scheduler surfaces faults no caller is observing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultPolicy {
    /// Log with `tracing::error!`.
    #[default]
    Log,
    /// Panic inside the scheduled work so the runtime's panic handling sees it.
    Panic,
}

/// Root scheduler configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Backend selection.
    pub backend: SchedulerBackendConfig,
    /// Worker threads for the tokio backend.
    #[serde(default = "default_worker_threads")]
    pub worker_threads: usize,
    /// Thread name for tokio workers.
    #[serde(default = "default_thread_name")]
    pub thread_name: String,
    /// Unobserved-fault policy.
    #[serde(default)]
    pub fault_policy: FaultPolicy,
}

fn default_worker_threads() -> usize {
    num_cpus::get()
}

fn default_thread_name() -> String {
    "prometheus-reactive".to_string()
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            backend: SchedulerBackendConfig::Tokio,
            worker_threads: default_worker_threads(),
            thread_name: default_thread_name(),
            fault_policy: FaultPolicy::Log,
        }
    }
}

impl SchedulerConfig {
    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns a description of the first invalid field.
    pub fn validate(&self) -> Result<(), String> {
        if self.backend == SchedulerBackendConfig::Tokio && self.worker_threads == 0 {
            return Err("worker_threads must be greater than 0".into());
        }
        if self.thread_name.trim().is_empty() {
            return Err("thread_name must not be empty".into());
        }
        Ok(())
    }

    /// Parse scheduler configuration from a JSON string and validate.
    ///
    /// # Errors
    ///
    /// Returns a parse or validation error message.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Build configuration from the environment, loading a `.env` file first if present.
    ///
    /// Unset variables keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error message for unparsable or invalid values.
    pub fn from_env() -> Result<Self, String> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns an error message for unparsable or invalid values.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();
        if let Some(backend) = lookup(ENV_BACKEND) {
            cfg.backend = match backend.trim().to_ascii_lowercase().as_str() {
                "tokio" => SchedulerBackendConfig::Tokio,
                "immediate" => SchedulerBackendConfig::Immediate,
                other => return Err(format!("{ENV_BACKEND}: unknown backend `{other}`")),
            };
        }
        if let Some(threads) = lookup(ENV_WORKER_THREADS) {
            cfg.worker_threads = threads
                .trim()
                .parse()
                .map_err(|e| format!("{ENV_WORKER_THREADS}: {e}"))?;
        }
        if let Some(name) = lookup(ENV_THREAD_NAME) {
            cfg.thread_name = name;
        }
        if let Some(policy) = lookup(ENV_FAULT_POLICY) {
            cfg.fault_policy = match policy.trim().to_ascii_lowercase().as_str() {
                "log" => FaultPolicy::Log,
                "panic" => FaultPolicy::Panic,
                other => return Err(format!("{ENV_FAULT_POLICY}: unknown policy `{other}`")),
            };
        }
        cfg.validate()?;
        Ok(cfg)
    }
}
