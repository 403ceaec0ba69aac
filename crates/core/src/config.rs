use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{PoolError, PoolResult};

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

// ── Enumerated settings ───────────────────────────────────────────

/// How tasks are queued and handed to workers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchPolicy {
    /// Unbounded per-worker queues with skip-scan dequeue; idle workers steal.
    #[default]
    WorkStealing,
    /// Bounded per-worker FIFO queues; a client's tasks only ever run on its home worker.
    Partitioned,
}

impl DispatchPolicy {
    pub fn allows_stealing(self) -> bool {
        matches!(self, DispatchPolicy::WorkStealing)
    }
}

impl fmt::Display for DispatchPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchPolicy::WorkStealing => f.write_str("work_stealing"),
            DispatchPolicy::Partitioned => f.write_str("partitioned"),
        }
    }
}

impl FromStr for DispatchPolicy {
    type Err = PoolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "work_stealing" | "stealing" => Ok(DispatchPolicy::WorkStealing),
            "partitioned" | "simple" => Ok(DispatchPolicy::Partitioned),
            other => Err(PoolError::Config(format!("unknown dispatch policy '{other}'"))),
        }
    }
}

/// Order in which an idle worker probes its peers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StealOrder {
    /// Always construction order. Biased toward low-index workers.
    #[default]
    Fixed,
    /// Start at the worker just after the requester and wrap around.
    Rotating,
}

impl fmt::Display for StealOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StealOrder::Fixed => f.write_str("fixed"),
            StealOrder::Rotating => f.write_str("rotating"),
        }
    }
}

impl FromStr for StealOrder {
    type Err = PoolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fixed" => Ok(StealOrder::Fixed),
            "rotating" => Ok(StealOrder::Rotating),
            other => Err(PoolError::Config(format!("unknown steal order '{other}'"))),
        }
    }
}

// ── Scheduler config ──────────────────────────────────────────────

/// Scheduler configuration, typically parsed from TOML.
///
/// ```toml
/// worker_count = 4
/// policy = "work_stealing"
/// steal_order = "rotating"
/// idle_sleep_ms = 0
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Number of worker threads. Fixed for the scheduler's lifetime; must be positive.
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,
    /// Queueing strategy shared by every worker.
    #[serde(default)]
    pub policy: DispatchPolicy,
    /// Per-worker capacity for the partitioned policy.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    /// Peer probe order when stealing.
    #[serde(default)]
    pub steal_order: StealOrder,
    /// Idle back-off in milliseconds. 0 = yield the thread and retry immediately.
    #[serde(default)]
    pub idle_sleep_ms: u64,
    /// Worker thread name prefix; threads are named `{prefix}-{index}`.
    #[serde(default = "default_thread_name")]
    pub thread_name: String,
}

fn default_worker_count() -> usize { 4 }
fn default_queue_capacity() -> usize { 100 }
fn default_thread_name() -> String { "workerpool-worker".into() }

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            worker_count: default_worker_count(),
            policy: DispatchPolicy::default(),
            queue_capacity: default_queue_capacity(),
            steal_order: StealOrder::default(),
            idle_sleep_ms: 0,
            thread_name: default_thread_name(),
        }
    }
}

// ── Loading & Validation ──────────────────────────────────────────

impl SchedulerConfig {
    /// Default config with the given worker count. Not validated until the
    /// scheduler is built.
    pub fn with_workers(worker_count: usize) -> Self {
        Self {
            worker_count,
            ..Self::default()
        }
    }

    /// Parse config from a TOML string, then apply env overrides and validate.
    pub fn from_toml(toml_str: &str) -> PoolResult<Self> {
        let mut config: Self = toml::from_str(toml_str)?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Load config from a file path.
    pub fn from_file(path: impl AsRef<Path>) -> PoolResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml(&content)
    }

    /// Build config from defaults plus environment variables (call `load_dotenv()` first).
    pub fn from_env() -> PoolResult<Self> {
        let mut config = Self::default();
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Idle back-off, `None` when the worker should just yield.
    pub fn idle_sleep(&self) -> Option<Duration> {
        (self.idle_sleep_ms > 0).then(|| Duration::from_millis(self.idle_sleep_ms))
    }

    // ── Environment variable overrides ────────────────────────────

    /// Apply environment variable overrides.
    ///
    /// Convention: `WORKERPOOL_KEY` overrides `key`:
    /// - `WORKERPOOL_WORKER_COUNT` → `worker_count`
    /// - `WORKERPOOL_POLICY` → `policy`
    /// - `WORKERPOOL_QUEUE_CAPACITY` → `queue_capacity`
    /// - `WORKERPOOL_STEAL_ORDER` → `steal_order`
    /// - `WORKERPOOL_IDLE_SLEEP_MS` → `idle_sleep_ms`
    /// - `WORKERPOOL_THREAD_NAME` → `thread_name`
    ///
    /// A bad worker count is an error; other unparseable values are logged and skipped.
    fn apply_env_overrides(&mut self) -> PoolResult<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    fn apply_overrides<F>(&mut self, lookup: F) -> PoolResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("WORKERPOOL_WORKER_COUNT") {
            self.worker_count = parse_worker_count(&v)?;
        }
        if let Some(v) = lookup("WORKERPOOL_POLICY") {
            match v.parse::<DispatchPolicy>() {
                Ok(p) => self.policy = p,
                Err(_) => ignored("WORKERPOOL_POLICY", &v),
            }
        }
        if let Some(v) = lookup("WORKERPOOL_QUEUE_CAPACITY") {
            match v.trim().parse::<usize>() {
                Ok(n) => self.queue_capacity = n,
                Err(_) => ignored("WORKERPOOL_QUEUE_CAPACITY", &v),
            }
        }
        if let Some(v) = lookup("WORKERPOOL_STEAL_ORDER") {
            match v.parse::<StealOrder>() {
                Ok(o) => self.steal_order = o,
                Err(_) => ignored("WORKERPOOL_STEAL_ORDER", &v),
            }
        }
        if let Some(v) = lookup("WORKERPOOL_IDLE_SLEEP_MS") {
            match v.trim().parse::<u64>() {
                Ok(ms) => self.idle_sleep_ms = ms,
                Err(_) => ignored("WORKERPOOL_IDLE_SLEEP_MS", &v),
            }
        }
        if let Some(v) = lookup("WORKERPOOL_THREAD_NAME") {
            if !v.trim().is_empty() {
                self.thread_name = v;
            }
        }
        Ok(())
    }

    // ── Validation ────────────────────────────────────────────────

    /// Reject configurations the scheduler cannot be built from.
    pub fn validate(&self) -> PoolResult<()> {
        if self.worker_count == 0 {
            return Err(PoolError::Config(
                "worker_count must be positive, got 0".into(),
            ));
        }
        if self.policy == DispatchPolicy::Partitioned && self.queue_capacity == 0 {
            return Err(PoolError::Config(
                "queue_capacity must be positive for the partitioned policy".into(),
            ));
        }
        if self.thread_name.trim().is_empty() {
            return Err(PoolError::Config("thread_name must not be empty".into()));
        }
        Ok(())
    }

    /// Print a summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!(
            workers = self.worker_count,
            policy = %self.policy,
            steal_order = %self.steal_order,
            idle_sleep_ms = self.idle_sleep_ms,
            "Scheduler config loaded"
        );
    }
}

/// Signed parse so `-3` is reported as non-positive rather than as garbage.
fn parse_worker_count(value: &str) -> PoolResult<usize> {
    let n: i64 = value.trim().parse().map_err(|_| {
        PoolError::Config(format!(
            "WORKERPOOL_WORKER_COUNT must be a positive integer, got '{value}'"
        ))
    })?;
    if n <= 0 {
        return Err(PoolError::Config(format!(
            "worker_count must be positive, got {n}"
        )));
    }
    usize::try_from(n)
        .map_err(|_| PoolError::Config(format!("worker_count {n} is out of range")))
}

fn ignored(key: &str, value: &str) {
    tracing::warn!(key, value, "Ignoring unparseable environment override");
}

// ── Tests ─────────────────────────────────────────────────────────
