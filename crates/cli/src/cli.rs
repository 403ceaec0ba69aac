use clap::Parser;

/// Demo driver for the client-ordered worker pool.
///
/// Builds a scheduler from a config file, environment, and flags, feeds it a
/// short script of client tasks, and reports what happened.
#[derive(Parser, Debug)]
#[command(name = "workerpool", version, about)]
pub struct CliArgs {
    /// Path to a scheduler TOML config file (defaults + env overrides when unset)
    #[arg(long, env = "WORKERPOOL_CONFIG")]
    pub config: Option<String>,

    /// Worker count override
    #[arg(long)]
    pub workers: Option<usize>,

    /// Dispatch policy override: work_stealing or partitioned
    #[arg(long)]
    pub policy: Option<String>,

    /// How long each demo task sleeps, in milliseconds
    #[arg(long, default_value_t = 1000)]
    pub task_ms: u64,

    /// Upper bound on how long to let the pool run before stopping, in seconds
    #[arg(long, default_value_t = 15)]
    pub run_secs: u64,

    /// Print the final metrics snapshot as JSON
    #[arg(long)]
    pub json_metrics: bool,
}
