use anyhow::{Context, Result};
use tracing::debug;

use workerpool_core::{DispatchPolicy, SchedulerConfig};

use crate::cli::CliArgs;

/// Resolve the scheduler config: file (or defaults) + env, then CLI flags.
pub fn resolve(args: &CliArgs) -> Result<SchedulerConfig> {
    let mut config = match args.config.as_deref() {
        Some(path) => {
            debug!(path, "Loading scheduler config file");
            SchedulerConfig::from_file(path)
                .with_context(|| format!("failed to load config from '{path}'"))?
        }
        None => SchedulerConfig::from_env().context("invalid scheduler environment")?,
    };

    if let Some(workers) = args.workers {
        config.worker_count = workers;
    }
    if let Some(policy) = args.policy.as_deref() {
        config.policy = policy
            .parse::<DispatchPolicy>()
            .with_context(|| format!("invalid --policy '{policy}'"))?;
    }

    config.validate().context("invalid scheduler configuration")?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn flags_override_defaults() {
        let args = CliArgs::parse_from(["workerpool", "--workers", "7", "--policy", "partitioned"]);
        let config = resolve(&args).unwrap();
        assert_eq!(config.worker_count, 7);
        assert_eq!(config.policy, DispatchPolicy::Partitioned);
    }

    #[test]
    fn zero_workers_flag_is_rejected() {
        let args = CliArgs::parse_from(["workerpool", "--workers", "0"]);
        let err = resolve(&args).unwrap_err();
        assert!(format!("{err:#}").contains("worker_count"));
    }

    #[test]
    fn bad_policy_flag_is_rejected() {
        let args = CliArgs::parse_from(["workerpool", "--policy", "fastest"]);
        assert!(resolve(&args).is_err());
    }

    #[test]
    fn missing_config_file_reports_path() {
        let args = CliArgs::parse_from(["workerpool", "--config", "/nope/workerpool.toml"]);
        let err = resolve(&args).unwrap_err();
        assert!(err.to_string().contains("/nope/workerpool.toml"));
    }
}
