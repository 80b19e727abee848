//! Execution engine configuration.

use std::time::Duration;

use anyhow::Context;
use clap::{Args, ValueEnum};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display};
use tabula_runtime::engine::{
    DistributedEngine, EngineConfig, ExecutionEngine, InProcessCluster, LocalEngine,
};

use crate::TRACING_TARGET_CONFIG;

/// Engine backends selectable from the command line.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[derive(AsRefStr, Display, ValueEnum)]
#[derive(Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    /// In-process engine running partitions on the blocking pool.
    #[default]
    Local,
    /// Distributed engine backed by an in-process cluster session.
    Distributed,
}

/// Engine selection and execution limits.
///
/// # Environment Variables
///
/// - `TABULA_ENGINE` - Engine backend (default: local)
/// - `TABULA_PARALLELISM` - Concurrent partition tasks, or cluster workers
///   (default: available CPUs)
/// - `TABULA_MAX_CONCURRENT_RUNS` - Concurrent workflow runs (default: 10)
/// - `TABULA_TIMEOUT_SECS` - Workflow timeout in seconds (default: none)
#[derive(Debug, Clone, Args, Serialize, Deserialize)]
#[must_use = "config does nothing unless you use it"]
pub struct EngineArgs {
    /// Engine backend executing the workflow.
    #[arg(long, env = "TABULA_ENGINE", value_enum, default_value_t = EngineKind::Local)]
    pub engine: EngineKind,

    /// Maximum number of partition tasks running at once.
    ///
    /// For the distributed engine this is the number of cluster workers.
    #[arg(long, env = "TABULA_PARALLELISM")]
    pub parallelism: Option<usize>,

    /// Maximum number of concurrent workflow executions.
    #[arg(long, env = "TABULA_MAX_CONCURRENT_RUNS", default_value_t = 10)]
    pub max_concurrent_runs: usize,

    /// Timeout in seconds for a whole workflow execution.
    #[arg(long, env = "TABULA_TIMEOUT_SECS")]
    pub timeout_secs: Option<u64>,
}

impl EngineArgs {
    /// Builds and validates the engine configuration.
    pub fn engine_config(&self) -> anyhow::Result<EngineConfig> {
        let mut builder = EngineConfig::builder();
        builder.max_concurrent_runs(self.max_concurrent_runs);
        if let Some(parallelism) = self.parallelism {
            builder.parallelism(parallelism);
        }
        if let Some(secs) = self.timeout_secs {
            builder.timeout(Duration::from_secs(secs));
        }

        builder.build().context("invalid engine configuration")
    }

    /// Creates the selected engine.
    pub fn create_engine(&self) -> anyhow::Result<Box<dyn ExecutionEngine>> {
        let config = self.engine_config()?;
        let engine: Box<dyn ExecutionEngine> = match self.engine {
            EngineKind::Local => Box::new(LocalEngine::new(config)),
            EngineKind::Distributed => {
                let cluster = InProcessCluster::new(config.parallelism);
                Box::new(DistributedEngine::new(cluster, config))
            }
        };
        Ok(engine)
    }

    /// Logs the engine configuration.
    pub fn log(&self) {
        tracing::info!(
            target: TRACING_TARGET_CONFIG,
            engine = %self.engine,
            parallelism = ?self.parallelism,
            max_concurrent_runs = self.max_concurrent_runs,
            timeout_secs = ?self.timeout_secs,
            "Engine configuration"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(parallelism: Option<usize>, timeout_secs: Option<u64>) -> EngineArgs {
        EngineArgs {
            engine: EngineKind::Distributed,
            parallelism,
            max_concurrent_runs: 2,
            timeout_secs,
        }
    }

    #[test]
    fn builds_engine_config() {
        let config = args(Some(3), Some(30)).engine_config().unwrap();
        assert_eq!(config.parallelism, 3);
        assert_eq!(config.max_concurrent_runs, 2);
        assert_eq!(config.timeout, Some(Duration::from_secs(30)));

        let engine = args(Some(3), None).create_engine().unwrap();
        assert_eq!(engine.name(), "distributed");
    }

    #[test]
    fn rejects_invalid_limits() {
        assert!(args(Some(0), None).engine_config().is_err());
        assert!(args(None, Some(0)).engine_config().is_err());
    }
}
