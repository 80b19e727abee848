//! In-process reference engine.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future;
use tabula_data::Dataset;
use tokio::sync::Semaphore;

use super::plan::{EngineInfo, Stage};
use super::scheduler::{self, StageRunner};
use super::{EngineConfig, ExecutionEngine, ExecutionResult, TRACING_TARGET};
use crate::error::{BoxedError, Result};
use crate::graph::WorkflowGraph;

/// Executes workflows over in-memory datasets in the current process.
///
/// Partition tasks run on the blocking thread pool, at most
/// [`EngineConfig::parallelism`] at a time across all running workflows.
/// Task results are concatenated in partition-key order.
pub struct LocalEngine {
    config: EngineConfig,
    info: EngineInfo,
    runs: Semaphore,
    partitions: Arc<Semaphore>,
}

impl LocalEngine {
    /// Creates a new engine with the given configuration.
    pub fn new(config: EngineConfig) -> Self {
        tracing::info!(
            target: TRACING_TARGET,
            parallelism = config.parallelism,
            max_concurrent_runs = config.max_concurrent_runs,
            timeout_secs = config.timeout.map(|t| t.as_secs()),
            "Local engine initialized"
        );

        Self {
            info: EngineInfo {
                name: Arc::from("local"),
                parallelism: config.parallelism,
            },
            runs: Semaphore::new(config.max_concurrent_runs),
            partitions: Arc::new(Semaphore::new(config.parallelism)),
            config,
        }
    }

    /// Creates a new engine with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(EngineConfig::default())
    }

    /// Returns the engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}

impl fmt::Debug for LocalEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalEngine")
            .field("config", &self.config)
            .field("available_runs", &self.runs.available_permits())
            .finish()
    }
}

#[async_trait]
impl StageRunner for LocalEngine {
    async fn run_stage(&self, stage: Stage) -> Result<Dataset, BoxedError> {
        let (schema, tasks) = stage.into_parts();
        let handles = tasks.into_iter().map(|task| {
            let permits = Arc::clone(&self.partitions);
            async move {
                let permit = permits.acquire_owned().await?;
                let output = tokio::task::spawn_blocking(move || {
                    let _permit = permit;
                    task.run()
                })
                .await??;
                Ok::<_, BoxedError>(output)
            }
        });

        let parts = future::try_join_all(handles).await?;
        Ok(Dataset::concat(schema, parts)?)
    }
}

#[async_trait]
impl ExecutionEngine for LocalEngine {
    fn name(&self) -> &str {
        &self.info.name
    }

    async fn execute(&self, graph: &WorkflowGraph) -> Result<ExecutionResult> {
        scheduler::drive(graph, self, &self.info, &self.config, &self.runs).await
    }
}
