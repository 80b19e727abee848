//! Engine delegating stage execution to a cluster session.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tabula_data::Dataset;
use thiserror::Error;
use tokio::sync::{Mutex, Semaphore};
use uuid::Uuid;

use super::plan::{EngineInfo, Stage};
use super::scheduler::{self, StageRunner};
use super::{EngineConfig, ExecutionEngine, ExecutionResult, TRACING_TARGET};
use crate::error::{BoxedError, Result};
use crate::graph::WorkflowGraph;

/// Failure reported by a cluster session, carrying the original cause.
#[derive(Debug, Error)]
#[error("stage '{stage}' failed on the cluster")]
pub struct ClusterFailure {
    stage: String,
    #[source]
    cause: BoxedError,
}

impl ClusterFailure {
    /// Creates a failure of the named stage.
    pub fn new(stage: impl Into<String>, cause: impl Into<BoxedError>) -> Self {
        Self {
            stage: stage.into(),
            cause: cause.into(),
        }
    }

    /// Returns the name of the failed stage.
    pub fn stage(&self) -> &str {
        &self.stage
    }

    /// Returns the underlying cause.
    pub fn cause(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
        self.cause.as_ref()
    }
}

/// Connection to an external compute cluster.
///
/// The engine submits one [`Stage`] per node, materializes its named
/// result, and releases it once no pending node needs it. Stage names are
/// prefixed with a per-execution id, so concurrent executions of one graph
/// never share a result. Fault tolerance and retries are the session's
/// concern.
#[async_trait]
pub trait ClusterSession: Send + Sync {
    /// Returns the number of workers, exposed to engine-aware nodes as
    /// parallelism.
    fn workers(&self) -> usize;

    /// Runs every task of a stage and keeps the result under its name.
    async fn submit(&self, stage: Stage) -> Result<(), ClusterFailure>;

    /// Fetches a stage result.
    async fn materialize(&self, stage: &str) -> Result<Dataset, ClusterFailure>;

    /// Drops a stage result.
    async fn release(&self, stage: &str) -> Result<(), ClusterFailure>;
}

/// Executes workflows through a [`ClusterSession`].
///
/// Scheduling and validation are the same as [`LocalEngine`]; only the
/// execution of stages is delegated.
///
/// [`LocalEngine`]: super::LocalEngine
pub struct DistributedEngine<S> {
    session: S,
    config: EngineConfig,
    info: EngineInfo,
    runs: Semaphore,
}

impl<S: ClusterSession> DistributedEngine<S> {
    /// Creates a new engine over `session`.
    pub fn new(session: S, config: EngineConfig) -> Self {
        tracing::info!(
            target: TRACING_TARGET,
            workers = session.workers(),
            max_concurrent_runs = config.max_concurrent_runs,
            timeout_secs = config.timeout.map(|t| t.as_secs()),
            "Distributed engine initialized"
        );

        Self {
            info: EngineInfo {
                name: Arc::from("distributed"),
                parallelism: session.workers(),
            },
            runs: Semaphore::new(config.max_concurrent_runs),
            session,
            config,
        }
    }

    /// Creates a new engine over `session` with default configuration.
    pub fn with_defaults(session: S) -> Self {
        Self::new(session, EngineConfig::default())
    }

    /// Returns the cluster session.
    pub fn session(&self) -> &S {
        &self.session
    }

    /// Returns the engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}

impl<S> fmt::Debug for DistributedEngine<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DistributedEngine")
            .field("config", &self.config)
            .field("workers", &self.info.parallelism)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl<S: ClusterSession> ExecutionEngine for DistributedEngine<S> {
    fn name(&self) -> &str {
        &self.info.name
    }

    async fn execute(&self, graph: &WorkflowGraph) -> Result<ExecutionResult> {
        let runner = SessionRunner {
            session: &self.session,
            run: Uuid::now_v7(),
            live: Mutex::new(HashSet::new()),
        };
        let result = scheduler::drive(graph, &runner, &self.info, &self.config, &self.runs).await;
        runner.release_all().await;
        result
    }
}

/// Per-execution view of the session tracking materialized stages.
struct SessionRunner<'a, S> {
    session: &'a S,
    run: Uuid,
    live: Mutex<HashSet<String>>,
}

impl<S: ClusterSession> SessionRunner<'_, S> {
    /// Session key of a stage of this execution.
    fn key(&self, stage: &str) -> String {
        format!("{}/{stage}", self.run)
    }

    async fn release_all(&self) {
        let names: Vec<_> = self.live.lock().await.drain().collect();
        for name in names {
            self.drop_stage(&name).await;
        }
    }

    async fn drop_stage(&self, name: &str) {
        if let Err(error) = self.session.release(name).await {
            tracing::warn!(
                target: TRACING_TARGET,
                stage = name,
                error = %error,
                "Failed to release stage"
            );
        }
    }
}

#[async_trait]
impl<'a, S: ClusterSession> StageRunner for SessionRunner<'a, S> {
    async fn run_stage(&self, stage: Stage) -> Result<Dataset, BoxedError> {
        let stage = stage.scoped(&self.run.to_string());
        let name = stage.name().to_owned();
        tracing::debug!(
            target: TRACING_TARGET,
            stage = %name,
            tasks = stage.len(),
            "Submitting stage"
        );

        self.session.submit(stage).await?;
        self.live.lock().await.insert(name.clone());
        Ok(self.session.materialize(&name).await?)
    }

    async fn release(&self, stage: &str) {
        let key = self.key(stage);
        if self.live.lock().await.remove(&key) {
            self.drop_stage(&key).await;
        }
    }
}
