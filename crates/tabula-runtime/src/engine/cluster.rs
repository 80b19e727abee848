//! In-memory cluster session.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt, stream};
use tabula_data::Dataset;
use tokio::sync::RwLock;

use super::config::default_parallelism;
use super::{ClusterFailure, ClusterSession, Stage, TRACING_TARGET};
use crate::BoxedError;

/// A cluster session simulated with a pool of in-process workers.
///
/// Tasks of a stage are dispatched in reverse partition order and their
/// results are concatenated in completion order, so row order across
/// partitions differs from [`LocalEngine`](super::LocalEngine).
#[derive(Debug)]
pub struct InProcessCluster {
    workers: usize,
    results: RwLock<HashMap<String, Dataset>>,
    submitted: AtomicUsize,
}

impl InProcessCluster {
    /// Creates a session with `workers` workers (at least one).
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
            results: RwLock::new(HashMap::new()),
            submitted: AtomicUsize::new(0),
        }
    }

    /// Creates a session with one worker per available CPU.
    pub fn with_defaults() -> Self {
        Self::new(default_parallelism())
    }

    /// Returns the number of stage results currently held.
    pub async fn stored(&self) -> usize {
        self.results.read().await.len()
    }

    /// Returns the number of stages submitted so far.
    pub fn submitted(&self) -> usize {
        self.submitted.load(Ordering::Relaxed)
    }
}

impl Default for InProcessCluster {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[async_trait]
impl ClusterSession for InProcessCluster {
    fn workers(&self) -> usize {
        self.workers
    }

    async fn submit(&self, stage: Stage) -> Result<(), ClusterFailure> {
        self.submitted.fetch_add(1, Ordering::Relaxed);
        let name = stage.name().to_owned();
        let (schema, tasks) = stage.into_parts();

        let parts: Vec<Dataset> = stream::iter(tasks.into_iter().rev())
            .map(|task| async move {
                match tokio::task::spawn_blocking(move || task.run()).await {
                    Ok(result) => result,
                    Err(join) => Err(BoxedError::from(join)),
                }
            })
            .buffer_unordered(self.workers)
            .try_collect()
            .await
            .map_err(|cause| ClusterFailure::new(&name, cause))?;

        let dataset =
            Dataset::concat(schema, parts).map_err(|cause| ClusterFailure::new(&name, cause))?;

        tracing::trace!(
            target: TRACING_TARGET,
            stage = %name,
            rows = dataset.len(),
            "Stage materialized on cluster"
        );

        self.results.write().await.insert(name, dataset);
        Ok(())
    }

    async fn materialize(&self, stage: &str) -> Result<Dataset, ClusterFailure> {
        self.results
            .read()
            .await
            .get(stage)
            .cloned()
            .ok_or_else(|| ClusterFailure::new(stage, "no result was stored under this name"))
    }

    async fn release(&self, stage: &str) -> Result<(), ClusterFailure> {
        self.results.write().await.remove(stage);
        Ok(())
    }
}
