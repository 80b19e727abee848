//! Dependency-driven scheduling shared by all engines.

use std::collections::HashMap;

use async_trait::async_trait;
use futures::StreamExt;
use futures::stream::FuturesUnordered;
use jiff::Timestamp;
use tabula_data::Dataset;
use tokio::sync::Semaphore;
use tokio::task::JoinError;

use super::plan::{self, EngineInfo, Stage, stage_name};
use super::{EngineConfig, ExecutionResult, ExecutionStats, TRACING_TARGET};
use crate::error::{BoxedError, Error, Result};
use crate::graph::WorkflowGraph;
use crate::node::NodeId;

/// Runs planned stages on a backend.
#[async_trait]
pub(crate) trait StageRunner: Send + Sync {
    /// Runs every task of `stage` and returns the concatenated result.
    async fn run_stage(&self, stage: Stage) -> Result<Dataset, BoxedError>;

    /// Called once no pending node needs the named stage result.
    async fn release(&self, _stage: &str) {}
}

/// Executes `graph` with the run limits of `config`.
pub(crate) async fn drive<R>(
    graph: &WorkflowGraph,
    runner: &R,
    engine: &EngineInfo,
    config: &EngineConfig,
    runs: &Semaphore,
) -> Result<ExecutionResult>
where
    R: StageRunner + ?Sized,
{
    let order = graph.topological_order()?;

    // The timeout also covers the wait for a run permit.
    let run = async {
        let _permit = runs
            .acquire()
            .await
            .map_err(|e| Error::Internal(format!("semaphore closed: {e}")))?;

        tracing::info!(
            target: TRACING_TARGET,
            engine = %engine.name,
            nodes = order.len(),
            workflow = graph.metadata.name.as_deref().unwrap_or_default(),
            "Starting workflow execution"
        );

        execute(graph, runner, engine).await
    };
    let result = match config.timeout {
        Some(limit) => tokio::time::timeout(limit, run)
            .await
            .map_err(|_| Error::Timeout)?,
        None => run.await,
    };

    match &result {
        Ok(result) => tracing::info!(
            target: TRACING_TARGET,
            engine = %engine.name,
            nodes_executed = result.stats().nodes_executed,
            partitions = result.stats().partitions_processed,
            elapsed = %result.stats().elapsed,
            "Workflow execution completed"
        ),
        Err(error) => tracing::warn!(
            target: TRACING_TARGET,
            engine = %engine.name,
            error = %error,
            "Workflow execution failed"
        ),
    }

    result
}

/// Runs every node once all of its inputs are materialized.
///
/// Returning early drops the pending futures, which cancels work that has
/// not started yet.
async fn execute<R>(
    graph: &WorkflowGraph,
    runner: &R,
    engine: &EngineInfo,
) -> Result<ExecutionResult>
where
    R: StageRunner + ?Sized,
{
    let started = Timestamp::now();
    let order = graph.topological_order()?;

    let mut waiting: HashMap<NodeId, usize> = HashMap::with_capacity(order.len());
    let mut remaining: HashMap<NodeId, usize> = HashMap::with_capacity(order.len());
    let mut ready = Vec::new();
    for &id in order {
        let node = graph
            .node(id)
            .ok_or_else(|| Error::Internal(format!("node {id} is missing")))?;
        match node.inputs().len() {
            0 => ready.push(id),
            pending => {
                waiting.insert(id, pending);
            }
        }
        remaining.insert(id, graph.consumer_edges(id).len());
    }

    let mut datasets: HashMap<NodeId, Dataset> = HashMap::new();
    let mut running = FuturesUnordered::new();
    let mut stats = ExecutionStats::default();

    loop {
        for id in ready.drain(..) {
            let node = graph
                .node(id)
                .ok_or_else(|| Error::Internal(format!("node {id} is missing")))?;
            let inputs = node
                .inputs()
                .iter()
                .map(|input| {
                    datasets.get(&input.node_id()).cloned().ok_or_else(|| {
                        Error::Internal(format!(
                            "input {} of '{}' was not materialized",
                            input.node_id(),
                            node.name()
                        ))
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            running.push(run_node(graph, runner, engine, id, inputs));
        }

        let Some((id, outcome)) = running.next().await else {
            break;
        };
        let (dataset, partitions) = outcome?;
        stats.nodes_executed += 1;
        stats.partitions_processed += partitions;
        if let Some(dataset) = dataset {
            datasets.insert(id, dataset);
        }

        for consumer in graph.consumer_edges(id) {
            if let Some(pending) = waiting.get_mut(&consumer) {
                *pending -= 1;
                if *pending == 0 {
                    waiting.remove(&consumer);
                    ready.push(consumer);
                }
            }
        }

        let Some(node) = graph.node(id) else {
            continue;
        };
        for input in node.inputs() {
            let producer = input.node_id();
            let Some(count) = remaining.get_mut(&producer) else {
                continue;
            };
            *count = count.saturating_sub(1);
            if *count == 0 && !graph.is_persisted(producer) && datasets.remove(&producer).is_some()
            {
                tracing::trace!(
                    target: TRACING_TARGET,
                    node_id = %producer,
                    "Released intermediate dataset"
                );
                runner.release(&stage_name(producer)).await;
            }
        }
    }

    if !waiting.is_empty() {
        return Err(Error::Internal(format!(
            "{} nodes never became ready",
            waiting.len()
        )));
    }

    stats.elapsed = Timestamp::now().duration_since(started);
    Ok(ExecutionResult::new(datasets, stats))
}

/// Plans and runs one node.
///
/// Returns the node's dataset (`None` for Outputters) and its task count.
async fn run_node<R>(
    graph: &WorkflowGraph,
    runner: &R,
    engine: &EngineInfo,
    id: NodeId,
    inputs: Vec<Dataset>,
) -> (NodeId, Result<(Option<Dataset>, usize)>)
where
    R: StageRunner + ?Sized,
{
    let outcome = async {
        let node = graph
            .node(id)
            .ok_or_else(|| Error::Internal(format!("node {id} is missing")))?;
        let fail = |source: BoxedError| failure(id, node.name(), source);

        let stage = plan::plan(node, graph.output_schema(id).cloned(), inputs, engine)
            .map_err(fail)?;
        let partitions = stage.len();

        tracing::debug!(
            target: TRACING_TARGET,
            node_id = %id,
            node = node.name(),
            kind = %node.node_type(),
            partitions,
            "Running node"
        );

        let dataset = runner.run_stage(stage).await.map_err(fail)?;
        Ok((node.node_type().has_output().then_some(dataset), partitions))
    }
    .await;

    (id, outcome)
}

/// Wraps a node failure, keeping the original error as the source.
fn failure(id: NodeId, name: &str, source: BoxedError) -> Error {
    if source
        .downcast_ref::<JoinError>()
        .is_some_and(JoinError::is_cancelled)
    {
        return Error::Cancelled;
    }

    tracing::error!(
        target: TRACING_TARGET,
        node_id = %id,
        node = name,
        error = %source,
        "Node failed"
    );

    Error::Execution {
        node_id: id,
        name: name.to_owned(),
        source,
    }
}
