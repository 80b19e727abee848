//! Workflow execution engines.
//!
//! This module provides the runtime for executing frozen workflow graphs:
//! - [`ExecutionEngine`]: the engine interface
//! - [`LocalEngine`]: in-process reference engine
//! - [`DistributedEngine`]: delegates stages to a [`ClusterSession`]
//! - [`InProcessCluster`]: in-memory cluster session
//! - [`EngineConfig`]: configuration options

mod cluster;
mod config;
mod distributed;
mod local;
mod plan;
mod result;
mod scheduler;

use async_trait::async_trait;

pub use cluster::InProcessCluster;
pub use config::{EngineConfig, EngineConfigBuilder, EngineConfigBuilderError};
pub use distributed::{ClusterFailure, ClusterSession, DistributedEngine};
pub use local::LocalEngine;
pub use plan::{Stage, Task};
pub use result::{ExecutionResult, ExecutionStats};

use crate::Result;
use crate::graph::WorkflowGraph;

/// Tracing target for engine operations.
pub(crate) const TRACING_TARGET: &str = "tabula_runtime::engine";

/// Executes frozen workflow graphs against a concrete backend.
///
/// Engines run nodes in a topological order, run independent branches and
/// partition groups concurrently, and stop at the first node failure.
/// The result holds the datasets of leaf and persisted references.
#[async_trait]
pub trait ExecutionEngine: Send + Sync {
    /// Returns the engine name, as exposed to engine-aware nodes.
    fn name(&self) -> &str;

    /// Executes a validated graph.
    async fn execute(&self, graph: &WorkflowGraph) -> Result<ExecutionResult>;
}
