//! Contexts handed to user functions.

use std::sync::Arc;

use tabula_data::{Dataset, PartitionKey, Row, Schema, SchemaResult};

use super::{NodeId, Params};

/// Context of engine-aware nodes (Creator, Processor, Outputter).
///
/// Exposes the executing engine alongside the node's parameters.
#[derive(Debug, Clone)]
pub struct EngineContext {
    pub(crate) engine: Arc<str>,
    pub(crate) parallelism: usize,
    pub(crate) node: NodeId,
    pub(crate) params: Arc<Params>,
    pub(crate) output: Arc<Schema>,
}

impl EngineContext {
    /// Returns the name of the executing engine.
    pub fn engine(&self) -> &str {
        &self.engine
    }

    /// Returns the engine's partition parallelism.
    pub fn parallelism(&self) -> usize {
        self.parallelism
    }

    /// Returns the ID of the running node.
    pub fn node_id(&self) -> NodeId {
        self.node
    }

    /// Returns the node parameters.
    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Returns the declared output schema.
    ///
    /// Outputters declare the empty schema.
    pub fn output_schema(&self) -> &Arc<Schema> {
        &self.output
    }

    /// Builds a dataset of the declared output schema.
    pub fn output(&self, rows: Vec<Row>) -> SchemaResult<Dataset> {
        Dataset::new(Arc::clone(&self.output), rows)
    }
}

/// Context of engine-unaware nodes (Transformer, CoTransformer).
#[derive(Debug, Clone)]
pub struct TransformContext {
    pub(crate) node: NodeId,
    pub(crate) params: Arc<Params>,
    pub(crate) output: Arc<Schema>,
    pub(crate) partition: PartitionKey,
}

impl TransformContext {
    /// Returns the ID of the running node.
    pub fn node_id(&self) -> NodeId {
        self.node
    }

    /// Returns the node parameters.
    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Returns the declared output schema.
    pub fn output_schema(&self) -> &Arc<Schema> {
        &self.output
    }

    /// Returns the key of the partition group being processed.
    ///
    /// Empty when the input is not partitioned.
    pub fn partition_key(&self) -> &PartitionKey {
        &self.partition
    }

    /// Builds a dataset of the declared output schema.
    pub fn output(&self, rows: Vec<Row>) -> SchemaResult<Dataset> {
        Dataset::new(Arc::clone(&self.output), rows)
    }
}
