//! Convenient re-exports for building and running workflows.

pub use tabula_data::{
    DataType, Dataset, PartitionKey, Partitioning, Row, RowView, Schema, SchemaDerivation,
    SchemaError, Value,
};

pub use crate::engine::{
    ClusterSession, DistributedEngine, EngineConfig, ExecutionEngine, ExecutionResult,
    InProcessCluster, LocalEngine,
};
pub use crate::error::{BoxedError, Error, Result};
pub use crate::graph::{WorkflowGraph, WorkflowMetadata};
pub use crate::node::{
    DatasetRef, EngineContext, InputContract, LogicalNode, NodeId, NodeType, Params,
    TransformContext, ZipPolicy,
};
pub use crate::ops;
