//! Workflow graph construction and validation.
//!
//! A [`WorkflowGraph`] is built incrementally from [`LogicalNode`]s and
//! frozen by [`WorkflowGraph::validate`]. Only a frozen graph can be
//! executed.
//!
//! [`LogicalNode`]: crate::node::LogicalNode

mod metadata;
mod workflow;

pub use metadata::WorkflowMetadata;
pub use workflow::WorkflowGraph;

/// Tracing target for graph operations.
pub(crate) const TRACING_TARGET: &str = "tabula_runtime::graph";
