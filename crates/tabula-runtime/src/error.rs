//! Workflow error types.

use tabula_data::{SchemaError, TypeMismatch};
use thiserror::Error;

use crate::node::NodeId;

/// Boxed error returned by user functions and cluster sessions.
pub type BoxedError = Box<dyn std::error::Error + Send + Sync>;

/// Result type for workflow operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors raised while building, validating or executing a workflow.
///
/// Everything except [`Error::Execution`], [`Error::Timeout`] and
/// [`Error::Cancelled`] is raised before any node runs.
#[derive(Debug, Error)]
pub enum Error {
    /// A schema could not be built or derived.
    #[error("schema error in node '{node}': {source}")]
    Schema {
        /// Name of the node being added.
        node: String,
        /// Underlying schema error.
        #[source]
        source: SchemaError,
    },

    /// A producer's output does not satisfy a consumer's declared input.
    #[error(
        "schema mismatch on input {input} of node '{node}': missing [{}], extra [{}], mismatched [{}]",
        .missing.join(", "),
        .extra.join(", "),
        .mismatched.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
    )]
    SchemaMismatch {
        /// Name of the consuming node.
        node: String,
        /// Position of the offending input.
        input: usize,
        /// Declared columns absent from the producer.
        missing: Vec<String>,
        /// Producer columns that were not declared.
        extra: Vec<String>,
        /// Columns whose types differ.
        mismatched: Vec<TypeMismatch>,
    },

    /// The graph contains a dependency cycle.
    #[error("dependency cycle between nodes [{}]", .nodes.join(", "))]
    GraphCycle {
        /// Names of the nodes on the cycle.
        nodes: Vec<String>,
    },

    /// CoTransformer inputs are not comparably partitioned.
    #[error("partition mismatch in node '{node}': {reason}")]
    PartitionMismatch {
        /// Name of the CoTransformer.
        node: String,
        /// Description of the discrepancy.
        reason: String,
    },

    /// The graph was modified after validation.
    #[error("workflow graph is frozen and cannot be modified")]
    FrozenGraph,

    /// Workflow structure is invalid.
    #[error("invalid workflow definition: {0}")]
    InvalidDefinition(String),

    /// A node failed at run time.
    #[error("node '{name}' ({node_id}) failed")]
    Execution {
        /// ID of the failed node.
        node_id: NodeId,
        /// Name of the failed node.
        name: String,
        /// Original failure.
        #[source]
        source: BoxedError,
    },

    /// Workflow execution timed out.
    #[error("workflow execution timed out")]
    Timeout,

    /// Workflow execution was cancelled.
    #[error("workflow execution cancelled")]
    Cancelled,

    /// Internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Returns the ID of the failing node for execution errors.
    pub fn node_id(&self) -> Option<NodeId> {
        match self {
            Self::Execution { node_id, .. } => Some(*node_id),
            _ => None,
        }
    }

    /// Returns whether the error was raised before execution started.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Self::Schema { .. }
                | Self::SchemaMismatch { .. }
                | Self::GraphCycle { .. }
                | Self::PartitionMismatch { .. }
                | Self::FrozenGraph
                | Self::InvalidDefinition(_)
        )
    }
}
