//! User function signatures.

use std::fmt;
use std::sync::Arc;

use tabula_data::Dataset;

use super::{EngineContext, NodeType, TransformContext};
use crate::BoxedError;

/// Function of a Creator node.
pub type CreatorFn = Arc<dyn Fn(&EngineContext) -> Result<Dataset, BoxedError> + Send + Sync>;

/// Function of a Processor node.
pub type ProcessorFn =
    Arc<dyn Fn(&[Dataset], &EngineContext) -> Result<Dataset, BoxedError> + Send + Sync>;

/// Function of an Outputter node.
pub type OutputterFn =
    Arc<dyn Fn(&[Dataset], &EngineContext) -> Result<(), BoxedError> + Send + Sync>;

/// Function of a Transformer node, called once per partition group.
pub type TransformerFn =
    Arc<dyn Fn(&Dataset, &TransformContext) -> Result<Dataset, BoxedError> + Send + Sync>;

/// Function of a CoTransformer node, called once per zipped group.
///
/// Receives one dataset per input, in input order.
pub type CoTransformerFn =
    Arc<dyn Fn(&[Dataset], &TransformContext) -> Result<Dataset, BoxedError> + Send + Sync>;

/// A user function tagged with its node kind.
#[derive(Clone)]
pub enum NodeFunction {
    /// See [`CreatorFn`].
    Creator(CreatorFn),
    /// See [`ProcessorFn`].
    Processor(ProcessorFn),
    /// See [`OutputterFn`].
    Outputter(OutputterFn),
    /// See [`TransformerFn`].
    Transformer(TransformerFn),
    /// See [`CoTransformerFn`].
    CoTransformer(CoTransformerFn),
}

impl NodeFunction {
    /// Returns the node kind this function belongs to.
    pub fn node_type(&self) -> NodeType {
        match self {
            Self::Creator(_) => NodeType::Creator,
            Self::Processor(_) => NodeType::Processor,
            Self::Outputter(_) => NodeType::Outputter,
            Self::Transformer(_) => NodeType::Transformer,
            Self::CoTransformer(_) => NodeType::CoTransformer,
        }
    }
}

impl fmt::Debug for NodeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeFunction::{:?}", self.node_type())
    }
}
