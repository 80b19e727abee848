//! Logical nodes and the handles connecting them.
//!
//! - [`LogicalNode`]: a user function plus its declared inputs and output
//! - [`NodeType`]: the five node kinds and their capabilities
//! - [`DatasetRef`]: handle on the dataset a node produces
//! - [`EngineContext`] / [`TransformContext`]: what user functions receive
//! - [`Params`]: named node parameters

mod context;
mod function;
mod id;
mod kind;
mod logical;
mod params;
mod reference;

pub use context::{EngineContext, TransformContext};
pub use function::{
    CoTransformerFn, CreatorFn, NodeFunction, OutputterFn, ProcessorFn, TransformerFn,
};
pub use id::NodeId;
pub use kind::NodeType;
pub use logical::{InputContract, InputExpectation, LogicalNode, OutputSchema, ZipPolicy};
pub use params::{ParamError, Params};
pub use reference::DatasetRef;
