//! Node kinds and their capabilities.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// The five kinds of logical node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(AsRefStr, Display, EnumString)]
#[derive(Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    /// Produces a dataset from nothing.
    Creator,
    /// Whole-dataset function over one or more inputs.
    Processor,
    /// Terminal side effect over one or more inputs.
    Outputter,
    /// Per-partition function over one input.
    Transformer,
    /// Per-partition function over several co-partitioned inputs.
    #[strum(to_string = "cotransformer", serialize = "co_transformer")]
    CoTransformer,
}

impl NodeType {
    /// Returns whether the user function receives the engine context.
    pub const fn engine_aware(self) -> bool {
        matches!(self, Self::Creator | Self::Processor | Self::Outputter)
    }

    /// Returns whether the node produces a dataset.
    pub const fn has_output(self) -> bool {
        !matches!(self, Self::Outputter)
    }

    /// Returns whether the node runs once per partition group.
    pub const fn is_partitioned(self) -> bool {
        matches!(self, Self::Transformer | Self::CoTransformer)
    }

    /// Returns whether the node accepts `count` inputs.
    pub const fn accepts_inputs(self, count: usize) -> bool {
        match self {
            Self::Creator => count == 0,
            Self::Processor | Self::Outputter => count >= 1,
            Self::Transformer => count == 1,
            Self::CoTransformer => count >= 2,
        }
    }

    /// Describes the accepted number of inputs.
    pub const fn arity(self) -> &'static str {
        match self {
            Self::Creator => "no inputs",
            Self::Processor | Self::Outputter => "at least one input",
            Self::Transformer => "exactly one input",
            Self::CoTransformer => "at least two inputs",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capabilities() {
        assert!(NodeType::Processor.engine_aware());
        assert!(!NodeType::CoTransformer.engine_aware());
        assert!(!NodeType::Outputter.has_output());
        assert!(NodeType::Transformer.accepts_inputs(1));
        assert!(!NodeType::Transformer.accepts_inputs(2));
        assert!(!NodeType::CoTransformer.accepts_inputs(1));
        assert!(!NodeType::Creator.accepts_inputs(1));
        assert_eq!(
            "co_transformer".parse::<NodeType>().unwrap(),
            NodeType::CoTransformer
        );
        assert_eq!(NodeType::CoTransformer.to_string(), "cotransformer");
    }
}
