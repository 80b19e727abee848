//! Logical node definitions.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use tabula_data::{Dataset, Schema, SchemaDerivation};

use super::{
    DatasetRef, EngineContext, NodeFunction, NodeId, NodeType, Params, TransformContext,
};
use crate::BoxedError;

/// Declared output of a node.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum OutputSchema {
    /// The node produces no dataset.
    #[default]
    None,
    /// An explicit schema.
    Explicit(Arc<Schema>),
    /// A derivation applied to the schema of the first input.
    Derived(SchemaDerivation),
}

impl From<Schema> for OutputSchema {
    fn from(schema: Schema) -> Self {
        Self::Explicit(Arc::new(schema))
    }
}

impl From<Arc<Schema>> for OutputSchema {
    fn from(schema: Arc<Schema>) -> Self {
        Self::Explicit(schema)
    }
}

impl From<SchemaDerivation> for OutputSchema {
    fn from(derivation: SchemaDerivation) -> Self {
        Self::Derived(derivation)
    }
}

/// How a declared input schema is checked against its producer.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(AsRefStr, Display, EnumString)]
#[derive(Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum InputContract {
    /// Every declared column must be produced with the same type.
    #[default]
    Subset,
    /// The producer must also have no other column.
    Exact,
}

/// How CoTransformer groups without a counterpart in every input are
/// handled.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(AsRefStr, Display, EnumString)]
#[derive(Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ZipPolicy {
    /// Keep only keys present in every input.
    #[default]
    Inner,
    /// Keep every key of the first input.
    Left,
    /// Keep every key of any input.
    Outer,
}

/// Input schema a node declares for one of its inputs.
#[derive(Debug, Clone, PartialEq)]
pub struct InputExpectation {
    /// Required schema.
    pub schema: Arc<Schema>,
    /// How it is compared with the producer's schema.
    pub contract: InputContract,
}

/// A typed, schema-checked unit of work.
///
/// Nodes are built with the kind-specific constructors and handed to
/// [`WorkflowGraph::add`](crate::graph::WorkflowGraph::add).
#[derive(Clone)]
pub struct LogicalNode {
    pub(crate) id: NodeId,
    name: String,
    description: Option<String>,
    inputs: Vec<DatasetRef>,
    output: OutputSchema,
    expectations: BTreeMap<usize, InputExpectation>,
    params: Params,
    zip_policy: ZipPolicy,
    function: NodeFunction,
}

impl LogicalNode {
    fn new(
        name: impl Into<String>,
        inputs: Vec<DatasetRef>,
        output: OutputSchema,
        function: NodeFunction,
    ) -> Self {
        Self {
            id: NodeId::new(),
            name: name.into(),
            description: None,
            inputs,
            output,
            expectations: BTreeMap::new(),
            params: Params::new(),
            zip_policy: ZipPolicy::default(),
            function,
        }
    }

    /// Creates a node producing a dataset of `schema` from nothing.
    pub fn creator<F>(name: impl Into<String>, schema: impl Into<Arc<Schema>>, f: F) -> Self
    where
        F: Fn(&EngineContext) -> Result<Dataset, BoxedError> + Send + Sync + 'static,
    {
        let output = OutputSchema::Explicit(schema.into());
        Self::new(name, Vec::new(), output, NodeFunction::Creator(Arc::new(f)))
    }

    /// Creates a node operating on whole input datasets.
    pub fn processor<'a, I, F>(
        name: impl Into<String>,
        inputs: I,
        output: impl Into<OutputSchema>,
        f: F,
    ) -> Self
    where
        I: IntoIterator<Item = &'a DatasetRef>,
        F: Fn(&[Dataset], &EngineContext) -> Result<Dataset, BoxedError> + Send + Sync + 'static,
    {
        let inputs = inputs.into_iter().cloned().collect();
        Self::new(
            name,
            inputs,
            output.into(),
            NodeFunction::Processor(Arc::new(f)),
        )
    }

    /// Creates a terminal node performing a side effect.
    pub fn outputter<'a, I, F>(name: impl Into<String>, inputs: I, f: F) -> Self
    where
        I: IntoIterator<Item = &'a DatasetRef>,
        F: Fn(&[Dataset], &EngineContext) -> Result<(), BoxedError> + Send + Sync + 'static,
    {
        let inputs = inputs.into_iter().cloned().collect();
        Self::new(
            name,
            inputs,
            OutputSchema::None,
            NodeFunction::Outputter(Arc::new(f)),
        )
    }

    /// Creates a node invoked once per partition group of `input`.
    ///
    /// Without partitioning on `input` the whole dataset is one group.
    pub fn transformer<F>(
        name: impl Into<String>,
        input: &DatasetRef,
        output: impl Into<OutputSchema>,
        f: F,
    ) -> Self
    where
        F: Fn(&Dataset, &TransformContext) -> Result<Dataset, BoxedError> + Send + Sync + 'static,
    {
        Self::new(
            name,
            vec![input.clone()],
            output.into(),
            NodeFunction::Transformer(Arc::new(f)),
        )
    }

    /// Creates a node invoked once per partition key shared by `inputs`.
    pub fn cotransformer<'a, I, F>(
        name: impl Into<String>,
        inputs: I,
        output: impl Into<OutputSchema>,
        f: F,
    ) -> Self
    where
        I: IntoIterator<Item = &'a DatasetRef>,
        F: Fn(&[Dataset], &TransformContext) -> Result<Dataset, BoxedError> + Send + Sync + 'static,
    {
        let inputs = inputs.into_iter().cloned().collect();
        Self::new(
            name,
            inputs,
            output.into(),
            NodeFunction::CoTransformer(Arc::new(f)),
        )
    }

    /// Sets the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Replaces the parameters.
    pub fn with_params(mut self, params: Params) -> Self {
        self.params = params;
        self
    }

    /// Sets one parameter.
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.params.insert(name, value);
        self
    }

    /// Sets the zip policy of a CoTransformer.
    pub fn with_zip_policy(mut self, policy: ZipPolicy) -> Self {
        self.zip_policy = policy;
        self
    }

    /// Declares the columns required on input `index`.
    pub fn expect_input(self, index: usize, schema: impl Into<Arc<Schema>>) -> Self {
        self.expect(index, schema.into(), InputContract::Subset)
    }

    /// Declares the exact schema required on input `index`.
    pub fn expect_exact_input(self, index: usize, schema: impl Into<Arc<Schema>>) -> Self {
        self.expect(index, schema.into(), InputContract::Exact)
    }

    fn expect(mut self, index: usize, schema: Arc<Schema>, contract: InputContract) -> Self {
        self.expectations
            .insert(index, InputExpectation { schema, contract });
        self
    }

    /// Returns the node ID.
    #[inline]
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Returns the node name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the description.
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Returns the node kind.
    #[inline]
    pub fn node_type(&self) -> NodeType {
        self.function.node_type()
    }

    /// Returns the input references in order.
    pub fn inputs(&self) -> &[DatasetRef] {
        &self.inputs
    }

    /// Returns the declared output.
    pub fn output(&self) -> &OutputSchema {
        &self.output
    }

    /// Returns the declared schema of input `index`, if any.
    pub fn expectation(&self, index: usize) -> Option<&InputExpectation> {
        self.expectations.get(&index)
    }

    pub(crate) fn expected_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.expectations.keys().copied()
    }

    /// Returns the parameters.
    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Returns the zip policy.
    pub fn zip_policy(&self) -> ZipPolicy {
        self.zip_policy
    }

    /// Returns the user function.
    pub fn function(&self) -> &NodeFunction {
        &self.function
    }
}

impl fmt::Debug for LogicalNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogicalNode")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("type", &self.node_type())
            .field("inputs", &self.inputs.len())
            .field("output", &self.output)
            .field("params", &self.params)
            .field("zip_policy", &self.zip_policy)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> DatasetRef {
        let schema: Schema = "id:str,stars:int".parse().unwrap();
        DatasetRef::new(NodeId::new(), Arc::new(schema))
    }

    #[test]
    fn constructors_tag_the_kind() {
        let input = source();
        let node = LogicalNode::transformer("t", &input, "*".parse::<SchemaDerivation>().unwrap(), |d, _| {
            Ok(d.clone())
        })
        .with_param("factor", 2)
        .expect_input(0, "stars:int".parse::<Schema>().unwrap());

        assert_eq!(node.node_type(), NodeType::Transformer);
        assert_eq!(node.inputs().len(), 1);
        assert!(matches!(node.output(), OutputSchema::Derived(_)));
        assert_eq!(node.params().get::<i64>("factor").unwrap(), 2);
        assert_eq!(
            node.expectation(0).map(|e| e.contract),
            Some(InputContract::Subset)
        );

        let sink = LogicalNode::outputter("out", [&input], |_, _| Ok(()));
        assert_eq!(sink.node_type(), NodeType::Outputter);
        assert_eq!(sink.output(), &OutputSchema::None);
    }

    #[test]
    fn zip_policy_defaults_to_inner() {
        let a = source();
        let b = source();
        let node = LogicalNode::cotransformer("zip", [&a, &b], a.schema().clone(), |d, _| {
            Ok(d[0].clone())
        });
        assert_eq!(node.zip_policy(), ZipPolicy::Inner);
        assert_eq!(
            node.with_zip_policy(ZipPolicy::Outer).zip_policy(),
            ZipPolicy::Outer
        );
        assert_eq!("left".parse::<ZipPolicy>().unwrap(), ZipPolicy::Left);
    }
}
