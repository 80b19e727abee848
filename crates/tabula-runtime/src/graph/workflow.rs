//! Workflow graph builder and validator.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use jiff::Timestamp;
use petgraph::Direction;
use petgraph::algo::{tarjan_scc, toposort};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use tabula_data::Schema;

use super::{TRACING_TARGET, WorkflowMetadata};
use crate::error::{Error, Result};
use crate::node::{DatasetRef, InputContract, LogicalNode, NodeId, NodeType, OutputSchema};

/// A graph vertex: either a reserved dataset or a bound node.
#[derive(Debug, Clone)]
enum Slot {
    Reserved(Arc<Schema>),
    Bound(BoundNode),
}

/// A node together with its resolved output schema.
#[derive(Debug, Clone)]
struct BoundNode {
    node: LogicalNode,
    output: Option<Arc<Schema>>,
}

/// Edge from producer to consumer; `input` is the consumer's input position.
#[derive(Debug, Clone, Copy)]
struct EdgeData {
    input: usize,
}

/// A DAG of logical nodes connected by dataset references.
///
/// Construction and execution are separate phases: nodes are added with
/// [`add`](Self::add) / [`add_node`](Self::add_node), then
/// [`validate`](Self::validate) checks the whole graph and freezes it.
/// Engines only accept frozen graphs.
#[derive(Debug, Clone, Default)]
pub struct WorkflowGraph {
    /// The underlying directed graph.
    graph: DiGraph<Slot, EdgeData>,
    /// Mapping from NodeId to petgraph's NodeIndex.
    node_indices: HashMap<NodeId, NodeIndex>,
    /// Reverse mapping from NodeIndex to NodeId.
    index_to_id: HashMap<NodeIndex, NodeId>,
    /// Datasets kept in the execution result.
    persisted: HashSet<NodeId>,
    /// Topological order, set once the graph is frozen.
    order: Option<Vec<NodeId>>,
    /// Workflow metadata.
    pub metadata: WorkflowMetadata,
}

impl WorkflowGraph {
    /// Creates an empty workflow graph.
    pub fn new() -> Self {
        Self::with_metadata(WorkflowMetadata::new())
    }

    /// Creates an empty workflow graph with metadata.
    pub fn with_metadata(metadata: WorkflowMetadata) -> Self {
        Self {
            metadata,
            ..Default::default()
        }
    }

    /// Builds a graph inside `f` and always finalizes it.
    ///
    /// The graph is validated whether `f` succeeds or fails. An error from
    /// `f` takes precedence over a validation error.
    pub fn build<T, E, F>(f: F) -> Result<(Self, T), E>
    where
        F: FnOnce(&mut Self) -> Result<T, E>,
        E: From<Error>,
    {
        Self::build_with_metadata(WorkflowMetadata::new(), f)
    }

    /// Same as [`build`](Self::build), starting from `metadata`.
    pub fn build_with_metadata<T, E, F>(metadata: WorkflowMetadata, f: F) -> Result<(Self, T), E>
    where
        F: FnOnce(&mut Self) -> Result<T, E>,
        E: From<Error>,
    {
        let mut graph = Self::with_metadata(metadata);
        let outcome = f(&mut graph);
        let validated = graph.validate();
        let value = outcome?;
        validated?;
        Ok((graph, value))
    }

    /// Returns the number of nodes, reservations included.
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Returns the number of edges.
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Returns whether the graph is empty.
    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Returns whether the graph has been validated and frozen.
    pub fn is_frozen(&self) -> bool {
        self.order.is_some()
    }

    /// Adds a node and returns the reference to its dataset.
    ///
    /// Returns `None` for Outputters.
    pub fn add_node(&mut self, node: LogicalNode) -> Result<Option<DatasetRef>> {
        self.ensure_mutable()?;
        if self.node_indices.contains_key(&node.id()) {
            return Err(Error::InvalidDefinition(format!(
                "node '{}' ({}) was already added",
                node.name(),
                node.id()
            )));
        }

        let bound = self.prepare(node)?;
        let id = bound.node.id();
        let index = self.graph.add_node(Slot::Bound(bound));
        self.node_indices.insert(id, index);
        self.index_to_id.insert(index, id);
        self.connect(index);

        Ok(self.reference_at(index))
    }

    /// Adds a node that produces a dataset.
    ///
    /// Fails for Outputters, which have nothing to reference.
    pub fn add(&mut self, node: LogicalNode) -> Result<DatasetRef> {
        if !node.node_type().has_output() {
            return Err(Error::InvalidDefinition(format!(
                "outputter '{}' produces no dataset, use add_node",
                node.name()
            )));
        }
        self.add_node(node)?
            .ok_or_else(|| Error::Internal("node with an output has no reference".into()))
    }

    /// Reserves a reference to a dataset whose producer is added later.
    ///
    /// `schema` is the schema consumers of the reservation expect. The
    /// producer is bound with [`add_node_as`](Self::add_node_as).
    pub fn reserve(&mut self, schema: impl Into<Arc<Schema>>) -> Result<DatasetRef> {
        self.ensure_mutable()?;
        let schema = schema.into();
        let id = NodeId::new();
        let index = self.graph.add_node(Slot::Reserved(Arc::clone(&schema)));
        self.node_indices.insert(id, index);
        self.index_to_id.insert(index, id);
        Ok(DatasetRef::new(id, schema))
    }

    /// Binds a node as the producer of a reserved reference.
    pub fn add_node_as(&mut self, reserved: &DatasetRef, mut node: LogicalNode) -> Result<DatasetRef> {
        self.ensure_mutable()?;
        let id = reserved.node_id();
        let index = self.index_of(id)?;
        if let Slot::Bound(bound) = &self.graph[index] {
            return Err(Error::InvalidDefinition(format!(
                "dataset {id} is already produced by '{}'",
                bound.node.name()
            )));
        }
        if !node.node_type().has_output() {
            return Err(Error::InvalidDefinition(format!(
                "outputter '{}' cannot produce a reserved dataset",
                node.name()
            )));
        }

        node.id = id;
        let bound = self.prepare(node)?;
        self.graph[index] = Slot::Bound(bound);
        self.connect(index);

        self.reference_at(index)
            .ok_or_else(|| Error::Internal("bound node has no output schema".into()))
    }

    /// Keeps a dataset in the execution result even when it has consumers.
    pub fn persist(&mut self, reference: &DatasetRef) -> Result<()> {
        self.ensure_mutable()?;
        let id = reference.node_id();
        self.index_of(id)?;
        self.persisted.insert(id);
        Ok(())
    }

    /// Returns a node by ID.
    pub fn node(&self, id: NodeId) -> Option<&LogicalNode> {
        self.bound(id).map(|bound| &bound.node)
    }

    /// Returns the resolved output schema of a node.
    pub fn output_schema(&self, id: NodeId) -> Option<&Arc<Schema>> {
        self.bound(id).and_then(|bound| bound.output.as_ref())
    }

    /// Returns the reference to the dataset of a node.
    pub fn dataset(&self, id: NodeId) -> Option<DatasetRef> {
        self.reference_at(*self.node_indices.get(&id)?)
    }

    /// Returns an iterator over bound nodes.
    pub fn nodes(&self) -> impl Iterator<Item = &LogicalNode> {
        self.graph.node_weights().filter_map(|slot| match slot {
            Slot::Bound(bound) => Some(&bound.node),
            Slot::Reserved(_) => None,
        })
    }

    /// Returns the distinct consumers of a node's dataset.
    pub fn consumers(&self, id: NodeId) -> Vec<NodeId> {
        let mut consumers = self.consumer_edges(id);
        consumers.sort();
        consumers.dedup();
        consumers
    }

    /// Returns one consumer entry per outgoing edge.
    pub(crate) fn consumer_edges(&self, id: NodeId) -> Vec<NodeId> {
        let Some(&index) = self.node_indices.get(&id) else {
            return Vec::new();
        };
        self.graph
            .edges_directed(index, Direction::Outgoing)
            .filter_map(|edge| self.index_to_id.get(&edge.target()).copied())
            .collect()
    }

    /// Returns nodes with an output and no consumers.
    pub fn leaves(&self) -> Vec<NodeId> {
        self.graph
            .node_indices()
            .filter(|&index| {
                matches!(&self.graph[index], Slot::Bound(b) if b.output.is_some())
                    && self
                        .graph
                        .edges_directed(index, Direction::Outgoing)
                        .next()
                        .is_none()
            })
            .filter_map(|index| self.index_to_id.get(&index).copied())
            .collect()
    }

    /// Returns whether a dataset was marked persisted.
    pub fn is_persisted(&self, id: NodeId) -> bool {
        self.persisted.contains(&id)
    }

    /// Returns the topological order of a frozen graph.
    pub fn topological_order(&self) -> Result<&[NodeId]> {
        self.order.as_deref().ok_or_else(|| {
            Error::InvalidDefinition("workflow graph has not been validated".into())
        })
    }

    /// Validates the graph and freezes it.
    ///
    /// Checks, in order:
    /// - every reserved dataset has a producer
    /// - the graph is acyclic
    /// - every producer satisfies the schema its consumer declares
    /// - CoTransformer inputs share partition keys of the same types
    ///
    /// Validating a frozen graph is a no-op.
    pub fn validate(&mut self) -> Result<()> {
        if self.is_frozen() {
            return Ok(());
        }
        if self.graph.node_count() == 0 {
            return Err(Error::InvalidDefinition(
                "workflow must have at least one node".into(),
            ));
        }

        self.check_bound()?;
        self.check_acyclic()?;
        self.check_schemas()?;
        self.check_partitions()?;

        let order = toposort(&self.graph, None)
            .map_err(|cycle| Error::GraphCycle {
                nodes: vec![self.name_at(cycle.node_id())],
            })?
            .into_iter()
            .filter_map(|index| self.index_to_id.get(&index).copied())
            .collect();

        self.order = Some(order);
        self.metadata.frozen_at = Some(Timestamp::now());

        tracing::info!(
            target: TRACING_TARGET,
            nodes = self.graph.node_count(),
            edges = self.graph.edge_count(),
            "Workflow graph validated"
        );

        Ok(())
    }

    fn ensure_mutable(&self) -> Result<()> {
        if self.is_frozen() {
            return Err(Error::FrozenGraph);
        }
        Ok(())
    }

    fn index_of(&self, id: NodeId) -> Result<NodeIndex> {
        self.node_indices.get(&id).copied().ok_or_else(|| {
            Error::InvalidDefinition(format!("dataset {id} is not part of this graph"))
        })
    }

    fn bound(&self, id: NodeId) -> Option<&BoundNode> {
        match self.graph.node_weight(*self.node_indices.get(&id)?)? {
            Slot::Bound(bound) => Some(bound),
            Slot::Reserved(_) => None,
        }
    }

    fn name_at(&self, index: NodeIndex) -> String {
        match &self.graph[index] {
            Slot::Bound(bound) => bound.node.name().to_owned(),
            Slot::Reserved(_) => self
                .index_to_id
                .get(&index)
                .map(ToString::to_string)
                .unwrap_or_default(),
        }
    }

    fn reference_at(&self, index: NodeIndex) -> Option<DatasetRef> {
        let id = *self.index_to_id.get(&index)?;
        match self.graph.node_weight(index)? {
            Slot::Bound(bound) => Some(DatasetRef::new(id, Arc::clone(bound.output.as_ref()?))),
            Slot::Reserved(schema) => Some(DatasetRef::new(id, Arc::clone(schema))),
        }
    }

    /// Checks arity and references, and resolves the output schema.
    fn prepare(&self, node: LogicalNode) -> Result<BoundNode> {
        let kind = node.node_type();
        let name = node.name();
        let inputs = node.inputs();

        if !kind.accepts_inputs(inputs.len()) {
            return Err(Error::InvalidDefinition(format!(
                "{kind} '{name}' requires {}, got {}",
                kind.arity(),
                inputs.len()
            )));
        }
        if let Some(input) = inputs
            .iter()
            .find(|input| !self.node_indices.contains_key(&input.node_id()))
        {
            return Err(Error::InvalidDefinition(format!(
                "node '{name}' references dataset {} which is not part of this graph",
                input.node_id()
            )));
        }
        if let Some(index) = node.expected_indices().find(|&i| i >= inputs.len()) {
            return Err(Error::InvalidDefinition(format!(
                "node '{name}' declares a schema for input {index} but has {} inputs",
                inputs.len()
            )));
        }

        let output = match node.output() {
            _ if !kind.has_output() => None,
            OutputSchema::None => {
                return Err(Error::InvalidDefinition(format!(
                    "{kind} '{name}' must declare an output schema"
                )));
            }
            OutputSchema::Explicit(schema) => Some(Arc::clone(schema)),
            OutputSchema::Derived(derivation) => {
                let base = inputs.first().ok_or_else(|| {
                    Error::InvalidDefinition(format!(
                        "{kind} '{name}' has no input to derive its output schema from"
                    ))
                })?;
                let schema = base.schema().derive(derivation).map_err(|source| {
                    Error::Schema {
                        node: name.to_owned(),
                        source,
                    }
                })?;
                Some(Arc::new(schema))
            }
        };

        tracing::debug!(
            target: TRACING_TARGET,
            node_id = %node.id(),
            node = name,
            kind = %kind,
            inputs = inputs.len(),
            "Node added"
        );

        Ok(BoundNode { node, output })
    }

    /// Adds one edge per input of the node at `index`.
    fn connect(&mut self, index: NodeIndex) {
        let Slot::Bound(bound) = &self.graph[index] else {
            return;
        };
        let edges: Vec<_> = bound
            .node
            .inputs()
            .iter()
            .enumerate()
            .filter_map(|(input, reference)| {
                let producer = *self.node_indices.get(&reference.node_id())?;
                Some((producer, EdgeData { input }))
            })
            .collect();

        for (producer, data) in edges {
            self.graph.add_edge(producer, index, data);
        }
    }

    fn check_bound(&self) -> Result<()> {
        for index in self.graph.node_indices() {
            if let Slot::Reserved(_) = self.graph[index] {
                let consumers: Vec<_> = self
                    .graph
                    .edges_directed(index, Direction::Outgoing)
                    .map(|edge| self.name_at(edge.target()))
                    .collect();
                return Err(Error::InvalidDefinition(format!(
                    "reserved dataset {} consumed by [{}] has no producer",
                    self.name_at(index),
                    consumers.join(", ")
                )));
            }
        }
        Ok(())
    }

    fn check_acyclic(&self) -> Result<()> {
        for mut component in tarjan_scc(&self.graph) {
            let cyclic = component.len() > 1
                || component
                    .first()
                    .is_some_and(|&index| self.graph.contains_edge(index, index));
            if cyclic {
                component.sort();
                let nodes = component
                    .into_iter()
                    .map(|index| self.name_at(index))
                    .collect();
                return Err(Error::GraphCycle { nodes });
            }
        }
        Ok(())
    }

    fn check_schemas(&self) -> Result<()> {
        for edge in self.graph.edge_references() {
            let (Slot::Bound(producer), Slot::Bound(consumer)) =
                (&self.graph[edge.source()], &self.graph[edge.target()])
            else {
                continue;
            };

            let input = edge.weight().input;
            let name = consumer.node.name();
            let provided = producer.output.as_ref().ok_or_else(|| {
                Error::InvalidDefinition(format!(
                    "node '{name}' consumes outputter '{}'",
                    producer.node.name()
                ))
            })?;

            let mut required = vec![(Arc::clone(consumer.node.inputs()[input].schema()), InputContract::Subset)];
            if let Some(expectation) = consumer.node.expectation(input) {
                required.push((Arc::clone(&expectation.schema), expectation.contract));
            }

            for (schema, contract) in required {
                let diff = schema.diff(provided);
                let satisfied = match contract {
                    InputContract::Subset => diff.is_satisfied(),
                    InputContract::Exact => diff.is_empty(),
                };
                if !satisfied {
                    return Err(Error::SchemaMismatch {
                        node: name.to_owned(),
                        input,
                        missing: diff.missing,
                        extra: diff.extra,
                        mismatched: diff.mismatched,
                    });
                }
            }
        }
        Ok(())
    }

    fn check_partitions(&self) -> Result<()> {
        for slot in self.graph.node_weights() {
            let Slot::Bound(bound) = slot else {
                continue;
            };
            let node = &bound.node;
            if !node.node_type().is_partitioned() {
                continue;
            }

            let name = node.name();
            let mismatch = |reason: String| Error::PartitionMismatch {
                node: name.to_owned(),
                reason,
            };

            let mut provided = Vec::with_capacity(node.inputs().len());
            for (i, input) in node.inputs().iter().enumerate() {
                let schema = self
                    .output_schema(input.node_id())
                    .ok_or_else(|| mismatch(format!("input {i} has no producer schema")))?;
                if let Some(partitioning) = input.partitioning() {
                    partitioning.validate(schema).map_err(|e| {
                        mismatch(format!("input {i} is partitioned by {partitioning}: {e}"))
                    })?;
                }
                provided.push(schema);
            }

            if node.node_type() != NodeType::CoTransformer {
                continue;
            }

            let first = node.inputs()[0]
                .partitioning()
                .ok_or_else(|| mismatch("input 0 is not partitioned".into()))?;
            for (i, input) in node.inputs().iter().enumerate().skip(1) {
                let partitioning = input
                    .partitioning()
                    .ok_or_else(|| mismatch(format!("input {i} is not partitioned")))?;
                if !first.same_keys(partitioning) {
                    return Err(mismatch(format!(
                        "input {i} is partitioned by {partitioning}, input 0 by {first}"
                    )));
                }
                for key in first.keys() {
                    if let (Some(expected), Some(actual)) =
                        (provided[0].data_type(key), provided[i].data_type(key))
                        && expected != actual
                    {
                        return Err(mismatch(format!(
                            "key '{key}' is {expected} on input 0 and {actual} on input {i}"
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tabula_data::{SchemaDerivation, SchemaError};

    use super::*;
    use crate::node::ZipPolicy;

    fn creator(name: &str, schema: &str) -> LogicalNode {
        let schema: Schema = schema.parse().unwrap();
        LogicalNode::creator(name, schema, |ctx| Ok(ctx.output(Vec::new())?))
    }

    fn passthrough(name: &str, input: &DatasetRef) -> LogicalNode {
        LogicalNode::processor(name, [input], input.schema().clone(), |inputs, _| {
            Ok(inputs[0].clone())
        })
    }

    fn zip(name: &str, inputs: [&DatasetRef; 2]) -> LogicalNode {
        let output: Schema = "city:str".parse().unwrap();
        LogicalNode::cotransformer(name, inputs, output, |inputs, _| Ok(inputs[0].clone()))
    }

    #[test]
    fn derives_output_schema_from_first_input() {
        let mut graph = WorkflowGraph::new();
        let source = graph.add(creator("load", "id:str,stars:int")).unwrap();
        let derivation: SchemaDerivation = "*,-stars,+score:float".parse().unwrap();
        let scored = graph
            .add(LogicalNode::transformer("score", &source, derivation, |d, _| Ok(d.clone())))
            .unwrap();

        assert_eq!(scored.schema().to_string(), "id:str,score:float");
        assert_eq!(graph.consumers(source.node_id()), vec![scored.node_id()]);
        assert_eq!(graph.leaves(), vec![scored.node_id()]);
    }

    #[test]
    fn rejects_bad_derivation_at_add_time() {
        let mut graph = WorkflowGraph::new();
        let source = graph.add(creator("load", "id:str")).unwrap();
        let derivation: SchemaDerivation = "*,-missing".parse().unwrap();
        let err = graph
            .add(LogicalNode::transformer("bad", &source, derivation, |d, _| Ok(d.clone())))
            .unwrap_err();

        assert!(matches!(
            err,
            Error::Schema { ref node, source: SchemaError::UnknownColumn(ref column) }
                if node == "bad" && column == "missing"
        ));
    }

    #[test]
    fn checks_input_arity() {
        let mut graph = WorkflowGraph::new();
        let a = graph.add(creator("a", "city:str")).unwrap();
        let err = graph
            .add(LogicalNode::cotransformer("solo", [&a], a.schema().clone(), |d, _| {
                Ok(d[0].clone())
            }))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidDefinition(_)));

        let sink = LogicalNode::outputter("sink", [&a], |_, _| Ok(()));
        assert!(matches!(graph.add(sink.clone()), Err(Error::InvalidDefinition(_))));
        assert_eq!(graph.add_node(sink).unwrap(), None);
    }

    #[test]
    fn rejects_foreign_references() {
        let mut other = WorkflowGraph::new();
        let foreign = other.add(creator("elsewhere", "id:str")).unwrap();

        let mut graph = WorkflowGraph::new();
        let err = graph.add(passthrough("p", &foreign)).unwrap_err();
        assert!(matches!(err, Error::InvalidDefinition(_)));
    }

    #[test]
    fn frozen_graph_rejects_changes() {
        let mut graph = WorkflowGraph::new();
        let source = graph.add(creator("load", "id:str")).unwrap();
        graph.validate().unwrap();

        assert!(graph.is_frozen());
        assert!(graph.metadata.frozen_at.is_some());
        assert!(matches!(
            graph.add(passthrough("late", &source)),
            Err(Error::FrozenGraph)
        ));
        assert!(matches!(graph.persist(&source), Err(Error::FrozenGraph)));
        assert!(matches!(
            graph.reserve(source.schema().clone()),
            Err(Error::FrozenGraph)
        ));
        assert!(graph.validate().is_ok());
    }

    #[test]
    fn detects_cycles_through_reservations() {
        let mut graph = WorkflowGraph::new();
        let schema: Schema = "id:str".parse().unwrap();
        let b = graph.reserve(schema).unwrap();
        let a = graph.add(passthrough("a", &b)).unwrap();
        graph.add_node_as(&b, passthrough("b", &a)).unwrap();

        let err = graph.validate().unwrap_err();
        match err {
            Error::GraphCycle { nodes } => {
                assert_eq!(nodes.len(), 2);
                assert!(nodes.contains(&"a".to_string()));
                assert!(nodes.contains(&"b".to_string()));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(!graph.is_frozen());
    }

    #[test]
    fn detects_self_loops() {
        let mut graph = WorkflowGraph::new();
        let schema: Schema = "id:str".parse().unwrap();
        let this = graph.reserve(schema).unwrap();
        graph.add_node_as(&this, passthrough("self", &this)).unwrap();

        assert!(matches!(
            graph.validate(),
            Err(Error::GraphCycle { nodes }) if nodes == vec!["self".to_string()]
        ));
    }

    #[test]
    fn rejects_unbound_reservations() {
        let mut graph = WorkflowGraph::new();
        let pending = graph.reserve("id:str".parse::<Schema>().unwrap()).unwrap();
        graph.add(passthrough("consumer", &pending)).unwrap();

        assert!(matches!(graph.validate(), Err(Error::InvalidDefinition(_))));
    }

    #[test]
    fn rejects_binding_twice() {
        let mut graph = WorkflowGraph::new();
        let pending = graph.reserve("id:str".parse::<Schema>().unwrap()).unwrap();
        graph.add_node_as(&pending, creator("first", "id:str")).unwrap();
        assert!(matches!(
            graph.add_node_as(&pending, creator("second", "id:str")),
            Err(Error::InvalidDefinition(_))
        ));
    }

    #[test]
    fn reports_missing_columns() {
        let mut graph = WorkflowGraph::new();
        let source = graph.add(creator("load", "id:str,stars:int")).unwrap();
        let required: Schema = "id:str,country:str".parse().unwrap();
        graph
            .add(passthrough("enrich", &source).expect_input(0, required))
            .unwrap();

        let err = graph.validate().unwrap_err();
        match err {
            Error::SchemaMismatch {
                node,
                input,
                missing,
                extra,
                mismatched,
            } => {
                assert_eq!(node, "enrich");
                assert_eq!(input, 0);
                assert_eq!(missing, vec!["country".to_string()]);
                assert_eq!(extra, vec!["stars".to_string()]);
                assert!(mismatched.is_empty());
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn reservation_schema_must_match_producer() {
        let mut graph = WorkflowGraph::new();
        let pending = graph.reserve("id:str,stars:int".parse::<Schema>().unwrap()).unwrap();
        graph.add(passthrough("consumer", &pending)).unwrap();
        graph
            .add_node_as(&pending, creator("producer", "id:str,stars:float"))
            .unwrap();

        assert!(matches!(
            graph.validate(),
            Err(Error::SchemaMismatch { mismatched, .. }) if mismatched.len() == 1
        ));
    }

    #[test]
    fn exact_contract_rejects_extra_columns() {
        let mut graph = WorkflowGraph::new();
        let source = graph.add(creator("load", "id:str,stars:int")).unwrap();
        let subset: Schema = "id:str".parse().unwrap();
        graph
            .add(passthrough("lenient", &source).expect_input(0, subset.clone()))
            .unwrap();
        let mut strict = graph.clone();
        graph.validate().unwrap();

        strict
            .add(passthrough("strict", &source).expect_exact_input(0, subset))
            .unwrap();
        assert!(matches!(
            strict.validate(),
            Err(Error::SchemaMismatch { node, .. }) if node == "strict"
        ));
    }

    #[test]
    fn cotransformer_requires_partitioning() {
        let mut graph = WorkflowGraph::new();
        let a = graph.add(creator("a", "city:str,t:float")).unwrap();
        let b = graph.add(creator("b", "city:str,t:float")).unwrap();
        graph
            .add(zip("zip", [&a.partition_by(["city"]).unwrap(), &b]))
            .unwrap();

        assert!(matches!(
            graph.validate(),
            Err(Error::PartitionMismatch { node, .. }) if node == "zip"
        ));
    }

    #[test]
    fn cotransformer_requires_same_key_sets() {
        let mut graph = WorkflowGraph::new();
        let a = graph.add(creator("a", "city:str,day:int")).unwrap();
        let b = graph.add(creator("b", "city:str,day:int")).unwrap();
        graph
            .add(zip(
                "zip",
                [
                    &a.partition_by(["city"]).unwrap(),
                    &b.partition_by(["day"]).unwrap(),
                ],
            ))
            .unwrap();

        assert!(matches!(graph.validate(), Err(Error::PartitionMismatch { .. })));
    }

    #[test]
    fn cotransformer_key_order_is_irrelevant_but_types_matter() {
        let mut graph = WorkflowGraph::new();
        let a = graph.add(creator("a", "city:str,day:int")).unwrap();
        let b = graph.add(creator("b", "day:int,city:str")).unwrap();
        graph
            .add(zip(
                "zip",
                [
                    &a.partition_by(["city", "day"]).unwrap(),
                    &b.partition_by(["day", "city"]).unwrap(),
                ],
            )
            .with_zip_policy(ZipPolicy::Outer))
            .unwrap();
        let mut typed = graph.clone();
        graph.validate().unwrap();

        let c = typed.add(creator("c", "city:str,day:str")).unwrap();
        typed
            .add(zip(
                "typed",
                [
                    &a.partition_by(["city", "day"]).unwrap(),
                    &c.partition_by(["city", "day"]).unwrap(),
                ],
            ))
            .unwrap();
        assert!(matches!(
            typed.validate(),
            Err(Error::PartitionMismatch { node, .. }) if node == "typed"
        ));
    }

    #[test]
    fn build_scope_always_finalizes() {
        let (graph, source) = WorkflowGraph::build(|graph| {
            graph.add(creator("load", "id:str"))
        })
        .unwrap();
        assert!(graph.is_frozen());
        assert_eq!(graph.topological_order().unwrap(), &[source.node_id()]);

        let err = WorkflowGraph::build(|graph| -> Result<()> {
            let pending = graph.reserve("id:str".parse::<Schema>().unwrap())?;
            graph.add(passthrough("consumer", &pending))?;
            Ok(())
        })
        .unwrap_err();
        assert!(matches!(err, Error::InvalidDefinition(_)));
    }

    #[test]
    fn topological_order_respects_edges() {
        let mut graph = WorkflowGraph::new();
        assert!(graph.topological_order().is_err());

        let source = graph.add(creator("load", "id:str")).unwrap();
        let left = graph.add(passthrough("left", &source)).unwrap();
        let right = graph.add(passthrough("right", &source)).unwrap();
        graph.persist(&left).unwrap();
        graph.validate().unwrap();

        let order = graph.topological_order().unwrap();
        let position = |id: NodeId| order.iter().position(|&n| n == id).unwrap();
        assert!(position(source.node_id()) < position(left.node_id()));
        assert!(position(source.node_id()) < position(right.node_id()));
        assert!(graph.is_persisted(left.node_id()));
        assert_eq!(graph.consumers(source.node_id()).len(), 2);
    }
}
