//! Stage planning: turns one node and its materialized inputs into tasks.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use tabula_data::{Dataset, PartitionKey, Schema, SchemaError};

use crate::BoxedError;
use crate::node::{
    EngineContext, LogicalNode, NodeFunction, NodeId, Params, TransformContext, ZipPolicy,
};

/// Engine properties exposed to engine-aware nodes.
#[derive(Debug, Clone)]
pub(crate) struct EngineInfo {
    pub name: Arc<str>,
    pub parallelism: usize,
}

type TaskFn = Box<dyn FnOnce() -> Result<Dataset, BoxedError> + Send>;

/// One invocation of a user function over one partition group.
pub struct Task {
    partition: PartitionKey,
    run: TaskFn,
}

impl Task {
    fn new<F>(partition: PartitionKey, run: F) -> Self
    where
        F: FnOnce() -> Result<Dataset, BoxedError> + Send + 'static,
    {
        Self {
            partition,
            run: Box::new(run),
        }
    }

    /// Returns the partition key this task processes.
    pub fn partition(&self) -> &PartitionKey {
        &self.partition
    }

    /// Runs the user function.
    ///
    /// Fails when the function fails or returns a dataset whose schema is
    /// not the declared one.
    pub fn run(self) -> Result<Dataset, BoxedError> {
        (self.run)()
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("partition", &self.partition)
            .finish_non_exhaustive()
    }
}

/// All tasks of one node, submitted to an engine as a unit.
///
/// The stage's result is the concatenation of its task outputs.
#[derive(Debug)]
pub struct Stage {
    name: String,
    node: NodeId,
    node_name: String,
    schema: Arc<Schema>,
    tasks: Vec<Task>,
}

impl Stage {
    /// Returns the stage name under which the result is materialized.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the ID of the planned node.
    pub fn node_id(&self) -> NodeId {
        self.node
    }

    /// Returns the name of the planned node.
    pub fn node_name(&self) -> &str {
        &self.node_name
    }

    /// Returns the schema of the stage result.
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Returns the tasks.
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// Returns the number of tasks.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Returns whether the stage has no task.
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Prefixes the stage name with `scope`, keeping results of concurrent
    /// executions apart.
    pub(crate) fn scoped(mut self, scope: &str) -> Self {
        self.name = format!("{scope}/{}", self.name);
        self
    }

    /// Splits the stage into its result schema and tasks.
    pub fn into_parts(self) -> (Arc<Schema>, Vec<Task>) {
        (self.schema, self.tasks)
    }
}

/// Name of the stage materializing the dataset of `node`.
pub(crate) fn stage_name(node: NodeId) -> String {
    format!("stage-{node}")
}

/// Plans the stage of `node` over its materialized `inputs`.
///
/// `output` is the resolved output schema, `None` for Outputters.
pub(crate) fn plan(
    node: &LogicalNode,
    output: Option<Arc<Schema>>,
    inputs: Vec<Dataset>,
    engine: &EngineInfo,
) -> Result<Stage, BoxedError> {
    let schema = output.unwrap_or_else(|| Arc::new(Schema::empty()));
    let params = Arc::new(node.params().clone());

    let tasks = match node.function() {
        NodeFunction::Creator(f) => {
            let f = Arc::clone(f);
            let ctx = engine_context(node, engine, &params, &schema);
            let expected = Arc::clone(&schema);
            vec![Task::new(PartitionKey::whole(), move || {
                conform(&expected, f(&ctx)?)
            })]
        }
        NodeFunction::Processor(f) => {
            let f = Arc::clone(f);
            let ctx = engine_context(node, engine, &params, &schema);
            let expected = Arc::clone(&schema);
            vec![Task::new(PartitionKey::whole(), move || {
                conform(&expected, f(&inputs[..], &ctx)?)
            })]
        }
        NodeFunction::Outputter(f) => {
            let f = Arc::clone(f);
            let ctx = engine_context(node, engine, &params, &schema);
            let empty = Dataset::empty(Arc::clone(&schema));
            vec![Task::new(PartitionKey::whole(), move || {
                f(&inputs[..], &ctx)?;
                Ok(empty)
            })]
        }
        NodeFunction::Transformer(f) => {
            let input = inputs
                .into_iter()
                .next()
                .ok_or_else(|| BoxedError::from("transformer has no input"))?;
            let groups = match node.inputs().first().and_then(|r| r.partitioning()) {
                Some(partitioning) => input.partition_by(partitioning)?,
                None => vec![(PartitionKey::whole(), input)],
            };

            groups
                .into_iter()
                .map(|(key, group)| {
                    let f = Arc::clone(f);
                    let ctx = transform_context(node, &params, &schema, key.clone());
                    let expected = Arc::clone(&schema);
                    Task::new(key, move || conform(&expected, f(&group, &ctx)?))
                })
                .collect()
        }
        NodeFunction::CoTransformer(f) => zip_groups(node, &inputs)?
            .into_iter()
            .map(|(key, group)| {
                let f = Arc::clone(f);
                let ctx = transform_context(node, &params, &schema, key.clone());
                let expected = Arc::clone(&schema);
                Task::new(key, move || conform(&expected, f(&group[..], &ctx)?))
            })
            .collect(),
    };

    Ok(Stage {
        name: stage_name(node.id()),
        node: node.id(),
        node_name: node.name().to_owned(),
        schema,
        tasks,
    })
}

fn engine_context(
    node: &LogicalNode,
    engine: &EngineInfo,
    params: &Arc<Params>,
    schema: &Arc<Schema>,
) -> EngineContext {
    EngineContext {
        engine: Arc::clone(&engine.name),
        parallelism: engine.parallelism,
        node: node.id(),
        params: Arc::clone(params),
        output: Arc::clone(schema),
    }
}

fn transform_context(
    node: &LogicalNode,
    params: &Arc<Params>,
    schema: &Arc<Schema>,
    partition: PartitionKey,
) -> TransformContext {
    TransformContext {
        node: node.id(),
        params: Arc::clone(params),
        output: Arc::clone(schema),
        partition,
    }
}

/// Rejects datasets that do not carry the declared schema.
fn conform(expected: &Arc<Schema>, dataset: Dataset) -> Result<Dataset, BoxedError> {
    if dataset.schema() != expected {
        return Err(Box::new(SchemaError::Mismatch {
            expected: expected.as_ref().clone(),
            actual: dataset.schema().as_ref().clone(),
        }));
    }
    Ok(dataset)
}

/// Groups the inputs of a CoTransformer by partition key.
///
/// Every input is grouped with the key order of the first input, so key
/// tuples line up even when inputs list their keys differently. Sides
/// missing from a kept group are filled with empty datasets.
fn zip_groups(
    node: &LogicalNode,
    inputs: &[Dataset],
) -> Result<Vec<(PartitionKey, Vec<Dataset>)>, BoxedError> {
    let partitioning = node
        .inputs()
        .first()
        .and_then(|r| r.partitioning())
        .ok_or_else(|| BoxedError::from("cotransformer input 0 is not partitioned"))?;

    let mut sides = Vec::with_capacity(inputs.len());
    for input in inputs {
        let groups: BTreeMap<_, _> = input.partition_by(partitioning)?.into_iter().collect();
        sides.push(groups);
    }

    let Some((first, rest)) = sides.split_first() else {
        return Ok(Vec::new());
    };
    let keys: BTreeSet<PartitionKey> = match node.zip_policy() {
        ZipPolicy::Inner => first
            .keys()
            .filter(|key| rest.iter().all(|side| side.contains_key(*key)))
            .cloned()
            .collect(),
        ZipPolicy::Left => first.keys().cloned().collect(),
        ZipPolicy::Outer => sides.iter().flat_map(|side| side.keys().cloned()).collect(),
    };

    Ok(keys
        .into_iter()
        .map(|key| {
            let group = sides
                .iter_mut()
                .zip(inputs)
                .map(|(side, input)| {
                    side.remove(&key)
                        .unwrap_or_else(|| Dataset::empty(Arc::clone(input.schema())))
                })
                .collect();
            (key, group)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use tabula_data::Value;

    use super::*;
    use crate::node::DatasetRef;

    fn engine() -> EngineInfo {
        EngineInfo {
            name: Arc::from("test"),
            parallelism: 2,
        }
    }

    fn temps(rows: &[(&str, f64)]) -> Dataset {
        let schema: Schema = "city:str,temp:float".parse().unwrap();
        let rows = rows
            .iter()
            .map(|(city, temp)| vec![Value::from(*city), Value::from(*temp)])
            .collect();
        Dataset::new(schema, rows).unwrap()
    }

    fn reference(dataset: &Dataset) -> DatasetRef {
        DatasetRef::new(NodeId::new(), Arc::clone(dataset.schema()))
            .partition_by(["city"])
            .unwrap()
    }

    fn count_node(inputs: [&DatasetRef; 2], policy: ZipPolicy) -> LogicalNode {
        let output: Schema = "left:int,right:int".parse().unwrap();
        LogicalNode::cotransformer("count", inputs, output, |groups, ctx| {
            let row = vec![
                Value::from(groups[0].len() as i64),
                Value::from(groups[1].len() as i64),
            ];
            Ok(ctx.output(vec![row])?)
        })
        .with_zip_policy(policy)
    }

    #[test]
    fn transformer_plans_one_task_per_group() {
        let input = temps(&[("Madrid", 10.0), ("Cluj", 2.0), ("Madrid", 12.0)]);
        let node = LogicalNode::transformer("t", &reference(&input), Arc::clone(input.schema()), |d, _| {
            Ok(d.clone())
        });

        let stage = plan(&node, Some(Arc::clone(input.schema())), vec![input], &engine()).unwrap();
        let keys: Vec<String> = stage.tasks().iter().map(|t| t.partition().to_string()).collect();
        assert_eq!(keys, vec!["(Cluj)", "(Madrid)"]);
        assert_eq!(stage.name(), stage_name(node.id()));
    }

    #[test]
    fn zip_policies_select_groups() {
        let min = temps(&[("Madrid", 5.0), ("Cluj", -3.0)]);
        let max = temps(&[("Madrid", 20.0), ("Oslo", 4.0)]);
        let refs = [reference(&min), reference(&max)];

        let groups = |policy| {
            let node = count_node([&refs[0], &refs[1]], policy);
            zip_groups(&node, &[min.clone(), max.clone()])
                .unwrap()
                .into_iter()
                .map(|(key, sides)| (key.to_string(), sides[0].len(), sides[1].len()))
                .collect::<Vec<_>>()
        };

        assert_eq!(groups(ZipPolicy::Inner), vec![("(Madrid)".into(), 1, 1)]);
        assert_eq!(
            groups(ZipPolicy::Left),
            vec![("(Cluj)".into(), 1, 0), ("(Madrid)".into(), 1, 1)]
        );
        assert_eq!(
            groups(ZipPolicy::Outer),
            vec![
                ("(Cluj)".into(), 1, 0),
                ("(Madrid)".into(), 1, 1),
                ("(Oslo)".into(), 0, 1)
            ]
        );
    }

    #[test]
    fn tasks_reject_undeclared_schemas() {
        let input = temps(&[("Madrid", 10.0)]);
        let declared: Schema = "city:str".parse().unwrap();
        let node = LogicalNode::transformer("t", &reference(&input), declared.clone(), |d, _| {
            Ok(d.clone())
        });

        let stage = plan(&node, Some(Arc::new(declared)), vec![input], &engine()).unwrap();
        let (_, tasks) = stage.into_parts();
        let err = tasks.into_iter().next().unwrap().run().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SchemaError>(),
            Some(SchemaError::Mismatch { .. })
        ));
    }
}
