//! Dataset references.

use std::sync::Arc;

use tabula_data::{Partitioning, Schema, SchemaResult};

use super::NodeId;

/// Handle on the dataset produced by one node.
///
/// References are returned by [`WorkflowGraph::add`] and passed to the
/// constructors of downstream nodes. They carry the schema the consumer
/// will see and, optionally, the partitioning that governs per-group
/// execution of Transformers and CoTransformers.
///
/// [`WorkflowGraph::add`]: crate::graph::WorkflowGraph::add
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetRef {
    node: NodeId,
    schema: Arc<Schema>,
    partitioning: Option<Partitioning>,
}

impl DatasetRef {
    pub(crate) fn new(node: NodeId, schema: Arc<Schema>) -> Self {
        Self {
            node,
            schema,
            partitioning: None,
        }
    }

    /// Returns the ID of the producing node.
    #[inline]
    pub fn node_id(&self) -> NodeId {
        self.node
    }

    /// Returns the schema of the referenced dataset.
    #[inline]
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Returns the declared partitioning, if any.
    #[inline]
    pub fn partitioning(&self) -> Option<&Partitioning> {
        self.partitioning.as_ref()
    }

    /// Returns a copy of this reference partitioned by `keys`.
    ///
    /// Every key must be a column of the referenced schema.
    pub fn partition_by<I, S>(&self, keys: I) -> SchemaResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let partitioning = Partitioning::new(keys)?;
        partitioning.validate(&self.schema)?;
        Ok(Self {
            partitioning: Some(partitioning),
            ..self.clone()
        })
    }

    /// Returns a copy of this reference without partitioning.
    pub fn unpartitioned(&self) -> Self {
        Self {
            partitioning: None,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use tabula_data::SchemaError;

    use super::*;

    fn reference() -> DatasetRef {
        let schema: Schema = "city:str,temp:float".parse().unwrap();
        DatasetRef::new(NodeId::new(), Arc::new(schema))
    }

    #[test]
    fn partition_keys_must_exist() {
        let base = reference();
        let by_city = base.partition_by(["city"]).unwrap();
        assert_eq!(by_city.node_id(), base.node_id());
        assert_eq!(by_city.partitioning().map(|p| p.keys().len()), Some(1));
        assert!(by_city.unpartitioned().partitioning().is_none());

        assert_eq!(
            base.partition_by(["country"]),
            Err(SchemaError::UnknownColumn("country".into()))
        );
        assert_eq!(
            base.partition_by(Vec::<String>::new()),
            Err(SchemaError::EmptyPartitioning)
        );
    }
}
