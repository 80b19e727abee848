//! Execution results.

use std::collections::HashMap;

use jiff::SignedDuration;
use serde::Serialize;
use tabula_data::Dataset;

use crate::node::{DatasetRef, NodeId};

/// Counters collected during one execution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ExecutionStats {
    /// Number of nodes that ran.
    pub nodes_executed: usize,
    /// Number of partition tasks that ran.
    pub partitions_processed: usize,
    /// Wall-clock duration of the execution.
    pub elapsed: SignedDuration,
}

/// Datasets materialized by one execution.
///
/// Holds the datasets of leaf nodes and of references marked persisted.
#[derive(Debug, Clone, Default)]
pub struct ExecutionResult {
    datasets: HashMap<NodeId, Dataset>,
    stats: ExecutionStats,
}

impl ExecutionResult {
    pub(crate) fn new(datasets: HashMap<NodeId, Dataset>, stats: ExecutionStats) -> Self {
        Self { datasets, stats }
    }

    /// Returns the dataset behind a reference.
    pub fn get(&self, reference: &DatasetRef) -> Option<&Dataset> {
        self.datasets.get(&reference.node_id())
    }

    /// Returns the dataset produced by a node.
    pub fn get_by_id(&self, id: NodeId) -> Option<&Dataset> {
        self.datasets.get(&id)
    }

    /// Returns the number of datasets.
    pub fn len(&self) -> usize {
        self.datasets.len()
    }

    /// Returns whether no dataset was kept.
    pub fn is_empty(&self) -> bool {
        self.datasets.is_empty()
    }

    /// Iterates over the kept datasets.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Dataset)> {
        self.datasets.iter().map(|(id, dataset)| (*id, dataset))
    }

    /// Returns the execution counters.
    pub fn stats(&self) -> &ExecutionStats {
        &self.stats
    }

    /// Consumes the result and returns the datasets.
    pub fn into_datasets(self) -> HashMap<NodeId, Dataset> {
        self.datasets
    }
}
