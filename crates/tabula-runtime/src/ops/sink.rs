//! Terminal outputters.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tabula_data::Dataset;

use super::TRACING_TARGET;
use crate::node::{DatasetRef, LogicalNode};

/// Shared in-memory destination for [`collect`].
#[derive(Debug, Clone, Default)]
pub struct DatasetSink {
    datasets: Arc<Mutex<Vec<Dataset>>>,
}

impl DatasetSink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Dataset>> {
        self.datasets.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends a dataset.
    pub fn push(&self, dataset: Dataset) {
        self.lock().push(dataset);
    }

    /// Returns the collected datasets in arrival order.
    pub fn datasets(&self) -> Vec<Dataset> {
        self.lock().clone()
    }

    /// Removes and returns the collected datasets.
    pub fn take(&self) -> Vec<Dataset> {
        std::mem::take(&mut *self.lock())
    }

    /// Returns the number of collected datasets.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns whether nothing was collected.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

/// Outputter appending each of its inputs to `sink`.
pub fn collect<'a, I>(name: impl Into<String>, inputs: I, sink: &DatasetSink) -> LogicalNode
where
    I: IntoIterator<Item = &'a DatasetRef>,
{
    let sink = sink.clone();
    LogicalNode::outputter(name, inputs, move |inputs, _| {
        for dataset in inputs {
            sink.push(dataset.clone());
        }
        Ok(())
    })
}

/// Outputter emitting the rows of its inputs as tracing events.
///
/// At most `limit` rows per input are logged (parameter, default 20).
pub fn log<'a, I>(name: impl Into<String>, inputs: I) -> LogicalNode
where
    I: IntoIterator<Item = &'a DatasetRef>,
{
    LogicalNode::outputter(name, inputs, |inputs, ctx| {
        let limit: usize = ctx.params().get_or("limit", 20)?;
        for (input, dataset) in inputs.iter().enumerate() {
            tracing::info!(
                target: TRACING_TARGET,
                node_id = %ctx.node_id(),
                input,
                rows = dataset.len(),
                schema = %dataset.schema(),
                "Dataset"
            );
            for row in dataset.iter().take(limit) {
                tracing::info!(target: TRACING_TARGET, input, row = %row.to_json(), "Row");
            }
        }
        Ok(())
    })
}
