//! Bundled demo workflows.

mod countries;
mod join;
mod temperatures;

use std::sync::Arc;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display};
use tabula_runtime::data::Dataset;
use tabula_runtime::graph::WorkflowGraph;
use tabula_runtime::node::{DatasetRef, LogicalNode};

/// Workflows shipped with the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[derive(AsRefStr, Display, ValueEnum)]
#[derive(Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Demo {
    /// Ratings filtered to two countries and enriched with their names.
    Countries,
    /// Daily minimum and maximum temperatures averaged per city.
    Temperatures,
    /// Orders joined with customers and totalled per customer.
    Join,
}

/// A validated demo graph and the datasets worth printing.
#[derive(Debug)]
pub struct Workflow {
    pub graph: WorkflowGraph,
    pub outputs: Vec<(String, DatasetRef)>,
}

impl Demo {
    /// Builds and validates the workflow.
    pub fn build(self) -> anyhow::Result<Workflow> {
        match self {
            Self::Countries => countries::build(),
            Self::Temperatures => temperatures::build(),
            Self::Join => join::build(),
        }
    }
}

/// Adds a Creator returning a fixed dataset.
fn constant(graph: &mut WorkflowGraph, name: &str, data: Dataset) -> anyhow::Result<DatasetRef> {
    let schema = Arc::clone(data.schema());
    let node = LogicalNode::creator(name, schema, move |_| Ok(data.clone()));
    Ok(graph.add(node)?)
}

#[cfg(test)]
mod tests {
    use tabula_runtime::engine::{
        DistributedEngine, EngineConfig, ExecutionEngine, InProcessCluster, LocalEngine,
    };

    use super::*;

    #[tokio::test]
    async fn demos_agree_across_engines() {
        let config = EngineConfig::builder().parallelism(2usize).build().unwrap();
        let local = LocalEngine::new(config.clone());
        let distributed = DistributedEngine::new(InProcessCluster::new(2), config);

        for demo in Demo::value_variants() {
            let workflow = demo.build().unwrap();
            let left = local.execute(&workflow.graph).await.unwrap();
            let right = distributed.execute(&workflow.graph).await.unwrap();

            for (name, reference) in &workflow.outputs {
                let left = left.get(reference).unwrap();
                let right = right.get(reference).unwrap();
                assert!(left.content_eq(right), "{demo}: {name} differs");
            }
        }
    }
}
