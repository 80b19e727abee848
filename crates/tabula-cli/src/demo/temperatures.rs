//! Daily temperature extremes averaged per city.

use tabula_runtime::data::{Dataset, Schema, Value};
use tabula_runtime::graph::{WorkflowGraph, WorkflowMetadata};
use tabula_runtime::node::{LogicalNode, ZipPolicy};

use super::{Workflow, constant};

const MIN_TEMPS: &[(&str, f64)] = &[("Madrid", 8.0), ("Cluj", -2.0), ("Oslo", -6.5)];
const MAX_TEMPS: &[(&str, f64)] = &[("Madrid", 20.0), ("Oslo", 1.5), ("Lima", 24.0)];

fn readings(column: &str, readings: &[(&str, f64)]) -> anyhow::Result<Dataset> {
    let schema: Schema = format!("city:str,{column}:float").parse()?;
    let rows = readings
        .iter()
        .map(|&(city, temp)| vec![city.into(), temp.into()])
        .collect();
    Ok(Dataset::new(schema, rows)?)
}

/// First non-null float of `column`, if any.
fn first(dataset: &Dataset, column: &str) -> Option<f64> {
    dataset
        .column(column)
        .ok()?
        .into_iter()
        .find_map(Value::as_f64)
}

pub fn build() -> anyhow::Result<Workflow> {
    let metadata = WorkflowMetadata::new()
        .with_name("temperatures")
        .with_description("Average of daily minimum and maximum per city")
        .with_tags(["demo"]);

    let (graph, outputs) = WorkflowGraph::build_with_metadata(metadata, |graph| {
        let min = constant(graph, "min_temp", readings("min_temp", MIN_TEMPS)?)?;
        let max = constant(graph, "max_temp", readings("max_temp", MAX_TEMPS)?)?;

        let output: Schema = "city:str,avg_temp:float".parse()?;
        let averages = graph.add(
            LogicalNode::cotransformer(
                "average",
                [&min.partition_by(["city"])?, &max.partition_by(["city"])?],
                output,
                |groups, ctx| {
                    let avg = match (first(&groups[0], "min_temp"), first(&groups[1], "max_temp")) {
                        (Some(low), Some(high)) => Value::Float((low + high) / 2.0),
                        _ => Value::Null,
                    };
                    let mut row = ctx.partition_key().values().to_vec();
                    row.push(avg);
                    Ok(ctx.output(vec![row])?)
                },
            )
            .with_zip_policy(ZipPolicy::Inner),
        )?;

        Ok::<_, anyhow::Error>(vec![("averages".to_owned(), averages)])
    })?;

    Ok(Workflow { graph, outputs })
}

#[cfg(test)]
mod tests {
    use tabula_runtime::engine::{ExecutionEngine, LocalEngine};

    use super::*;

    #[tokio::test]
    async fn averages_cities_with_both_readings() {
        let workflow = build().unwrap();
        let result = LocalEngine::with_defaults().execute(&workflow.graph).await.unwrap();

        let averages = result.get(&workflow.outputs[0].1).unwrap().sorted();
        assert_eq!(
            averages.rows(),
            &[
                vec![Value::from("Madrid"), 14.0.into()],
                vec![Value::from("Oslo"), (-2.5).into()],
            ]
        );
    }
}
