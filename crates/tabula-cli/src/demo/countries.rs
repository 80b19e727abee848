//! Ratings of DACH customers enriched with country names.

use std::collections::HashMap;

use tabula_runtime::data::{Dataset, Schema, SchemaDerivation, Value};
use tabula_runtime::graph::{WorkflowGraph, WorkflowMetadata};
use tabula_runtime::node::LogicalNode;
use tabula_runtime::ops::{self, Aggregation};

use super::{Workflow, constant};

const RATINGS: &[(&str, &str, i64)] = &[
    ("c_0", "AT", 3),
    ("c_1", "DE", 5),
    ("c_2", "ES", 2),
    ("c_3", "DE", 4),
    ("c_4", "FR", 1),
    ("c_5", "AT", 4),
];

const COUNTRY_NAMES: &[(&str, &str)] = &[("AT", "Austria"), ("DE", "Germany")];

pub fn build() -> anyhow::Result<Workflow> {
    let metadata = WorkflowMetadata::new()
        .with_name("countries")
        .with_description("Ratings of DACH customers with country names")
        .with_tags(["demo"]);

    let (graph, outputs) = WorkflowGraph::build_with_metadata(metadata, |graph| {
        let schema: Schema = "id:str,country:str,stars:int".parse()?;
        let rows = RATINGS
            .iter()
            .map(|&(id, country, stars)| vec![id.into(), country.into(), stars.into()])
            .collect();
        let ratings = constant(graph, "ratings", Dataset::new(schema, rows)?)?;

        let dach = graph.add(ops::filter_in("dach", &ratings, "country", ["AT", "DE"]))?;

        let lookup: HashMap<&str, &str> = COUNTRY_NAMES.iter().copied().collect();
        let named = graph.add(
            LogicalNode::transformer(
                "country_name",
                &dach.partition_by(["country"])?,
                "*,+country_name:str".parse::<SchemaDerivation>()?,
                |input, ctx| {
                    let lookup: HashMap<String, String> = ctx.params().get("lookup")?;
                    let name = ctx
                        .partition_key()
                        .values()
                        .first()
                        .and_then(Value::as_str)
                        .and_then(|code| lookup.get(code))
                        .cloned();
                    let rows = input
                        .iter()
                        .map(|row| {
                            let mut values = row.to_row();
                            values.push(name.clone().into());
                            values
                        })
                        .collect();
                    Ok(ctx.output(rows)?)
                },
            )
            .with_description("Adds the country name looked up per country group")
            .with_param("lookup", serde_json::to_value(lookup)?),
        )?;

        let summary = graph.add(ops::aggregate(
            "summary",
            &named.partition_by(["country_name"])?,
            [
                Aggregation::count("ratings"),
                Aggregation::mean("stars", "avg_stars"),
            ],
        )?)?;

        graph.persist(&named)?;
        Ok::<_, anyhow::Error>(vec![("rated".to_owned(), named), ("summary".to_owned(), summary)])
    })?;

    Ok(Workflow { graph, outputs })
}

#[cfg(test)]
mod tests {
    use tabula_runtime::engine::{ExecutionEngine, LocalEngine};

    use super::*;

    #[tokio::test]
    async fn keeps_dach_ratings_only() {
        let workflow = build().unwrap();
        let result = LocalEngine::with_defaults().execute(&workflow.graph).await.unwrap();

        let rated = result.get(&workflow.outputs[0].1).unwrap();
        assert_eq!(rated.len(), 4);
        assert!(
            rated
                .column("country_name")
                .unwrap()
                .iter()
                .all(|name| matches!(name.as_str(), Some("Austria" | "Germany")))
        );

        let summary = result.get(&workflow.outputs[1].1).unwrap().sorted();
        assert_eq!(
            summary.rows(),
            &[
                vec![Value::from("Austria"), 2.into(), 3.5.into()],
                vec![Value::from("Germany"), 2.into(), 4.5.into()],
            ]
        );
    }
}
