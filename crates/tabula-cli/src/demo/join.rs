//! Orders joined with customers and totalled per customer.

use tabula_runtime::data::{Dataset, Schema, Value};
use tabula_runtime::graph::{WorkflowGraph, WorkflowMetadata};
use tabula_runtime::ops::{self, Aggregation, JoinKind};

use super::{Workflow, constant};

const CUSTOMERS: &[(&str, &str)] = &[("c_0", "Ana"), ("c_1", "Bo"), ("c_2", "Chen")];

const ORDERS: &[(i64, &str, f64)] = &[
    (1, "c_0", 12.5),
    (2, "c_1", 40.0),
    (3, "c_0", 7.5),
    (4, "c_9", 3.0),
];

pub fn build() -> anyhow::Result<Workflow> {
    let metadata = WorkflowMetadata::new()
        .with_name("join")
        .with_description("Order totals per customer")
        .with_tags(["demo"]);

    let (graph, outputs) = WorkflowGraph::build_with_metadata(metadata, |graph| {
        let schema: Schema = "customer:str,name:str".parse()?;
        let rows = CUSTOMERS
            .iter()
            .map(|&(id, name)| vec![id.into(), name.into()])
            .collect();
        let customers = constant(graph, "customers", Dataset::new(schema, rows)?)?;

        let schema: Schema = "order:int,customer:str,amount:float".parse()?;
        let rows = ORDERS
            .iter()
            .map(|&(order, customer, amount)| vec![order.into(), customer.into(), amount.into()])
            .collect();
        let orders = constant(graph, "orders", Dataset::new(schema, rows)?)?;

        let joined = graph.add(ops::join(
            "customer_orders",
            &customers,
            &orders,
            ["customer"],
            JoinKind::Left,
        )?)?;
        let totals = graph.add(ops::aggregate(
            "totals",
            &joined.partition_by(["name"])?,
            [
                Aggregation::count("rows"),
                Aggregation::sum("amount", "total"),
            ],
        )?)?;
        graph.add_node(ops::log("log_totals", [&totals]))?;
        graph.persist(&totals)?;

        Ok::<_, anyhow::Error>(vec![("totals".to_owned(), totals)])
    })?;

    Ok(Workflow { graph, outputs })
}

#[cfg(test)]
mod tests {
    use tabula_runtime::engine::{ExecutionEngine, LocalEngine};

    use super::*;

    #[tokio::test]
    async fn totals_include_customers_without_orders() {
        let workflow = build().unwrap();
        let result = LocalEngine::with_defaults().execute(&workflow.graph).await.unwrap();

        let totals = result.get(&workflow.outputs[0].1).unwrap().sorted();
        assert_eq!(
            totals.rows(),
            &[
                vec![Value::from("Ana"), 2.into(), 20.0.into()],
                vec![Value::from("Bo"), 1.into(), 40.0.into()],
                vec![Value::from("Chen"), 1.into(), Value::Null],
            ]
        );
    }
}
