//! Row filters.

use tabula_data::{RowView, Value};

use crate::node::{DatasetRef, LogicalNode, Params};

/// Processor keeping the rows for which `predicate` holds.
pub fn filter<F>(name: impl Into<String>, input: &DatasetRef, predicate: F) -> LogicalNode
where
    F: Fn(&RowView<'_>) -> bool + Send + Sync + 'static,
{
    LogicalNode::processor(name, [input], input.schema().clone(), move |inputs, _| {
        Ok(inputs[0].filter(|row| predicate(row)))
    })
}

/// Processor keeping the rows whose `column` equals one of `values`.
///
/// The column and the accepted values are recorded as the `column` and
/// `values` parameters.
pub fn filter_in<I, V>(
    name: impl Into<String>,
    input: &DatasetRef,
    column: impl Into<String>,
    values: I,
) -> LogicalNode
where
    I: IntoIterator<Item = V>,
    V: Into<Value>,
{
    let column: String = column.into();
    let values: Vec<serde_json::Value> = values
        .into_iter()
        .map(|value| Into::<Value>::into(value).to_json())
        .collect();
    let params = Params::new().with("column", column).with("values", values);

    LogicalNode::processor(name, [input], input.schema().clone(), |inputs, ctx| {
        let input = &inputs[0];
        let column: String = ctx.params().get("column")?;
        let data_type = input
            .schema()
            .data_type(&column)
            .ok_or_else(|| format!("unknown column '{column}'"))?;
        let accepted = ctx
            .params()
            .get::<Vec<serde_json::Value>>("values")?
            .iter()
            .map(|value| {
                Value::from_json(value, data_type)
                    .ok_or_else(|| format!("value {value} is not a {data_type}"))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(input.filter(|row| row.get(&column).is_some_and(|value| accepted.contains(value))))
    })
    .with_params(params)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tabula_data::{Dataset, Schema};

    use super::*;
    use crate::engine::{ExecutionEngine, LocalEngine};
    use crate::graph::WorkflowGraph;

    fn ratings() -> Dataset {
        let schema: Schema = "id:str,country:str,stars:int".parse().unwrap();
        let rows = [("c_0", "AT", 3), ("c_1", "DE", 5), ("c_2", "ES", 2)]
            .into_iter()
            .map(|(id, country, stars)| vec![id.into(), country.into(), stars.into()])
            .collect();
        Dataset::new(schema, rows).unwrap()
    }

    #[tokio::test]
    async fn filters_by_predicate_and_membership() {
        let data = ratings();
        let mut graph = WorkflowGraph::new();
        let source = graph
            .add(LogicalNode::creator("load", Arc::clone(data.schema()), move |_| {
                Ok(data.clone())
            }))
            .unwrap();
        let starred = graph
            .add(filter("starred", &source, |row| {
                row.get("stars").and_then(Value::as_i64) >= Some(3)
            }))
            .unwrap();
        let dach = graph
            .add(filter_in("dach", &source, "country", ["AT", "DE", "CH"]))
            .unwrap();
        graph.validate().unwrap();

        let result = LocalEngine::with_defaults().execute(&graph).await.unwrap();
        assert_eq!(result.get(&starred).map(Dataset::len), Some(2));
        let countries: Vec<_> = result
            .get(&dach)
            .unwrap()
            .column("country")
            .unwrap()
            .into_iter()
            .cloned()
            .collect();
        assert_eq!(countries, vec![Value::from("AT"), Value::from("DE")]);
    }

    #[tokio::test]
    async fn membership_values_must_match_column_type() {
        let data = ratings();
        let mut graph = WorkflowGraph::new();
        let source = graph
            .add(LogicalNode::creator("load", Arc::clone(data.schema()), move |_| {
                Ok(data.clone())
            }))
            .unwrap();
        graph
            .add(filter_in("bad", &source, "stars", ["three"]))
            .unwrap();
        graph.validate().unwrap();

        let err = LocalEngine::with_defaults().execute(&graph).await.unwrap_err();
        assert!(matches!(err, crate::Error::Execution { ref name, .. } if name == "bad"));
    }
}
