//! Grouped aggregations.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use tabula_data::{Column, DataType, Dataset, Row, Schema, SchemaError, SchemaResult, Value};

use crate::BoxedError;
use crate::node::{DatasetRef, LogicalNode};

/// Aggregate function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(AsRefStr, Display, EnumString)]
#[derive(Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AggregateFn {
    /// Number of rows, or of non-null values when a column is given.
    Count,
    /// Sum of non-null values.
    Sum,
    /// Arithmetic mean of non-null values.
    Mean,
    /// Smallest non-null value.
    Min,
    /// Largest non-null value.
    Max,
}

/// One output column of [`aggregate`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Aggregation {
    /// Function to apply.
    pub function: AggregateFn,
    /// Input column, optional for [`AggregateFn::Count`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
    /// Name of the output column.
    pub alias: String,
}

impl Aggregation {
    fn new(function: AggregateFn, column: Option<String>, alias: impl Into<String>) -> Self {
        Self {
            function,
            column,
            alias: alias.into(),
        }
    }

    /// Counts the rows of each group.
    pub fn count(alias: impl Into<String>) -> Self {
        Self::new(AggregateFn::Count, None, alias)
    }

    /// Sums a numeric column.
    pub fn sum(column: impl Into<String>, alias: impl Into<String>) -> Self {
        Self::new(AggregateFn::Sum, Some(column.into()), alias)
    }

    /// Averages a numeric column.
    pub fn mean(column: impl Into<String>, alias: impl Into<String>) -> Self {
        Self::new(AggregateFn::Mean, Some(column.into()), alias)
    }

    /// Takes the minimum of a column.
    pub fn min(column: impl Into<String>, alias: impl Into<String>) -> Self {
        Self::new(AggregateFn::Min, Some(column.into()), alias)
    }

    /// Takes the maximum of a column.
    pub fn max(column: impl Into<String>, alias: impl Into<String>) -> Self {
        Self::new(AggregateFn::Max, Some(column.into()), alias)
    }

    /// Resolves the type of the output column against the input schema.
    fn output_type(&self, input: &Schema) -> SchemaResult<DataType> {
        let source = match &self.column {
            Some(column) => Some(
                input
                    .data_type(column)
                    .ok_or_else(|| SchemaError::UnknownColumn(column.clone()))?,
            ),
            None => None,
        };

        let invalid = |reason: &str| SchemaError::InvalidExpression {
            expression: self.to_string(),
            reason: reason.to_owned(),
        };

        match (self.function, source) {
            (AggregateFn::Count, _) => Ok(DataType::Int),
            (_, None) => Err(invalid("a column is required")),
            (AggregateFn::Sum, Some(DataType::Int)) => Ok(DataType::Int),
            (AggregateFn::Sum | AggregateFn::Mean, Some(DataType::Float)) => Ok(DataType::Float),
            (AggregateFn::Mean, Some(DataType::Int)) => Ok(DataType::Float),
            (AggregateFn::Sum | AggregateFn::Mean, Some(_)) => {
                Err(invalid("the column is not numeric"))
            }
            (AggregateFn::Min | AggregateFn::Max, Some(data_type)) => Ok(data_type),
        }
    }

    /// Computes the aggregate over one group.
    fn evaluate(&self, group: &Dataset) -> Result<Value, BoxedError> {
        let Some(column) = &self.column else {
            return Ok(Value::Int(i64::try_from(group.len())?));
        };
        let values: Vec<&Value> = group
            .column(column)?
            .into_iter()
            .filter(|value| !value.is_null())
            .collect();

        let value = match self.function {
            AggregateFn::Count => Value::Int(i64::try_from(values.len())?),
            _ if values.is_empty() => Value::Null,
            AggregateFn::Sum if group.schema().data_type(column) == Some(DataType::Int) => values
                .iter()
                .filter_map(|value| value.as_i64())
                .try_fold(0i64, i64::checked_add)
                .map(Value::Int)
                .ok_or_else(|| format!("integer overflow in {self}"))?,
            AggregateFn::Sum => Value::Float(values.iter().filter_map(|v| v.as_f64()).sum()),
            AggregateFn::Mean => {
                let sum: f64 = values.iter().filter_map(|v| v.as_f64()).sum();
                Value::Float(sum / values.len() as f64)
            }
            AggregateFn::Min => values.iter().min().map_or(Value::Null, |v| (*v).clone()),
            AggregateFn::Max => values.iter().max().map_or(Value::Null, |v| (*v).clone()),
        };
        Ok(value)
    }
}

impl fmt::Display for Aggregation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let column = self.column.as_deref().unwrap_or("*");
        write!(f, "{}({column}) as {}", self.function, self.alias)
    }
}

/// Transformer computing `aggregations` once per partition group of
/// `input`.
///
/// The output schema is the partition key columns followed by one column
/// per aggregation. An unpartitioned input is aggregated as a whole and
/// yields a single row.
pub fn aggregate<I>(
    name: impl Into<String>,
    input: &DatasetRef,
    aggregations: I,
) -> SchemaResult<LogicalNode>
where
    I: IntoIterator<Item = Aggregation>,
{
    let aggregations: Vec<Aggregation> = aggregations.into_iter().collect();
    let keys = input
        .partitioning()
        .map(|p| p.keys().to_vec())
        .unwrap_or_default();

    let mut output = input.schema().select(&keys)?;
    for aggregation in &aggregations {
        let data_type = aggregation.output_type(input.schema())?;
        output = output.with_column(Column::new(aggregation.alias.clone(), data_type))?;
    }

    let params = serde_json::to_value(&aggregations)
        .map_err(|e| SchemaError::InvalidExpression {
            expression: String::new(),
            reason: e.to_string(),
        })?;

    let node = LogicalNode::transformer(name, input, Arc::new(output), move |group, ctx| {
        let mut row: Row = ctx.partition_key().values().to_vec();
        for aggregation in &aggregations {
            row.push(aggregation.evaluate(group)?);
        }
        Ok(ctx.output(vec![row])?)
    })
    .with_param("aggregations", params);

    Ok(node)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{ExecutionEngine, LocalEngine};
    use crate::graph::WorkflowGraph;

    fn sales() -> Dataset {
        let schema: Schema = "region:str,units:int,price:float".parse().unwrap();
        let rows = vec![
            vec!["north".into(), 3.into(), 2.5.into()],
            vec!["south".into(), 1.into(), 4.0.into()],
            vec!["north".into(), 5.into(), Value::Null],
        ];
        Dataset::new(schema, rows).unwrap()
    }

    #[tokio::test]
    async fn aggregates_per_partition() {
        let data = sales();
        let mut graph = WorkflowGraph::new();
        let source = graph
            .add(LogicalNode::creator("sales", Arc::clone(data.schema()), move |_| {
                Ok(data.clone())
            }))
            .unwrap();
        let node = aggregate(
            "by_region",
            &source.partition_by(["region"]).unwrap(),
            [
                Aggregation::count("rows"),
                Aggregation::sum("units", "units"),
                Aggregation::mean("price", "avg_price"),
                Aggregation::max("units", "most"),
            ],
        )
        .unwrap();
        let totals = graph.add(node).unwrap();
        graph.validate().unwrap();

        assert_eq!(
            totals.schema().to_string(),
            "region:str,rows:int,units:int,avg_price:float,most:int"
        );

        let result = LocalEngine::with_defaults().execute(&graph).await.unwrap();
        let totals = result.get(&totals).unwrap().sorted();
        assert_eq!(
            totals.rows(),
            &[
                vec![Value::from("north"), 2.into(), 8.into(), 2.5.into(), 5.into()],
                vec![Value::from("south"), 1.into(), 1.into(), 4.0.into(), 1.into()],
            ]
        );
    }

    #[test]
    fn evaluates_whole_dataset_and_empty_groups() {
        let data = sales();
        assert_eq!(Aggregation::count("n").evaluate(&data).unwrap(), Value::Int(3));
        assert_eq!(
            Aggregation::min("price", "p").evaluate(&data).unwrap(),
            Value::Float(2.5)
        );

        let empty = Dataset::empty(Arc::clone(data.schema()));
        assert_eq!(Aggregation::sum("units", "u").evaluate(&empty).unwrap(), Value::Null);
        assert_eq!(Aggregation::count("n").evaluate(&empty).unwrap(), Value::Int(0));
    }

    #[test]
    fn rejects_non_numeric_sums() {
        let schema: Schema = "region:str".parse().unwrap();
        let sum = Aggregation::sum("region", "total");
        assert!(matches!(
            sum.output_type(&schema),
            Err(SchemaError::InvalidExpression { .. })
        ));
        assert_eq!(sum.to_string(), "sum(region) as total");
        assert!(matches!(
            Aggregation::max("missing", "m").output_type(&schema),
            Err(SchemaError::UnknownColumn(_))
        ));
    }
}
