//! Equi-joins.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use tabula_data::{Dataset, Row, Schema, SchemaError, SchemaResult, Value};

use crate::BoxedError;
use crate::node::{DatasetRef, LogicalNode};

/// Which unmatched rows a join keeps.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(AsRefStr, Display, EnumString)]
#[derive(Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum JoinKind {
    /// Matched rows only.
    #[default]
    Inner,
    /// Every left row; unmatched ones get nulls on the right.
    Left,
    /// Every row of both sides.
    Outer,
}

/// Processor joining `left` and `right` on equal values of the `on`
/// columns.
///
/// The output schema is the left schema followed by the right's non-key
/// columns. Key columns must have the same type on both sides, and non-key
/// names must not collide. Null keys never match.
pub fn join<I, S>(
    name: impl Into<String>,
    left: &DatasetRef,
    right: &DatasetRef,
    on: I,
    kind: JoinKind,
) -> SchemaResult<LogicalNode>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let keys: Vec<String> = on.into_iter().map(Into::into).collect();
    if keys.is_empty() {
        return Err(SchemaError::InvalidExpression {
            expression: String::new(),
            reason: "a join needs at least one key column".into(),
        });
    }

    for key in &keys {
        let unknown = || SchemaError::UnknownColumn(key.clone());
        let expected = left.schema().data_type(key).ok_or_else(unknown)?;
        let actual = right.schema().data_type(key).ok_or_else(unknown)?;
        if expected != actual {
            return Err(SchemaError::TypeConflict {
                column: key.clone(),
                expected,
                actual,
            });
        }
    }

    let mut output = left.schema().as_ref().clone();
    for column in right.schema().columns() {
        if !keys.contains(&column.name) {
            output = output.with_column(column.clone())?;
        }
    }
    let left_keys = left.schema().select(&keys)?;
    let right_keys = right.schema().select(&keys)?;

    let join_keys = keys.clone();
    let node = LogicalNode::processor(name, [left, right], output, move |inputs, ctx| {
        hash_join(&inputs[0], &inputs[1], &join_keys, kind, ctx.output_schema())
    })
    .expect_input(0, left_keys)
    .expect_input(1, right_keys)
    .with_param("on", keys)
    .with_param("kind", kind.as_ref());

    Ok(node)
}

fn hash_join(
    left: &Dataset,
    right: &Dataset,
    keys: &[String],
    kind: JoinKind,
    output: &Arc<Schema>,
) -> Result<Dataset, BoxedError> {
    let left_keys = key_indices(left.schema(), keys)?;
    let right_keys = key_indices(right.schema(), keys)?;
    let right_rest: Vec<usize> = (0..right.schema().len())
        .filter(|i| !right_keys.contains(i))
        .collect();

    let mut index: HashMap<Vec<Value>, Vec<usize>> = HashMap::new();
    for (position, row) in right.rows().iter().enumerate() {
        if let Some(key) = key_of(row, &right_keys) {
            index.entry(key).or_default().push(position);
        }
    }

    let mut matched = vec![false; right.len()];
    let mut rows: Vec<Row> = Vec::new();
    for row in left.rows() {
        match key_of(row, &left_keys).and_then(|key| index.get(&key)) {
            Some(positions) => {
                for &position in positions {
                    matched[position] = true;
                    let other = &right.rows()[position];
                    let mut joined = row.clone();
                    joined.extend(right_rest.iter().map(|&i| other[i].clone()));
                    rows.push(joined);
                }
            }
            None if kind != JoinKind::Inner => {
                let mut joined = row.clone();
                joined.extend(right_rest.iter().map(|_| Value::Null));
                rows.push(joined);
            }
            None => {}
        }
    }

    if kind == JoinKind::Outer {
        let unmatched = right
            .rows()
            .iter()
            .zip(&matched)
            .filter(|(_, matched)| !**matched);
        for (row, _) in unmatched {
            let mut joined = vec![Value::Null; left.schema().len()];
            for (&l, &r) in left_keys.iter().zip(&right_keys) {
                joined[l] = row[r].clone();
            }
            joined.extend(right_rest.iter().map(|&i| row[i].clone()));
            rows.push(joined);
        }
    }

    Ok(Dataset::new(Arc::clone(output), rows)?)
}

fn key_indices(schema: &Schema, keys: &[String]) -> SchemaResult<Vec<usize>> {
    keys.iter().map(|key| schema.require(key)).collect()
}

/// Extracts the key tuple of a row, `None` when any key is null.
fn key_of(row: &[Value], indices: &[usize]) -> Option<Vec<Value>> {
    indices
        .iter()
        .map(|&i| Some(row[i].clone()).filter(|value| !value.is_null()))
        .collect()
}
