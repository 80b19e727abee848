//! Immutable in-memory datasets.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::error::{SchemaError, SchemaResult};
use crate::partition::{PartitionKey, Partitioning};
use crate::schema::Schema;
use crate::types::Value;

/// A positional row of values, aligned with a schema.
pub type Row = Vec<Value>;

/// An immutable table tagged with exactly one schema.
///
/// Cloning is cheap: schema and rows are shared. Every operation returns a
/// new dataset and never mutates the receiver.
#[derive(Clone, PartialEq)]
pub struct Dataset {
    schema: Arc<Schema>,
    rows: Arc<[Row]>,
}

impl Dataset {
    /// Creates a dataset, checking every row against the schema.
    pub fn new(schema: impl Into<Arc<Schema>>, rows: Vec<Row>) -> SchemaResult<Self> {
        let schema = schema.into();
        for (index, row) in rows.iter().enumerate() {
            check_row(&schema, index, row)?;
        }
        Ok(Self {
            schema,
            rows: rows.into(),
        })
    }

    /// Creates an empty dataset.
    pub fn empty(schema: impl Into<Arc<Schema>>) -> Self {
        Self {
            schema: schema.into(),
            rows: Arc::from(Vec::new()),
        }
    }

    /// Builds a dataset from JSON objects keyed by column name.
    ///
    /// Absent keys become `Null`; keys that are not columns are rejected.
    pub fn from_json_rows(
        schema: impl Into<Arc<Schema>>,
        records: &[serde_json::Value],
    ) -> SchemaResult<Self> {
        let schema = schema.into();
        let mut rows = Vec::with_capacity(records.len());

        for (index, record) in records.iter().enumerate() {
            let object = record
                .as_object()
                .ok_or(SchemaError::NotAnObject { row: index })?;

            if let Some(unknown) = object.keys().find(|key| !schema.contains(key)) {
                return Err(SchemaError::UnknownColumn(unknown.clone()));
            }

            let row = schema
                .columns()
                .iter()
                .map(|column| {
                    let json = object.get(&column.name).unwrap_or(&serde_json::Value::Null);
                    Value::from_json(json, column.data_type).ok_or_else(|| SchemaError::ValueType {
                        row: index,
                        column: column.name.clone(),
                        expected: column.data_type,
                        found: json.to_string(),
                    })
                })
                .collect::<SchemaResult<Row>>()?;
            rows.push(row);
        }

        Ok(Self {
            schema,
            rows: rows.into(),
        })
    }

    /// Concatenates datasets that all carry `schema`.
    pub fn concat(
        schema: impl Into<Arc<Schema>>,
        parts: impl IntoIterator<Item = Dataset>,
    ) -> SchemaResult<Self> {
        let schema = schema.into();
        let mut rows = Vec::new();
        for part in parts {
            if part.schema != schema {
                return Err(SchemaError::Mismatch {
                    expected: schema.as_ref().clone(),
                    actual: part.schema.as_ref().clone(),
                });
            }
            rows.extend(part.rows.iter().cloned());
        }
        Ok(Self {
            schema,
            rows: rows.into(),
        })
    }

    /// Returns the schema.
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Returns the number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns whether the dataset has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Returns the raw rows.
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Returns a view of one row.
    pub fn row(&self, index: usize) -> Option<RowView<'_>> {
        self.rows.get(index).map(|values| RowView {
            schema: &self.schema,
            values,
        })
    }

    /// Iterates over row views.
    pub fn iter(&self) -> impl Iterator<Item = RowView<'_>> {
        self.rows.iter().map(|values| RowView {
            schema: &self.schema,
            values,
        })
    }

    /// Returns the values of one column.
    pub fn column(&self, name: &str) -> SchemaResult<Vec<&Value>> {
        let index = self.schema.require(name)?;
        Ok(self.rows.iter().map(|row| &row[index]).collect())
    }

    /// Keeps the rows matching `predicate`.
    pub fn filter(&self, mut predicate: impl FnMut(&RowView<'_>) -> bool) -> Self {
        let rows: Vec<Row> = self
            .iter()
            .filter(|row| predicate(row))
            .map(|row| row.to_row())
            .collect();
        Self {
            schema: Arc::clone(&self.schema),
            rows: rows.into(),
        }
    }

    /// Maps every row into a row of `schema`.
    pub fn map_rows(
        &self,
        schema: impl Into<Arc<Schema>>,
        f: impl FnMut(RowView<'_>) -> Row,
    ) -> SchemaResult<Self> {
        Self::new(schema, self.iter().map(f).collect())
    }

    /// Replaces the rows, keeping the schema.
    pub fn with_rows(&self, rows: Vec<Row>) -> SchemaResult<Self> {
        Self::new(Arc::clone(&self.schema), rows)
    }

    /// Projects onto the named columns.
    pub fn select<S: AsRef<str>>(&self, names: &[S]) -> SchemaResult<Self> {
        let schema = self.schema.select(names)?;
        let indices = names
            .iter()
            .map(|name| self.schema.require(name.as_ref()))
            .collect::<SchemaResult<Vec<_>>>()?;

        let rows: Vec<Row> = self
            .rows
            .iter()
            .map(|row| indices.iter().map(|&i| row[i].clone()).collect())
            .collect();

        Ok(Self {
            schema: Arc::new(schema),
            rows: rows.into(),
        })
    }

    /// Groups rows by the partitioning keys.
    ///
    /// Groups are returned in ascending key order; rows keep their relative
    /// order within a group.
    pub fn partition_by(
        &self,
        partitioning: &Partitioning,
    ) -> SchemaResult<Vec<(PartitionKey, Dataset)>> {
        let indices = partitioning.key_indices(&self.schema)?;
        let mut groups: BTreeMap<PartitionKey, Vec<Row>> = BTreeMap::new();

        for row in self.rows.iter() {
            let key: PartitionKey = indices
                .iter()
                .map(|&i| row[i].clone())
                .collect::<Vec<_>>()
                .into();
            groups.entry(key).or_default().push(row.clone());
        }

        Ok(groups
            .into_iter()
            .map(|(key, rows)| {
                let group = Self {
                    schema: Arc::clone(&self.schema),
                    rows: rows.into(),
                };
                (key, group)
            })
            .collect())
    }

    /// Returns a copy with rows in ascending value order.
    pub fn sorted(&self) -> Self {
        let mut rows = self.rows.to_vec();
        rows.sort();
        Self {
            schema: Arc::clone(&self.schema),
            rows: rows.into(),
        }
    }

    /// Compares schema and row content, ignoring row order.
    pub fn content_eq(&self, other: &Dataset) -> bool {
        self.schema == other.schema && self.sorted().rows == other.sorted().rows
    }

    /// Renders rows as JSON objects keyed by column name.
    pub fn to_json_rows(&self) -> Vec<serde_json::Value> {
        self.iter().map(|row| row.to_json()).collect()
    }
}

impl fmt::Debug for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dataset")
            .field("schema", &self.schema.to_string())
            .field("rows", &self.rows.len())
            .finish()
    }
}

fn check_row(schema: &Schema, index: usize, row: &Row) -> SchemaResult<()> {
    if row.len() != schema.len() {
        return Err(SchemaError::ArityMismatch {
            row: index,
            expected: schema.len(),
            actual: row.len(),
        });
    }

    for (value, column) in row.iter().zip(schema.columns()) {
        if !value.conforms_to(column.data_type) {
            return Err(SchemaError::ValueType {
                row: index,
                column: column.name.clone(),
                expected: column.data_type,
                found: value.to_string(),
            });
        }
    }

    Ok(())
}

/// A borrowed row together with its schema.
#[derive(Debug, Clone, Copy)]
pub struct RowView<'a> {
    schema: &'a Schema,
    values: &'a [Value],
}

impl<'a> RowView<'a> {
    /// Returns the value of a column by name.
    pub fn get(&self, name: &str) -> Option<&'a Value> {
        self.schema.index_of(name).map(|i| &self.values[i])
    }

    /// Returns the value at a column position.
    pub fn value(&self, index: usize) -> Option<&'a Value> {
        self.values.get(index)
    }

    /// Returns all values in schema order.
    pub fn values(&self) -> &'a [Value] {
        self.values
    }

    /// Returns the schema of the row.
    pub fn schema(&self) -> &'a Schema {
        self.schema
    }

    /// Copies the values into an owned row.
    pub fn to_row(&self) -> Row {
        self.values.to_vec()
    }

    /// Renders the row as a JSON object.
    pub fn to_json(&self) -> serde_json::Value {
        let object = self
            .schema
            .names()
            .zip(self.values)
            .map(|(name, value)| (name.to_owned(), value.to_json()))
            .collect::<serde_json::Map<_, _>>();
        serde_json::Value::Object(object)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::DataType;

    fn customers() -> Dataset {
        Dataset::from_json_rows(
            "id:str,country:str,stars:int".parse::<Schema>().unwrap(),
            &[
                json!({"id": "c_0", "country": "AT", "stars": 3}),
                json!({"id": "c_1", "country": "DE", "stars": 5}),
                json!({"id": "c_2", "country": "ES", "stars": 2}),
                json!({"id": "c_3", "country": "DE", "stars": 4}),
            ],
        )
        .unwrap()
    }

    #[test]
    fn new_checks_arity_and_types() {
        let schema: Schema = "a:int,b:str".parse().unwrap();
        assert!(Dataset::new(schema.clone(), vec![vec![1.into(), "x".into()]]).is_ok());
        assert!(Dataset::new(schema.clone(), vec![vec![Value::Null, Value::Null]]).is_ok());
        assert_eq!(
            Dataset::new(schema.clone(), vec![vec![1.into()]]).unwrap_err(),
            SchemaError::ArityMismatch {
                row: 0,
                expected: 2,
                actual: 1
            }
        );
        assert!(matches!(
            Dataset::new(schema, vec![vec!["x".into(), "y".into()]]),
            Err(SchemaError::ValueType { row: 0, .. })
        ));
    }

    #[test]
    fn json_rows_reject_unknown_keys() {
        let schema: Schema = "a:int".parse().unwrap();
        assert_eq!(
            Dataset::from_json_rows(schema, &[json!({"a": 1, "b": 2})]).unwrap_err(),
            SchemaError::UnknownColumn("b".into())
        );
    }

    #[test]
    fn filter_keeps_schema() {
        let data = customers();
        let filtered = data.filter(|row| row.get("stars").and_then(Value::as_i64) >= Some(4));
        assert_eq!(filtered.len(), 2);
        assert_eq!(filtered.schema(), data.schema());
        assert_eq!(data.len(), 4);
    }

    #[test]
    fn partition_by_groups_in_key_order() {
        let data = customers();
        let groups = data
            .partition_by(&Partitioning::new(["country"]).unwrap())
            .unwrap();

        let keys: Vec<String> = groups.iter().map(|(k, _)| k.to_string()).collect();
        assert_eq!(keys, vec!["(\"AT\")", "(\"DE\")", "(\"ES\")"]);
        assert_eq!(groups[1].1.len(), 2);
    }

    #[test]
    fn select_projects_rows() {
        let data = customers().select(&["stars", "id"]).unwrap();
        assert_eq!(data.schema().to_string(), "stars:int,id:str");
        assert_eq!(data.rows()[0], vec![Value::from(3), Value::from("c_0")]);
    }

    #[test]
    fn concat_requires_identical_schema() {
        let data = customers();
        let both = Dataset::concat(Arc::clone(data.schema()), [data.clone(), data.clone()]).unwrap();
        assert_eq!(both.len(), 8);

        let other = data.select(&["id"]).unwrap();
        assert!(matches!(
            Dataset::concat(Arc::clone(data.schema()), [other]),
            Err(SchemaError::Mismatch { .. })
        ));
    }

    #[test]
    fn content_eq_ignores_order() {
        let data = customers();
        let mut reversed = data.rows().to_vec();
        reversed.reverse();
        let reversed = data.with_rows(reversed).unwrap();
        assert_ne!(data, reversed);
        assert!(data.content_eq(&reversed));
    }

    #[test]
    fn map_rows_validates_output() {
        let data = customers();
        let schema = data
            .schema()
            .as_ref()
            .clone()
            .with_column(crate::Column::new("double_stars", DataType::Int))
            .unwrap();
        let mapped = data
            .map_rows(schema, |row| {
                let mut values = row.to_row();
                let stars = row.get("stars").and_then(Value::as_i64).unwrap_or_default();
                values.push(Value::from(stars * 2));
                values
            })
            .unwrap();
        assert_eq!(mapped.rows()[1][3], Value::from(10));
    }

    #[test]
    fn json_round_trip_preserves_column_order() {
        let data = customers();
        let json = data.to_json_rows();
        assert_eq!(
            serde_json::to_string(&json[0]).unwrap(),
            r#"{"id":"c_0","country":"AT","stars":3}"#
        );
    }
}
