//! Partitioning keys.

use std::collections::BTreeSet;
use std::fmt;

use derive_more::{Deref, From, Into};
use serde::{Deserialize, Serialize};

use crate::error::{SchemaError, SchemaResult};
use crate::schema::Schema;
use crate::types::Value;

/// Grouping keys attached to a dataset reference.
///
/// Keys are ordered (the order defines the layout of a [`PartitionKey`])
/// but two partitionings are considered compatible when their key *sets*
/// are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Partitioning {
    keys: Vec<String>,
}

impl Partitioning {
    /// Creates a partitioning from key column names.
    pub fn new<I, S>(keys: I) -> SchemaResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let keys: Vec<String> = keys.into_iter().map(Into::into).collect();
        if keys.is_empty() {
            return Err(SchemaError::EmptyPartitioning);
        }

        let mut seen = BTreeSet::new();
        for key in &keys {
            if !seen.insert(key.as_str()) {
                return Err(SchemaError::DuplicateColumn(key.clone()));
            }
        }

        Ok(Self { keys })
    }

    /// Returns the key column names in order.
    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    /// Returns the key column names as a set.
    pub fn key_set(&self) -> BTreeSet<&str> {
        self.keys.iter().map(String::as_str).collect()
    }

    /// Returns whether both partitionings use the same key set.
    pub fn same_keys(&self, other: &Partitioning) -> bool {
        self.key_set() == other.key_set()
    }

    /// Resolves key positions within `schema`.
    pub fn key_indices(&self, schema: &Schema) -> SchemaResult<Vec<usize>> {
        self.keys.iter().map(|key| schema.require(key)).collect()
    }

    /// Checks that every key exists in `schema`.
    pub fn validate(&self, schema: &Schema) -> SchemaResult<()> {
        self.key_indices(schema).map(|_| ())
    }
}

impl fmt::Display for Partitioning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.keys.join(", "))
    }
}

/// The key tuple identifying one partition group.
///
/// The key of an unpartitioned dataset is the empty tuple.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[derive(Deref, From, Into, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PartitionKey(Vec<Value>);

impl PartitionKey {
    /// Returns the key of an unpartitioned dataset.
    pub fn whole() -> Self {
        Self::default()
    }

    /// Returns the key values.
    pub fn values(&self) -> &[Value] {
        &self.0
    }
}

impl fmt::Display for PartitionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for (i, value) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{value}")?;
        }
        f.write_str(")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_and_duplicate_keys() {
        assert_eq!(
            Partitioning::new(Vec::<String>::new()),
            Err(SchemaError::EmptyPartitioning)
        );
        assert_eq!(
            Partitioning::new(["a", "a"]),
            Err(SchemaError::DuplicateColumn("a".into()))
        );
    }

    #[test]
    fn compares_key_sets() {
        let a = Partitioning::new(["city", "year"]).unwrap();
        let b = Partitioning::new(["year", "city"]).unwrap();
        let c = Partitioning::new(["city"]).unwrap();
        assert!(a.same_keys(&b));
        assert!(!a.same_keys(&c));
    }

    #[test]
    fn validates_against_schema() {
        let schema: Schema = "city:str,temp:float".parse().unwrap();
        assert!(Partitioning::new(["city"]).unwrap().validate(&schema).is_ok());
        assert_eq!(
            Partitioning::new(["year"]).unwrap().validate(&schema),
            Err(SchemaError::UnknownColumn("year".into()))
        );
    }

    #[test]
    fn key_displays_as_tuple() {
        let key = PartitionKey::from(vec![Value::from("Madrid"), Value::from(2024)]);
        assert_eq!(key.to_string(), "(\"Madrid\", 2024)");
    }
}
