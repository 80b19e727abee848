//! Ordered, name-unique column descriptions.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{SchemaError, SchemaResult};
use crate::types::DataType;

/// A named, typed column.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Column {
    /// Column name, unique within its schema.
    pub name: String,
    /// Column type.
    #[serde(rename = "type")]
    pub data_type: DataType,
}

impl Column {
    /// Creates a new column.
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.data_type)
    }
}

impl FromStr for Column {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, data_type) = s.split_once(':').ok_or_else(|| SchemaError::InvalidExpression {
            expression: s.to_owned(),
            reason: "expected 'name:type'".into(),
        })?;

        let name = name.trim();
        if name.is_empty() {
            return Err(SchemaError::InvalidExpression {
                expression: s.to_owned(),
                reason: "column name is empty".into(),
            });
        }

        let data_type = data_type.trim();
        let data_type = data_type
            .parse::<DataType>()
            .map_err(|_| SchemaError::UnknownType(data_type.to_owned()))?;

        Ok(Self::new(name, data_type))
    }
}

/// An ordered sequence of uniquely named columns.
///
/// Equality is structural and order-sensitive. Use [`Schema::diff`] for
/// name-based compatibility checks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<Column>", into = "Vec<Column>")]
pub struct Schema {
    columns: Vec<Column>,
}

impl Schema {
    /// Creates a schema, rejecting duplicate column names.
    pub fn new(columns: impl IntoIterator<Item = Column>) -> SchemaResult<Self> {
        let columns: Vec<Column> = columns.into_iter().collect();
        let mut seen = HashSet::with_capacity(columns.len());
        for column in &columns {
            if !seen.insert(column.name.as_str()) {
                return Err(SchemaError::DuplicateColumn(column.name.clone()));
            }
        }
        Ok(Self { columns })
    }

    /// Creates a schema with no columns.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Returns the number of columns.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Returns whether the schema has no columns.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Returns the columns in order.
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Returns the column names in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    /// Returns the position of a column.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Returns a column by name.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Returns whether a column exists.
    pub fn contains(&self, name: &str) -> bool {
        self.index_of(name).is_some()
    }

    /// Returns the type of a column.
    pub fn data_type(&self, name: &str) -> Option<DataType> {
        self.column(name).map(|c| c.data_type)
    }

    /// Returns the position of a column or fails with `UnknownColumn`.
    pub fn require(&self, name: &str) -> SchemaResult<usize> {
        self.index_of(name)
            .ok_or_else(|| SchemaError::UnknownColumn(name.to_owned()))
    }

    /// Projects the schema onto the named columns, in the given order.
    pub fn select<S: AsRef<str>>(&self, names: &[S]) -> SchemaResult<Self> {
        let columns = names
            .iter()
            .map(|name| {
                let index = self.require(name.as_ref())?;
                Ok(self.columns[index].clone())
            })
            .collect::<SchemaResult<Vec<_>>>()?;
        Self::new(columns)
    }

    /// Appends a column, rejecting a duplicate name.
    pub fn with_column(mut self, column: Column) -> SchemaResult<Self> {
        if self.contains(&column.name) {
            return Err(SchemaError::DuplicateColumn(column.name));
        }
        self.columns.push(column);
        Ok(self)
    }

    /// Compares this schema, taken as the required one, with `provided`.
    pub fn diff(&self, provided: &Schema) -> SchemaDiff {
        let mut diff = SchemaDiff::default();

        for column in &self.columns {
            match provided.data_type(&column.name) {
                None => diff.missing.push(column.name.clone()),
                Some(actual) if actual != column.data_type => {
                    diff.mismatched.push(TypeMismatch {
                        column: column.name.clone(),
                        expected: column.data_type,
                        actual,
                    });
                }
                Some(_) => {}
            }
        }

        diff.extra = provided
            .names()
            .filter(|name| !self.contains(name))
            .map(str::to_owned)
            .collect();

        diff
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, column) in self.columns.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{column}")?;
        }
        Ok(())
    }
}

impl FromStr for Schema {
    type Err = SchemaError;

    /// Parses `"name:type,name:type"`. An empty string is the empty schema.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().is_empty() {
            return Ok(Self::empty());
        }
        let columns = s
            .split(',')
            .map(str::parse::<Column>)
            .collect::<SchemaResult<Vec<_>>>()?;
        Self::new(columns)
    }
}

impl TryFrom<Vec<Column>> for Schema {
    type Error = SchemaError;

    fn try_from(columns: Vec<Column>) -> Result<Self, Self::Error> {
        Self::new(columns)
    }
}

impl From<Schema> for Vec<Column> {
    fn from(schema: Schema) -> Self {
        schema.columns
    }
}

/// A column whose type differs between two schemas.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeMismatch {
    /// Column name.
    pub column: String,
    /// Required type.
    pub expected: DataType,
    /// Provided type.
    pub actual: DataType,
}

impl fmt::Display for TypeMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} != {})", self.column, self.expected, self.actual)
    }
}

/// Name-based difference between a required and a provided schema.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaDiff {
    /// Required columns absent from the provided schema.
    pub missing: Vec<String>,
    /// Provided columns that were not required.
    pub extra: Vec<String>,
    /// Columns present on both sides with different types.
    pub mismatched: Vec<TypeMismatch>,
}

impl SchemaDiff {
    /// Returns whether the name sets and types are identical.
    pub fn is_empty(&self) -> bool {
        self.missing.is_empty() && self.extra.is_empty() && self.mismatched.is_empty()
    }

    /// Returns whether every required column is provided with its type.
    pub fn is_satisfied(&self) -> bool {
        self.missing.is_empty() && self.mismatched.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_displays_expression() {
        let schema: Schema = "id:str, stars:int ,score:double".parse().unwrap();
        assert_eq!(schema.len(), 3);
        assert_eq!(schema.data_type("score"), Some(DataType::Float));
        assert_eq!(schema.to_string(), "id:str,stars:int,score:float");
    }

    #[test]
    fn rejects_duplicate_names() {
        let err = "a:int,a:str".parse::<Schema>().unwrap_err();
        assert_eq!(err, SchemaError::DuplicateColumn("a".into()));
    }

    #[test]
    fn rejects_malformed_columns() {
        assert!(matches!(
            "a".parse::<Schema>(),
            Err(SchemaError::InvalidExpression { .. })
        ));
        assert_eq!(
            "a:decimal".parse::<Schema>(),
            Err(SchemaError::UnknownType("decimal".into()))
        );
    }

    #[test]
    fn equality_is_order_sensitive() {
        let a: Schema = "a:int,b:str".parse().unwrap();
        let b: Schema = "b:str,a:int".parse().unwrap();
        assert_ne!(a, b);
        assert!(a.diff(&b).is_empty());
    }

    #[test]
    fn diff_reports_missing_extra_and_mismatched() {
        let required: Schema = "id:str,stars:int,country:str".parse().unwrap();
        let provided: Schema = "id:str,stars:float,city:str".parse().unwrap();
        let diff = required.diff(&provided);

        assert_eq!(diff.missing, vec!["country".to_string()]);
        assert_eq!(diff.extra, vec!["city".to_string()]);
        assert_eq!(diff.mismatched.len(), 1);
        assert_eq!(diff.mismatched[0].column, "stars");
        assert!(!diff.is_satisfied());
    }

    #[test]
    fn select_projects_in_order() {
        let schema: Schema = "a:int,b:str,c:bool".parse().unwrap();
        let projected = schema.select(&["c", "a"]).unwrap();
        assert_eq!(projected.to_string(), "c:bool,a:int");
        assert_eq!(
            schema.select(&["z"]),
            Err(SchemaError::UnknownColumn("z".into()))
        );
    }

    #[test]
    fn deserialization_validates_names() {
        let json = r#"[{"name":"a","type":"int"},{"name":"a","type":"str"}]"#;
        assert!(serde_json::from_str::<Schema>(json).is_err());

        let json = r#"[{"name":"a","type":"int"}]"#;
        let schema: Schema = serde_json::from_str(json).unwrap();
        assert_eq!(schema.to_string(), "a:int");
    }
}
