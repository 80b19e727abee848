//! Schema derivation directives.
//!
//! A derivation describes an output schema relative to an input schema.
//! The textual shorthand is a comma separated list of directives:
//!
//! | Directive     | Meaning                               |
//! |---------------|---------------------------------------|
//! | `*`           | keep every input column               |
//! | `name`        | keep one input column                 |
//! | `-name`       | drop an input column                  |
//! | `+name:type`  | add a new column (the `+` is optional)|

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{SchemaError, SchemaResult};
use crate::schema::{Column, Schema};
use crate::types::DataType;

/// A single derivation directive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Directive {
    /// Keep every column of the base schema.
    KeepAll,
    /// Keep one column of the base schema.
    Keep {
        /// Column name.
        name: String,
    },
    /// Add a column that is not part of the base schema.
    Add {
        /// The new column.
        column: Column,
    },
    /// Remove a column of the base schema.
    Drop {
        /// Column name.
        name: String,
    },
}

impl fmt::Display for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::KeepAll => f.write_str("*"),
            Self::Keep { name } => f.write_str(name),
            Self::Add { column } => write!(f, "+{column}"),
            Self::Drop { name } => write!(f, "-{name}"),
        }
    }
}

/// An ordered list of directives producing a schema from a base schema.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SchemaDerivation {
    directives: Vec<Directive>,
}

impl SchemaDerivation {
    /// Creates an empty derivation.
    pub fn new() -> Self {
        Self::default()
    }

    /// Keeps every base column.
    pub fn keep_all(mut self) -> Self {
        self.directives.push(Directive::KeepAll);
        self
    }

    /// Keeps one base column.
    pub fn keep(mut self, name: impl Into<String>) -> Self {
        self.directives.push(Directive::Keep { name: name.into() });
        self
    }

    /// Adds a new column.
    pub fn add(mut self, name: impl Into<String>, data_type: DataType) -> Self {
        self.directives.push(Directive::Add {
            column: Column::new(name, data_type),
        });
        self
    }

    /// Drops a base column.
    pub fn drop(mut self, name: impl Into<String>) -> Self {
        self.directives.push(Directive::Drop { name: name.into() });
        self
    }

    /// Returns the directives in order.
    pub fn directives(&self) -> &[Directive] {
        &self.directives
    }

    /// Returns whether the derivation keeps every base column.
    pub fn keeps_all(&self) -> bool {
        self.directives.contains(&Directive::KeepAll)
    }

    /// Applies the directives to `base`.
    ///
    /// Directives are applied in order, except that drops apply to the
    /// whole derivation: `-a,*` and `*,-a` are equivalent.
    pub fn apply(&self, base: &Schema) -> SchemaResult<Schema> {
        let mut dropped = HashSet::new();
        for directive in &self.directives {
            if let Directive::Drop { name } = directive {
                base.require(name)?;
                dropped.insert(name.as_str());
            }
        }

        let mut columns: Vec<Column> = Vec::with_capacity(base.len());
        let mut added = HashSet::new();
        let contains = |columns: &[Column], name: &str| columns.iter().any(|c| c.name == name);

        for directive in &self.directives {
            match directive {
                Directive::KeepAll => {
                    for column in base.columns() {
                        if dropped.contains(column.name.as_str()) {
                            continue;
                        }
                        if added.contains(column.name.as_str()) {
                            return Err(SchemaError::DuplicateColumn(column.name.clone()));
                        }
                        if !contains(&columns, &column.name) {
                            columns.push(column.clone());
                        }
                    }
                }
                Directive::Keep { name } => {
                    let index = base.require(name)?;
                    if dropped.contains(name.as_str()) {
                        return Err(SchemaError::ConflictingDirective(name.clone()));
                    }
                    if contains(&columns, name) {
                        return Err(SchemaError::DuplicateColumn(name.clone()));
                    }
                    columns.push(base.columns()[index].clone());
                }
                Directive::Add { column } => {
                    if contains(&columns, &column.name) {
                        return Err(SchemaError::DuplicateColumn(column.name.clone()));
                    }
                    added.insert(column.name.as_str());
                    columns.push(column.clone());
                }
                Directive::Drop { .. } => {}
            }
        }

        Schema::new(columns)
    }
}

impl Schema {
    /// Derives a new schema from this one.
    pub fn derive(&self, derivation: &SchemaDerivation) -> SchemaResult<Schema> {
        derivation.apply(self)
    }
}

impl FromIterator<Directive> for SchemaDerivation {
    fn from_iter<T: IntoIterator<Item = Directive>>(iter: T) -> Self {
        Self {
            directives: iter.into_iter().collect(),
        }
    }
}

impl fmt::Display for SchemaDerivation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, directive) in self.directives.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{directive}")?;
        }
        Ok(())
    }
}

impl FromStr for SchemaDerivation {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.split(',')
            .map(|part| {
                let part = part.trim();
                if part.is_empty() {
                    return Err(SchemaError::InvalidExpression {
                        expression: s.to_owned(),
                        reason: "empty directive".into(),
                    });
                }

                if part == "*" {
                    Ok(Directive::KeepAll)
                } else if let Some(name) = part.strip_prefix('-') {
                    Ok(Directive::Drop {
                        name: name.trim().to_owned(),
                    })
                } else if let Some(column) = part.strip_prefix('+') {
                    Ok(Directive::Add {
                        column: column.parse()?,
                    })
                } else if part.contains(':') {
                    Ok(Directive::Add {
                        column: part.parse()?,
                    })
                } else {
                    Ok(Directive::Keep {
                        name: part.to_owned(),
                    })
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Schema {
        "id:str,country:str,stars:int".parse().unwrap()
    }

    fn derive(expr: &str) -> SchemaResult<Schema> {
        base().derive(&expr.parse::<SchemaDerivation>()?)
    }

    #[test]
    fn keep_all_and_add() {
        let schema = derive("*,+country_name:str").unwrap();
        assert_eq!(
            schema.to_string(),
            "id:str,country:str,stars:int,country_name:str"
        );
    }

    #[test]
    fn plain_name_type_pair_adds_a_column() {
        assert_eq!(derive("*, c:int").unwrap(), derive("*,+c:int").unwrap());
    }

    #[test]
    fn drop_applies_regardless_of_position() {
        assert_eq!(derive("-stars,*").unwrap(), derive("*,-stars").unwrap());
        assert_eq!(derive("*,-stars").unwrap().to_string(), "id:str,country:str");
    }

    #[test]
    fn drop_then_add_replaces_a_column_type() {
        let schema = derive("*,-stars,+stars:float").unwrap();
        assert_eq!(
            schema.to_string(),
            "id:str,country:str,stars:float"
        );
    }

    #[test]
    fn keep_selects_and_reorders() {
        let schema = derive("stars,*").unwrap();
        assert_eq!(schema.to_string(), "stars:int,id:str,country:str");
    }

    #[test]
    fn unknown_names_fail() {
        assert_eq!(derive("*,-nope"), Err(SchemaError::UnknownColumn("nope".into())));
        assert_eq!(derive("nope"), Err(SchemaError::UnknownColumn("nope".into())));
    }

    #[test]
    fn added_name_collisions_fail() {
        assert_eq!(
            derive("*,+stars:int"),
            Err(SchemaError::DuplicateColumn("stars".into()))
        );
        assert_eq!(
            derive("+stars:float,*"),
            Err(SchemaError::DuplicateColumn("stars".into()))
        );
    }

    #[test]
    fn keep_and_drop_conflict() {
        assert_eq!(
            derive("stars,-stars"),
            Err(SchemaError::ConflictingDirective("stars".into()))
        );
    }

    #[test]
    fn empty_directive_is_rejected() {
        assert!(matches!(
            "*,,+a:int".parse::<SchemaDerivation>(),
            Err(SchemaError::InvalidExpression { .. })
        ));
    }

    #[test]
    fn display_round_trips_through_parse() {
        let derivation = SchemaDerivation::new()
            .keep_all()
            .drop("stars")
            .add("score", DataType::Float);
        assert_eq!(derivation.to_string(), "*,-stars,+score:float");
        assert_eq!(
            derivation.to_string().parse::<SchemaDerivation>().unwrap(),
            derivation
        );
        assert!(derivation.keeps_all());
    }
}
