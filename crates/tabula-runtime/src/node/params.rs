//! Named node parameters.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised when reading a parameter.
#[derive(Debug, Error)]
pub enum ParamError {
    /// The parameter is not set.
    #[error("missing parameter '{0}'")]
    Missing(String),

    /// The parameter has an unexpected shape.
    #[error("invalid parameter '{name}': {source}")]
    Invalid {
        /// Parameter name.
        name: String,
        /// Deserialization failure.
        #[source]
        source: serde_json::Error,
    },
}

/// The configuration mapping of a node, passed to its user function.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Params(BTreeMap<String, serde_json::Value>);

impl Params {
    /// Creates an empty parameter map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a parameter.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.insert(name, value);
        self
    }

    /// Sets a parameter in place.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<serde_json::Value>) {
        self.0.insert(name.into(), value.into());
    }

    /// Returns the raw JSON value of a parameter.
    pub fn raw(&self, name: &str) -> Option<&serde_json::Value> {
        self.0.get(name)
    }

    /// Returns whether a parameter is set.
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Reads a required parameter.
    pub fn get<T: DeserializeOwned>(&self, name: &str) -> Result<T, ParamError> {
        let value = self
            .0
            .get(name)
            .ok_or_else(|| ParamError::Missing(name.to_owned()))?;
        T::deserialize(value).map_err(|source| ParamError::Invalid {
            name: name.to_owned(),
            source,
        })
    }

    /// Reads an optional parameter, falling back to `default` when unset.
    pub fn get_or<T: DeserializeOwned>(&self, name: &str, default: T) -> Result<T, ParamError> {
        match self.get(name) {
            Err(ParamError::Missing(_)) => Ok(default),
            other => other,
        }
    }

    /// Returns the number of parameters.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns whether no parameter is set.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over parameters in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &serde_json::Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn typed_lookup() {
        let params = Params::new()
            .with("threshold", 3)
            .with("countries", vec!["AT", "DE"]);

        assert_eq!(params.get::<i64>("threshold").unwrap(), 3);
        assert_eq!(
            params.get::<Vec<String>>("countries").unwrap(),
            vec!["AT".to_string(), "DE".to_string()]
        );
        assert_eq!(params.get_or("limit", 10usize).unwrap(), 10);
    }

    #[test]
    fn reports_missing_and_invalid() {
        let params = Params::new().with("lookup", "not a map");
        assert!(matches!(
            params.get::<i64>("absent"),
            Err(ParamError::Missing(name)) if name == "absent"
        ));
        assert!(matches!(
            params.get::<HashMap<String, String>>("lookup"),
            Err(ParamError::Invalid { .. })
        ));
    }
}
