#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod dataset;
mod derive;
mod error;
mod partition;
mod schema;
mod types;

pub use dataset::{Dataset, Row, RowView};
pub use derive::{Directive, SchemaDerivation};
pub use error::{SchemaError, SchemaResult};
pub use partition::{PartitionKey, Partitioning};
pub use schema::{Column, Schema, SchemaDiff, TypeMismatch};
pub use types::{DataType, Value};
