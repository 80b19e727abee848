#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

pub mod engine;
mod error;
pub mod graph;
pub mod node;
pub mod ops;

#[doc(hidden)]
pub mod prelude;

pub use error::{BoxedError, Error, Result};
pub use tabula_data as data;

/// Tracing target for runtime operations.
pub const TRACING_TARGET: &str = "tabula_runtime";
