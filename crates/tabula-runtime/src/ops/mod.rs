//! Built-in operations.
//!
//! Ready-made node constructors for common relational steps. They are
//! ordinary [`LogicalNode`]s built through the public node API and can be
//! mixed freely with user-defined nodes.
//!
//! [`LogicalNode`]: crate::node::LogicalNode

mod aggregate;
mod filter;
mod join;
mod select;
mod sink;

pub use aggregate::{AggregateFn, Aggregation, aggregate};
pub use filter::{filter, filter_in};
pub use join::{JoinKind, join};
pub use select::select;
pub use sink::{DatasetSink, collect, log};

/// Tracing target for built-in operations.
pub(crate) const TRACING_TARGET: &str = "tabula_runtime::ops";
