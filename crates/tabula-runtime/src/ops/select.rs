//! Column projection.

use tabula_data::SchemaDerivation;

use crate::node::{DatasetRef, LogicalNode};

/// Processor projecting `input` onto `columns`, in the given order.
///
/// Unknown columns are reported when the node is added to a graph.
pub fn select<I, S>(name: impl Into<String>, input: &DatasetRef, columns: I) -> LogicalNode
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let columns: Vec<String> = columns.into_iter().map(Into::into).collect();
    let derivation = columns
        .iter()
        .fold(SchemaDerivation::new(), |derivation, column| {
            derivation.keep(column.as_str())
        });

    LogicalNode::processor(name, [input], derivation, move |inputs, _| {
        Ok(inputs[0].select(&columns)?)
    })
}

#[cfg(test)]
mod tests {
    use tabula_data::{Schema, SchemaError};

    use super::*;
    use crate::Error;
    use crate::graph::WorkflowGraph;

    #[test]
    fn derives_projected_schema() {
        let mut graph = WorkflowGraph::new();
        let schema: Schema = "id:str,country:str,stars:int".parse().unwrap();
        let source = graph
            .add(LogicalNode::creator("load", schema, |ctx| Ok(ctx.output(Vec::new())?)))
            .unwrap();

        let projected = graph.add(select("ids", &source, ["stars", "id"])).unwrap();
        assert_eq!(projected.schema().to_string(), "stars:int,id:str");

        let err = graph.add(select("bad", &source, ["name"])).unwrap_err();
        assert!(matches!(
            err,
            Error::Schema { source: SchemaError::UnknownColumn(_), .. }
        ));
    }
}
