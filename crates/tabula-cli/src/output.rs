//! Rendering of execution results.

use anyhow::Context;
use serde_json::json;
use tabula_runtime::data::Dataset;
use tabula_runtime::engine::ExecutionResult;
use tabula_runtime::node::DatasetRef;

use crate::config::OutputFormat;

/// Renders the named datasets of `result`.
///
/// Rows are sorted so the output does not depend on the engine.
pub fn render(
    result: &ExecutionResult,
    outputs: &[(String, DatasetRef)],
    format: OutputFormat,
) -> anyhow::Result<String> {
    let mut datasets = Vec::with_capacity(outputs.len());
    for (name, reference) in outputs {
        let dataset = result
            .get(reference)
            .with_context(|| format!("dataset '{name}' was not materialized"))?;
        datasets.push((name.as_str(), dataset.sorted()));
    }

    match format {
        OutputFormat::Json => render_json(result, &datasets),
        OutputFormat::Pretty => Ok(render_pretty(&datasets)),
    }
}

fn render_json(result: &ExecutionResult, datasets: &[(&str, Dataset)]) -> anyhow::Result<String> {
    let datasets: serde_json::Map<String, serde_json::Value> = datasets
        .iter()
        .map(|(name, dataset)| {
            let value = json!({
                "schema": dataset.schema().to_string(),
                "rows": dataset.to_json_rows(),
            });
            ((*name).to_owned(), value)
        })
        .collect();

    let document = json!({
        "datasets": datasets,
        "stats": result.stats(),
    });
    serde_json::to_string_pretty(&document).context("failed to serialize the result")
}

fn render_pretty(datasets: &[(&str, Dataset)]) -> String {
    let mut out = String::new();
    for (name, dataset) in datasets {
        out.push_str(&format!("{name} ({} rows)\n", dataset.len()));
        out.push_str(&table(dataset));
        out.push('\n');
    }
    out
}

/// Formats a dataset as an aligned text table.
fn table(dataset: &Dataset) -> String {
    let header: Vec<String> = dataset
        .schema()
        .columns()
        .iter()
        .map(ToString::to_string)
        .collect();
    let cells: Vec<Vec<String>> = dataset
        .rows()
        .iter()
        .map(|row| row.iter().map(ToString::to_string).collect())
        .collect();

    let mut widths: Vec<usize> = header.iter().map(String::len).collect();
    for row in &cells {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.len());
        }
    }

    let line = |values: &[String]| {
        let padded: Vec<String> = values
            .iter()
            .zip(&widths)
            .map(|(value, &width)| format!("{value:<width$}"))
            .collect();
        format!("| {} |\n", padded.join(" | "))
    };
    let rule: Vec<String> = widths.iter().map(|&width| "-".repeat(width)).collect();

    let mut out = line(&header);
    out.push_str(&line(&rule));
    for row in &cells {
        out.push_str(&line(row));
    }
    out
}
