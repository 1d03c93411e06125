//! Joining documents with their projected coordinates.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::document::{check_unique_titles, Document, DocumentId, Table};
use crate::error::{Result, TextSpaceError};
use crate::features::StrategyKind;
use crate::reduce::ProjectedPoint;

/// One plotted document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlotRow {
    pub id: DocumentId,
    pub title: String,
    pub author: String,
    pub text: String,
    pub point: ProjectedPoint,
    pub strategy: StrategyKind,
}

/// Pair every document with its point, preserving order.
///
/// Titles must be unique within the batch.
pub fn assemble(
    documents: &[Document],
    points: &[ProjectedPoint],
    strategy: StrategyKind,
) -> Result<Vec<PlotRow>> {
    if documents.len() != points.len() {
        return Err(TextSpaceError::InvariantViolation(format!(
            "{} documents but {} projected points for the {} strategy",
            documents.len(),
            points.len(),
            strategy
        )));
    }
    check_unique_titles(documents)?;

    Ok(documents
        .iter()
        .zip(points)
        .map(|(doc, point)| PlotRow {
            id: doc.id,
            title: doc.title.clone(),
            author: doc.author.clone(),
            text: doc.text.clone(),
            point: *point,
            strategy,
        })
        .collect())
}

/// The input table with `x`, `y`, `z` columns appended, same row order.
pub fn augment_table(table: &Table, rows: &[PlotRow]) -> Result<Table> {
    if table.len() != rows.len() {
        return Err(TextSpaceError::InvariantViolation(format!(
            "table has {} rows but {} plot rows were assembled",
            table.len(),
            rows.len()
        )));
    }

    let columns = table
        .columns()
        .iter()
        .cloned()
        .chain(["x", "y", "z"].map(String::from));
    let mut out = Table::new(columns);
    for (cells, row) in table.rows().iter().zip(rows) {
        let mut cells = cells.clone();
        cells.extend([row.point.x, row.point.y, row.point.z].map(coordinate));
        out.push_row(cells)?;
    }
    Ok(out)
}

fn coordinate(v: f64) -> Value {
    serde_json::Number::from_f64(v)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}
