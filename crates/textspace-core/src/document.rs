//! Documents and the row-oriented tables they are read from.
//!
//! A [`Table`] is the in-memory form of the upstream data table (one row per
//! song, poem, article, ...). [`documents_from_table`] pulls the three
//! required columns out of it and assigns every row a stable [`DocumentId`].

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::ColumnMapping;
use crate::error::{Result, TextSpaceError};

/// Stable synthetic identifier of a document: its row index in the input table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DocumentId(pub usize);

impl DocumentId {
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "doc-{}", self.0)
    }
}

/// One input record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub title: String,
    pub author: String,
    pub text: String,
}

impl Document {
    pub fn new(
        id: usize,
        title: impl Into<String>,
        author: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            id: DocumentId(id),
            title: title.into(),
            author: author.into(),
            text: text.into(),
        }
    }
}

/// Row-oriented table with a fixed header.
///
/// `null` cells stand for missing values. Every row has exactly as many cells
/// as there are columns.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    /// Create an empty table with the given header.
    pub fn new<S: Into<String>>(columns: impl IntoIterator<Item = S>) -> Self {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Create a table from a header and rows, validating row widths.
    pub fn from_rows<S: Into<String>>(
        columns: impl IntoIterator<Item = S>,
        rows: Vec<Vec<Value>>,
    ) -> Result<Self> {
        let mut table = Self::new(columns);
        for row in rows {
            table.push_row(row)?;
        }
        Ok(table)
    }

    /// Append a row. Fails if its width differs from the header.
    pub fn push_row(&mut self, row: Vec<Value>) -> Result<()> {
        if row.len() != self.columns.len() {
            return Err(TextSpaceError::Validation(format!(
                "row {} has {} cells, expected {}",
                self.rows.len(),
                row.len(),
                self.columns.len()
            )));
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of a column in the header.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Cell at (`row`, `column`), if both exist.
    pub fn get(&self, row: usize, column: &str) -> Option<&Value> {
        let idx = self.column_index(column)?;
        self.rows.get(row).map(|r| &r[idx])
    }
}

/// Read the documents of a table using the configured column names.
///
/// Additional columns are ignored. Numbers and booleans are stringified;
/// `null` cells are rejected naming the column and row.
pub fn documents_from_table(table: &Table, columns: &ColumnMapping) -> Result<Vec<Document>> {
    let author_idx = required_column(table, &columns.author)?;
    let text_idx = required_column(table, &columns.text)?;
    let title_idx = required_column(table, &columns.title)?;

    table
        .rows()
        .iter()
        .enumerate()
        .map(|(row, cells)| {
            Ok(Document {
                id: DocumentId(row),
                title: cell_string(&cells[title_idx], &columns.title, row)?,
                author: cell_string(&cells[author_idx], &columns.author, row)?,
                text: cell_string(&cells[text_idx], &columns.text, row)?,
            })
        })
        .collect()
}

fn required_column(table: &Table, name: &str) -> Result<usize> {
    table
        .column_index(name)
        .ok_or_else(|| TextSpaceError::MissingColumn {
            column: name.to_string(),
        })
}

fn cell_string(value: &Value, column: &str, row: usize) -> Result<String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Null => Err(TextSpaceError::NullValue {
            column: column.to_string(),
            row,
        }),
        Value::Array(_) | Value::Object(_) => Err(TextSpaceError::Validation(format!(
            "column '{}' holds a nested value at row {}",
            column, row
        ))),
    }
}

/// Reject an empty batch or a document with blank text.
pub fn check_texts(documents: &[Document]) -> Result<()> {
    if documents.is_empty() {
        return Err(TextSpaceError::Validation(
            "document batch is empty".to_string(),
        ));
    }
    if let Some((row, doc)) = documents
        .iter()
        .enumerate()
        .find(|(_, d)| d.text.trim().is_empty())
    {
        return Err(TextSpaceError::Validation(format!(
            "document '{}' at row {} has empty text",
            doc.title, row
        )));
    }
    Ok(())
}

/// Reject a batch in which two documents share a title.
///
/// Titles are what a viewer sees next to each point, and the legacy click
/// lookup matches on them.
pub fn check_unique_titles(documents: &[Document]) -> Result<()> {
    let mut seen: HashMap<&str, usize> = HashMap::with_capacity(documents.len());
    for (row, doc) in documents.iter().enumerate() {
        if let Some(&first) = seen.get(doc.title.as_str()) {
            return Err(TextSpaceError::DuplicateTitle {
                title: doc.title.clone(),
                first,
                second: row,
            });
        }
        seen.insert(&doc.title, row);
    }
    Ok(())
}

/// Full batch validation: non-empty, non-blank texts, unique titles.
pub fn validate_batch(documents: &[Document]) -> Result<()> {
    check_texts(documents)?;
    check_unique_titles(documents)
}

/// Derive `(author, title)` from a lyrics file name like
/// `Taylor Swift-Love_Story.txt`.
///
/// The author is everything before the first `-`; the title is the stem with
/// underscores turned into spaces and `-` into ` - `.
pub fn metadata_from_file_name(file_name: &str) -> (String, String) {
    let stem = file_name
        .rsplit_once('.')
        .map(|(stem, _)| stem)
        .unwrap_or(file_name);
    let author = stem.split('-').next().unwrap_or(stem).to_string();
    let title = stem.replace('_', " ").replace('-', " - ");
    (author, title)
}
