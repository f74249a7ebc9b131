//! Batch Row Models
//!
//! One parsed row of the batch sheet describes one job: which template to
//! instantiate, what to name the result, and the free-form column values
//! used for text and footage substitution.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Column holding the template scene name
pub const COLUMN_TEMPLATE: &str = "Comp";

/// Primary column holding the output name
pub const COLUMN_OUTPUT: &str = "NewComp";

/// Fallback column holding the output name
pub const COLUMN_OUTPUT_FALLBACK: &str = "Output";

/// One job row of the batch sheet
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchRow {
    /// 1-based line number in the batch file (header is line 1)
    pub line: usize,
    /// Name of the template scene to instantiate
    pub template_name: String,
    /// Name of the finished clone (the render/watch key)
    pub output_name: String,
    /// Every column value of the row, keyed by trimmed header name.
    /// Unrecognized columns are carried but ignored downstream.
    pub values: HashMap<String, String>,
}

impl BatchRow {
    /// Returns the trimmed value of a column, or `""` when the column is
    /// absent or the row was shorter than the header.
    pub fn value(&self, column: &str) -> &str {
        self.values.get(column).map(|v| v.as_str()).unwrap_or("")
    }
}

/// A row that was dropped during parsing, with the reason why
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedRow {
    /// 1-based line number in the batch file
    pub line: usize,
    /// Human-readable drop reason
    pub reason: String,
}

/// Result of parsing a batch sheet
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedBatch {
    /// Job rows in file order
    pub rows: Vec<BatchRow>,
    /// Dropped rows with reasons
    pub skipped: Vec<SkippedRow>,
}
