//! Batch Sheet Parser
//!
//! The batch format is delimiter-separated text: a header line of column
//! names, then one job per line. The column map is built from the header, so
//! column order in the file is irrelevant. Rows shorter than the header
//! yield empty values for the missing columns; blank lines are skipped. A
//! row missing its template or output name is dropped with a recorded
//! reason, never an error.

use std::collections::HashMap;

use tracing::debug;

use super::{
    BatchRow, ParsedBatch, SkippedRow, COLUMN_OUTPUT, COLUMN_OUTPUT_FALLBACK, COLUMN_TEMPLATE,
};

/// Default field delimiter of batch sheets
pub const DEFAULT_DELIMITER: char = '\t';

/// Parses batch text into job rows.
///
/// No column-count or type validation is performed beyond the template and
/// output name requirement.
pub fn parse_batch(text: &str, delimiter: char) -> ParsedBatch {
    let normalized = text.replace("\r\n", "\n").replace('\r', "\n");
    let mut lines = normalized.split('\n');

    let header = match lines.next() {
        Some(h) if !h.trim().is_empty() => h,
        _ => return ParsedBatch::default(),
    };

    // Trimmed header name -> field index. A duplicated header name keeps its
    // first column, matching the first-match rule used everywhere else.
    let mut columns: HashMap<String, usize> = HashMap::new();
    for (idx, name) in header.split(delimiter).enumerate() {
        columns.entry(name.trim().to_string()).or_insert(idx);
    }

    let mut batch = ParsedBatch::default();

    for (offset, line) in lines.enumerate() {
        let line_no = offset + 2; // header is line 1
        if line.trim().is_empty() {
            continue;
        }

        let fields: Vec<&str> = line.split(delimiter).collect();
        let mut values = HashMap::new();
        for (name, idx) in &columns {
            let value = fields.get(*idx).map(|f| f.trim()).unwrap_or("");
            values.insert(name.clone(), value.to_string());
        }

        let row = BatchRow {
            line: line_no,
            template_name: values
                .get(COLUMN_TEMPLATE)
                .cloned()
                .unwrap_or_default(),
            output_name: output_name(&values),
            values,
        };

        if row.template_name.is_empty() {
            batch.skipped.push(SkippedRow {
                line: line_no,
                reason: format!("missing {COLUMN_TEMPLATE} value"),
            });
            continue;
        }
        if row.output_name.is_empty() {
            batch.skipped.push(SkippedRow {
                line: line_no,
                reason: format!("missing {COLUMN_OUTPUT}/{COLUMN_OUTPUT_FALLBACK} value"),
            });
            continue;
        }

        batch.rows.push(row);
    }

    debug!(
        rows = batch.rows.len(),
        skipped = batch.skipped.len(),
        "parsed batch sheet"
    );
    batch
}

/// `NewComp` wins over `Output` when both are present and non-empty
fn output_name(values: &HashMap<String, String>) -> String {
    let primary = values.get(COLUMN_OUTPUT).map(String::as_str).unwrap_or("");
    if !primary.is_empty() {
        return primary.to_string();
    }
    values
        .get(COLUMN_OUTPUT_FALLBACK)
        .cloned()
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // Column Mapping Tests
    // =========================================================================

    #[test]
    fn test_column_order_independence() {
        let a = parse_batch("Output\tComp\nX\tTemplateA", '\t');
        let b = parse_batch("Comp\tOutput\nTemplateA\tX", '\t');

        assert_eq!(a.rows.len(), 1);
        assert_eq!(b.rows.len(), 1);
        assert_eq!(a.rows[0].template_name, b.rows[0].template_name);
        assert_eq!(a.rows[0].output_name, b.rows[0].output_name);
        assert_eq!(a.rows[0].values, b.rows[0].values);
    }

    #[test]
    fn test_header_names_are_trimmed() {
        let batch = parse_batch(" Comp \t NewComp \nTemplateA\tPromo1", '\t');
        assert_eq!(batch.rows[0].template_name, "TemplateA");
        assert_eq!(batch.rows[0].output_name, "Promo1");
    }

    #[test]
    fn test_newcomp_wins_over_output() {
        let batch = parse_batch("Comp\tNewComp\tOutput\nT\tFromNew\tFromOut", '\t');
        assert_eq!(batch.rows[0].output_name, "FromNew");

        let fallback = parse_batch("Comp\tNewComp\tOutput\nT\t\tFromOut", '\t');
        assert_eq!(fallback.rows[0].output_name, "FromOut");
    }

    // =========================================================================
    // Row Shape Tests
    // =========================================================================

    #[test]
    fn test_short_row_yields_empty_values() {
        let batch = parse_batch("Comp\tNewComp\tTitel1\nT\tOut", '\t');
        assert_eq!(batch.rows.len(), 1);
        assert_eq!(batch.rows[0].value("Titel1"), "");
    }

    #[test]
    fn test_blank_lines_skipped_silently() {
        let batch = parse_batch("Comp\tNewComp\n\n  \nT\tOut\n\n", '\t');
        assert_eq!(batch.rows.len(), 1);
        assert!(batch.skipped.is_empty());
    }

    #[test]
    fn test_crlf_and_cr_line_endings() {
        let crlf = parse_batch("Comp\tNewComp\r\nT\tOut\r\n", '\t');
        assert_eq!(crlf.rows.len(), 1);

        let cr = parse_batch("Comp\tNewComp\rT\tOut", '\t');
        assert_eq!(cr.rows.len(), 1);
    }

    #[test]
    fn test_values_are_trimmed() {
        let batch = parse_batch("Comp\tNewComp\tTitel1\nT\tOut\t  Hello  ", '\t');
        assert_eq!(batch.rows[0].value("Titel1"), "Hello");
    }

    #[test]
    fn test_unrecognized_columns_are_carried() {
        let batch = parse_batch("Comp\tNewComp\tWhatever\nT\tOut\tnoise", '\t');
        assert_eq!(batch.rows[0].value("Whatever"), "noise");
    }

    // =========================================================================
    // Drop Tests
    // =========================================================================

    #[test]
    fn test_missing_template_name_drops_row() {
        let batch = parse_batch("Comp\tNewComp\n\tOut\nT2\tOut2", '\t');
        assert_eq!(batch.rows.len(), 1);
        assert_eq!(batch.rows[0].template_name, "T2");
        assert_eq!(batch.skipped.len(), 1);
        assert_eq!(batch.skipped[0].line, 2);
        assert!(batch.skipped[0].reason.contains("Comp"));
    }

    #[test]
    fn test_missing_output_name_drops_row() {
        let batch = parse_batch("Comp\tNewComp\nT\t", '\t');
        assert!(batch.rows.is_empty());
        assert_eq!(batch.skipped.len(), 1);
    }

    #[test]
    fn test_header_only_input() {
        let batch = parse_batch("Comp\tNewComp", '\t');
        assert!(batch.rows.is_empty());
        assert!(batch.skipped.is_empty());
    }

    #[test]
    fn test_empty_input() {
        let batch = parse_batch("", '\t');
        assert!(batch.rows.is_empty());
    }

    #[test]
    fn test_alternate_delimiter() {
        let batch = parse_batch("Comp;NewComp\nT;Out", ';');
        assert_eq!(batch.rows.len(), 1);
        assert_eq!(batch.rows[0].output_name, "Out");
    }
}
