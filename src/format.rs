//! Fixed-width table rendering for Slack code blocks.

use crate::db::executor::{PREVIEW_ROW_LIMIT, QueryResult};

/// Renders a QueryResult as a fixed-width ASCII table, one line per row,
/// values left-aligned and padded to the widest value per column. Emits at
/// most `PREVIEW_ROW_LIMIT` data rows and a "Showing N of M" footer when the
/// true row count exceeds what is shown. Deterministic: the same result
/// always produces byte-identical output.
pub fn render_table(result: &QueryResult) -> String {
    let rows: Vec<&Vec<String>> = result.rows.iter().take(PREVIEW_ROW_LIMIT).collect();
    if rows.is_empty() {
        return "_No rows returned._".to_string();
    }

    let columns = &result.columns;
    let mut widths: Vec<usize> = columns.iter().map(|c| c.len()).collect();
    for row in &rows {
        for (idx, value) in row.iter().enumerate() {
            if idx < widths.len() && value.len() > widths[idx] {
                widths[idx] = value.len();
            }
        }
    }

    let fmt_row = |values: &[String]| -> String {
        let cells: Vec<String> = values
            .iter()
            .zip(widths.iter())
            .map(|(value, width)| format!("{:<width$}", value, width = *width))
            .collect();
        format!("| {} |", cells.join(" | "))
    };

    let separator = format!(
        "+-{}-+",
        widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join("-+-")
    );

    let mut lines = vec![separator.clone(), fmt_row(columns), separator.clone()];
    for row in &rows {
        lines.push(fmt_row(row.as_slice()));
    }
    lines.push(separator);

    let mut table = lines.join("\n");
    if result.total_rows > rows.len() {
        table.push_str(&format!(
            "\n_Showing {} of {} rows._",
            rows.len(),
            result.total_rows
        ));
    }

    table
}
