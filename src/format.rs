//! Output formatting for procedure results.
//!
//! Used by the command-line binary to print tables, result sets and
//! affected-row counts as JSON, an ASCII table or a Markdown table.

use serde::{Deserialize, Serialize};
use unicode_width::UnicodeWidthStr;

use crate::models::{AffectedRowCount, ResultSet, Row, Table, Value};

/// Output format for results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// JSON format (default)
    #[default]
    Json,
    /// ASCII table format (like the sqlcmd / MySQL CLI)
    Table,
    /// Markdown table format
    Markdown,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Json => write!(f, "json"),
            Self::Table => write!(f, "table"),
            Self::Markdown => write!(f, "markdown"),
        }
    }
}

fn is_numeric(value: &Value) -> bool {
    matches!(value, Value::Int(_) | Value::Float(_) | Value::Decimal(_))
}

pub fn format_as_table(table: &Table) -> String {
    if table.columns().is_empty() {
        return "Empty set\n".to_string();
    }

    let mut widths: Vec<usize> = table.columns().iter().map(|c| c.width()).collect();
    for row in table.rows() {
        for (i, value) in row.values().iter().enumerate() {
            widths[i] = widths[i].max(value.to_string().width());
        }
    }

    let mut output = String::new();
    let separator: String = widths
        .iter()
        .map(|w| format!("+{}", "-".repeat(w + 2)))
        .collect::<String>()
        + "+\n";

    output.push_str(&separator);
    let header: String = table
        .columns()
        .iter()
        .zip(&widths)
        .map(|(name, w)| format!("| {} ", pad_center(name, *w)))
        .collect::<String>()
        + "|\n";
    output.push_str(&header);
    output.push_str(&separator);

    for row in table.rows() {
        let row_str: String = row
            .values()
            .iter()
            .zip(&widths)
            .map(|(value, w)| {
                let formatted = value.to_string();
                let padding = " ".repeat(w.saturating_sub(formatted.width()));
                if is_numeric(value) {
                    format!("| {}{} ", padding, formatted)
                } else {
                    format!("| {}{} ", formatted, padding)
                }
            })
            .collect::<String>()
            + "|\n";
        output.push_str(&row_str);
    }

    output.push_str(&separator);

    let row_count = table.row_count();
    let row_text = if row_count == 1 { "row" } else { "rows" };
    output.push_str(&format!("{} {} in set\n", row_count, row_text));

    output
}

// `{:^w$}` pads by char count; CJK and emoji need display width
fn pad_center(text: &str, width: usize) -> String {
    let total = width.saturating_sub(text.width());
    let left = total / 2;
    format!("{}{}{}", " ".repeat(left), text, " ".repeat(total - left))
}

fn escape_markdown(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}

pub fn format_as_markdown(table: &Table) -> String {
    if table.columns().is_empty() {
        return "*Empty set*\n".to_string();
    }

    let mut output = String::new();

    let header: String = table
        .columns()
        .iter()
        .map(|c| format!("| {} ", escape_markdown(c)))
        .collect::<String>()
        + "|\n";
    output.push_str(&header);

    let sep: String = table.columns().iter().map(|_| "|---").collect::<String>() + "|\n";
    output.push_str(&sep);

    for row in table.rows() {
        let row_str: String = row
            .values()
            .iter()
            .map(|value| format!("| {} ", escape_markdown(&value.to_string())))
            .collect::<String>()
            + "|\n";
        output.push_str(&row_str);
    }

    output.push_str(&format!("\n*{} rows*\n", table.row_count()));

    output
}

fn format_output_row(row: &Row, format: OutputFormat) -> String {
    let table = Table::from_row(row);
    match format {
        OutputFormat::Markdown => format!("**Output parameters**\n\n{}", format_as_markdown(&table)),
        _ => format!("Output parameters:\n{}", format_as_table(&table)),
    }
}

/// Render a single table.
pub fn render_table(table: &Table, format: OutputFormat) -> serde_json::Result<String> {
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(table),
        OutputFormat::Table => Ok(format_as_table(table)),
        OutputFormat::Markdown => Ok(format_as_markdown(table)),
    }
}

/// Render every table of a result set, followed by output parameters if any.
pub fn render_result_set(result: &ResultSet, format: OutputFormat) -> serde_json::Result<String> {
    if format == OutputFormat::Json {
        return serde_json::to_string_pretty(result);
    }

    let mut sections: Vec<String> = result
        .tables
        .iter()
        .map(|table| match format {
            OutputFormat::Markdown => format_as_markdown(table),
            _ => format_as_table(table),
        })
        .collect();
    if sections.is_empty() {
        sections.push(match format {
            OutputFormat::Markdown => "*No result tables*\n".to_string(),
            _ => "No result tables\n".to_string(),
        });
    }
    if let Some(row) = &result.output_values {
        sections.push(format_output_row(row, format));
    }
    Ok(sections.join("\n"))
}

/// Render an affected-row count.
pub fn render_row_count(rows_affected: AffectedRowCount, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => serde_json::json!({ "rows_affected": rows_affected }).to_string(),
        OutputFormat::Table => format!("{} rows affected\n", rows_affected),
        OutputFormat::Markdown => format!("*{} rows affected*\n", rows_affected),
    }
}
