//! Output formatting utilities

use crate::change_detection::{DiffResult, SchemaChanges};
use crate::error::Result;
use crate::pipeline::SyncReport;
use crate::snapshot::{Snapshot, StreamInfo};
use crate::table::Table;

/// Pretty printer for sheetsync output
pub struct PrettyPrinter;

impl PrettyPrinter {
    /// Print a table with aligned columns, truncated to `max_rows`
    pub fn print_table(table: &Table, max_rows: Option<usize>) {
        print!("{}", render_table(table, max_rows));
    }

    /// Print the result of one sync run
    pub fn print_sync_report(report: &SyncReport) {
        println!("📄 Synced: {}", report.source.display());
        println!("├─ Stream: {}", report.stream);
        println!("├─ Rows: {}", report.row_count);
        println!("├─ Changes: {}", report.summary);
        Self::print_diff_details(&report.diff, "│  ");

        match &report.sheet_url {
            Some(url) => println!("├─ 🔗 Sheet: {}", url),
            None => println!("├─ Sheet: not pushed"),
        }
        println!(
            "└─ Notification: {}",
            if report.notified { "sent" } else { "not sent" }
        );
    }

    /// Print schema and row changes below a summary line
    pub fn print_diff_details(diff: &DiffResult, prefix: &str) {
        if diff.schema.has_changes() {
            Self::print_schema_changes(&diff.schema, prefix);
        }

        if !diff.added.is_empty() {
            println!("{}├─ Added rows: {}", prefix, diff.added.len());
        }

        if !diff.updated.is_empty() {
            println!("{}├─ Updated rows: {}", prefix, diff.updated.len());
            for (i, update) in diff.updated.iter().take(3).enumerate() {
                let is_last = i == std::cmp::min(2, diff.updated.len() - 1);
                let row_prefix = if is_last { "└─" } else { "├─" };
                let change_prefix = if is_last { "   " } else { "│  " };
                println!(
                    "{}│  {} {} columns changed",
                    prefix,
                    row_prefix,
                    update.changes.len()
                );

                for (j, (column, change)) in update.changes.iter().take(2).enumerate() {
                    let marker = if j == std::cmp::min(1, update.changes.len() - 1) {
                        "└─"
                    } else {
                        "├─"
                    };
                    println!(
                        "{}│  {}{} {}: '{}' → '{}'",
                        prefix, change_prefix, marker, column, change.before, change.after
                    );
                }
                if update.changes.len() > 2 {
                    println!(
                        "{}│  {}└─ ... and {} more",
                        prefix,
                        change_prefix,
                        update.changes.len() - 2
                    );
                }
            }
            if diff.updated.len() > 3 {
                println!(
                    "{}│  └─ ... and {} more updated rows",
                    prefix,
                    diff.updated.len() - 3
                );
            }
        }

        if !diff.deleted.is_empty() {
            println!("{}└─ Deleted rows: {}", prefix, diff.deleted.len());
        }
    }

    fn print_schema_changes(schema: &SchemaChanges, prefix: &str) {
        if !schema.columns_added.is_empty() {
            println!(
                "{}├─ Columns added: {}",
                prefix,
                schema.columns_added.join(", ")
            );
        }
        if !schema.columns_removed.is_empty() {
            println!(
                "{}├─ Columns removed: {}",
                prefix,
                schema.columns_removed.join(", ")
            );
        }
    }

    /// Print committed streams
    pub fn print_stream_list(streams: &[StreamInfo]) {
        if streams.is_empty() {
            println!("No snapshots found.");
            return;
        }

        println!("📸 Tracked Streams:");
        for (i, stream) in streams.iter().enumerate() {
            let prefix = if i == streams.len() - 1 { "└─" } else { "├─" };
            println!(
                "{} {} ({} rows, {} columns, committed {})",
                prefix,
                stream.stream_id,
                stream.row_count,
                stream.column_count,
                format_timestamp(stream)
            );
        }
    }

    /// Print one stream's snapshot
    pub fn print_snapshot(stream_id: &str, snapshot: &Snapshot, show_rows: bool) {
        println!("📸 Stream: {}", stream_id);
        let committed = snapshot
            .committed_at
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| "never".to_string());
        println!("├─ Committed: {}", committed);
        println!("├─ Rows: {}", snapshot.len());
        println!("└─ Columns: {}", snapshot.columns.join(", "));

        if show_rows && !snapshot.is_empty() {
            println!();
            Self::print_table(&snapshot.to_table(), None);
        }
    }
}

fn format_timestamp(stream: &StreamInfo) -> String {
    stream
        .committed_at
        .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Render a table as aligned text
pub fn render_table(table: &Table, max_rows: Option<usize>) -> String {
    if table.columns.is_empty() {
        return "(empty table)\n".to_string();
    }

    let shown = max_rows.unwrap_or(table.row_count()).min(table.row_count());
    let cells: Vec<Vec<String>> = (0..shown)
        .filter_map(|i| table.record(i))
        .map(|record| record.iter().map(|c| c.to_string()).collect())
        .collect();

    let widths: Vec<usize> = table
        .columns
        .iter()
        .enumerate()
        .map(|(i, name)| {
            cells
                .iter()
                .map(|r| r[i].chars().count())
                .chain(std::iter::once(name.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let format_line = |values: Vec<&str>| -> String {
        values
            .iter()
            .zip(&widths)
            .map(|(v, w)| format!("{:<width$}", v, width = *w))
            .collect::<Vec<_>>()
            .join(" | ")
            .trim_end()
            .to_string()
    };

    let mut out = String::new();
    out.push_str(&format_line(table.columns.iter().map(String::as_str).collect()));
    out.push('\n');
    out.push_str(
        &widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join("-+-"),
    );
    out.push('\n');
    for row in &cells {
        out.push_str(&format_line(row.iter().map(String::as_str).collect()));
        out.push('\n');
    }
    if shown < table.row_count() {
        out.push_str(&format!("... {} more rows\n", table.row_count() - shown));
    }
    out
}

/// JSON formatter for machine-readable output
pub struct JsonFormatter;

impl JsonFormatter {
    /// Format any serializable data as JSON
    pub fn format<T: serde::Serialize + ?Sized>(data: &T) -> Result<String> {
        Ok(serde_json::to_string_pretty(data)?)
    }

    /// Format a table as a list of row objects
    pub fn format_table(table: &Table) -> Result<String> {
        Ok(serde_json::to_string_pretty(&table.rows)?)
    }

    pub fn format_sync_report(report: &SyncReport) -> Result<String> {
        let json = serde_json::json!({
            "source": report.source,
            "stream": report.stream,
            "row_count": report.row_count,
            "summary": report.summary,
            "schema": report.diff.schema,
            "changes": report.changed.rows,
            "sheet_url": report.sheet_url,
            "notified": report.notified,
        });
        Ok(serde_json::to_string_pretty(&json)?)
    }

    pub fn format_snapshot(stream_id: &str, snapshot: &Snapshot, show_rows: bool) -> Result<String> {
        let mut json = serde_json::json!({
            "stream": stream_id,
            "committed_at": snapshot.committed_at,
            "row_count": snapshot.len(),
            "columns": snapshot.columns,
        });
        if show_rows {
            json["rows"] = serde_json::to_value(&snapshot.to_table().rows)?;
        }
        Ok(serde_json::to_string_pretty(&json)?)
    }
}
