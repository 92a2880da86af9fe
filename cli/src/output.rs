//! Table and timestamp formatting helpers for CLI output.

use std::fmt;

use chrono::{DateTime, Utc};

/// Tab-delimited table with tabwriter-style alignment.
///
/// Every cell followed by a tab is padded to the widest cell of its column
/// within this table. The last cell of a row is written as is.
#[derive(Debug, Clone, Default)]
pub struct TabTable {
    indent: String,
    rows: Vec<Vec<String>>,
}

impl TabTable {
    /// Create a table whose first row is `headers`.
    pub fn new(headers: &[&str]) -> Self {
        let mut table = Self::default();
        table.add_row(headers.iter().copied());
        table
    }

    /// Prefix every rendered line with `indent`.
    pub fn indented(mut self, indent: &str) -> Self {
        self.indent = indent.to_string();
        self
    }

    pub fn add_row<I, S>(&mut self, cells: I)
    where
        I: IntoIterator<Item = S>,
        S: ToString,
    {
        self.rows
            .push(cells.into_iter().map(|c| c.to_string()).collect());
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Width of each column: the widest cell in that column, header included.
    pub fn column_widths(&self) -> Vec<usize> {
        let columns = self.rows.iter().map(Vec::len).max().unwrap_or(0);
        (0..columns)
            .map(|i| {
                self.rows
                    .iter()
                    .filter_map(|row| row.get(i))
                    .map(|cell| cell.chars().count())
                    .max()
                    .unwrap_or(0)
            })
            .collect()
    }
}

impl fmt::Display for TabTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let widths = self.column_widths();
        for row in &self.rows {
            f.write_str(&self.indent)?;
            for (i, cell) in row.iter().enumerate() {
                if i + 1 < row.len() {
                    write!(f, "{:<width$}\t", cell, width = widths[i])?;
                } else {
                    f.write_str(cell)?;
                }
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Format an absolute timestamp, e.g. `2018-12-01 21:33:20.123456789 +0000 UTC`.
///
/// Fractional seconds carry no trailing zeros and are omitted when zero, so
/// half a second renders as `.5` and the epoch as `1970-01-01 00:00:00 +0000 UTC`.
pub fn format_timestamp(dt: &DateTime<Utc>) -> String {
    let nanos = dt.format("%f").to_string();
    let frac = nanos.trim_end_matches('0');
    let secs = dt.format("%Y-%m-%d %H:%M:%S");
    let zone = dt.format("%z");
    if frac.is_empty() {
        format!("{secs} {zone} UTC")
    } else {
        format!("{secs}.{frac} {zone} UTC")
    }
}

/// Format the time elapsed from `t` to `now` in its coarsest non-zero unit.
///
/// Units are `d`, `h`, `m`, `s` and `ms`. A zero or negative elapsed time
/// renders as `0ms`.
pub fn format_ago(t: &DateTime<Utc>, now: &DateTime<Utc>) -> String {
    let elapsed = now.signed_duration_since(*t);
    if elapsed <= chrono::Duration::zero() {
        return "0ms".to_string();
    }

    let days = elapsed.num_days();
    if days > 0 {
        return format!("{days}d");
    }

    let hours = elapsed.num_hours();
    if hours > 0 {
        return format!("{hours}h");
    }

    let mins = elapsed.num_minutes();
    if mins > 0 {
        return format!("{mins}m");
    }

    let secs = elapsed.num_seconds();
    if secs > 0 {
        return format!("{secs}s");
    }

    format!("{}ms", elapsed.num_milliseconds())
}
