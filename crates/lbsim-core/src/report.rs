//! Tabular reports: CSV files and aligned console tables.
//!
//! Anything that can describe itself as a header plus a row of cells
//! implements [`TableRow`]; a [`Table`] of such rows renders either form.

use crate::metrics::{PolicyMetrics, TimestepMetrics};

/// A report row: column names and the matching cell values.
pub trait TableRow {
    fn header(&self) -> Vec<String>;
    fn data(&self) -> Vec<String>;
}

const DELIMITER: &str = ",";
const MIN_COL_WIDTH: usize = 10;

/// Rows of one kind, rendered together.
pub struct Table<'a> {
    rows: Vec<&'a dyn TableRow>,
    col_widths: Vec<usize>,
}

impl<'a> Default for Table<'a> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> Table<'a> {
    pub fn new() -> Self {
        Self {
            rows: Vec::new(),
            col_widths: Vec::new(),
        }
    }

    pub fn from_rows<R: TableRow>(rows: &'a [R]) -> Self {
        let mut table = Self::new();
        for row in rows {
            table.add_row(row);
        }
        table
    }

    pub fn add_row(&mut self, row: &'a dyn TableRow) {
        if self.rows.is_empty() {
            self.widen(&row.header());
        }
        self.widen(&row.data());
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn widen(&mut self, cells: &[String]) {
        if self.col_widths.len() < cells.len() {
            self.col_widths.resize(cells.len(), MIN_COL_WIDTH);
        }
        for (width, cell) in self.col_widths.iter_mut().zip(cells) {
            if cell.len() + 2 > *width {
                *width = cell.len() + 2;
            }
        }
    }

    /// Header line followed by one line per row.
    pub fn to_csv(&self) -> String {
        let mut out = String::new();
        if let Some(first) = self.rows.first() {
            out.push_str(&first.header().join(DELIMITER));
            out.push('\n');
        }
        for row in &self.rows {
            out.push_str(&row.data().join(DELIMITER));
            out.push('\n');
        }
        out
    }

    /// Left-aligned fixed-width table with a rule under the header.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let Some(first) = self.rows.first() else {
            return out;
        };
        out.push_str(&self.render_line(&first.header()));
        out.push_str(&"-".repeat(self.col_widths.iter().sum()));
        out.push('\n');
        for row in &self.rows {
            out.push_str(&self.render_line(&row.data()));
        }
        out
    }

    fn render_line(&self, cells: &[String]) -> String {
        let mut line = String::new();
        for (cell, &width) in cells.iter().zip(&self.col_widths) {
            line.push_str(&format!("{:<width$}", cell, width = width));
        }
        line.truncate(line.trim_end().len());
        line.push('\n');
        line
    }
}

impl TableRow for PolicyMetrics {
    fn header(&self) -> Vec<String> {
        [
            "policy",
            "nranks",
            "timesteps",
            "total_cost_us",
            "makespan_us",
            "imbalance_p50",
            "imbalance_p99",
            "imbalance_max",
            "mean_jains",
            "mean_rank_changes",
            "load_cv",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect()
    }

    fn data(&self) -> Vec<String> {
        vec![
            self.policy.to_string(),
            self.nranks.to_string(),
            self.timesteps.to_string(),
            self.total_cost_us.to_string(),
            self.makespan_us.to_string(),
            format!("{:.3}", self.imbalance.p50),
            format!("{:.3}", self.imbalance.p99),
            format!("{:.3}", self.imbalance.max),
            format!("{:.4}", self.mean_jains_fairness_index),
            format!("{:.1}", self.mean_rank_changes),
            format!("{:.3}", self.load_cv),
        ]
    }
}

impl TableRow for TimestepMetrics {
    fn header(&self) -> Vec<String> {
        [
            "timestep",
            "policy",
            "nblocks",
            "total_cost_us",
            "max_rank_cost_us",
            "mean_rank_cost_us",
            "imbalance",
            "jains",
            "rank_changes",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect()
    }

    fn data(&self) -> Vec<String> {
        vec![
            self.timestep.to_string(),
            self.policy.to_string(),
            self.nblocks.to_string(),
            self.total_cost_us.to_string(),
            self.max_rank_cost_us.to_string(),
            format!("{:.1}", self.mean_rank_cost_us),
            format!("{:.3}", self.imbalance),
            format!("{:.4}", self.jains_fairness_index),
            self.rank_changes.to_string(),
        ]
    }
}
