//! Terminal output: trial progress, styled messages and markdown tables.

use std::io::{self, Write};

use console::style;
use gasbench::{SummaryTable, TrialObserver, Workload, format_value};
use indicatif::{ProgressBar, ProgressStyle};

/// Progress bar over trials.
pub struct TrialProgress {
    bar: ProgressBar,
}

impl TrialProgress {
    pub fn new(total: usize, hidden: bool) -> Self {
        let bar = if hidden {
            ProgressBar::hidden()
        } else {
            ProgressBar::new(total as u64)
        };
        let style = ProgressStyle::default_bar()
            .template("{msg:30} [{bar:30.cyan/dim}] {pos}/{len} {elapsed}")
            .map_or_else(|_| ProgressStyle::default_bar(), |s| s.progress_chars("━╸━"));
        bar.set_style(style);
        Self { bar }
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl TrialObserver for TrialProgress {
    fn trial_started(&self, trial: usize, total: usize) {
        self.bar
            .set_message(format!("trial {}/{total}", trial + 1));
    }

    fn workload_built(&self, trial: usize, workload: &Workload) {
        self.bar
            .set_message(format!("trial {}: built {workload}", trial + 1));
    }

    fn executing(&self, trial: usize) {
        self.bar
            .set_message(format!("trial {}: running", trial + 1));
    }

    fn trial_finished(&self, _trial: usize, _rows: usize) {
        self.bar.inc(1);
    }
}

impl Drop for TrialProgress {
    fn drop(&mut self) {
        self.bar.finish_and_clear();
    }
}

// ============================================================================
// Styled output helpers
// ============================================================================

/// Print an info message to stderr.
pub fn info(message: &str) {
    eprintln!("{} {}", style("→").cyan(), message);
}

/// Print a success message to stderr.
pub fn success(message: &str) {
    eprintln!("{} {}", style("✓").green().bold(), message);
}

/// Print an error message to stderr.
pub fn error(message: &str) {
    eprintln!("{} {}", style("✗").red().bold(), message);
}

/// Print a warning message to stderr.
pub fn warning(message: &str) {
    eprintln!("{} {}", style("!").yellow().bold(), message);
}

/// Print a path output (like "-> /path/to/file").
pub fn path_output(path: &std::path::Path) {
    eprintln!("  {} {}", style("→").dim(), style(path.display()).dim());
}

// ============================================================================
// Tables
// ============================================================================

#[derive(Clone, Copy, Default)]
pub enum Alignment {
    #[default]
    Left,
    Right,
}

/// Markdown table builder.
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
    alignments: Vec<Alignment>,
}

impl Table {
    pub fn new<S: Into<String>>(headers: impl IntoIterator<Item = S>) -> Self {
        let headers: Vec<String> = headers.into_iter().map(Into::into).collect();
        let alignments = vec![Alignment::Left; headers.len()];
        Self {
            headers,
            rows: Vec::new(),
            alignments,
        }
    }

    /// Right-align column `index`.
    #[must_use]
    pub fn right(mut self, index: usize) -> Self {
        if let Some(a) = self.alignments.get_mut(index) {
            *a = Alignment::Right;
        }
        self
    }

    pub fn add_row(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    /// Render as a markdown table.
    pub fn render(&self) -> String {
        if self.headers.is_empty() {
            return String::new();
        }

        let mut widths: Vec<usize> = self.headers.iter().map(|h| h.chars().count()).collect();
        for row in &self.rows {
            for (width, cell) in widths.iter_mut().zip(row) {
                *width = (*width).max(cell.chars().count());
            }
        }

        let mut out = String::new();
        out.push('|');
        for (header, &w) in self.headers.iter().zip(&widths) {
            out.push_str(&format!(" {header:^w$} |"));
        }
        out.push_str("\n|");
        for (i, &w) in widths.iter().enumerate() {
            match self.alignments.get(i).copied().unwrap_or_default() {
                Alignment::Left => out.push_str(&format!(":{:-<w$}|", "", w = w + 1)),
                Alignment::Right => out.push_str(&format!("{:-<w$}:|", "", w = w + 1)),
            }
        }
        out.push('\n');

        for row in &self.rows {
            out.push('|');
            for (i, (cell, &w)) in row.iter().zip(&widths).enumerate() {
                match self.alignments.get(i).copied().unwrap_or_default() {
                    Alignment::Left => out.push_str(&format!(" {cell:<w$} |")),
                    Alignment::Right => out.push_str(&format!(" {cell:>w$} |")),
                }
            }
            out.push('\n');
        }
        out
    }

    /// Print to stdout.
    pub fn print(&self) {
        print!("{}", self.render());
        let _ = io::stdout().flush();
    }
}

/// Summary rows as a table: key columns followed by the statistics.
pub fn summary_table(summary: &SummaryTable, key: &[usize]) -> Table {
    let headers = key
        .iter()
        .filter_map(|&i| summary.header().get(i).cloned())
        .chain(["Mean", "Variance", "Min", "Max"].map(String::from));
    let first_stat = key.len();
    let mut table = Table::new(headers)
        .right(first_stat)
        .right(first_stat + 1)
        .right(first_stat + 2)
        .right(first_stat + 3);

    for row in summary.rows() {
        let mut cells: Vec<String> = key
            .iter()
            .filter_map(|&i| row.cell(i).map(String::from))
            .collect();
        cells.push(format_value(row.stats.mean));
        cells.push(row.stats.variance.map_or_else(|| "-".to_string(), format_value));
        cells.push(format_value(row.stats.min));
        cells.push(format_value(row.stats.max));
        table.add_row(cells);
    }
    table
}
