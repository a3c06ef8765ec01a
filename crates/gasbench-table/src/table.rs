//! Raw per-trial tables and aggregated summary tables, with CSV codecs.

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use crate::column::ColumnRef;
use crate::stats::{SampleStats, format_value};
use crate::{Result, TableError};

/// Columns appended to a raw header to form a summary header.
pub const SUMMARY_COLUMNS: [&str; 3] = ["Variance", "Min", "Max"];

/// One trial's output: a header and one row of cells per benchmarked call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMetricsTable {
    header: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl RawMetricsTable {
    /// Build a table, checking that every row matches the header width.
    pub fn new(header: Vec<String>, rows: Vec<Vec<String>>) -> Result<Self> {
        for (i, row) in rows.iter().enumerate() {
            if row.len() != header.len() {
                return Err(TableError::RaggedRow {
                    row: i,
                    expected: header.len(),
                    found: row.len(),
                });
            }
        }
        Ok(Self { header, rows })
    }

    /// Column names.
    #[must_use]
    pub fn header(&self) -> &[String] {
        &self.header
    }

    /// Data rows in emission order.
    #[must_use]
    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Number of data rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Cell at (`row`, `column`).
    #[must_use]
    pub fn cell(&self, row: usize, column: usize) -> Option<&str> {
        self.rows.get(row)?.get(column).map(String::as_str)
    }

    /// Parse a CSV document with a header line.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut csv = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(reader);
        let header = csv.headers()?.iter().map(str::to_string).collect();
        let rows = csv
            .records()
            .map(|r| r.map(|rec| rec.iter().map(str::to_string).collect()))
            .collect::<std::result::Result<Vec<Vec<String>>, _>>()?;
        Self::new(header, rows)
    }

    /// Read a CSV file.
    pub fn from_path(path: &Path) -> Result<Self> {
        Self::from_reader(File::open(path)?)
    }

    /// Write as CSV with a header line.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut csv = csv::Writer::from_writer(writer);
        csv.write_record(&self.header)?;
        for row in &self.rows {
            csv.write_record(row)?;
        }
        csv.flush()?;
        Ok(())
    }
}

/// One aggregated row: the original cells (metric replaced by the mean)
/// plus the cross-trial statistics.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryRow {
    pub cells: Vec<String>,
    pub stats: SampleStats,
}

impl SummaryRow {
    /// Cell by position within the original (non-appended) columns.
    #[must_use]
    pub fn cell(&self, column: usize) -> Option<&str> {
        self.cells.get(column).map(String::as_str)
    }
}

/// Aggregated table: the raw layout with the metric column holding the
/// mean, followed by `Variance`, `Min` and `Max`.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryTable {
    header: Vec<String>,
    metric_column: usize,
    rows: Vec<SummaryRow>,
}

impl SummaryTable {
    /// Assemble a summary. `header` is the raw header (without appended columns).
    #[must_use]
    pub fn new(header: Vec<String>, metric_column: usize, rows: Vec<SummaryRow>) -> Self {
        Self {
            header,
            metric_column,
            rows,
        }
    }

    /// The raw column names (without `Variance`/`Min`/`Max`).
    #[must_use]
    pub fn header(&self) -> &[String] {
        &self.header
    }

    /// Full output header including the appended statistic columns.
    #[must_use]
    pub fn output_header(&self) -> Vec<String> {
        self.header
            .iter()
            .cloned()
            .chain(SUMMARY_COLUMNS.iter().map(ToString::to_string))
            .collect()
    }

    /// Position of the metric (mean) column.
    #[must_use]
    pub const fn metric_column(&self) -> usize {
        self.metric_column
    }

    #[must_use]
    pub fn rows(&self) -> &[SummaryRow] {
        &self.rows
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Output cells for one row, in `output_header` order.
    /// Undefined variance is written as an empty cell.
    #[must_use]
    pub fn output_row(row: &SummaryRow) -> Vec<String> {
        let mut out = row.cells.clone();
        out.push(row.stats.variance.map(format_value).unwrap_or_default());
        out.push(format_value(row.stats.min));
        out.push(format_value(row.stats.max));
        out
    }

    /// Write as CSV.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut csv = csv::Writer::from_writer(writer);
        csv.write_record(self.output_header())?;
        for row in &self.rows {
            csv.write_record(Self::output_row(row))?;
        }
        csv.flush()?;
        Ok(())
    }

    /// Parse a previously written summary CSV.
    ///
    /// `metric` names the column holding the mean; the trailing three
    /// columns must be `Variance`, `Min` and `Max`.
    pub fn from_reader<R: Read>(reader: R, metric: &ColumnRef) -> Result<Self> {
        let raw = RawMetricsTable::from_reader(reader)?;
        let full = raw.header();
        let Some(split) = full.len().checked_sub(SUMMARY_COLUMNS.len()) else {
            return Err(TableError::NotASummary(format!(
                "only {} columns",
                full.len()
            )));
        };
        if full[split..] != SUMMARY_COLUMNS {
            return Err(TableError::NotASummary(format!(
                "trailing columns are {}",
                full[split..].join(",")
            )));
        }

        let header = full[..split].to_vec();
        let metric_column = metric.resolve(&header)?;
        let parse = |row: usize, value: &str| {
            value
                .trim()
                .parse::<f64>()
                .map_err(|_| TableError::InvalidMetric {
                    trial: 0,
                    row,
                    value: value.to_string(),
                })
        };

        let mut rows = Vec::with_capacity(raw.len());
        for (i, cells) in raw.rows().iter().enumerate() {
            let variance = match cells[split].trim() {
                "" | "NaN" | "nan" => None,
                v => Some(parse(i, v)?),
            };
            let stats = SampleStats {
                count: None,
                mean: parse(i, &cells[metric_column])?,
                variance,
                min: parse(i, &cells[split + 1])?,
                max: parse(i, &cells[split + 2])?,
            };
            rows.push(SummaryRow {
                cells: cells[..split].to_vec(),
                stats,
            });
        }

        Ok(Self::new(header, metric_column, rows))
    }

    /// Read a summary CSV file.
    pub fn from_path(path: &Path, metric: &ColumnRef) -> Result<Self> {
        Self::from_reader(File::open(path)?, metric)
    }
}
