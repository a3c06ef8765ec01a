//! Column-wise reduction of per-trial tables into a summary.

use rayon::prelude::*;
use tracing::{debug, warn};

use crate::column::{ColumnRef, KeyColumns};
use crate::stats::{SampleStats, format_value};
use crate::table::{RawMetricsTable, SummaryRow, SummaryTable};
use crate::{Result, TableError};

/// Verify that `candidate` (from trial `trial`) has the same layout and
/// row identity as `reference`.
///
/// `key` holds resolved key column positions.
pub fn check_row_identity(
    reference: &RawMetricsTable,
    candidate: &RawMetricsTable,
    trial: usize,
    key: &[usize],
) -> Result<()> {
    if candidate.header() != reference.header() {
        return Err(TableError::ShapeMismatch {
            trial,
            detail: format!(
                "column layout [{}] differs from [{}]",
                candidate.header().join(","),
                reference.header().join(",")
            ),
        });
    }
    if candidate.len() != reference.len() {
        return Err(TableError::ShapeMismatch {
            trial,
            detail: format!("expected {} rows, found {}", reference.len(), candidate.len()),
        });
    }
    for (i, (want, got)) in reference.rows().iter().zip(candidate.rows()).enumerate() {
        let want = KeyColumns::identity(key, want);
        let got = KeyColumns::identity(key, got);
        if want != got {
            return Err(TableError::ShapeMismatch {
                trial,
                detail: format!(
                    "row {i} is `{}`, expected `{}`",
                    got.join("/"),
                    want.join("/")
                ),
            });
        }
    }
    Ok(())
}

/// Verify that the distinct values of column `column` in `table` are
/// exactly `expected`.
///
/// A name the runtime skipped would otherwise drop out of the summary
/// without a trace.
pub fn check_workloads(table: &RawMetricsTable, column: usize, expected: &[&str]) -> Result<()> {
    let mut seen: Vec<&str> = Vec::new();
    for row in table.rows() {
        let name = row[column].as_str();
        if !seen.contains(&name) {
            seen.push(name);
        }
    }

    let missing: Vec<String> = expected
        .iter()
        .filter(|name| !seen.contains(name))
        .map(ToString::to_string)
        .collect();
    let unexpected: Vec<String> = seen
        .iter()
        .filter(|name| !expected.contains(name))
        .map(ToString::to_string)
        .collect();
    if missing.is_empty() && unexpected.is_empty() {
        return Ok(());
    }
    Err(TableError::WorkloadMismatch {
        missing,
        unexpected,
    })
}

/// Reduce `tables` (one per trial) into a summary of `metric`.
///
/// Every table must share the first table's header, row count and row
/// identity under `key`. Non-metric cells are taken from the first table.
pub fn aggregate(
    tables: &[RawMetricsTable],
    metric: &ColumnRef,
    key: &KeyColumns,
) -> Result<SummaryTable> {
    let Some(first) = tables.first() else {
        return Err(TableError::NoTrials);
    };

    let metric_column = metric.resolve(first.header())?;
    let key = key.resolve(first.header())?;
    if key.contains(&metric_column) {
        return Err(TableError::MetricInKey(metric.to_string()));
    }

    for (trial, table) in tables.iter().enumerate().skip(1) {
        check_row_identity(first, table, trial, &key)?;
    }

    // Rows are independent; rayon keeps output order for indexed iterators.
    let rows = (0..first.len())
        .into_par_iter()
        .map(|row| summarize_row(tables, row, metric_column))
        .collect::<Result<Vec<_>>>()?;

    if tables.len() < 2 {
        warn!(
            trials = tables.len(),
            "variance is undefined for a single trial"
        );
    }
    debug!(
        trials = tables.len(),
        rows = rows.len(),
        column = metric_column,
        "aggregated metric"
    );

    Ok(SummaryTable::new(
        first.header().to_vec(),
        metric_column,
        rows,
    ))
}

fn summarize_row(tables: &[RawMetricsTable], row: usize, column: usize) -> Result<SummaryRow> {
    let samples = tables
        .iter()
        .enumerate()
        .map(|(trial, table)| {
            let value = table.cell(row, column).unwrap_or_default();
            value
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| TableError::InvalidMetric {
                    trial,
                    row,
                    value: value.to_string(),
                })
        })
        .collect::<Result<Vec<f64>>>()?;

    // Non-empty: `tables` is non-empty.
    let Some(stats) = SampleStats::from_samples(&samples) else {
        return Err(TableError::NoTrials);
    };

    let mut cells = tables[0].rows()[row].clone();
    cells[column] = format_value(stats.mean);
    Ok(SummaryRow { cells, stats })
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: [&str; 6] = [
        "Commit",
        "Contract",
        "Method",
        "Input",
        "Tgas burned",
        "Avg Tgas used",
    ];

    fn table(rows: &[(&str, &str, f64)]) -> RawMetricsTable {
        let header = HEADER.iter().map(ToString::to_string).collect();
        let rows = rows
            .iter()
            .map(|(contract, method, gas)| {
                vec![
                    "abc1234".to_string(),
                    (*contract).to_string(),
                    (*method).to_string(),
                    "{}".to_string(),
                    "1".to_string(),
                    gas.to_string(),
                ]
            })
            .collect();
        RawMetricsTable::new(header, rows).unwrap()
    }

    fn trials(values: &[f64]) -> Vec<RawMetricsTable> {
        values
            .iter()
            .map(|&v| table(&[("calc", "run", v), ("const", "get", 2.0)]))
            .collect()
    }

    #[test]
    fn test_mean_variance_min_max() {
        let tables = trials(&[10.0, 20.0, 30.0]);
        let summary = aggregate(&tables, &ColumnRef::Index(5), &KeyColumns::default()).unwrap();

        assert_eq!(summary.len(), 2);
        let calc = &summary.rows()[0];
        assert_eq!(calc.stats.mean, 20.0);
        assert_eq!(calc.stats.variance, Some(100.0));
        assert_eq!(calc.stats.min, 10.0);
        assert_eq!(calc.stats.max, 30.0);
        assert_eq!(calc.cell(5), Some("20"));

        let constant = &summary.rows()[1];
        assert_eq!(constant.stats.variance, Some(0.0));
    }

    #[test]
    fn test_non_metric_columns_preserved() {
        let tables = trials(&[250.0, 252.0, 254.0]);
        let summary = aggregate(&tables, &ColumnRef::from("Avg Tgas used"), &KeyColumns::default())
            .unwrap();

        assert_eq!(summary.header(), tables[0].header());
        assert_eq!(summary.metric_column(), 5);
        assert_eq!(
            summary.output_header().last().map(String::as_str),
            Some("Max")
        );
        let row = &summary.rows()[0];
        assert_eq!(&row.cells[..5], &tables[0].rows()[0][..5]);
        assert_eq!(
            SummaryTable::output_row(row)[5..],
            ["252", "4", "250", "254"]
        );
    }

    #[test]
    fn test_single_trial_variance_undefined() {
        let tables = trials(&[250.0]);
        let summary = aggregate(&tables, &ColumnRef::Index(5), &KeyColumns::default()).unwrap();
        assert_eq!(summary.rows()[0].stats.variance, None);
        assert_eq!(SummaryTable::output_row(&summary.rows()[0])[6], "");
    }

    #[test]
    fn test_no_trials() {
        let err = aggregate(&[], &ColumnRef::Index(5), &KeyColumns::default()).unwrap_err();
        assert!(matches!(err, TableError::NoTrials));
    }

    #[test]
    fn test_workloads_match_registry() {
        let t = table(&[("calc", "run", 1.0), ("calc", "reset", 1.0), ("const", "get", 2.0)]);
        check_workloads(&t, 1, &["calc", "const"]).unwrap();
        check_workloads(&t, 1, &["const", "calc"]).unwrap();

        let err = check_workloads(&t, 1, &["calc", "erc20"]).unwrap_err();
        let TableError::WorkloadMismatch {
            missing,
            unexpected,
        } = err
        else {
            panic!("expected a workload mismatch");
        };
        assert_eq!(missing, ["erc20"]);
        assert_eq!(unexpected, ["const"]);
    }

    #[test]
    fn test_row_count_mismatch() {
        let mut tables = trials(&[1.0, 2.0]);
        tables.push(table(&[("calc", "run", 3.0)]));
        let err = aggregate(&tables, &ColumnRef::Index(5), &KeyColumns::default()).unwrap_err();
        assert!(matches!(err, TableError::ShapeMismatch { trial: 2, .. }));
    }

    #[test]
    fn test_row_identity_mismatch() {
        let tables = vec![
            table(&[("calc", "run", 1.0), ("const", "get", 2.0)]),
            table(&[("const", "get", 2.0), ("calc", "run", 1.0)]),
        ];
        let err = aggregate(&tables, &ColumnRef::Index(5), &KeyColumns::default()).unwrap_err();
        let TableError::ShapeMismatch { trial, detail } = err else {
            panic!("expected shape mismatch");
        };
        assert_eq!(trial, 1);
        assert!(detail.contains("row 0"), "{detail}");
    }

    #[test]
    fn test_invalid_metric() {
        let mut tables = trials(&[1.0, 2.0]);
        let header = tables[1].header().to_vec();
        let mut rows = tables[1].rows().to_vec();
        rows[1][5] = "n/a".to_string();
        tables[1] = RawMetricsTable::new(header, rows).unwrap();

        let err = aggregate(&tables, &ColumnRef::Index(5), &KeyColumns::default()).unwrap_err();
        assert!(matches!(
            err,
            TableError::InvalidMetric { trial: 1, row: 1, .. }
        ));
    }

    #[test]
    fn test_metric_cannot_be_key() {
        let tables = trials(&[1.0]);
        let err = aggregate(&tables, &ColumnRef::Index(2), &KeyColumns::default()).unwrap_err();
        assert!(matches!(err, TableError::MetricInKey(_)));
    }

    #[test]
    fn test_unknown_metric_column() {
        let tables = trials(&[1.0]);
        let err = aggregate(&tables, &ColumnRef::Index(9), &KeyColumns::default()).unwrap_err();
        assert!(matches!(err, TableError::UnknownColumn { .. }));
    }
}
