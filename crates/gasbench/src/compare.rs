//! Diff two stored summaries row by row.
//!
//! This is a reporting aid. The pass/fail decision of a run stays with the
//! fixed-interval gate.

use std::collections::HashMap;
use std::fmt;

use gasbench_table::{KeyColumns, SummaryTable};

use crate::Result;

/// Mean of one row in the base and head summaries.
#[derive(Debug, Clone, PartialEq)]
pub struct RowDelta {
    /// Key cells joined with `/`.
    pub row: String,
    /// `None` when the row is new in head.
    pub base: Option<f64>,
    pub head: f64,
}

impl RowDelta {
    /// `(head - base) / base` in percent. `None` for new rows or a zero base.
    #[must_use]
    pub fn change_pct(&self) -> Option<f64> {
        let base = self.base?;
        (base.abs() > f64::EPSILON).then(|| (self.head - base) / base * 100.0)
    }

    /// Whether the head mean grew by more than `tolerance_pct` percent.
    #[must_use]
    pub fn exceeds(&self, tolerance_pct: f64) -> bool {
        self.change_pct().is_some_and(|c| c > tolerance_pct)
    }
}

impl fmt::Display for RowDelta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.base, self.change_pct()) {
            (Some(base), Some(pct)) => {
                write!(f, "{}: {base} -> {} ({pct:+.2}%)", self.row, self.head)
            }
            (Some(base), None) => write!(f, "{}: {base} -> {}", self.row, self.head),
            (None, _) => write!(f, "{}: new, {}", self.row, self.head),
        }
    }
}

/// Row-by-row comparison of two summaries, in head row order.
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    pub deltas: Vec<RowDelta>,
    /// Rows present in base only.
    pub removed: Vec<String>,
}

impl Comparison {
    /// Rows whose mean grew beyond `tolerance_pct`.
    pub fn regressions(&self, tolerance_pct: f64) -> impl Iterator<Item = &RowDelta> {
        self.deltas.iter().filter(move |d| d.exceeds(tolerance_pct))
    }
}

fn row_keys(summary: &SummaryTable, key: &KeyColumns) -> Result<Vec<String>> {
    let positions = key.resolve(summary.header())?;
    Ok(summary
        .rows()
        .iter()
        .map(|row| KeyColumns::identity(&positions, &row.cells).join("/"))
        .collect())
}

/// Match rows of `head` against `base` by key columns and compare means.
pub fn compare(base: &SummaryTable, head: &SummaryTable, key: &KeyColumns) -> Result<Comparison> {
    let base_keys = row_keys(base, key)?;
    let head_keys = row_keys(head, key)?;

    let base_means: HashMap<&str, f64> = base_keys
        .iter()
        .map(String::as_str)
        .zip(base.rows().iter().map(|r| r.stats.mean))
        .collect();

    let deltas = head_keys
        .iter()
        .zip(head.rows())
        .map(|(row, summary_row)| RowDelta {
            row: row.clone(),
            base: base_means.get(row.as_str()).copied(),
            head: summary_row.stats.mean,
        })
        .collect();

    let removed = base_keys
        .iter()
        .filter(|k| !head_keys.contains(*k))
        .cloned()
        .collect();

    Ok(Comparison { deltas, removed })
}

#[cfg(test)]
mod tests {
    use super::*;
    use gasbench_table::{SampleStats, SummaryRow};

    fn summary(rows: &[(&str, f64)]) -> SummaryTable {
        let header = ["Commit", "Contract", "Method", "Input", "Tgas burned", "Avg Tgas used"]
            .map(String::from)
            .to_vec();
        let rows = rows
            .iter()
            .map(|&(name, mean)| SummaryRow {
                cells: vec![
                    "rev".to_string(),
                    name.to_string(),
                    "run".to_string(),
                    "{}".to_string(),
                    "1".to_string(),
                    mean.to_string(),
                ],
                stats: SampleStats::from_samples(&[mean]).unwrap(),
            })
            .collect();
        SummaryTable::new(header, 5, rows)
    }

    #[test]
    fn test_compare_by_key() {
        let base = summary(&[("calc", 200.0), ("const", 10.0), ("gone", 1.0)]);
        // Reordered head with one new row.
        let head = summary(&[("const", 10.0), ("calc", 250.0), ("erc20", 5.0)]);

        let cmp = compare(&base, &head, &KeyColumns::default()).unwrap();
        assert_eq!(cmp.deltas.len(), 3);

        assert_eq!(cmp.deltas[0].row, "const/run/{}");
        assert_eq!(cmp.deltas[0].change_pct(), Some(0.0));
        assert_eq!(cmp.deltas[1].change_pct(), Some(25.0));
        assert_eq!(cmp.deltas[2].base, None);
        assert_eq!(cmp.removed, ["gone/run/{}"]);

        let regressed: Vec<_> = cmp.regressions(5.0).map(|d| d.row.as_str()).collect();
        assert_eq!(regressed, ["calc/run/{}"]);
        assert_eq!(cmp.regressions(30.0).count(), 0);
    }

    #[test]
    fn test_display() {
        let delta = RowDelta {
            row: "calc/run/{}".to_string(),
            base: Some(200.0),
            head: 250.0,
        };
        assert_eq!(delta.to_string(), "calc/run/{}: 200 -> 250 (+25.00%)");

        let new = RowDelta {
            row: "erc20/run/{}".to_string(),
            base: None,
            head: 5.0,
        };
        assert_eq!(new.to_string(), "erc20/run/{}: new, 5");
        assert!(!new.exceeds(0.0));
    }

    #[test]
    fn test_zero_base_has_no_change() {
        let delta = RowDelta {
            row: "x".to_string(),
            base: Some(0.0),
            head: 1.0,
        };
        assert_eq!(delta.change_pct(), None);
    }
}
