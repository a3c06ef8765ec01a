//! Regression gate: one statistic of one summary row against a fixed interval.

use std::fmt;

use gasbench_table::{ColumnRef, SampleStats, SummaryRow, SummaryTable};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{Error, Result};

/// Which summary statistic to gate on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Statistic {
    #[default]
    Mean,
    Variance,
    Min,
    Max,
}

impl Statistic {
    /// Read this statistic; `None` when it is undefined (variance of one trial).
    #[must_use]
    pub const fn of(self, stats: &SampleStats) -> Option<f64> {
        match self {
            Self::Mean => Some(stats.mean),
            Self::Variance => stats.variance,
            Self::Min => Some(stats.min),
            Self::Max => Some(stats.max),
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Mean => "mean",
            Self::Variance => "variance",
            Self::Min => "min",
            Self::Max => "max",
        }
    }
}

impl fmt::Display for Statistic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inclusive acceptance bounds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AcceptanceInterval {
    lower: f64,
    upper: f64,
}

impl AcceptanceInterval {
    /// Both bounds must be finite and `lower <= upper`.
    pub fn new(lower: f64, upper: f64) -> Result<Self> {
        if !lower.is_finite() || !upper.is_finite() || lower > upper {
            return Err(Error::InvalidInterval { lower, upper });
        }
        Ok(Self { lower, upper })
    }

    #[must_use]
    pub const fn lower(&self) -> f64 {
        self.lower
    }

    #[must_use]
    pub const fn upper(&self) -> f64 {
        self.upper
    }

    /// `lower <= value <= upper`. NaN is never contained.
    #[must_use]
    pub fn contains(&self, value: f64) -> bool {
        self.lower <= value && value <= self.upper
    }
}

impl fmt::Display for AcceptanceInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.lower, self.upper)
    }
}

/// `column == value`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMatch {
    pub column: ColumnRef,
    pub value: String,
}

impl ColumnMatch {
    pub fn new(column: impl Into<ColumnRef>, value: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            value: value.into(),
        }
    }
}

/// Picks rows by cell values rather than position, so registry reordering
/// never moves the gate onto another row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowSelector {
    conditions: Vec<ColumnMatch>,
}

impl RowSelector {
    #[must_use]
    pub const fn new(conditions: Vec<ColumnMatch>) -> Self {
        Self { conditions }
    }

    /// Select on the workload column alone.
    #[must_use]
    pub fn workload(column: impl Into<ColumnRef>, name: &str) -> Self {
        Self::new(vec![ColumnMatch::new(column, name)])
    }

    /// Add a narrowing condition.
    #[must_use]
    pub fn and(mut self, column: impl Into<ColumnRef>, value: impl Into<String>) -> Self {
        self.conditions.push(ColumnMatch::new(column, value));
        self
    }

    /// The single row matching every condition.
    pub fn select<'a>(&self, summary: &'a SummaryTable) -> Result<&'a SummaryRow> {
        let resolved = self
            .conditions
            .iter()
            .map(|c| -> Result<(usize, &str)> {
                Ok((c.column.resolve(summary.header())?, c.value.as_str()))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut matches = summary.rows().iter().filter(|row| {
            resolved
                .iter()
                .all(|&(col, value)| row.cell(col) == Some(value))
        });

        let Some(first) = matches.next() else {
            return Err(Error::RowNotFound(self.to_string()));
        };
        let extra = matches.count();
        if extra > 0 {
            return Err(Error::AmbiguousRow {
                selector: self.to_string(),
                count: extra + 1,
            });
        }
        Ok(first)
    }
}

impl fmt::Display for RowSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .conditions
            .iter()
            .map(|c| format!("{}={}", c.column, c.value))
            .collect();
        write!(f, "{{{}}}", parts.join(", "))
    }
}

/// Gate decision.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GateVerdict {
    Pass { value: f64 },
    Fail {
        value: f64,
        interval: AcceptanceInterval,
    },
}

impl GateVerdict {
    #[must_use]
    pub const fn passed(&self) -> bool {
        matches!(self, Self::Pass { .. })
    }

    #[must_use]
    pub const fn value(&self) -> f64 {
        match self {
            Self::Pass { value } | Self::Fail { value, .. } => *value,
        }
    }

    /// Convert a failure into [`Error::Regression`].
    pub fn ensure_pass(self, statistic: Statistic, selector: &RowSelector) -> Result<f64> {
        match self {
            Self::Pass { value } => Ok(value),
            Self::Fail { value, interval } => Err(Error::Regression {
                statistic: statistic.to_string(),
                row: selector.to_string(),
                value,
                lower: interval.lower(),
                upper: interval.upper(),
            }),
        }
    }
}

/// Check `statistic` of the row picked by `selector` against `interval`.
pub fn gate(
    summary: &SummaryTable,
    selector: &RowSelector,
    statistic: Statistic,
    interval: AcceptanceInterval,
) -> Result<GateVerdict> {
    let row = selector.select(summary)?;
    let Some(value) = statistic.of(&row.stats) else {
        return Err(Error::UndefinedStatistic {
            statistic: statistic.to_string(),
            row: selector.to_string(),
        });
    };

    if interval.contains(value) {
        info!(%statistic, value, %interval, row = %selector, "gate passed");
        Ok(GateVerdict::Pass { value })
    } else {
        warn!(%statistic, value, %interval, row = %selector, "gate failed");
        Ok(GateVerdict::Fail { value, interval })
    }
}
