//! Column references resolved against a table header.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Result, TableError};

/// A column addressed by zero-based position or by header name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColumnRef {
    Index(usize),
    Name(String),
}

impl ColumnRef {
    /// Parse from a CLI-style string: digits select by index, anything else by name.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        s.trim()
            .parse::<usize>()
            .map_or_else(|_| Self::Name(s.trim().to_string()), Self::Index)
    }

    /// Resolve to a position in `header`.
    pub fn resolve(&self, header: &[String]) -> Result<usize> {
        let found = match self {
            Self::Index(i) => (*i < header.len()).then_some(*i),
            Self::Name(name) => header.iter().position(|h| h == name),
        };
        found.ok_or_else(|| TableError::UnknownColumn {
            column: self.to_string(),
            header: header.join(","),
        })
    }
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index(i) => write!(f, "#{i}"),
            Self::Name(name) => write!(f, "`{name}`"),
        }
    }
}

impl From<usize> for ColumnRef {
    fn from(index: usize) -> Self {
        Self::Index(index)
    }
}

impl From<&str> for ColumnRef {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

/// Columns that together identify a row across trials.
///
/// The runtime emits one row per benchmarked call, so the workload name
/// alone is not unique; by default identity is (contract, method, input).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyColumns(pub Vec<ColumnRef>);

impl KeyColumns {
    /// Resolve every key column against `header`.
    pub fn resolve(&self, header: &[String]) -> Result<Vec<usize>> {
        self.0.iter().map(|c| c.resolve(header)).collect()
    }

    /// Extract the identity of `row` given resolved key positions.
    #[must_use]
    pub fn identity<'a>(positions: &[usize], row: &'a [String]) -> Vec<&'a str> {
        positions
            .iter()
            .filter_map(|&i| row.get(i).map(String::as_str))
            .collect()
    }
}

impl Default for KeyColumns {
    fn default() -> Self {
        Self(vec![ColumnRef::Index(1), ColumnRef::Index(2), ColumnRef::Index(3)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header() -> Vec<String> {
        ["Commit", "Contract", "Method", "Input", "Tgas burned", "Avg Tgas used"]
            .iter()
            .map(ToString::to_string)
            .collect()
    }

    #[test]
    fn test_resolve() {
        let header = header();
        assert_eq!(ColumnRef::Index(5).resolve(&header).unwrap(), 5);
        assert_eq!(ColumnRef::from("Method").resolve(&header).unwrap(), 2);
        assert!(matches!(
            ColumnRef::Index(6).resolve(&header),
            Err(TableError::UnknownColumn { .. })
        ));
        assert!(ColumnRef::from("Gas").resolve(&header).is_err());
    }

    #[test]
    fn test_parse() {
        assert_eq!(ColumnRef::parse("5"), ColumnRef::Index(5));
        assert_eq!(ColumnRef::parse(" Avg Tgas used"), ColumnRef::from("Avg Tgas used"));
    }

    #[test]
    fn test_identity() {
        let row: Vec<String> = ["abc", "calc", "run", "{}", "1", "2"]
            .iter()
            .map(ToString::to_string)
            .collect();
        let positions = KeyColumns::default().resolve(&header()).unwrap();
        assert_eq!(KeyColumns::identity(&positions, &row), ["calc", "run", "{}"]);
    }
}
