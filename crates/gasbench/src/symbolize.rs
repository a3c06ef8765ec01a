//! Replace numeric function ids in a disassembly listing with names.
//!
//! The dictionary has one entry per line: a 4-character id immediately
//! followed by the function name.

use std::collections::HashMap;
use std::path::Path;

use regex::Regex;
use tracing::debug;

use crate::{Error, Result};

/// Width of the id prefix on each dictionary line.
const ID_WIDTH: usize = 4;

/// Sentinels for "no function" that are always erased.
const ERASED: [&str; 2] = ["18446744073709551615", "0xffffffffffffffff"];

/// Id to name substitutions.
#[derive(Debug, Clone)]
pub struct SymbolTable {
    names: HashMap<String, String>,
    pattern: Regex,
}

impl SymbolTable {
    /// Parse dictionary text. Lines shorter than the id width are skipped.
    pub fn parse(text: &str) -> Result<Self> {
        let mut names: HashMap<String, String> = ERASED
            .iter()
            .map(|k| ((*k).to_string(), String::new()))
            .collect();

        for line in text.lines() {
            if line.chars().count() < ID_WIDTH {
                continue;
            }
            let split = line
                .char_indices()
                .nth(ID_WIDTH)
                .map_or(line.len(), |(i, _)| i);
            let (id, name) = line.split_at(split);
            names.insert(id.to_string(), name.to_string());
        }

        // Longest first: the regex alternation takes the first branch that
        // matches, so a short id never eats the prefix of a longer one.
        let mut keys: Vec<&str> = names.keys().map(String::as_str).collect();
        keys.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        let alternation = keys
            .iter()
            .map(|k| regex::escape(k))
            .collect::<Vec<_>>()
            .join("|");
        let pattern = Regex::new(&alternation)
            .map_err(|e| Error::Config(format!("symbol dictionary: {e}")))?;

        debug!(entries = names.len(), "loaded symbol table");
        Ok(Self { names, pattern })
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        Self::parse(&std::fs::read_to_string(path)?)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Substitute every id in `listing` in a single pass.
    #[must_use]
    pub fn apply(&self, listing: &str) -> String {
        self.pattern
            .replace_all(listing, |caps: &regex::Captures<'_>| {
                self.names.get(&caps[0]).cloned().unwrap_or_default()
            })
            .into_owned()
    }
}

/// Read `listing`, substitute, write `output`. Returns the number of lines written.
pub fn symbolize_file(table: &SymbolTable, listing: &Path, output: &Path) -> Result<usize> {
    let text = std::fs::read_to_string(listing)?;
    let result = table.apply(&text);
    std::fs::write(output, &result)?;
    Ok(result.lines().count())
}
