//! Disassembly symbolizer command.

use std::path::Path;

use gasbench::symbolize::{SymbolTable, symbolize_file};
use tracing::info;

use crate::cli::EXIT_SUCCESS;
use crate::terminal;

/// Handle the `symbolize` command.
pub fn cmd_symbolize(functions: &Path, input: &Path, output: &Path) -> i32 {
    let table = match SymbolTable::from_path(functions) {
        Ok(table) => table,
        Err(e) => return super::fail(&format!("cannot read {}", functions.display()), &e),
    };
    info!(entries = table.len(), "loaded function names");

    match symbolize_file(&table, input, output) {
        Ok(lines) => {
            terminal::success(&format!("wrote {lines} lines"));
            terminal::path_output(output);
            EXIT_SUCCESS
        }
        Err(e) => super::fail(&format!("cannot symbolize {}", input.display()), &e),
    }
}
