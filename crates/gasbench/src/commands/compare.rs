//! Baseline comparison and history over the result store.

use std::path::Path;

use gasbench::compare::compare;
use gasbench::{ResultStore, RevisionId, revision};

use crate::cli::{EXIT_FAILURE, EXIT_SUCCESS};
use crate::terminal::{self, Table};

/// Handle the `compare` command.
pub fn cmd_compare(
    config_path: Option<&Path>,
    base: &str,
    head: Option<&str>,
    tolerance: f64,
) -> i32 {
    let Some(config) = super::load_config(config_path) else {
        return EXIT_FAILURE;
    };
    let store = ResultStore::new(config.store_dir());

    let (base, head) = match (
        RevisionId::parse(base),
        revision::resolve(head, &config.project_root),
    ) {
        (Ok(base), Ok(head)) => (base, head),
        (Err(e), _) | (_, Err(e)) => return super::fail("invalid revision", &e),
    };

    let loaded = store
        .load(&base, &config.metric_column)
        .and_then(|b| Ok((b, store.load(&head, &config.metric_column)?)));
    let (base_summary, head_summary) = match loaded {
        Ok(pair) => pair,
        Err(e) => return super::fail("cannot load stored summary", &e),
    };

    let comparison = match compare(&base_summary, &head_summary, &config.key_columns) {
        Ok(c) => c,
        Err(e) => return super::fail("comparison failed", &e),
    };

    let mut table = Table::new(["Row", base.as_str(), head.as_str(), "Change"])
        .right(1)
        .right(2)
        .right(3);
    for delta in &comparison.deltas {
        table.add_row(vec![
            delta.row.clone(),
            delta.base.map_or_else(|| "-".to_string(), gasbench::format_value),
            gasbench::format_value(delta.head),
            delta
                .change_pct()
                .map_or_else(|| "new".to_string(), |pct| format!("{pct:+.2}%")),
        ]);
    }
    table.print();
    for row in &comparison.removed {
        terminal::warning(&format!("{row} missing from {head}"));
    }

    let regressions: Vec<_> = comparison.regressions(tolerance).collect();
    if regressions.is_empty() {
        terminal::success(&format!(
            "no row of {head} grew more than {tolerance}% over {base}"
        ));
        EXIT_SUCCESS
    } else {
        for delta in &regressions {
            terminal::error(&delta.to_string());
        }
        terminal::error(&format!(
            "{} row(s) grew more than {tolerance}% over {base}",
            regressions.len()
        ));
        EXIT_FAILURE
    }
}

/// Handle the `history` command.
pub fn cmd_history(config_path: Option<&Path>) -> i32 {
    let Some(config) = super::load_config(config_path) else {
        return EXIT_FAILURE;
    };
    let store = ResultStore::new(config.store_dir());
    match store.revisions() {
        Ok(revisions) if revisions.is_empty() => {
            terminal::info(&format!("no summaries in {}", store.dir().display()));
            EXIT_SUCCESS
        }
        Ok(revisions) => {
            for revision in revisions {
                println!("{revision}");
            }
            EXIT_SUCCESS
        }
        Err(e) => super::fail("cannot list stored summaries", &e),
    }
}
