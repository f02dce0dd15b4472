//! Compact numeric selection: `1,3-5,7`.
//!
//! Each comma-separated token is a 1-based index or an inclusive
//! `start-end` range. A range running past `n` is clipped to `n`. A token
//! that does not parse, starts outside `[1, n]`, or runs backwards is
//! skipped on its own; the rest still count.

use std::collections::BTreeSet;
use std::path::PathBuf;

use tracing::debug;

use crate::results::ResultSet;

/// Parse `raw` against `n` results. Returns strictly ascending, unique
/// indices in `[1, n]`; empty means "no selection".
pub fn parse_selection(raw: &str, n: usize) -> Vec<usize> {
    let mut picked = BTreeSet::new();

    for token in raw.split(',') {
        let token: String = token.chars().filter(|c| !c.is_whitespace()).collect();
        if token.is_empty() {
            continue;
        }
        match parse_token(&token, n) {
            Some((start, end)) => picked.extend(start..=end),
            None => debug!(token = %token, "skipping selection token"),
        }
    }

    picked.into_iter().collect()
}

fn parse_token(token: &str, n: usize) -> Option<(usize, usize)> {
    let (start, end) = match token.split_once('-') {
        Some((s, e)) => (s.parse::<usize>().ok()?, e.parse::<usize>().ok()?),
        None => {
            let i = token.parse::<usize>().ok()?;
            (i, i)
        }
    };
    (1 <= start && start <= end && start <= n).then_some((start, end.min(n)))
}

/// Resolve a selection string to paths, in result order.
pub fn select(results: &ResultSet, raw: &str) -> Vec<PathBuf> {
    parse_selection(raw, results.len())
        .into_iter()
        .filter_map(|i| results.get(i).map(|h| h.path.clone()))
        .collect()
}
