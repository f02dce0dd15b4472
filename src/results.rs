use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::hit::FilteredHit;
use crate::selection;

/// The final answer to one request.
///
/// Entries are unique by canonical path, at most the effective
/// `max_results`, and ordered by first discovery across the root list.
#[derive(Debug, Clone, Default)]
pub struct ResultSet {
    pub hits: Vec<FilteredHit>,

    /// Scan statistics across both passes.
    pub stats: ScanStats,
}

impl ResultSet {
    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.hits.iter().map(|h| h.path.as_path())
    }

    /// 1-based lookup, matching the numbering shown to users.
    pub fn get(&self, index: usize) -> Option<&FilteredHit> {
        index.checked_sub(1).and_then(|i| self.hits.get(i))
    }

    /// Paths picked by a selection string such as `1,3-5,7`.
    pub fn select(&self, raw: &str) -> Vec<PathBuf> {
        selection::select(self, raw)
    }
}

/// Statistics for a completed request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanStats {
    /// Roots whose tool call was dispatched.
    pub roots_scanned: usize,

    /// Dispatched roots whose call failed or timed out.
    pub roots_failed: usize,

    /// Lines reported by tools before filtering.
    pub raw_hits: usize,

    /// Hits removed by exclusions or metadata bounds.
    pub filtered_out: usize,

    /// Wall-clock time across both passes.
    pub duration: Duration,

    /// Whether a full-volume pass ran.
    pub escalated: bool,
}

impl ScanStats {
    /// Fold one pass into the running totals.
    pub(crate) fn absorb(&mut self, pass: &ScanStats) {
        self.roots_scanned += pass.roots_scanned;
        self.roots_failed += pass.roots_failed;
        self.raw_hits += pass.raw_hits;
        self.filtered_out += pass.filtered_out;
        self.duration += pass.duration;
    }
}
