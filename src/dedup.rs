use std::collections::HashSet;
use std::path::PathBuf;

use crate::hit::FilteredHit;

/// Order-preserving, budget-capped merge of filtered hits.
///
/// State lives for the whole request, so hits from the full-volume pass are
/// deduplicated against the common-folder pass. The first occurrence of a
/// canonical path wins; nothing is appended once `cap` hits are held.
#[derive(Debug, Clone)]
pub struct Deduplicator {
    seen: HashSet<PathBuf>,
    hits: Vec<FilteredHit>,
    cap: usize,
}

impl Deduplicator {
    pub fn new(cap: usize) -> Self {
        Self {
            seen: HashSet::new(),
            hits: Vec::new(),
            cap,
        }
    }

    /// Append `hit` if it is new and there is room. Returns whether it was
    /// appended.
    pub fn push(&mut self, hit: FilteredHit) -> bool {
        if self.is_full() || self.seen.contains(&hit.canonical) {
            return false;
        }
        self.seen.insert(hit.canonical.clone());
        self.hits.push(hit);
        true
    }

    /// Append a batch in order. Returns how many hits were appended.
    pub fn extend<I>(&mut self, hits: I) -> usize
    where
        I: IntoIterator<Item = FilteredHit>,
    {
        let mut added = 0;
        for hit in hits {
            if self.is_full() {
                break;
            }
            if self.push(hit) {
                added += 1;
            }
        }
        added
    }

    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    pub fn cap(&self) -> usize {
        self.cap
    }

    pub fn is_full(&self) -> bool {
        self.hits.len() >= self.cap
    }

    pub fn remaining(&self) -> usize {
        self.cap.saturating_sub(self.hits.len())
    }

    pub fn hits(&self) -> &[FilteredHit] {
        &self.hits
    }

    pub fn into_hits(self) -> Vec<FilteredHit> {
        self.hits
    }
}

/// First `cap` unique hits of `hits`, in order.
pub fn dedup_capped(hits: impl IntoIterator<Item = FilteredHit>, cap: usize) -> Vec<FilteredHit> {
    let mut d = Deduplicator::new(cap);
    d.extend(hits);
    d.into_hits()
}
