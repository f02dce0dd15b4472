//! Post-filtering of raw tool output.
//!
//! Two predicates run in order: user exclusions, then metadata bounds. The
//! metadata check re-stats the file and is fail-open: a hit whose metadata
//! cannot be read is kept.

use std::fs;
use std::path::{Component, Path};
use std::time::SystemTime;

use globset::{GlobBuilder, GlobMatcher};
use tracing::{debug, warn};

use crate::hit::{FilteredHit, RawHit};
use crate::request::SearchFilters;

// ---------------------------------------------------------------------------
// Exclusions
// ---------------------------------------------------------------------------

struct ExcludeEntry {
    raw: String,
    glob: Option<GlobMatcher>,
    absolute: bool,
    /// Number of path segments the glob spans, matched against the tail of
    /// the candidate path.
    segments: usize,
}

/// Exclusion patterns. A path is excluded when an entry equals one of its
/// segments exactly, or when the entry matches it as a glob.
///
/// Relative globs match the trailing segments of the path (`*.tmp` against
/// the file name, `build/*.o` against the last two segments). Absolute globs
/// must match the whole path. `*` and `?` never cross a separator.
#[derive(Default)]
pub struct ExcludeMatcher {
    entries: Vec<ExcludeEntry>,
}

impl ExcludeMatcher {
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let entries = patterns
            .into_iter()
            .filter_map(|p| {
                let raw = p.as_ref().trim();
                if raw.is_empty() {
                    return None;
                }
                let normalized = raw.replace('\\', "/");
                let glob = match GlobBuilder::new(&normalized)
                    .literal_separator(true)
                    .case_insensitive(cfg!(windows))
                    .build()
                {
                    Ok(g) => Some(g.compile_matcher()),
                    Err(e) => {
                        warn!(pattern = raw, error = %e, "exclude pattern is not a valid glob; matching segments only");
                        None
                    }
                };
                Some(ExcludeEntry {
                    raw: raw.to_string(),
                    glob,
                    absolute: Path::new(raw).is_absolute() || normalized.starts_with('/'),
                    segments: normalized.split('/').filter(|s| !s.is_empty()).count(),
                })
            })
            .collect();
        Self { entries }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_excluded(&self, path: &Path) -> bool {
        if self.entries.is_empty() {
            return false;
        }
        let segments: Vec<String> = path
            .components()
            .filter_map(|c| match c {
                Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect();
        let full = path.to_string_lossy().replace('\\', "/");

        self.entries.iter().any(|entry| {
            if segments.iter().any(|s| *s == entry.raw) {
                return true;
            }
            let Some(glob) = &entry.glob else { return false };
            if entry.absolute {
                glob.is_match(&full)
            } else if entry.segments > 0 && entry.segments <= segments.len() {
                let tail = segments[segments.len() - entry.segments..].join("/");
                glob.is_match(tail)
            } else {
                false
            }
        })
    }
}

// ---------------------------------------------------------------------------
// Metadata
// ---------------------------------------------------------------------------

/// Whether `path` satisfies `filters`. Unreadable metadata keeps the hit,
/// and so does an unsupported timestamp (creation time on some filesystems).
pub fn passes_metadata(path: &Path, filters: &SearchFilters) -> bool {
    if !filters.is_active() {
        return true;
    }
    let meta = match fs::metadata(path) {
        Ok(m) => m,
        Err(e) => {
            debug!(path = %path.display(), error = %e, "cannot stat hit; keeping it");
            return true;
        }
    };

    let size = meta.len();
    if filters.min_size.is_some_and(|min| size < min) {
        return false;
    }
    if filters.max_size.is_some_and(|max| size > max) {
        return false;
    }

    if filters.modified_after.is_some() || filters.modified_before.is_some() {
        if let Ok(t) = meta.modified() {
            if !within(t, filters.modified_after, filters.modified_before) {
                return false;
            }
        }
    }
    if filters.created_after.is_some() || filters.created_before.is_some() {
        if let Ok(t) = meta.created() {
            if !within(t, filters.created_after, filters.created_before) {
                return false;
            }
        }
    }
    true
}

fn within(t: SystemTime, after: Option<SystemTime>, before: Option<SystemTime>) -> bool {
    after.is_none_or(|a| t >= a) && before.is_none_or(|b| t <= b)
}

// ---------------------------------------------------------------------------
// Chain
// ---------------------------------------------------------------------------

/// Exclusions followed by metadata bounds. Order preserved.
pub struct ResultFilterChain {
    exclude: ExcludeMatcher,
    filters: SearchFilters,
}

impl ResultFilterChain {
    pub fn new(exclude: ExcludeMatcher, filters: SearchFilters) -> Self {
        Self { exclude, filters }
    }

    pub fn accepts(&self, path: &Path) -> bool {
        !self.exclude.is_excluded(path) && passes_metadata(path, &self.filters)
    }

    /// Filter a batch, resolving canonical paths for the survivors.
    /// Returns the survivors and how many hits were dropped.
    pub fn apply(&self, raw: Vec<RawHit>) -> (Vec<FilteredHit>, usize) {
        let total = raw.len();
        let kept: Vec<FilteredHit> = raw
            .iter()
            .filter(|hit| self.accepts(hit.as_path()))
            .map(FilteredHit::resolve)
            .collect();
        let dropped = total - kept.len();
        (kept, dropped)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn segment_match_excludes_nested_dirs() {
        let ex = ExcludeMatcher::new(["node_modules"]);
        assert!(ex.is_excluded(Path::new("/home/u/project/node_modules/x.js")));
        assert!(!ex.is_excluded(Path::new("/home/u/project/node_modules_old/x.js")));
    }

    #[test]
    fn glob_matches_file_name_only_on_extension() {
        let ex = ExcludeMatcher::new(["*.tmp"]);
        assert!(ex.is_excluded(Path::new("a.tmp")));
        assert!(ex.is_excluded(Path::new("/var/data/a.tmp")));
        assert!(!ex.is_excluded(Path::new("/var/data/a.tmpx")));
    }

    #[test]
    fn multi_segment_and_absolute_globs() {
        let ex = ExcludeMatcher::new(["build/*.o", "/srv/cache/*"]);
        assert!(ex.is_excluded(Path::new("/src/app/build/main.o")));
        assert!(!ex.is_excluded(Path::new("/src/app/main.o")));
        assert!(ex.is_excluded(Path::new("/srv/cache/blob")));
        assert!(!ex.is_excluded(Path::new("/srv/cache/deep/blob")));
    }

    #[test]
    fn question_mark_matches_single_char() {
        let ex = ExcludeMatcher::new(["~$?.docx"]);
        assert!(ex.is_excluded(Path::new("/d/~$a.docx")));
        assert!(!ex.is_excluded(Path::new("/d/~$ab.docx")));
    }

    #[test]
    fn blank_patterns_are_ignored() {
        let ex = ExcludeMatcher::new(["", "   "]);
        assert!(ex.is_empty());
        assert!(!ex.is_excluded(Path::new("/anything")));
    }

    fn file_of(dir: &Path, name: &str, len: usize) -> std::path::PathBuf {
        let p = dir.join(name);
        fs::write(&p, vec![b'x'; len]).unwrap();
        p
    }

    #[test]
    fn size_bounds_are_inclusive() {
        let dir = tempfile::tempdir().unwrap();
        let filters = SearchFilters {
            min_size: Some(1000),
            max_size: Some(2000),
            ..Default::default()
        };
        assert!(passes_metadata(&file_of(dir.path(), "a", 1000), &filters));
        assert!(passes_metadata(&file_of(dir.path(), "b", 2000), &filters));
        assert!(!passes_metadata(&file_of(dir.path(), "c", 999), &filters));
        assert!(!passes_metadata(&file_of(dir.path(), "d", 2001), &filters));
    }

    #[test]
    fn missing_file_fails_open() {
        let filters = SearchFilters {
            min_size: Some(1),
            ..Default::default()
        };
        assert!(passes_metadata(Path::new("/definitely/not/here.bin"), &filters));
    }

    #[test]
    fn modified_window() {
        let dir = tempfile::tempdir().unwrap();
        let p = file_of(dir.path(), "m", 10);
        let mtime = fs::metadata(&p).unwrap().modified().unwrap();

        let exact = SearchFilters {
            modified_after: Some(mtime),
            modified_before: Some(mtime),
            ..Default::default()
        };
        assert!(passes_metadata(&p, &exact));

        let future = SearchFilters {
            modified_after: Some(mtime + Duration::from_secs(3600)),
            ..Default::default()
        };
        assert!(!passes_metadata(&p, &future));
    }

    #[test]
    fn created_window_or_fail_open() {
        let dir = tempfile::tempdir().unwrap();
        let p = file_of(dir.path(), "c", 10);
        let now = SystemTime::now();

        let future = SearchFilters {
            created_after: Some(now + Duration::from_secs(3600)),
            ..Default::default()
        };
        let past = SearchFilters {
            created_before: Some(now - Duration::from_secs(3600)),
            ..Default::default()
        };

        match fs::metadata(&p).unwrap().created() {
            Ok(ctime) => {
                let exact = SearchFilters {
                    created_after: Some(ctime),
                    created_before: Some(ctime),
                    ..Default::default()
                };
                assert!(passes_metadata(&p, &exact));
                assert!(!passes_metadata(&p, &future));
                assert!(!passes_metadata(&p, &past));
            }
            // No birth time on this filesystem: the bounds cannot be
            // evaluated, so the hit stays.
            Err(_) => {
                assert!(passes_metadata(&p, &future));
                assert!(passes_metadata(&p, &past));
            }
        }
    }

    #[test]
    fn chain_preserves_order_and_counts_drops() {
        let chain = ResultFilterChain::new(ExcludeMatcher::new(["*.tmp"]), SearchFilters::default());
        let raw = vec![
            RawHit::from("/x/b.txt"),
            RawHit::from("/x/a.tmp"),
            RawHit::from("/x/a.txt"),
        ];
        let (kept, dropped) = chain.apply(raw);
        assert_eq!(dropped, 1);
        let paths: Vec<_> = kept.iter().map(|h| h.path.to_string_lossy().into_owned()).collect();
        assert_eq!(paths, ["/x/b.txt", "/x/a.txt"]);
    }
}
