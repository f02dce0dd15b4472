use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use crate::config::DEFAULT_MAX_RESULTS;
use crate::error::SearchError;
use crate::invoker::ExternalSearchInvoker;
use crate::roots::{RootSetBuilder, SystemVolumes};
use crate::searcher::Searcher;
use crate::tools::{self, UnavailableTool};
use crate::traits::{ConfigStore, HistoryLog, SearchTool, VolumeEnumerator};

// ---------------------------------------------------------------------------
// Timeouts
// ---------------------------------------------------------------------------

/// Per-call timeouts for one search mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassTimeouts {
    /// Each call of the common-folder pass.
    pub common: Duration,
    /// Each call of the full-volume pass.
    pub full_volume: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub filename: PassTimeouts,
    pub content: PassTimeouts,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            filename: PassTimeouts {
                common: Duration::from_secs(30),
                full_volume: Duration::from_secs(90),
            },
            content: PassTimeouts {
                common: Duration::from_secs(180),
                full_volume: Duration::from_secs(600),
            },
        }
    }
}

// ---------------------------------------------------------------------------
// SearchBuilder
// ---------------------------------------------------------------------------

/// Entry point for configuring a [`Searcher`].
///
/// Created via [`parscan::searcher()`](crate::searcher). Anything left unset
/// is detected from the host: tools on `PATH`, the home directory, the
/// mounted volumes.
///
/// # Example
///
/// ```rust,ignore
/// let config = Config::load_or_default(&path);
/// let searcher = parscan::searcher()
///     .config(&config)
///     .filename_tool(FdTool::new("fd"))
///     .threads(8)
///     .build()?;
/// ```
pub struct SearchBuilder {
    filename_tool:  Option<Arc<dyn SearchTool>>,
    content_tool:   Option<Arc<dyn SearchTool>>,
    volumes:        Box<dyn VolumeEnumerator>,
    roots:          RootSetBuilder,
    max_results:    usize,
    exclude:        Vec<String>,
    extra_folders:  Vec<PathBuf>,
    threads:        Option<usize>,
    config_threads: Option<usize>,
    timeouts:       Timeouts,
    history:        Option<Box<dyn HistoryLog>>,
}

impl Default for SearchBuilder {
    fn default() -> Self {
        Self {
            filename_tool:  None,
            content_tool:   None,
            volumes:        Box::new(SystemVolumes),
            roots:          RootSetBuilder::default(),
            max_results:    DEFAULT_MAX_RESULTS,
            exclude:        Vec::new(),
            extra_folders:  Vec::new(),
            threads:        None,
            config_threads: None,
            timeouts:       Timeouts::default(),
            history:        None,
        }
    }
}

impl SearchBuilder {
    // ── Tools ─────────────────────────────────────────────────────────────

    /// Backend for [`SearchMode::Filename`](crate::SearchMode::Filename).
    ///
    /// An index tool ([`FdTool`](crate::FdTool),
    /// [`EverythingTool`](crate::EverythingTool)) or a shim with the same
    /// contract ([`WalkTool`](crate::WalkTool),
    /// [`RipgrepFilesTool`](crate::RipgrepFilesTool)).
    pub fn filename_tool(mut self, tool: impl SearchTool + 'static) -> Self {
        self.filename_tool = Some(Arc::new(tool));
        self
    }

    /// Backend for [`SearchMode::Content`](crate::SearchMode::Content).
    pub fn content_tool(mut self, tool: impl SearchTool + 'static) -> Self {
        self.content_tool = Some(Arc::new(tool));
        self
    }

    // ── Roots ─────────────────────────────────────────────────────────────

    pub fn volumes(mut self, volumes: impl VolumeEnumerator + 'static) -> Self {
        self.volumes = Box::new(volumes);
        self
    }

    /// Replace the root-set policy (catalog, home, user, public folder).
    /// Extra folders from [`config`](Self::config) or
    /// [`extra_folders`](Self::extra_folders) are appended to any the
    /// policy already carries.
    pub fn roots(mut self, roots: RootSetBuilder) -> Self {
        self.roots = roots;
        self
    }

    // ── Configuration ─────────────────────────────────────────────────────

    /// Read the effective settings once. Later calls to the individual
    /// setters override them.
    pub fn config<C: ConfigStore + ?Sized>(mut self, config: &C) -> Self {
        self.max_results = config.effective_max_results();
        self.exclude = config.effective_exclude_patterns();
        self.extra_folders = config.effective_extra_folders();
        self.config_threads = config.effective_threads();
        self
    }

    /// Upper bound on unique results per request.
    pub fn max_results(mut self, n: usize) -> Self {
        self.max_results = n;
        self
    }

    pub fn exclude<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude = patterns.into_iter().map(Into::into).collect();
        self
    }

    pub fn extra_folders(mut self, folders: Vec<PathBuf>) -> Self {
        self.extra_folders = folders;
        self
    }

    /// Worker count for each pass. Defaults to the number of logical cores.
    pub fn threads(mut self, n: usize) -> Self {
        self.threads = Some(n);
        self
    }

    pub fn timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Where to record a summary of each completed request.
    pub fn history(mut self, log: impl HistoryLog + 'static) -> Self {
        self.history = Some(Box::new(log));
        self
    }

    // ── Build ─────────────────────────────────────────────────────────────

    /// # Errors
    ///
    /// Returns `InvalidThreadCount` for a worker count of zero.
    pub fn build(self) -> Result<Searcher, SearchError> {
        let threads = self.threads.or(self.config_threads).unwrap_or_else(num_cpus);
        if threads == 0 {
            return Err(SearchError::InvalidThreadCount(threads));
        }

        let filename = self
            .filename_tool
            .unwrap_or_else(|| Arc::from(tools::detect_filename_tool()));
        let content = content_or_unavailable(self.content_tool, tools::detect_content_tool);

        Ok(Searcher {
            filename:    ExternalSearchInvoker::new(filename),
            content:     ExternalSearchInvoker::new(content),
            volumes:     self.volumes,
            roots:       self.roots.append_extra_folders(self.extra_folders),
            max_results: self.max_results,
            exclude:     self.exclude,
            threads,
            timeouts:    self.timeouts,
            history:     self.history,
        })
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// The content backend: explicit, else detected, else one that fails every
/// call so content requests degrade to zero hits.
fn content_or_unavailable<D, T>(explicit: Option<Arc<dyn SearchTool>>, detect: D) -> Arc<dyn SearchTool>
where
    D: FnOnce() -> Option<T>,
    T: SearchTool + 'static,
{
    match explicit {
        Some(tool) => tool,
        None => match detect() {
            Some(tool) => Arc::new(tool),
            None => {
                warn!("no content search tool found; content searches will return nothing");
                Arc::new(UnavailableTool::new("content"))
            }
        },
    }
}

/// Get the logical CPU count, with a safe fallback.
fn num_cpus() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}
