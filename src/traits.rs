use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::SearchError;
use crate::escalation::{EscalationDecision, EscalationOffer};
use crate::history::HistoryRecord;
use crate::hit::RawHit;

/// Everything a tool needs for one call against one root.
#[derive(Debug, Clone)]
pub struct ToolCall<'a> {
    pub pattern: &'a str,
    pub root: &'a Path,
    pub max_results: usize,
    pub use_regex: bool,
    /// Content search only: restrict which files are read.
    pub file_glob: Option<&'a str>,
    /// Content search only: globs the tool should skip itself.
    pub exclude_globs: &'a [String],
    pub case_insensitive: bool,
    pub follow_symlinks: bool,
    pub timeout: Duration,
}

/// A single-purpose search tool: a filename index, a content grep, or
/// anything else that maps `(pattern, root)` to a list of paths.
///
/// Implementations report failure through `Err`. They never need to recover
/// on their own: the invoker turns every error into zero hits for that root.
///
/// # Thread Safety
///
/// `Send + Sync` are required: one tool instance serves every worker.
///
/// # Example
///
/// ```rust
/// use parscan::{RawHit, SearchError, SearchTool, ToolCall};
///
/// struct Fixed(Vec<&'static str>);
///
/// impl SearchTool for Fixed {
///     fn name(&self) -> &str { "fixed" }
///     fn search(&self, call: &ToolCall<'_>) -> Result<Vec<RawHit>, SearchError> {
///         Ok(self.0.iter().take(call.max_results).map(|s| RawHit::from(*s)).collect())
///     }
/// }
/// ```
pub trait SearchTool: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Run one call. Output order is preserved by the engine.
    fn search(&self, call: &ToolCall<'_>) -> Result<Vec<RawHit>, SearchError>;
}

/// Lists the top-level volumes available right now, in a stable order.
pub trait VolumeEnumerator: Send + Sync {
    fn volumes(&self) -> Vec<PathBuf>;
}

/// Read-only view of the effective configuration.
pub trait ConfigStore: Send + Sync {
    fn effective_max_results(&self) -> usize;
    fn effective_exclude_patterns(&self) -> Vec<String>;
    fn effective_extra_folders(&self) -> Vec<PathBuf>;

    /// Worker count, when the configuration pins one.
    fn effective_threads(&self) -> Option<usize> {
        None
    }
}

/// Write-only sink for per-request summaries.
///
/// Recording is best effort: implementations log their own failures.
pub trait HistoryLog: Send + Sync {
    fn record(&self, record: &HistoryRecord);
}

/// Answers the full-volume escalation question on behalf of the caller.
pub trait EscalationPolicy {
    fn decide(&self, offer: &EscalationOffer) -> EscalationDecision;
}

impl<F> EscalationPolicy for F
where
    F: Fn(&EscalationOffer) -> EscalationDecision,
{
    fn decide(&self, offer: &EscalationOffer) -> EscalationDecision {
        self(offer)
    }
}
