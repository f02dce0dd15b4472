//! # parscan
//!
//! Federated file search across external single-purpose tools.
//!
//! parscan does not index or grep anything itself. It decides *where* to
//! look (the user's common folders first, then optionally whole volumes),
//! fans one tool call per directory out over a fixed worker pool, filters
//! and deduplicates what comes back, and hands the caller a capped,
//! deterministically ordered [`ResultSet`]. A root whose tool fails or times
//! out simply contributes nothing.
//!
//! # Quick Start
//!
//! ```rust
//! use parscan::{
//!     DeclineEscalation, RawHit, RootSetBuilder, SearchError, SearchRequest,
//!     SearchTool, StaticVolumes, ToolCall,
//! };
//!
//! // A stand-in for fd / Everything that always reports the same files.
//! struct Listing(Vec<&'static str>);
//!
//! impl SearchTool for Listing {
//!     fn name(&self) -> &str { "listing" }
//!     fn search(&self, call: &ToolCall<'_>) -> Result<Vec<RawHit>, SearchError> {
//!         Ok(self.0.iter().take(call.max_results).map(|p| RawHit::from(*p)).collect())
//!     }
//! }
//!
//! let searcher = parscan::searcher()
//!     .filename_tool(Listing(vec!["/data/invoice_jan.txt", "/data/invoice_feb.txt"]))
//!     .content_tool(Listing(vec![]))
//!     .volumes(StaticVolumes(vec![]))
//!     .roots(RootSetBuilder::empty())
//!     .extra_folders(vec![std::env::temp_dir()])
//!     .build()
//!     .unwrap();
//!
//! let results = searcher
//!     .search(&SearchRequest::filename("invoice"), &DeclineEscalation)
//!     .unwrap();
//!
//! assert_eq!(results.len(), 2);
//! assert_eq!(results.select("2").len(), 1);
//! ```
//!
//! # Escalation
//!
//! When the common-folder pass finds fewer hits than the budget, the engine
//! can offer a full-volume pass. It never takes that step on its own: either
//! pass an [`EscalationPolicy`] to [`Searcher::search`], or drive the two
//! halves yourself:
//!
//! ```rust,ignore
//! let first = searcher.first_pass(&request)?;
//! let decision = match first.offer() {
//!     Some(offer) => ask_the_user(offer),
//!     None => EscalationDecision::Decline,
//! };
//! let results = first.resolve(decision);
//! ```

#![forbid(unsafe_code)]

pub mod engine;

mod builder;
mod config;
mod dedup;
mod error;
mod escalation;
mod filter;
mod history;
mod hit;
mod invoker;
mod pattern;
mod process;
mod request;
mod results;
mod roots;
mod searcher;
mod selection;
mod tools;
mod traits;

// ── Public re-exports ─────────────────────────────────────────────────────────

pub use builder::{PassTimeouts, SearchBuilder, Timeouts};
pub use config::{Config, CONFIG_FILE_NAME, DEFAULT_MAX_RESULTS};
pub use dedup::{dedup_capped, Deduplicator};
pub use error::SearchError;
pub use escalation::{
    DeclineEscalation, EscalateAll, EscalationDecision, EscalationGate, EscalationOffer,
};
pub use filter::{passes_metadata, ExcludeMatcher, ResultFilterChain};
pub use history::{HistoryRecord, JsonLinesHistory, MemoryHistory};
pub use hit::{FilteredHit, RawHit};
pub use invoker::{ExternalSearchInvoker, Invocation};
pub use pattern::{filename_pattern, CompiledQuery, REGEX_PREFIX};
pub use request::{SearchFilters, SearchMode, SearchRequest};
pub use results::{ResultSet, ScanStats};
pub use roots::{Provenance, Root, RootSetBuilder, StaticVolumes, SystemVolumes, COMMON_FOLDERS};
pub use searcher::{FirstPass, Searcher};
pub use selection::{parse_selection, select};
pub use tools::{
    detect_content_tool, detect_filename_tool, EverythingTool, FdTool, RipgrepFilesTool,
    RipgrepTool, UnavailableTool, WalkTool,
};
pub use traits::{
    ConfigStore, EscalationPolicy, HistoryLog, SearchTool, ToolCall, VolumeEnumerator,
};

// ── Entry point ───────────────────────────────────────────────────────────────

/// Create a new [`SearchBuilder`] to configure a [`Searcher`].
pub fn searcher() -> SearchBuilder {
    SearchBuilder::default()
}
