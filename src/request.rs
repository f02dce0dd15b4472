use std::fmt;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use crate::error::SearchError;
use crate::pattern::{self, CompiledQuery};

/// Which kind of tool answers the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    /// Match against file names via the filename index tool.
    Filename,
    /// Match against file contents via the content grep tool.
    Content,
}

impl fmt::Display for SearchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Filename => f.write_str("filename"),
            Self::Content => f.write_str("content"),
        }
    }
}

/// Metadata bounds applied after a tool reports a hit. All bounds are
/// inclusive; `None` means unbounded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchFilters {
    pub min_size: Option<u64>,
    pub max_size: Option<u64>,
    pub modified_after: Option<SystemTime>,
    pub modified_before: Option<SystemTime>,
    pub created_after: Option<SystemTime>,
    pub created_before: Option<SystemTime>,
}

impl SearchFilters {
    /// Whether any bound is set. When none are, hits are never stat'ed.
    pub fn is_active(&self) -> bool {
        self.min_size.is_some()
            || self.max_size.is_some()
            || self.modified_after.is_some()
            || self.modified_before.is_some()
            || self.created_after.is_some()
            || self.created_before.is_some()
    }
}

/// One search invocation. Built once and never mutated while a scan runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub mode: SearchMode,
    pub query: String,
    pub extension_filter: Option<String>,
    pub filters: SearchFilters,
    pub use_regex: bool,
}

impl SearchRequest {
    pub fn filename(query: impl Into<String>) -> Self {
        Self::new(SearchMode::Filename, query)
    }

    pub fn content(query: impl Into<String>) -> Self {
        Self::new(SearchMode::Content, query)
    }

    pub fn new(mode: SearchMode, query: impl Into<String>) -> Self {
        Self {
            mode,
            query: query.into(),
            extension_filter: None,
            filters: SearchFilters::default(),
            use_regex: false,
        }
    }

    pub fn extension(mut self, ext: impl Into<String>) -> Self {
        let ext = ext.into();
        let ext = ext.trim().trim_start_matches('.');
        self.extension_filter = if ext.is_empty() { None } else { Some(ext.to_string()) };
        self
    }

    pub fn filters(mut self, filters: SearchFilters) -> Self {
        self.filters = filters;
        self
    }

    pub fn regex(mut self, yes: bool) -> Self {
        self.use_regex = yes;
        self
    }

    /// Turn the user's query into the pattern handed to tools.
    ///
    /// # Errors
    ///
    /// Fails only when regex mode is requested and the pattern does not
    /// compile. An empty query is a wildcard, not an error.
    pub fn compile(&self) -> Result<CompiledQuery, SearchError> {
        pattern::compile(self)
    }
}
