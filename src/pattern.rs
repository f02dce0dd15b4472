//! Query compilation.
//!
//! Filename queries accept a small shorthand so that typing `invoice` finds
//! `*invoice*`, `report.pdf` finds that exact name, and `invoice/pdf` finds
//! `*invoice*.pdf`. Queries that already carry glob wildcards pass through.

use crate::error::SearchError;
use crate::request::{SearchMode, SearchRequest};

/// Prefix that switches a query into regex mode.
pub const REGEX_PREFIX: &str = "re:";

/// The tool-facing form of a [`SearchRequest`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledQuery {
    pub mode: SearchMode,
    /// Glob (filename, non-regex), regex, or literal text (content).
    pub pattern: String,
    pub use_regex: bool,
    /// Restricts which files a content search reads.
    pub file_glob: Option<String>,
}

pub(crate) fn compile(request: &SearchRequest) -> Result<CompiledQuery, SearchError> {
    let (query, use_regex) = match request.query.trim().strip_prefix(REGEX_PREFIX) {
        Some(rest) => (rest, true),
        None => (request.query.as_str(), request.use_regex),
    };
    let ext = request.extension_filter.as_deref();

    if use_regex {
        regex::Regex::new(query).map_err(|e| SearchError::InvalidPattern(e.to_string()))?;
    }

    let compiled = match request.mode {
        SearchMode::Filename => CompiledQuery {
            mode: SearchMode::Filename,
            pattern: if use_regex {
                query.trim().to_string()
            } else {
                filename_pattern(query, ext)
            },
            use_regex,
            file_glob: None,
        },
        SearchMode::Content => CompiledQuery {
            mode: SearchMode::Content,
            pattern: query.to_string(),
            use_regex,
            file_glob: ext.map(|e| format!("*.{e}")),
        },
    };
    Ok(compiled)
}

/// Expand the filename shorthand into a glob.
pub fn filename_pattern(input: &str, ext: Option<&str>) -> String {
    let s = input.trim();
    let ext = ext.map(|e| e.trim().trim_start_matches('.')).filter(|e| !e.is_empty());

    if s.is_empty() {
        return match ext {
            Some(e) => format!("*.{e}"),
            None => "*".to_string(),
        };
    }

    let has_wildcard = s.contains('*') || s.contains('?');
    if s.contains('.') && !s.contains('/') && !has_wildcard {
        return s.to_string();
    }
    if has_wildcard {
        return s.to_string();
    }
    if let Some((name, inline_ext)) = s.split_once('/') {
        let inline_ext = inline_ext.trim_start_matches('.');
        return if inline_ext.is_empty() {
            format!("*{name}*")
        } else {
            format!("*{name}*.{inline_ext}")
        };
    }
    match ext {
        Some(e) => format!("*{s}*.{e}"),
        None => format!("*{s}*"),
    }
}
