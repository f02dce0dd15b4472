use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::warn;

use crate::error::SearchError;
use crate::traits::ConfigStore;

pub const DEFAULT_MAX_RESULTS: usize = 500;

/// File name of the per-user config in the home directory.
pub const CONFIG_FILE_NAME: &str = ".parscan.json";

/// User configuration, loaded once per process and then read-only.
///
/// ```json
/// {
///   "max_results": 1000,
///   "exclude": ["node_modules", "*.tmp"],
///   "extra_folders": ["D:\\Projects"],
///   "threads": 8
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub max_results: usize,
    pub exclude: Vec<String>,
    pub extra_folders: Vec<PathBuf>,
    pub threads: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_results: DEFAULT_MAX_RESULTS,
            exclude: Vec::new(),
            extra_folders: Vec::new(),
            threads: None,
        }
    }
}

impl Config {
    /// `~/.parscan.json`, if a home directory is known.
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(CONFIG_FILE_NAME))
    }

    /// # Errors
    ///
    /// Returns `Io` when the file cannot be read and `Config` when it is not
    /// valid JSON for this shape.
    pub fn load(path: &Path) -> Result<Self, SearchError> {
        let text = fs::read_to_string(path).map_err(|source| SearchError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| SearchError::Config {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load `path`, falling back to defaults when it is missing or broken.
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }
        Self::load(path).unwrap_or_else(|e| {
            warn!(path = %path.display(), error = %e, "config unreadable; using defaults");
            Self::default()
        })
    }
}

impl ConfigStore for Config {
    fn effective_max_results(&self) -> usize {
        self.max_results
    }

    fn effective_exclude_patterns(&self) -> Vec<String> {
        self.exclude.clone()
    }

    fn effective_extra_folders(&self) -> Vec<PathBuf> {
        self.extra_folders.clone()
    }

    fn effective_threads(&self) -> Option<usize> {
        self.threads
    }
}
