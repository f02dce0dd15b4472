use std::path::{Path, PathBuf};

/// One line of output from an external tool, trimmed and non-empty.
///
/// Nothing about it is validated: the path may not exist, may be relative,
/// or may have vanished by the time it is filtered.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RawHit(pub String);

impl RawHit {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_path(&self) -> &Path {
        Path::new(&self.0)
    }
}

impl From<&str> for RawHit {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for RawHit {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// A hit that survived the filter chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilteredHit {
    /// The path as the tool reported it.
    pub path: PathBuf,

    /// The alias-resolved form used for equality. Falls back to `path` when
    /// the file cannot be resolved (vanished, permission denied).
    pub canonical: PathBuf,
}

impl FilteredHit {
    /// Build a hit, resolving its canonical form against the filesystem.
    pub fn resolve(raw: &RawHit) -> Self {
        let path = PathBuf::from(raw.as_str());
        let canonical = dunce::canonicalize(&path).unwrap_or_else(|_| path.clone());
        Self { path, canonical }
    }

    /// Build a hit whose canonical form is already known.
    pub fn with_canonical(path: impl Into<PathBuf>, canonical: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            canonical: canonical.into(),
        }
    }
}
