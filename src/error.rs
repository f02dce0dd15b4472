use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SearchError {
    // Request
    #[error("invalid pattern: {0}")]
    InvalidPattern(String),

    #[error("invalid thread count")]
    InvalidThreadCount(usize),

    // Runtime
    #[error("thread pool failure")]
    ThreadPool(String),

    // Tool invocation
    #[error("no {0} tool available")]
    MissingTool(&'static str),

    #[error("failed to spawn {program}")]
    ToolSpawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} timed out after {timeout:?}")]
    ToolTimeout { program: String, timeout: Duration },

    #[error("{program} exited with status {code:?}")]
    ToolExit { program: String, code: Option<i32> },

    #[error("IO error")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed config")]
    Config {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    // Third-party extensibility
    #[error("tool error: {0}")]
    Tool(String),
}

impl SearchError {
    /// The path this error occurred at, if applicable.
    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            Self::Io { path, .. } | Self::Config { path, .. } => Some(path),
            _ => None,
        }
    }

    /// Whether the request can continue after this error.
    ///
    /// Tool failures are recovered per root as zero hits. Everything else
    /// describes a request or setup that cannot run.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::MissingTool(_)
                | Self::ToolSpawn { .. }
                | Self::ToolTimeout { .. }
                | Self::ToolExit { .. }
                | Self::Tool(_)
                | Self::Io { .. }
        )
    }
}
