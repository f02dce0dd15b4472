use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::hit::RawHit;
use crate::traits::{SearchTool, ToolCall};

/// The outcome of one call against one root.
#[derive(Debug, Default)]
pub struct Invocation {
    pub hits: Vec<RawHit>,
    /// The call failed and its hits were replaced by an empty list.
    pub failed: bool,
}

/// Runs a tool against a single root and never lets a failure escape.
///
/// Errors, timeouts and even a panicking backend all become an empty hit
/// list, so one bad root cannot affect the others.
#[derive(Clone)]
pub struct ExternalSearchInvoker {
    tool: Arc<dyn SearchTool>,
}

impl ExternalSearchInvoker {
    pub fn new(tool: Arc<dyn SearchTool>) -> Self {
        Self { tool }
    }

    pub fn tool_name(&self) -> &str {
        self.tool.name()
    }

    pub fn invoke(&self, call: &ToolCall<'_>) -> Invocation {
        let tool = &self.tool;
        match panic::catch_unwind(AssertUnwindSafe(|| tool.search(call))) {
            Ok(Ok(hits)) => {
                debug!(tool = tool.name(), root = %call.root.display(), hits = hits.len(), "root done");
                Invocation { hits, failed: false }
            }
            Ok(Err(err)) => {
                warn!(tool = tool.name(), root = %call.root.display(), error = %err, "tool failed; root contributes no hits");
                Invocation { hits: Vec::new(), failed: true }
            }
            Err(_) => {
                warn!(tool = tool.name(), root = %call.root.display(), "tool panicked; root contributes no hits");
                Invocation { hits: Vec::new(), failed: true }
            }
        }
    }
}
