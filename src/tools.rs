//! Concrete [`SearchTool`] backends.
//!
//! The engine only knows the [`SearchTool`] contract; these are the backends
//! a host usually wires in. Filename search prefers a real index (`fd`,
//! Everything's `es.exe`) and can fall back to `rg --files` or an in-process
//! walk with the same contract.

use std::path::PathBuf;
use std::process::Command;
use std::time::Instant;

use globset::{GlobBuilder, GlobMatcher};
use ignore::WalkBuilder;
use regex::{Regex, RegexBuilder};
use tracing::debug;

use crate::error::SearchError;
use crate::hit::RawHit;
use crate::process;
use crate::traits::{SearchTool, ToolCall};

// ---------------------------------------------------------------------------
// fd
// ---------------------------------------------------------------------------

/// Filename search through [`fd`](https://github.com/sharkdp/fd).
pub struct FdTool {
    program: PathBuf,
}

impl FdTool {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self { program: program.into() }
    }

    fn command(&self, call: &ToolCall<'_>) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.arg("--absolute-path")
            .arg("--max-results")
            .arg(call.max_results.to_string());
        if !call.use_regex {
            cmd.arg("--glob");
        }
        if call.case_insensitive {
            cmd.arg("--ignore-case");
        }
        if call.follow_symlinks {
            cmd.arg("--follow");
        }
        cmd.arg("--").arg(call.pattern).arg(call.root);
        cmd
    }
}

impl SearchTool for FdTool {
    fn name(&self) -> &str {
        "fd"
    }

    fn search(&self, call: &ToolCall<'_>) -> Result<Vec<RawHit>, SearchError> {
        process::run(self.command(call), call.timeout, &[0])
    }
}

// ---------------------------------------------------------------------------
// Everything (es.exe)
// ---------------------------------------------------------------------------

/// Filename search through voidtools Everything's command-line client.
pub struct EverythingTool {
    program: PathBuf,
}

impl EverythingTool {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self { program: program.into() }
    }

    fn command(&self, call: &ToolCall<'_>) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.arg("-path")
            .arg(call.root)
            .arg("-n")
            .arg(call.max_results.to_string());
        if call.use_regex {
            cmd.arg("-regex");
        }
        cmd.arg(call.pattern);
        cmd
    }
}

impl SearchTool for EverythingTool {
    fn name(&self) -> &str {
        "everything"
    }

    fn search(&self, call: &ToolCall<'_>) -> Result<Vec<RawHit>, SearchError> {
        process::run(self.command(call), call.timeout, &[0])
    }
}

// ---------------------------------------------------------------------------
// ripgrep
// ---------------------------------------------------------------------------

/// Content search through ripgrep, listing files with at least one match.
pub struct RipgrepTool {
    program: PathBuf,
}

/// rg exits 1 for "no match" and 2 when some files could not be read; the
/// listed files are still valid in both cases.
const RG_ACCEPTED: &[i32] = &[0, 1, 2];

impl RipgrepTool {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self { program: program.into() }
    }

    fn command(&self, call: &ToolCall<'_>) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(["--files-with-matches", "--no-messages", "--max-columns", "200"]);
        if call.case_insensitive {
            cmd.arg("--ignore-case");
        }
        if call.follow_symlinks {
            cmd.arg("--follow");
        }
        if !call.use_regex {
            cmd.arg("--fixed-strings");
        }
        if let Some(glob) = call.file_glob {
            cmd.arg("--glob").arg(glob);
        }
        for ex in call.exclude_globs {
            cmd.arg("--glob").arg(format!("!{ex}"));
        }
        cmd.arg("--regexp").arg(call.pattern).arg(call.root);
        cmd
    }
}

impl SearchTool for RipgrepTool {
    fn name(&self) -> &str {
        "rg"
    }

    fn search(&self, call: &ToolCall<'_>) -> Result<Vec<RawHit>, SearchError> {
        let mut hits = process::run(self.command(call), call.timeout, RG_ACCEPTED)?;
        hits.truncate(call.max_results);
        Ok(hits)
    }
}

/// Filename search through `rg --files`, for hosts without a filename index.
///
/// Lists every file under the root and lets ripgrep's glob filter the names.
/// Regex patterns are not supported by `--iglob` and are passed through as
/// globs.
pub struct RipgrepFilesTool {
    program: PathBuf,
}

impl RipgrepFilesTool {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self { program: program.into() }
    }

    fn command(&self, call: &ToolCall<'_>) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(["--files", "--no-messages"]);
        if call.follow_symlinks {
            cmd.arg("--follow");
        }
        let glob_flag = if call.case_insensitive { "--iglob" } else { "--glob" };
        if call.pattern != "*" {
            cmd.arg(glob_flag).arg(call.pattern);
        }
        cmd.arg(call.root);
        cmd
    }
}

impl SearchTool for RipgrepFilesTool {
    fn name(&self) -> &str {
        "rg-files"
    }

    fn search(&self, call: &ToolCall<'_>) -> Result<Vec<RawHit>, SearchError> {
        if call.use_regex {
            debug!(pattern = call.pattern, "rg --files cannot match regex; using it as a glob");
        }
        let mut hits = process::run(self.command(call), call.timeout, RG_ACCEPTED)?;
        hits.truncate(call.max_results);
        Ok(hits)
    }
}

// ---------------------------------------------------------------------------
// In-process walk
// ---------------------------------------------------------------------------

/// Filename search by walking the root sequentially in-process.
///
/// Same contract as the index tools: absolute paths, at most `max_results`,
/// and a timeout reported as an error so the root yields zero hits.
#[derive(Debug, Default)]
pub struct WalkTool;

enum NameMatcher {
    Glob(GlobMatcher),
    Regex(Regex),
}

impl NameMatcher {
    fn new(call: &ToolCall<'_>) -> Result<Self, SearchError> {
        if call.use_regex {
            RegexBuilder::new(call.pattern)
                .case_insensitive(call.case_insensitive)
                .build()
                .map(Self::Regex)
                .map_err(|e| SearchError::InvalidPattern(e.to_string()))
        } else {
            GlobBuilder::new(call.pattern)
                .case_insensitive(call.case_insensitive)
                .build()
                .map(|g| Self::Glob(g.compile_matcher()))
                .map_err(|e| SearchError::InvalidPattern(e.to_string()))
        }
    }

    fn is_match(&self, name: &str) -> bool {
        match self {
            Self::Glob(g) => g.is_match(name),
            Self::Regex(r) => r.is_match(name),
        }
    }
}

impl SearchTool for WalkTool {
    fn name(&self) -> &str {
        "walk"
    }

    fn search(&self, call: &ToolCall<'_>) -> Result<Vec<RawHit>, SearchError> {
        let matcher = NameMatcher::new(call)?;
        let deadline = Instant::now() + call.timeout;

        let walker = WalkBuilder::new(call.root)
            .standard_filters(false)
            .ignore(false)
            .parents(false)
            .hidden(false)
            .follow_links(call.follow_symlinks)
            .same_file_system(false)
            .threads(1)
            .build();

        let mut hits = Vec::new();
        for entry in walker {
            if Instant::now() >= deadline {
                return Err(SearchError::ToolTimeout {
                    program: "walk".into(),
                    timeout: call.timeout,
                });
            }
            // Unreadable entries are skipped, same as an index would.
            let Ok(entry) = entry else { continue };
            if entry.depth() == 0 {
                continue;
            }
            let name = entry.file_name().to_string_lossy();
            if matcher.is_match(&name) {
                hits.push(RawHit(entry.path().to_string_lossy().into_owned()));
                if hits.len() >= call.max_results {
                    break;
                }
            }
        }
        Ok(hits)
    }
}

// ---------------------------------------------------------------------------
// Unavailable backend
// ---------------------------------------------------------------------------

/// Stands in for a backend that is not installed. Every call fails with
/// [`SearchError::MissingTool`], so each root is logged and contributes zero
/// hits while the request itself still completes.
#[derive(Debug, Clone, Copy)]
pub struct UnavailableTool {
    kind: &'static str,
}

impl UnavailableTool {
    pub fn new(kind: &'static str) -> Self {
        Self { kind }
    }
}

impl SearchTool for UnavailableTool {
    fn name(&self) -> &str {
        "unavailable"
    }

    fn search(&self, _call: &ToolCall<'_>) -> Result<Vec<RawHit>, SearchError> {
        Err(SearchError::MissingTool(self.kind))
    }
}

// ---------------------------------------------------------------------------
// Detection
// ---------------------------------------------------------------------------

/// Pick the best filename backend available on `PATH`.
///
/// Order: Everything (Windows), `fd`/`fdfind`, `rg --files`, then the
/// in-process walk, which always works.
pub fn detect_filename_tool() -> Box<dyn SearchTool> {
    if cfg!(windows) {
        if let Ok(es) = which::which("es") {
            debug!(path = %es.display(), "using Everything for filename search");
            return Box::new(EverythingTool::new(es));
        }
    }
    for name in ["fd", "fdfind"] {
        if let Ok(fd) = which::which(name) {
            debug!(path = %fd.display(), "using fd for filename search");
            return Box::new(FdTool::new(fd));
        }
    }
    if let Ok(rg) = which::which("rg") {
        debug!(path = %rg.display(), "no filename index; using rg --files");
        return Box::new(RipgrepFilesTool::new(rg));
    }
    debug!("no filename index or rg; walking directories in-process");
    Box::new(WalkTool)
}

/// Locate ripgrep for content search.
pub fn detect_content_tool() -> Option<RipgrepTool> {
    which::which("rg").ok().map(RipgrepTool::new)
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;
    use std::time::Duration;

    use super::*;

    fn call<'a>(pattern: &'a str, root: &'a Path) -> ToolCall<'a> {
        ToolCall {
            pattern,
            root,
            max_results: 100,
            use_regex: false,
            file_glob: None,
            exclude_globs: &[],
            case_insensitive: true,
            follow_symlinks: false,
            timeout: Duration::from_secs(10),
        }
    }

    fn args(cmd: &Command) -> Vec<String> {
        cmd.get_args().map(|a| a.to_string_lossy().into_owned()).collect()
    }

    #[test]
    fn fd_command_shape() {
        let root = Path::new("/home/u/Documents");
        let cmd = FdTool::new("fd").command(&call("*inv*", root));
        assert_eq!(
            args(&cmd),
            ["--absolute-path", "--max-results", "100", "--glob", "--ignore-case", "--", "*inv*", "/home/u/Documents"]
        );
    }

    #[test]
    fn everything_command_shape() {
        let root = Path::new("C:\\Users\\u\\Desktop");
        let mut c = call("^inv", root);
        c.use_regex = true;
        let cmd = EverythingTool::new("es.exe").command(&c);
        assert_eq!(args(&cmd), ["-path", "C:\\Users\\u\\Desktop", "-n", "100", "-regex", "^inv"]);
    }

    #[test]
    fn ripgrep_command_passes_globs_and_excludes() {
        let root = Path::new("/data");
        let excludes = vec!["node_modules".to_string(), "*.tmp".to_string()];
        let mut c = call("needle", root);
        c.file_glob = Some("*.rs");
        c.exclude_globs = &excludes;
        c.follow_symlinks = true;
        let got = args(&RipgrepTool::new("rg").command(&c));
        assert_eq!(
            got,
            [
                "--files-with-matches", "--no-messages", "--max-columns", "200",
                "--ignore-case", "--follow", "--fixed-strings",
                "--glob", "*.rs", "--glob", "!node_modules", "--glob", "!*.tmp",
                "--regexp", "needle", "/data",
            ]
        );
    }

    #[test]
    fn walk_tool_matches_names_case_insensitively() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("Invoice_Jan.txt"), "x").unwrap();
        fs::write(dir.path().join("report.txt"), "x").unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub").join("invoice_mar.txt"), "x").unwrap();

        let mut hits = WalkTool.search(&call("*invoice*", dir.path())).unwrap();
        hits.sort_by(|a, b| a.0.cmp(&b.0));
        assert_eq!(hits.len(), 2);
        assert!(hits.iter().all(|h| h.as_path().is_absolute()));
    }

    #[test]
    fn walk_tool_honours_max_results() {
        let dir = tempfile::tempdir().unwrap();
        for i in 0..5 {
            fs::write(dir.path().join(format!("f{i}.log")), "x").unwrap();
        }
        let mut c = call("*.log", dir.path());
        c.max_results = 2;
        assert_eq!(WalkTool.search(&c).unwrap().len(), 2);
    }

    #[test]
    fn walk_tool_regex_mode() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a1.txt"), "x").unwrap();
        fs::write(dir.path().join("b2.txt"), "x").unwrap();
        let mut c = call("^a\\d", dir.path());
        c.use_regex = true;
        let hits = WalkTool.search(&c).unwrap();
        assert_eq!(hits.len(), 1);
        assert!(hits[0].as_str().ends_with("a1.txt"));
    }

    #[test]
    fn unavailable_tool_fails_every_call() {
        let root = Path::new("/data");
        let err = UnavailableTool::new("content").search(&call("needle", root)).unwrap_err();
        assert!(matches!(err, SearchError::MissingTool("content")));
        assert!(err.is_recoverable());
    }

    #[test]
    fn walk_tool_zero_timeout_is_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "x").unwrap();
        let mut c = call("*", dir.path());
        c.timeout = Duration::ZERO;
        assert!(matches!(WalkTool.search(&c), Err(SearchError::ToolTimeout { .. })));
    }
}
