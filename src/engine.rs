use std::collections::BTreeMap;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::Sender;
use tracing::{debug, info};

use crate::dedup::Deduplicator;
use crate::filter::ResultFilterChain;
use crate::hit::FilteredHit;
use crate::invoker::ExternalSearchInvoker;
use crate::pattern::CompiledQuery;
use crate::results::ScanStats;
use crate::roots::Root;
use crate::traits::ToolCall;

// ---------------------------------------------------------------------------
// PassPlan
// ---------------------------------------------------------------------------

/// Everything one pass needs besides the tool: which roots, what to ask for,
/// and how long each call may take.
pub struct PassPlan<'a> {
    pub roots: &'a [Root],
    pub query: &'a CompiledQuery,
    pub exclude_globs: &'a [String],
    pub timeout: Duration,
    pub max_results: usize,
    pub case_insensitive: bool,
    pub follow_symlinks: bool,
}

impl<'a> PassPlan<'a> {
    fn call(&self, root: &'a Root) -> ToolCall<'a> {
        ToolCall {
            pattern: &self.query.pattern,
            root: &root.path,
            max_results: self.max_results,
            use_regex: self.query.use_regex,
            file_glob: self.query.file_glob.as_deref(),
            exclude_globs: self.exclude_globs,
            case_insensitive: self.case_insensitive,
            follow_symlinks: self.follow_symlinks,
            timeout: self.timeout,
        }
    }
}

/// What a worker hands back for one root. Workers never touch the merge
/// state; they only return this.
struct Batch {
    index: usize,
    hits: Vec<FilteredHit>,
    raw: usize,
    dropped: usize,
    failed: bool,
}

// ---------------------------------------------------------------------------
// ParallelScanCoordinator
// ---------------------------------------------------------------------------

/// Fans one tool call per root out over a fixed pool of workers and merges
/// the batches in root order.
///
/// Workers pull root indices from a job queue, run the call, filter the
/// output and send the batch back. The coordinator holds out-of-order
/// batches until every earlier root has been merged, so the result depends
/// only on the root order and the tools' output, never on which worker
/// finished first.
///
/// Roots are dispatched as workers free up. Once the merged prefix reaches
/// the budget no further roots are dispatched; calls already running are
/// waited for but their hits are not needed.
pub struct ParallelScanCoordinator {
    invoker: ExternalSearchInvoker,
    threads: usize,
}

impl ParallelScanCoordinator {
    pub fn new(invoker: ExternalSearchInvoker, threads: usize) -> Self {
        Self {
            invoker,
            threads: threads.max(1),
        }
    }

    /// Run one pass, merging into `dedup`. Blocks until every dispatched
    /// root has answered or timed out.
    pub fn run_pass(
        &self,
        plan: &PassPlan<'_>,
        chain: &ResultFilterChain,
        dedup: &mut Deduplicator,
    ) -> ScanStats {
        let start = Instant::now();
        let mut stats = ScanStats::default();

        if plan.roots.is_empty() || dedup.is_full() {
            stats.duration = start.elapsed();
            return stats;
        }

        let workers = self.threads.min(plan.roots.len());
        let (job_tx, job_rx) = crossbeam_channel::unbounded::<usize>();
        let (done_tx, done_rx) = crossbeam_channel::unbounded::<Batch>();

        thread::scope(|s| {
            for _ in 0..workers {
                let job_rx = job_rx.clone();
                let done_tx = done_tx.clone();
                s.spawn(move || {
                    for index in job_rx.iter() {
                        let root = &plan.roots[index];
                        let out = self.invoker.invoke(&plan.call(root));
                        let raw = out.hits.len();
                        let (hits, dropped) = chain.apply(out.hits);
                        let batch = Batch {
                            index,
                            hits,
                            raw,
                            dropped,
                            failed: out.failed,
                        };
                        if done_tx.send(batch).is_err() {
                            break;
                        }
                    }
                });
            }
            drop(job_rx);
            drop(done_tx);

            let mut dispatcher = Dispatcher {
                tx: Some(job_tx),
                next: 0,
                total: plan.roots.len(),
                in_flight: 0,
            };
            for _ in 0..workers {
                dispatcher.dispatch(plan.roots);
            }

            let mut pending: BTreeMap<usize, Vec<FilteredHit>> = BTreeMap::new();
            let mut next_merge = 0;

            while dispatcher.in_flight > 0 {
                let Ok(batch) = done_rx.recv() else { break };
                dispatcher.in_flight -= 1;

                stats.roots_scanned += 1;
                stats.raw_hits += batch.raw;
                stats.filtered_out += batch.dropped;
                if batch.failed {
                    stats.roots_failed += 1;
                }
                pending.insert(batch.index, batch.hits);

                while let Some(hits) = pending.remove(&next_merge) {
                    let added = dedup.extend(hits);
                    debug!(root = %plan.roots[next_merge], added, total = dedup.len(), "merged batch");
                    next_merge += 1;
                }

                if dedup.is_full() {
                    dispatcher.stop();
                } else {
                    dispatcher.dispatch(plan.roots);
                }
            }
            dispatcher.stop();
        });

        stats.duration = start.elapsed();
        info!(
            tool = self.invoker.tool_name(),
            roots = stats.roots_scanned,
            failed = stats.roots_failed,
            hits = dedup.len(),
            elapsed_ms = stats.duration.as_millis() as u64,
            "pass complete"
        );
        stats
    }
}

/// Hands out root indices in order until told to stop.
struct Dispatcher {
    tx: Option<Sender<usize>>,
    next: usize,
    total: usize,
    in_flight: usize,
}

impl Dispatcher {
    fn dispatch(&mut self, roots: &[Root]) {
        if self.next >= self.total {
            return;
        }
        let Some(tx) = &self.tx else { return };
        if tx.send(self.next).is_ok() {
            debug!(root = %roots[self.next], "dispatched");
            self.next += 1;
            self.in_flight += 1;
        }
    }

    /// Close the queue; idle workers exit, busy ones finish their call.
    fn stop(&mut self) {
        self.tx = None;
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;
    use crate::error::SearchError;
    use crate::filter::ExcludeMatcher;
    use crate::hit::RawHit;
    use crate::request::{SearchFilters, SearchMode};
    use crate::roots::Provenance;
    use crate::traits::SearchTool;

    /// Per-root scripted output with an optional delay, counting calls.
    struct Scripted {
        outputs: HashMap<PathBuf, (Vec<String>, u64)>,
        calls: AtomicUsize,
    }

    impl Scripted {
        fn new(script: &[(&str, &[&str], u64)]) -> Self {
            Self {
                outputs: script
                    .iter()
                    .map(|(root, lines, delay)| {
                        (PathBuf::from(root), (lines.iter().map(|s| s.to_string()).collect(), *delay))
                    })
                    .collect(),
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl SearchTool for Scripted {
        fn name(&self) -> &str {
            "scripted"
        }
        fn search(&self, call: &ToolCall<'_>) -> Result<Vec<RawHit>, SearchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.outputs.get(call.root) {
                Some((lines, delay)) => {
                    thread::sleep(Duration::from_millis(*delay));
                    Ok(lines.iter().map(|l| RawHit(l.clone())).collect())
                }
                None => Err(SearchError::Tool("no script".into())),
            }
        }
    }

    fn query() -> CompiledQuery {
        CompiledQuery {
            mode: SearchMode::Filename,
            pattern: "*".into(),
            use_regex: false,
            file_glob: None,
        }
    }

    fn roots(names: &[&str]) -> Vec<Root> {
        names.iter().map(|n| Root::new(*n, Provenance::CommonFolder)).collect()
    }

    fn run(tool: Arc<Scripted>, roots: &[Root], cap: usize, threads: usize) -> (Vec<PathBuf>, ScanStats) {
        let coordinator = ParallelScanCoordinator::new(ExternalSearchInvoker::new(tool), threads);
        let q = query();
        let plan = PassPlan {
            roots,
            query: &q,
            exclude_globs: &[],
            timeout: Duration::from_secs(5),
            max_results: cap,
            case_insensitive: true,
            follow_symlinks: false,
        };
        let chain = ResultFilterChain::new(ExcludeMatcher::default(), SearchFilters::default());
        let mut dedup = Deduplicator::new(cap);
        let stats = coordinator.run_pass(&plan, &chain, &mut dedup);
        (dedup.into_hits().into_iter().map(|h| h.path).collect(), stats)
    }

    #[test]
    fn merge_follows_root_order_not_completion_order() {
        // The first root is the slowest; its hits must still come first.
        let tool = Arc::new(Scripted::new(&[
            ("/r1", &["/r1/a", "/shared"], 120),
            ("/r2", &["/r2/b", "/shared"], 0),
            ("/r3", &["/r3/c"], 30),
        ]));
        let (paths, stats) = run(tool, &roots(&["/r1", "/r2", "/r3"]), 100, 3);
        assert_eq!(paths, ["/r1/a", "/shared", "/r2/b", "/r3/c"].map(PathBuf::from));
        assert_eq!(stats.roots_scanned, 3);
        assert_eq!(stats.raw_hits, 5);
    }

    #[test]
    fn failed_root_contributes_nothing() {
        let tool = Arc::new(Scripted::new(&[("/r1", &["/r1/a"], 0), ("/r3", &["/r3/c"], 0)]));
        let (paths, stats) = run(tool, &roots(&["/r1", "/missing", "/r3"]), 100, 2);
        assert_eq!(paths, ["/r1/a", "/r3/c"].map(PathBuf::from));
        assert_eq!(stats.roots_failed, 1);
    }

    #[test]
    fn stops_dispatching_once_budget_reached() {
        let tool = Arc::new(Scripted::new(&[
            ("/r1", &["/a", "/b"], 0),
            ("/r2", &["/c"], 0),
            ("/r3", &["/d"], 0),
            ("/r4", &["/e"], 0),
        ]));
        let (paths, stats) = run(Arc::clone(&tool), &roots(&["/r1", "/r2", "/r3", "/r4"]), 2, 1);
        assert_eq!(paths, ["/a", "/b"].map(PathBuf::from));
        assert_eq!(tool.calls.load(Ordering::SeqCst), 1);
        assert_eq!(stats.roots_scanned, 1);
    }

    #[test]
    fn deterministic_across_thread_counts() {
        let script: &[(&str, &[&str], u64)] = &[
            ("/r1", &["/x/1", "/x/2"], 25),
            ("/r2", &["/x/2", "/x/3"], 5),
            ("/r3", &["/x/4", "/x/1"], 15),
            ("/r4", &["/x/5"], 0),
        ];
        let rs = roots(&["/r1", "/r2", "/r3", "/r4"]);
        let (baseline, _) = run(Arc::new(Scripted::new(script)), &rs, 4, 1);
        for threads in [2, 3, 4, 8] {
            let (paths, _) = run(Arc::new(Scripted::new(script)), &rs, 4, threads);
            assert_eq!(paths, baseline, "threads = {threads}");
        }
        assert_eq!(baseline, ["/x/1", "/x/2", "/x/3", "/x/4"].map(PathBuf::from));
    }

    #[test]
    fn empty_root_list_is_a_no_op() {
        let tool = Arc::new(Scripted::new(&[]));
        let (paths, stats) = run(tool, &[], 10, 4);
        assert!(paths.is_empty());
        assert_eq!(stats.roots_scanned, 0);
    }
}
