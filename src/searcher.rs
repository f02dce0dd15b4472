use std::time::Duration;

use chrono::Utc;
use tracing::info;

use crate::builder::{PassTimeouts, Timeouts};
use crate::dedup::Deduplicator;
use crate::engine::{ParallelScanCoordinator, PassPlan};
use crate::error::SearchError;
use crate::escalation::{EscalationDecision, EscalationGate, EscalationOffer};
use crate::filter::{ExcludeMatcher, ResultFilterChain};
use crate::history::HistoryRecord;
use crate::hit::FilteredHit;
use crate::invoker::ExternalSearchInvoker;
use crate::pattern::CompiledQuery;
use crate::request::{SearchMode, SearchRequest};
use crate::results::{ResultSet, ScanStats};
use crate::roots::{Root, RootSetBuilder};
use crate::traits::{EscalationPolicy, HistoryLog, VolumeEnumerator};

/// A configured search engine. Built by [`SearchBuilder`](crate::SearchBuilder);
/// holds no per-request state, so one instance serves any number of
/// requests.
pub struct Searcher {
    pub(crate) filename:    ExternalSearchInvoker,
    pub(crate) content:     ExternalSearchInvoker,
    pub(crate) volumes:     Box<dyn VolumeEnumerator>,
    pub(crate) roots:       RootSetBuilder,
    pub(crate) max_results: usize,
    pub(crate) exclude:     Vec<String>,
    pub(crate) threads:     usize,
    pub(crate) timeouts:    Timeouts,
    pub(crate) history:     Option<Box<dyn HistoryLog>>,
}

impl Searcher {
    /// Run a request end to end. If the common-folder pass falls short of
    /// the budget, `policy` decides whether to scan full volumes.
    ///
    /// # Errors
    ///
    /// Only a structurally invalid request fails, i.e. a regex that does not
    /// compile. Tool failures, including a backend that is not installed,
    /// never surface here; the affected roots contribute zero hits.
    pub fn search(
        &self,
        request: &SearchRequest,
        policy: &dyn EscalationPolicy,
    ) -> Result<ResultSet, SearchError> {
        let first = self.first_pass(request)?;
        let decision = match first.offer() {
            Some(offer) => policy.decide(offer),
            None => EscalationDecision::Decline,
        };
        Ok(first.resolve(decision))
    }

    /// Run only the common-folder pass and stop at the escalation point.
    ///
    /// The returned [`FirstPass`] holds the merge state; inspect
    /// [`FirstPass::offer`] and call [`FirstPass::resolve`] with the caller's
    /// answer to finish the request.
    pub fn first_pass(&self, request: &SearchRequest) -> Result<FirstPass<'_>, SearchError> {
        let query = request.compile()?;

        let volumes = self.volumes.volumes();
        let roots = self.roots.common_roots(&volumes);
        info!(mode = %request.mode, pattern = %query.pattern, roots = roots.len(), "common-folder pass");

        let chain = ResultFilterChain::new(ExcludeMatcher::new(&self.exclude), request.filters.clone());
        let mut dedup = Deduplicator::new(self.max_results);
        let timeouts = self.timeouts_for(request.mode);

        let stats = self.run_pass(self.threads, &roots, &query, timeouts.common, &chain, &mut dedup);
        let offer = EscalationGate.evaluate(&dedup, volumes);

        Ok(FirstPass {
            searcher: self,
            request: request.clone(),
            query,
            chain,
            dedup,
            stats,
            offer,
        })
    }

    fn invoker(&self, mode: SearchMode) -> &ExternalSearchInvoker {
        match mode {
            SearchMode::Filename => &self.filename,
            SearchMode::Content => &self.content,
        }
    }

    fn timeouts_for(&self, mode: SearchMode) -> PassTimeouts {
        match mode {
            SearchMode::Filename => self.timeouts.filename,
            SearchMode::Content => self.timeouts.content,
        }
    }

    fn run_pass(
        &self,
        workers: usize,
        roots: &[Root],
        query: &CompiledQuery,
        timeout: Duration,
        chain: &ResultFilterChain,
        dedup: &mut Deduplicator,
    ) -> ScanStats {
        let plan = PassPlan {
            roots,
            query,
            exclude_globs: &self.exclude,
            timeout,
            max_results: self.max_results,
            case_insensitive: true,
            follow_symlinks: query.mode == SearchMode::Content,
        };
        let invoker = self.invoker(query.mode).clone();
        ParallelScanCoordinator::new(invoker, workers).run_pass(&plan, chain, dedup)
    }

    fn record(&self, request: &SearchRequest, count: usize) {
        if let Some(history) = &self.history {
            history.record(&HistoryRecord {
                mode: request.mode,
                query: request.query.clone(),
                ext: request.extension_filter.clone(),
                result_count: count,
                timestamp: Utc::now(),
            });
        }
    }
}

/// A request suspended at the escalation point.
///
/// Nothing runs until [`resolve`](Self::resolve) is called, so a front end
/// can ask its user (or apply a fixed policy) without the engine doing any
/// terminal I/O.
pub struct FirstPass<'s> {
    searcher: &'s Searcher,
    request: SearchRequest,
    query: CompiledQuery,
    chain: ResultFilterChain,
    dedup: Deduplicator,
    stats: ScanStats,
    offer: Option<EscalationOffer>,
}

impl FirstPass<'_> {
    /// The pending full-volume question, if the first pass was under budget.
    pub fn offer(&self) -> Option<&EscalationOffer> {
        self.offer.as_ref()
    }

    /// Hits found so far, in discovery order.
    pub fn hits(&self) -> &[FilteredHit] {
        self.dedup.hits()
    }

    /// Finish without a second pass.
    pub fn finish(self) -> ResultSet {
        self.resolve(EscalationDecision::Decline)
    }

    /// Finish the request. Selected volumes are scanned one at a time with
    /// the long timeout and merged into the existing state, so first-pass
    /// hits keep their positions and earlier volumes outrank later ones.
    /// No further volume is started once the budget is met.
    pub fn resolve(mut self, decision: EscalationDecision) -> ResultSet {
        let targets = match &self.offer {
            Some(offer) => EscalationGate.targets(offer, &decision),
            None => Vec::new(),
        };

        if !targets.is_empty() {
            let searcher = self.searcher;
            let roots = searcher.roots.volume_roots(&targets);
            info!(volumes = roots.len(), found = self.dedup.len(), "full-volume pass");

            let timeout = searcher.timeouts_for(self.request.mode).full_volume;
            // A whole-volume scan is long; a single worker means the next
            // volume is only dispatched after the cap has been checked.
            let pass = searcher.run_pass(1, &roots, &self.query, timeout, &self.chain, &mut self.dedup);
            self.stats.absorb(&pass);
            self.stats.escalated = true;
        }

        let result = ResultSet {
            hits: self.dedup.into_hits(),
            stats: self.stats,
        };
        self.searcher.record(&self.request, result.len());
        result
    }
}
