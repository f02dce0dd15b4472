//! The optional full-volume pass.
//!
//! After the common-folder pass the gate decides whether a second pass is
//! even possible (the budget is not yet met and there are volumes to scan)
//! and, if so, produces an [`EscalationOffer`]. The engine never answers the
//! offer itself: a caller-supplied [`EscalationPolicy`] or an explicit
//! [`FirstPass::resolve`](crate::FirstPass::resolve) call does.

use std::path::PathBuf;

use tracing::debug;

use crate::dedup::Deduplicator;
use crate::traits::EscalationPolicy;

/// A pending question to the caller: scan any of these volumes?
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EscalationOffer {
    /// Candidate volumes, in enumeration order.
    pub volumes: Vec<PathBuf>,
    /// Unique hits after the first pass.
    pub found: usize,
    /// The budget the first pass fell short of.
    pub max_results: usize,
}

/// The caller's answer to an [`EscalationOffer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EscalationDecision {
    /// Keep the first-pass results.
    Decline,
    /// Scan every offered volume, in offer order.
    All,
    /// Scan these volumes, in this order. Earlier entries outrank later
    /// ones. Paths that were not offered are ignored.
    Volumes(Vec<PathBuf>),
}

/// Always keep the first pass. The default for batch callers.
#[derive(Debug, Default, Clone, Copy)]
pub struct DeclineEscalation;

impl EscalationPolicy for DeclineEscalation {
    fn decide(&self, _offer: &EscalationOffer) -> EscalationDecision {
        EscalationDecision::Decline
    }
}

/// Always scan every offered volume.
#[derive(Debug, Default, Clone, Copy)]
pub struct EscalateAll;

impl EscalationPolicy for EscalateAll {
    fn decide(&self, _offer: &EscalationOffer) -> EscalationDecision {
        EscalationDecision::All
    }
}

/// Decides whether a full-volume pass may be offered and which volumes a
/// decision actually selects.
#[derive(Debug, Default, Clone, Copy)]
pub struct EscalationGate;

impl EscalationGate {
    /// An offer when the first pass is under budget and volumes exist.
    pub fn evaluate(&self, dedup: &Deduplicator, volumes: Vec<PathBuf>) -> Option<EscalationOffer> {
        if dedup.is_full() || volumes.is_empty() {
            return None;
        }
        Some(EscalationOffer {
            volumes,
            found: dedup.len(),
            max_results: dedup.cap(),
        })
    }

    /// The volumes to scan, in order, for `decision`. Unknown and repeated
    /// entries are dropped.
    pub fn targets(&self, offer: &EscalationOffer, decision: &EscalationDecision) -> Vec<PathBuf> {
        match decision {
            EscalationDecision::Decline => Vec::new(),
            EscalationDecision::All => offer.volumes.clone(),
            EscalationDecision::Volumes(chosen) => {
                let mut out: Vec<PathBuf> = Vec::with_capacity(chosen.len());
                for v in chosen {
                    if !offer.volumes.contains(v) {
                        debug!(volume = %v.display(), "volume was not offered; ignored");
                    } else if !out.contains(v) {
                        out.push(v.clone());
                    }
                }
                out
            }
        }
    }
}
