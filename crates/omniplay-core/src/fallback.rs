//! Backend fallback ordering
//!
//! Candidates are tried by priority: DASH, then HLS, then the embeds, then
//! native progressive. Each backend kind gets at most one attempt per source
//! assignment. When every prioritized candidate has failed, the first native
//! candidate (or the first unclassified segment) is played by the native
//! element as a last resort.

use crate::{
    backend::BackendKind,
    error::ErrorKind,
    source::{Candidate, CandidateKind, SourceSpec},
};
use serde::Serialize;
use tracing::{debug, info};

/// One planned attempt
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlannedAttempt {
    pub candidate: Candidate,
    pub backend: BackendKind,
    pub last_resort: bool,
}

/// Outcome of a finished attempt
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttemptRecord {
    pub backend: BackendKind,
    pub uri: String,
    /// `None` while the attempt is live
    pub failure: Option<ErrorKind>,
}

#[derive(Debug, Clone)]
pub struct FallbackCoordinator {
    plan: Vec<PlannedAttempt>,
    cursor: usize,
    attempts: Vec<AttemptRecord>,
}

impl FallbackCoordinator {
    /// Build the plan for a parsed source. `available` filters backends that
    /// have no registered runtime.
    pub fn new(spec: &SourceSpec, available: impl Fn(BackendKind) -> bool) -> Self {
        let plan = build_plan(spec, available);
        debug!(
            attempts = plan.len(),
            order = ?plan.iter().map(|p| p.backend).collect::<Vec<_>>(),
            "Fallback plan"
        );
        Self {
            plan,
            cursor: 0,
            attempts: Vec::new(),
        }
    }

    pub fn plan(&self) -> &[PlannedAttempt] {
        &self.plan
    }

    /// Nothing in the plan can be tried
    pub fn is_empty(&self) -> bool {
        self.plan.is_empty()
    }

    pub fn attempts(&self) -> &[AttemptRecord] {
        &self.attempts
    }

    pub fn is_exhausted(&self) -> bool {
        self.cursor >= self.plan.len()
    }

    fn attempted(&self, backend: BackendKind) -> bool {
        self.attempts.iter().any(|a| a.backend == backend)
    }

    /// Next candidate whose backend has not been attempted yet
    pub fn next_attempt(&mut self) -> Option<PlannedAttempt> {
        while let Some(planned) = self.plan.get(self.cursor).cloned() {
            self.cursor += 1;
            if self.attempted(planned.backend) {
                debug!(backend = %planned.backend, uri = %planned.candidate.uri, "Backend already attempted; skipped");
                continue;
            }
            info!(
                backend = %planned.backend,
                uri = %planned.candidate.uri,
                last_resort = planned.last_resort,
                "Trying candidate"
            );
            self.attempts.push(AttemptRecord {
                backend: planned.backend,
                uri: planned.candidate.uri.clone(),
                failure: None,
            });
            return Some(planned);
        }
        None
    }

    /// Mark the live attempt of `backend` as failed
    pub fn record_failure(&mut self, backend: BackendKind, kind: ErrorKind) {
        if let Some(record) = self
            .attempts
            .iter_mut()
            .rev()
            .find(|a| a.backend == backend && a.failure.is_none())
        {
            info!(backend = %backend, error = %kind, "Candidate failed");
            record.failure = Some(kind);
        }
    }
}

fn build_plan(spec: &SourceSpec, available: impl Fn(BackendKind) -> bool) -> Vec<PlannedAttempt> {
    let mut prioritized: Vec<&Candidate> = spec
        .candidates
        .iter()
        .filter(|c| !matches!(c.kind, CandidateKind::NativeProgressive | CandidateKind::Unknown))
        .filter(|c| c.kind.backend().is_some_and(&available))
        .collect();
    // Stable: declaration order breaks ties
    prioritized.sort_by_key(|c| c.kind.priority());

    let mut plan: Vec<PlannedAttempt> = prioritized
        .into_iter()
        .filter_map(|candidate| {
            candidate.kind.backend().map(|backend| PlannedAttempt {
                candidate: candidate.clone(),
                backend,
                last_resort: false,
            })
        })
        .collect();

    // A source made only of unclassified segments is not supported at all
    if spec.is_supported() && available(BackendKind::Native) {
        if let Some(candidate) = spec.last_resort() {
            plan.push(PlannedAttempt {
                candidate: candidate.clone(),
                backend: BackendKind::Native,
                last_resort: !plan.is_empty() || candidate.kind == CandidateKind::Unknown,
            });
        }
    }

    plan
}
