//! Store-identity resolution.
//!
//! The storefront never says which physical store serves a delivery street
//! and which pickup point belongs to the same store. The resolver infers it
//! from catalogs: the candidate whose catalog looks most like the reference
//! delivery catalog is taken to be the same store.
//!
//! Each run moves `Pending → FetchingReference → ProbingCandidates →
//! Resolved | Unresolved`. The stages are distinct types with consuming
//! transitions, so a run cannot skip the reference fetch or be reopened once
//! it has concluded.

use std::cmp::Ordering;

use chrono::Utc;
use serde::Serialize;
use spesa_core::{
    Candidate, CandidateScore, MatchResult, ResolutionOutcome, ResolutionPath, ResolutionRequest,
    StoreContext, StoreRef, UnresolvedReason,
};
use tracing::Instrument;
use uuid::Uuid;

use crate::client::SpesaClient;
use crate::error::ScraperError;
use crate::retry::RetryPolicy;
use crate::runner::{TaskOutcome, TaskRunner};
use crate::score::{score, CatalogProfile};

/// Resolves reference stores against their pickup-point candidates.
#[derive(Debug, Clone)]
pub struct StoreResolver {
    client: SpesaClient,
    runner: TaskRunner,
}

impl StoreResolver {
    #[must_use]
    pub fn new(client: SpesaClient, runner: TaskRunner) -> Self {
        Self { client, runner }
    }

    /// Runs one resolution.
    ///
    /// # Errors
    ///
    /// - [`ScraperError::NoReferenceContext`] if the request has no reference street.
    /// - Any error from fetching the reference catalog, once retries are
    ///   exhausted. Candidate failures never fail the run.
    pub async fn resolve(&self, request: &ResolutionRequest) -> Result<MatchResult, ScraperError> {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!(
            "resolve",
            %run_id,
            reference = %request.reference,
            candidates = request.candidates.len()
        );
        self.run(Pending { run_id, request }).instrument(span).await
    }

    async fn run(&self, pending: Pending<'_>) -> Result<MatchResult, ScraperError> {
        let fetching = match pending.advance()? {
            Start::Concluded(result) => return Ok(result),
            Start::Fetch(fetching) => fetching,
        };

        let context = fetching.context;
        let client = &self.client;
        let (reference, attempts) = self
            .runner
            .attempt(|| async move {
                client
                    .harvest_catalog(&context)
                    .await
                    .map(|catalog| CatalogProfile::from_catalog(&catalog))
            })
            .await;
        let reference = reference.inspect_err(|e| {
            tracing::error!(%context, attempts, error = %e, "reference catalog fetch failed");
        })?;
        tracing::info!(
            %context,
            products = reference.products.len(),
            total = reference.total_count,
            "reference catalog fetched"
        );

        let probing = fetching.fetched(reference);
        let scores = self.probe(&probing).await;
        Ok(probing.conclude(scores))
    }

    /// Fetches and scores every candidate, returning diagnostics in
    /// candidate order.
    async fn probe(&self, probing: &ProbingCandidates<'_>) -> Vec<CandidateScore> {
        let candidates = &probing.request.candidates;
        let client = &self.client;

        let mut outcomes = self
            .runner
            .run(0..candidates.len(), |index| {
                let context = candidates[*index].context;
                async move {
                    client
                        .harvest_catalog(&context)
                        .await
                        .map(|catalog| CatalogProfile::from_catalog(&catalog))
                }
            })
            .await;
        outcomes.sort_by_key(|o| *o.id());

        outcomes
            .into_iter()
            .map(|outcome| match outcome {
                TaskOutcome::Completed { id, value, .. } => {
                    let similarity = score(&probing.reference, &value);
                    tracing::debug!(
                        candidate = %candidates[id].context,
                        score = similarity.score,
                        common = similarity.common_products,
                        "candidate scored"
                    );
                    CandidateScore {
                        candidate: candidates[id].clone(),
                        score: Some(similarity.score),
                        common_products: similarity.common_products,
                        error: None,
                    }
                }
                TaskOutcome::Failed { id, error, .. } => {
                    tracing::warn!(
                        candidate = %candidates[id].context,
                        error = %error,
                        "skipping candidate"
                    );
                    CandidateScore {
                        candidate: candidates[id].clone(),
                        score: None,
                        common_products: 0,
                        error: Some(error.to_string()),
                    }
                }
            })
            .collect()
    }

    /// Resolves every request, one task per reference.
    ///
    /// References run through a runner without its own retries: each run
    /// already retries its fetches, and a reference that still fails is
    /// counted as failed.
    pub async fn resolve_all(&self, requests: &[ResolutionRequest]) -> ResolutionReport {
        let outer = TaskRunner::new(self.runner.concurrency(), RetryPolicy::no_retry(), None);
        let mut outcomes = outer
            .run(0..requests.len(), |index| self.resolve(&requests[*index]))
            .await;
        outcomes.sort_by_key(|o| *o.id());

        let mut report = ResolutionReport::default();
        for outcome in outcomes {
            match outcome {
                TaskOutcome::Completed { value, .. } => report.results.push(value),
                TaskOutcome::Failed { id, error, .. } => report.failed.push(FailedResolution {
                    reference: requests[id].reference.clone(),
                    error: error.to_string(),
                }),
            }
        }
        tracing::info!(
            resolved = report.resolved(),
            unresolved = report.unresolved(),
            failed = report.failed.len(),
            "resolution batch complete"
        );
        report
    }
}

/// Picks the lowest finite score; ties go to the lowest
/// [`Candidate::tie_break_key`].
#[must_use]
pub fn select_best(scores: &[CandidateScore]) -> Option<&CandidateScore> {
    scores
        .iter()
        .filter(|s| s.score.is_some_and(f64::is_finite))
        .min_by(|a, b| compare_scores(a, b))
}

fn compare_scores(a: &CandidateScore, b: &CandidateScore) -> Ordering {
    let sa = a.score.unwrap_or(f64::INFINITY);
    let sb = b.score.unwrap_or(f64::INFINITY);
    sa.total_cmp(&sb)
        .then_with(|| a.candidate.tie_break_key().cmp(&b.candidate.tie_break_key()))
}

struct Pending<'a> {
    run_id: Uuid,
    request: &'a ResolutionRequest,
}

enum Start<'a> {
    Concluded(MatchResult),
    Fetch(FetchingReference<'a>),
}

impl<'a> Pending<'a> {
    /// Concludes runs that need no network at all, or moves on to the
    /// reference fetch.
    fn advance(self) -> Result<Start<'a>, ScraperError> {
        let request = self.request;
        let Some(&context) = request.reference_contexts.first() else {
            return Err(ScraperError::NoReferenceContext {
                reference: request.reference.to_string(),
            });
        };

        if request.candidates.is_empty() {
            let err = ScraperError::NoCandidate {
                reference: request.reference.to_string(),
            };
            tracing::warn!(error = %err, "store unresolved");
            return Ok(Start::Concluded(conclude(
                self.run_id,
                &request.reference,
                Verdict::Unresolved(UnresolvedReason::NoCandidates),
                ResolutionPath::Probed,
                Vec::new(),
            )));
        }

        if let ([_], [only]) = (
            request.reference_contexts.as_slice(),
            request.candidates.as_slice(),
        ) {
            tracing::info!(candidate = %only.context, "single candidate, resolved without probing");
            return Ok(Start::Concluded(conclude(
                self.run_id,
                &request.reference,
                Verdict::Chosen(only.clone(), None),
                ResolutionPath::FastPath,
                Vec::new(),
            )));
        }

        Ok(Start::Fetch(FetchingReference {
            run_id: self.run_id,
            request,
            context,
        }))
    }
}

struct FetchingReference<'a> {
    run_id: Uuid,
    request: &'a ResolutionRequest,
    context: StoreContext,
}

impl<'a> FetchingReference<'a> {
    fn fetched(self, reference: CatalogProfile) -> ProbingCandidates<'a> {
        ProbingCandidates {
            run_id: self.run_id,
            request: self.request,
            reference,
        }
    }
}

struct ProbingCandidates<'a> {
    run_id: Uuid,
    request: &'a ResolutionRequest,
    reference: CatalogProfile,
}

impl ProbingCandidates<'_> {
    fn conclude(self, scores: Vec<CandidateScore>) -> MatchResult {
        let verdict = if scores.iter().all(|s| s.score.is_none()) {
            Verdict::Unresolved(UnresolvedReason::AllCandidatesFailed)
        } else if let Some(best) = select_best(&scores) {
            Verdict::Chosen(best.candidate.clone(), best.score)
        } else {
            Verdict::Unresolved(UnresolvedReason::NoComparableCandidate)
        };

        match &verdict {
            Verdict::Chosen(candidate, score) => tracing::info!(
                chosen = %candidate.context,
                label = %candidate.label,
                score = score.unwrap_or(f64::NAN),
                "store resolved"
            ),
            Verdict::Unresolved(reason) => tracing::warn!(?reason, "store unresolved"),
        }

        conclude(
            self.run_id,
            &self.request.reference,
            verdict,
            ResolutionPath::Probed,
            scores,
        )
    }
}

enum Verdict {
    Chosen(Candidate, Option<f64>),
    Unresolved(UnresolvedReason),
}

fn conclude(
    run_id: Uuid,
    reference: &StoreRef,
    verdict: Verdict,
    path: ResolutionPath,
    candidates: Vec<CandidateScore>,
) -> MatchResult {
    let (outcome, chosen, score) = match verdict {
        Verdict::Chosen(candidate, score) => (ResolutionOutcome::Resolved, Some(candidate), score),
        Verdict::Unresolved(reason) => (ResolutionOutcome::Unresolved(reason), None, None),
    };
    MatchResult {
        run_id,
        reference: reference.clone(),
        outcome,
        path,
        chosen,
        score,
        candidates,
        resolved_at: Utc::now(),
    }
}

/// A reference whose run failed before any candidate could be probed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailedResolution {
    pub reference: StoreRef,
    pub error: String,
}

/// Outcome of [`StoreResolver::resolve_all`], in request order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ResolutionReport {
    pub results: Vec<MatchResult>,
    pub failed: Vec<FailedResolution>,
}

impl ResolutionReport {
    #[must_use]
    pub fn resolved(&self) -> usize {
        self.results.iter().filter(|r| r.is_resolved()).count()
    }

    #[must_use]
    pub fn unresolved(&self) -> usize {
        self.results.len() - self.resolved()
    }

    #[must_use]
    pub fn summary(&self) -> ResolutionSummary {
        ResolutionSummary {
            resolved: self.resolved(),
            unresolved: self.unresolved(),
            failed: self.failed.len(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ResolutionSummary {
    pub resolved: usize,
    pub unresolved: usize,
    pub failed: usize,
}
