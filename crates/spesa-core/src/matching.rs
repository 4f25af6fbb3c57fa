//! Outcome types for store-identity resolution runs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::stores::{Candidate, StoreRef};

/// How a resolution reached its outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionPath {
    /// One reference row and one candidate: matched without probing.
    FastPath,
    /// Candidates were fetched and scored against the reference catalog.
    Probed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnresolvedReason {
    /// No candidate shares the reference's postal code.
    NoCandidates,
    /// Every candidate fetch failed after retries.
    AllCandidatesFailed,
    /// Candidates were fetched but none shared a single product id with the reference.
    NoComparableCandidate,
}

/// Terminal state of a resolution run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "state", content = "reason")]
pub enum ResolutionOutcome {
    Resolved,
    Unresolved(UnresolvedReason),
}

/// Per-candidate diagnostic recorded during probing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateScore {
    pub candidate: Candidate,
    /// `None` when the candidate's catalog could not be fetched. Infinite
    /// when nothing is shared with the reference; serialized as `"inf"`.
    #[serde(with = "score_repr")]
    pub score: Option<f64>,
    pub common_products: usize,
    pub error: Option<String>,
}

/// JSON has no infinity; write it as `"inf"` so it stays distinct from `null`.
mod score_repr {
    use serde::{Deserialize, Deserializer, Serializer};

    const INFINITE: &str = "inf";

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Finite(f64),
        Text(String),
    }

    #[allow(clippy::ref_option)]
    pub(super) fn serialize<S: Serializer>(
        score: &Option<f64>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match score {
            Some(v) if v.is_infinite() => serializer.serialize_str(INFINITE),
            Some(v) => serializer.serialize_f64(*v),
            None => serializer.serialize_none(),
        }
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<f64>, D::Error> {
        match Option::<Repr>::deserialize(deserializer)? {
            None => Ok(None),
            Some(Repr::Finite(v)) => Ok(Some(v)),
            Some(Repr::Text(t)) if t == INFINITE => Ok(Some(f64::INFINITY)),
            Some(Repr::Text(t)) => Err(serde::de::Error::custom(format!(
                "invalid score {t:?}, expected a number, \"{INFINITE}\" or null"
            ))),
        }
    }
}

/// Result of one resolution run. Never updated in place: a new run yields a
/// new value with a new `run_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub run_id: Uuid,
    pub reference: StoreRef,
    pub outcome: ResolutionOutcome,
    pub path: ResolutionPath,
    pub chosen: Option<Candidate>,
    /// Winning score; `None` for the fast path and for unresolved runs.
    pub score: Option<f64>,
    pub candidates: Vec<CandidateScore>,
    pub resolved_at: DateTime<Utc>,
}

impl MatchResult {
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.outcome == ResolutionOutcome::Resolved
    }

    /// Compares everything except the per-run identity (`run_id`, `resolved_at`).
    #[must_use]
    pub fn same_decision(&self, other: &MatchResult) -> bool {
        self.reference == other.reference
            && self.outcome == other.outcome
            && self.path == other.path
            && self.chosen == other.chosen
            && self.score == other.score
            && self.candidates == other.candidates
    }
}
