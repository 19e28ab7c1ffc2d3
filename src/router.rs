//! Threshold filtering and deterministic selection.
//!
//! Selection rules:
//! 1. A candidate is eligible when `normalized_confidence >= confidence_threshold` of its own
//!    capability. There is no global threshold.
//! 2. No eligible candidate: `UNKNOWN`, with the best candidates attached for diagnostics.
//! 3. Otherwise the strictly highest confidence wins; equal confidences go to the
//!    first-registered capability.
//!
//! The router never fails. `UNKNOWN` and `REJECTED` are ordinary outcomes.

use crate::scoring::ScoredCandidate;
use crate::vocabulary::CapabilityDefinition;
use serde::Serialize;
use std::cmp::Ordering;
use std::fmt;

/// Wire value for unroutable queries
pub const UNKNOWN: &str = "UNKNOWN";

/// Wire value for out-of-scope queries
pub const REJECTED: &str = "REJECTED";

pub const REASON_PREDEFINED: &str = "matched predefined query";
pub const REASON_NO_THRESHOLD: &str = "no capability met its threshold";
pub const REASON_EMPTY: &str = "query is empty after normalization";

/// Where a query was sent
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteTarget {
    Capability(String),
    /// No capability met its threshold
    Unknown,
    /// Matched an out-of-scope category
    Rejected { category: String },
}

impl RouteTarget {
    /// Capability id, or the `UNKNOWN` / `REJECTED` sentinel
    pub fn as_str(&self) -> &str {
        match self {
            RouteTarget::Capability(id) => id,
            RouteTarget::Unknown => UNKNOWN,
            RouteTarget::Rejected { .. } => REJECTED,
        }
    }

    pub fn is_capability(&self) -> bool {
        matches!(self, RouteTarget::Capability(_))
    }

    /// Message surfaced to the end user when the query cannot be served
    pub fn user_message(&self) -> Option<&'static str> {
        match self {
            RouteTarget::Capability(_) => None,
            RouteTarget::Unknown => Some("could not determine intent, please rephrase"),
            RouteTarget::Rejected { .. } => Some("out of scope"),
        }
    }
}

impl fmt::Display for RouteTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome of routing one query
#[derive(Debug, Clone, PartialEq)]
pub struct RoutingDecision {
    pub target: RouteTarget,

    /// Confidence in the selected capability; 0.0 for `UNKNOWN` and `REJECTED`
    pub confidence: f64,

    pub reason: String,

    pub alternates: Vec<ScoredCandidate>,
}

impl RoutingDecision {
    pub fn capability(id: impl Into<String>, confidence: f64, reason: impl Into<String>) -> Self {
        Self {
            target: RouteTarget::Capability(id.into()),
            confidence,
            reason: reason.into(),
            alternates: Vec::new(),
        }
    }

    pub fn unknown(reason: impl Into<String>, alternates: Vec<ScoredCandidate>) -> Self {
        Self {
            target: RouteTarget::Unknown,
            confidence: 0.0,
            reason: reason.into(),
            alternates,
        }
    }

    /// The category name doubles as the reason
    pub fn rejected(category: impl Into<String>) -> Self {
        let category = category.into();
        Self {
            target: RouteTarget::Rejected {
                category: category.clone(),
            },
            confidence: 0.0,
            reason: category,
            alternates: Vec::new(),
        }
    }

    pub fn capability_id(&self) -> &str {
        self.target.as_str()
    }

    /// Output contract consumed by downstream services
    pub fn to_payload(&self) -> DecisionPayload {
        DecisionPayload {
            capability_id: self.target.as_str().to_string(),
            confidence: self.confidence,
            reason: self.reason.clone(),
            alternates: self
                .alternates
                .iter()
                .map(|c| AlternatePayload {
                    capability_id: c.capability_id.clone(),
                    confidence: c.normalized_confidence,
                })
                .collect(),
        }
    }
}

/// Serialized decision
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionPayload {
    pub capability_id: String,
    pub confidence: f64,
    pub reason: String,
    pub alternates: Vec<AlternatePayload>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlternatePayload {
    pub capability_id: String,
    pub confidence: f64,
}

pub struct Router<'v> {
    capabilities: &'v [CapabilityDefinition],
    max_alternates: usize,
}

impl<'v> Router<'v> {
    pub fn new(capabilities: &'v [CapabilityDefinition], max_alternates: usize) -> Self {
        Self {
            capabilities,
            max_alternates,
        }
    }

    /// Select a capability from the full candidate list.
    ///
    /// `candidates` must be in registration order, one per capability, as produced by
    /// [`ScoringEngine::score`](crate::scoring::ScoringEngine::score).
    pub fn decide(&self, candidates: &[ScoredCandidate]) -> RoutingDecision {
        let eligible: Vec<usize> = candidates
            .iter()
            .enumerate()
            .filter(|(i, c)| {
                self.capabilities
                    .get(*i)
                    .is_some_and(|cap| c.normalized_confidence >= cap.confidence_threshold)
            })
            .map(|(i, _)| i)
            .collect();

        let Some(&first) = eligible.first() else {
            let alternates = self.ranked(candidates, None, false);
            return RoutingDecision::unknown(REASON_NO_THRESHOLD, alternates);
        };

        // Strict comparison keeps the earliest registration on equal confidence.
        let mut best = first;
        for &i in &eligible[1..] {
            if candidates[i].normalized_confidence > candidates[best].normalized_confidence {
                best = i;
            }
        }

        let winner = &candidates[best];
        let tied: Vec<&str> = eligible
            .iter()
            .filter(|&&i| {
                i != best && candidates[i].normalized_confidence == winner.normalized_confidence
            })
            .map(|&i| candidates[i].capability_id.as_str())
            .collect();

        let reason = if !tied.is_empty() {
            format!(
                "tied at {:.3} with {}; resolved by registration order",
                winner.normalized_confidence,
                tied.join(", ")
            )
        } else if eligible.len() > 1 {
            format!(
                "highest confidence among {} eligible capabilities",
                eligible.len()
            )
        } else {
            "met confidence threshold".to_string()
        };

        RoutingDecision {
            target: RouteTarget::Capability(winner.capability_id.clone()),
            confidence: winner.normalized_confidence,
            reason,
            alternates: self.ranked(candidates, Some(best), true),
        }
    }

    /// Candidates by descending confidence, then raw score, registration order breaking ties
    fn ranked(
        &self,
        candidates: &[ScoredCandidate],
        exclude: Option<usize>,
        positive_only: bool,
    ) -> Vec<ScoredCandidate> {
        let mut ranked: Vec<&ScoredCandidate> = candidates
            .iter()
            .enumerate()
            .filter(|(i, c)| Some(*i) != exclude && (!positive_only || c.normalized_confidence > 0.0))
            .map(|(_, c)| c)
            .collect();

        // sort_by is stable, so equal confidences keep registration order
        ranked.sort_by(|a, b| compare_confidence(b, a));
        ranked
            .into_iter()
            .take(self.max_alternates)
            .cloned()
            .collect()
    }
}

/// Clamped candidates still differ in how far below zero they fell
fn compare_confidence(a: &ScoredCandidate, b: &ScoredCandidate) -> Ordering {
    a.normalized_confidence
        .total_cmp(&b.normalized_confidence)
        .then(a.raw_score.total_cmp(&b.raw_score))
}
