//! Per-capability scoring.
//!
//! Each capability is scored in isolation: matched boost weights minus matched penalty weights,
//! then saturated into [0, 1] with `score / (score + k)`. A term counts once no matter how often
//! it appears, and no capability's terms can influence another capability's score.

use crate::expansion::ExpandedQuery;
use crate::vocabulary::{CapabilityDefinition, WeightedTerm};
use serde::Serialize;

/// Score for one capability
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredCandidate {
    pub capability_id: String,

    /// Boost sum minus penalty sum, may be negative
    pub raw_score: f64,

    pub matched_boost_terms: Vec<String>,

    pub matched_penalty_terms: Vec<String>,

    /// Saturated score, clamped to 0 when penalties dominate
    pub normalized_confidence: f64,
}

/// Saturate a raw score into [0, 1). Non-positive scores map to 0.
pub fn saturate(raw_score: f64, k: f64) -> f64 {
    if raw_score <= 0.0 {
        return 0.0;
    }
    raw_score / (raw_score + k)
}

pub struct ScoringEngine<'v> {
    capabilities: &'v [CapabilityDefinition],
    saturation_k: f64,
}

impl<'v> ScoringEngine<'v> {
    pub fn new(capabilities: &'v [CapabilityDefinition], saturation_k: f64) -> Self {
        Self {
            capabilities,
            saturation_k,
        }
    }

    /// One candidate per capability, in registration order, zero scorers included
    pub fn score(&self, query: &ExpandedQuery) -> Vec<ScoredCandidate> {
        self.capabilities
            .iter()
            .map(|capability| self.score_capability(capability, query))
            .collect()
    }

    pub fn score_capability(
        &self,
        capability: &CapabilityDefinition,
        query: &ExpandedQuery,
    ) -> ScoredCandidate {
        let (boost, matched_boost_terms) = sum_matches(&capability.boost_terms, query);
        let (penalty, matched_penalty_terms) = sum_matches(&capability.penalty_terms, query);
        let raw_score = boost - penalty;

        ScoredCandidate {
            capability_id: capability.id.clone(),
            raw_score,
            matched_boost_terms,
            matched_penalty_terms,
            normalized_confidence: saturate(raw_score, self.saturation_k),
        }
    }
}

/// Sum weights of matched terms in declaration order
fn sum_matches(terms: &[WeightedTerm], query: &ExpandedQuery) -> (f64, Vec<String>) {
    let mut total = 0.0;
    let mut matched = Vec::new();

    for term in terms {
        if query.contains(&term.phrase) {
            total += term.weight;
            matched.push(term.text.clone());
        }
    }

    (total, matched)
}
