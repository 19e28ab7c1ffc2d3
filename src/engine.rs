//! Routing pipeline.
//!
//! raw query → normalize → whitelist (accept) → scope (reject) → score → select.
//!
//! [`IntentEngine`] owns an immutable [`DomainVocabulary`] and holds no other state, so one
//! instance can serve any number of threads at once without locking.

use crate::error::ConfigurationError;
use crate::normalizer::tokenize;
use crate::router::{RoutingDecision, Router, REASON_EMPTY, REASON_PREDEFINED};
use crate::scope::ScopeVerdict;
use crate::scoring::{ScoredCandidate, ScoringEngine};
use crate::vocabulary::DomainVocabulary;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Input contract from the chat front end
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteRequest {
    /// The user's question
    pub query: String,

    /// Previous turn(s), used only for scoring so follow-ups inherit intent
    #[serde(default)]
    pub conversation_context: Option<String>,
}

impl RouteRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            conversation_context: None,
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.conversation_context = Some(context.into());
        self
    }
}

/// Which stage produced the decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionStage {
    Empty,
    Predefined,
    Scope,
    Scored,
}

/// Everything the pipeline saw while routing one query
#[derive(Debug, Clone, PartialEq)]
pub struct RouteTrace {
    pub normalized: String,

    /// Normalized text the scoring engine saw (includes conversation context)
    pub scored_text: String,

    pub expansions: Vec<String>,

    pub domain_relevance: f64,

    pub scope: Option<ScopeVerdict>,

    /// Full candidate list in registration order; empty when scoring was skipped
    pub candidates: Vec<ScoredCandidate>,

    pub stage: DecisionStage,

    pub decision: RoutingDecision,
}

#[derive(Debug, Clone)]
pub struct IntentEngine {
    vocabulary: DomainVocabulary,
}

impl IntentEngine {
    pub fn new(vocabulary: DomainVocabulary) -> Self {
        Self { vocabulary }
    }

    /// Engine over the vocabulary embedded in the binary
    pub fn builtin() -> Result<Self, ConfigurationError> {
        DomainVocabulary::builtin().map(Self::new)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigurationError> {
        DomainVocabulary::from_path(path).map(Self::new)
    }

    pub fn vocabulary(&self) -> &DomainVocabulary {
        &self.vocabulary
    }

    /// Route a bare query
    pub fn route(&self, query: &str) -> RoutingDecision {
        self.trace(&RouteRequest::new(query)).decision
    }

    pub fn route_request(&self, request: &RouteRequest) -> RoutingDecision {
        self.trace(request).decision
    }

    /// Route and keep every intermediate result
    pub fn trace(&self, request: &RouteRequest) -> RouteTrace {
        let vocabulary = &self.vocabulary;
        let normalizer = vocabulary.normalizer();
        let normalized = normalizer.normalize(&request.query);

        if normalized.is_empty() {
            debug!("Query is empty after normalization");
            return RouteTrace {
                scored_text: normalized.clone(),
                normalized,
                expansions: Vec::new(),
                domain_relevance: 0.0,
                scope: None,
                candidates: Vec::new(),
                stage: DecisionStage::Empty,
                decision: RoutingDecision::unknown(REASON_EMPTY, Vec::new()),
            };
        }

        // Whitelist hits win over everything, including rejection patterns.
        if let Some(hit) = vocabulary.predefined().lookup(&normalized) {
            debug!("Predefined query hit: {}", hit.capability_id);
            return RouteTrace {
                scored_text: normalized.clone(),
                normalized,
                expansions: Vec::new(),
                domain_relevance: 0.0,
                scope: None,
                candidates: Vec::new(),
                stage: DecisionStage::Predefined,
                decision: RoutingDecision::capability(
                    hit.capability_id,
                    hit.confidence,
                    REASON_PREDEFINED,
                ),
            };
        }

        let query_only = vocabulary.synonyms().expand(tokenize(&normalized));
        let verdict = vocabulary.scope().check(&normalized, &query_only);
        if let ScopeVerdict::Rejected { category } = &verdict {
            debug!("Rejected as {}", category);
            return RouteTrace {
                scored_text: normalized.clone(),
                expansions: query_only.expansion_labels(),
                domain_relevance: vocabulary.domain_relevance(&query_only),
                normalized,
                decision: RoutingDecision::rejected(category.clone()),
                scope: Some(verdict),
                candidates: Vec::new(),
                stage: DecisionStage::Scope,
            };
        }

        let (scored_text, expanded) = match request
            .conversation_context
            .as_deref()
            .map(|context| normalizer.normalize(context))
            .filter(|context| !context.is_empty())
        {
            Some(context) => {
                let combined = normalizer.normalize(&format!("{} {}", context, normalized));
                let expanded = vocabulary.synonyms().expand(tokenize(&combined));
                (combined, expanded)
            }
            None => (normalized.clone(), query_only),
        };

        let scoring = vocabulary.scoring();
        let candidates =
            ScoringEngine::new(vocabulary.capabilities(), scoring.saturation_k).score(&expanded);
        let decision =
            Router::new(vocabulary.capabilities(), scoring.max_alternates).decide(&candidates);

        debug!(
            "Routed '{}' to {} ({:.3}): {}",
            scored_text, decision.target, decision.confidence, decision.reason
        );

        RouteTrace {
            normalized,
            expansions: expanded.expansion_labels(),
            domain_relevance: vocabulary.domain_relevance(&expanded),
            scored_text,
            scope: Some(verdict),
            candidates,
            stage: DecisionStage::Scored,
            decision,
        }
    }
}
