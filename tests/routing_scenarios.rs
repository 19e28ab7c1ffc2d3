//! End-to-end routing against the embedded vocabulary

use geo_query_router::router::{REASON_EMPTY, REASON_NO_THRESHOLD, REASON_PREDEFINED};
use geo_query_router::vocabulary::{TermFile, VocabularyFile, BUILTIN_VOCABULARY};
use geo_query_router::{
    DecisionStage, DomainVocabulary, IntentEngine, RouteRequest, RouteTarget, RoutingDecision,
};
use rayon::prelude::*;
use serde_json::json;

fn engine() -> IntentEngine {
    IntentEngine::builtin().unwrap()
}

fn assert_routes(decision: &RoutingDecision, capability: &str, confidence: f64) {
    assert_eq!(
        decision.target,
        RouteTarget::Capability(capability.to_string()),
        "reason: {}",
        decision.reason
    );
    assert!(
        (decision.confidence - confidence).abs() < 1e-9,
        "expected {} got {}",
        confidence,
        decision.confidence
    );
}

const SAMPLE_QUERIES: &[&str] = &[
    "Show me the top strategic markets for Red Bull energy drink expansion",
    "What if Red Bull changes its pricing strategy — which markets would be most resilient?",
    "Write me a birthday poem",
    "asdkjashdkj",
    "What is the accuracy of our predictions?",
    "Which competitors are gaining market share based on the latest predictions?",
    "Which areas have clusters of similar customers?",
    "How do I reset my password?",
    "Troubleshoot declining sales in our Ohio stores",
    "How robust are our top markets if a competitor cuts prices?",
    "Give me a summary",
    "",
];

// ============================================================================
// Reference scenarios
// ============================================================================

#[test]
fn test_whitelisted_query_routes_at_fixed_confidence() {
    let engine = engine();
    let trace = engine.trace(&RouteRequest::new(
        "Show me the top strategic markets for Red Bull energy drink expansion",
    ));
    assert_eq!(trace.stage, DecisionStage::Predefined);
    assert_routes(&trace.decision, "/strategic-analysis", 0.95);
    assert_eq!(trace.decision.reason, REASON_PREDEFINED);

    // Case and punctuation do not matter
    let decision =
        engine.route("  show me the TOP strategic markets for red bull energy drink expansion?! ");
    assert_routes(&decision, "/strategic-analysis", 0.95);
}

#[test]
fn test_what_if_query_goes_to_scenario_analysis() {
    let engine = engine();
    let trace = engine.trace(&RouteRequest::new(
        "What if Red Bull changes its pricing strategy — which markets would be most resilient?",
    ));

    assert_eq!(trace.stage, DecisionStage::Scored);
    assert_eq!(trace.expansions, vec!["resilience"]);
    // what if 2.0 + resilience 1.5 + pricing strategy 1.0
    assert_routes(&trace.decision, "/scenario-analysis", 4.5 / 5.5);

    let strategic = trace
        .candidates
        .iter()
        .find(|c| c.capability_id == "/strategic-analysis")
        .unwrap();
    assert_eq!(strategic.matched_boost_terms, vec!["strategy"]);
    assert_eq!(strategic.matched_penalty_terms, vec!["what if", "resilience"]);
    assert_eq!(strategic.normalized_confidence, 0.0);
}

#[test]
fn test_creative_request_is_rejected() {
    let trace = engine().trace(&RouteRequest::new("Write me a birthday poem"));
    assert_eq!(trace.stage, DecisionStage::Scope);
    assert!(trace.candidates.is_empty());
    assert_eq!(
        trace.decision.target,
        RouteTarget::Rejected {
            category: "creative_tasks".to_string()
        }
    );
    assert_eq!(trace.decision.confidence, 0.0);

    let payload = trace.decision.to_payload();
    assert_eq!(payload.capability_id, "REJECTED");
    assert_eq!(payload.reason, "creative_tasks");
}

#[test]
fn test_gibberish_is_unknown() {
    let decision = engine().route("asdkjashdkj");
    assert_eq!(decision.target, RouteTarget::Unknown);
    assert_eq!(decision.confidence, 0.0);
    assert_eq!(decision.reason, REASON_NO_THRESHOLD);
    assert_eq!(decision.alternates.len(), 3);
    assert!(decision
        .alternates
        .iter()
        .all(|c| c.normalized_confidence == 0.0));
}

#[test]
fn test_penalties_separate_model_performance_from_competition() {
    let engine = engine();

    let decision = engine.route("What is the accuracy of our predictions?");
    assert_routes(&decision, "/model-performance", 2.5 / 3.5);

    let decision =
        engine.route("Which competitors are gaining market share based on the latest predictions?");
    assert_routes(&decision, "/competitive-analysis", 3.5 / 4.5);
}

#[test]
fn test_technical_support_is_rejected() {
    let decision = engine().route("How do I reset my password?");
    assert_eq!(decision.capability_id(), "REJECTED");
    assert_eq!(decision.reason, "technical_support");
}

#[test]
fn test_rejection_pattern_with_business_term_is_not_rejected() {
    let trace = engine().trace(&RouteRequest::new(
        "Troubleshoot declining sales in our Ohio stores",
    ));
    assert_eq!(trace.stage, DecisionStage::Scored);
    assert_eq!(trace.decision.target, RouteTarget::Unknown);
}

#[test]
fn test_filler_does_not_change_the_route() {
    let engine = engine();
    let plain = engine.route("show me which markets are the top markets for expansion");
    let chatty = engine
        .route("So, can you please show me which markets are the top markets for expansion?");
    assert_eq!(plain, chatty);
    assert_routes(&chatty, "/strategic-analysis", 0.75);
}

#[test]
fn test_exact_tie_in_builtin_vocabulary_goes_to_first_registered() {
    // robust -> resilience feeds /scenario-analysis, competitor -> competitors feeds
    // /competitive-analysis; both land on 1.5 net.
    let decision = engine().route("How robust are our top markets if a competitor cuts prices?");
    assert_routes(&decision, "/competitive-analysis", 0.6);
    assert!(decision.reason.contains("/scenario-analysis"));
    assert_eq!(decision.alternates[0].capability_id, "/scenario-analysis");
}

#[test]
fn test_unknown_keeps_best_candidates_for_diagnostics() {
    let decision = engine().route("Give me a summary");
    assert_eq!(decision.target, RouteTarget::Unknown);
    assert_eq!(decision.alternates[0].capability_id, "/analyze");
    assert!((decision.alternates[0].normalized_confidence - 0.75 / 1.75).abs() < 1e-9);
}

#[test]
fn test_empty_query_is_unknown() {
    for query in ["", "   ", "???", "can you please"] {
        let decision = engine().route(query);
        assert_eq!(decision.target, RouteTarget::Unknown);
        assert_eq!(decision.reason, REASON_EMPTY);
    }
}

#[test]
fn test_follow_up_inherits_intent_from_context() {
    let engine = engine();
    assert_eq!(engine.route("What about for Monster?").target, RouteTarget::Unknown);

    let request = RouteRequest::new("What about for Monster?").with_context(
        "Show me the top strategic markets for Red Bull energy drink expansion",
    );
    let decision = engine.route_request(&request);
    // strategic 2.0 + expansion 1.5
    assert_routes(&decision, "/strategic-analysis", 3.5 / 4.5);
}

// ============================================================================
// Properties
// ============================================================================

#[test]
fn test_every_predefined_query_routes_to_its_capability() {
    let engine = engine();
    let predefined = engine.vocabulary().predefined();
    assert!(!predefined.is_empty());

    for (query, capability) in predefined.iter() {
        let decision = engine.route(query);
        assert_routes(&decision, capability, 0.95);
        assert!(engine.vocabulary().capability(capability).is_some());
    }
}

#[test]
fn test_routing_is_deterministic() {
    let first = engine();
    let second = engine();
    for query in SAMPLE_QUERIES {
        let decision = first.route(query);
        assert_eq!(decision, first.route(query));
        assert_eq!(decision, second.route(query));
    }
}

#[test]
fn test_confidence_is_bounded() {
    let engine = engine();
    for query in SAMPLE_QUERIES {
        let trace = engine.trace(&RouteRequest::new(*query));
        assert!((0.0..=1.0).contains(&trace.decision.confidence));
        for candidate in &trace.candidates {
            assert!((0.0..1.0).contains(&candidate.normalized_confidence));
        }
    }
}

#[test]
fn test_adding_boost_term_only_moves_its_capability() {
    let query = RouteRequest::new("Which areas have clusters of similar customers?");
    let before = engine().trace(&query);

    let mut file: VocabularyFile = serde_json::from_str(BUILTIN_VOCABULARY).unwrap();
    let target = file
        .capabilities
        .iter_mut()
        .find(|c| c.id == "/customer-profile")
        .unwrap();
    target.boost_terms.push(TermFile {
        term: "similar customers".to_string(),
        weight: 1.0,
        conflicts_with: None,
    });
    let after = IntentEngine::new(DomainVocabulary::from_file(file).unwrap()).trace(&query);

    for (old, new) in before.candidates.iter().zip(&after.candidates) {
        if old.capability_id == "/customer-profile" {
            assert!(new.raw_score > old.raw_score);
            assert!(new.normalized_confidence >= old.normalized_confidence);
        } else {
            assert_eq!(old, new);
        }
    }
}

#[test]
fn test_exact_tie_goes_to_first_registered() {
    let config = json!({
        "version": "tie",
        "capabilities": [
            { "id": "/first", "confidence_threshold": 0.5, "boost_terms": [ { "term": "coverage", "weight": 2.0 } ] },
            { "id": "/second", "confidence_threshold": 0.5, "boost_terms": [ { "term": "coverage", "weight": 2.0 } ] }
        ]
    });
    let engine = IntentEngine::new(DomainVocabulary::from_json_str(&config.to_string()).unwrap());
    for _ in 0..10 {
        let decision = engine.route("store coverage");
        assert_routes(&decision, "/first", 2.0 / 3.0);
    }
}

// ============================================================================
// Concurrency
// ============================================================================

#[test]
fn test_engine_is_shareable_across_threads() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<IntentEngine>();
}

#[test]
fn test_parallel_routing_matches_sequential() {
    let engine = engine();
    let queries: Vec<&str> = SAMPLE_QUERIES.iter().cycle().take(240).copied().collect();

    let sequential: Vec<RoutingDecision> = queries.iter().map(|q| engine.route(q)).collect();
    let parallel: Vec<RoutingDecision> = queries.par_iter().map(|q| engine.route(q)).collect();

    assert_eq!(sequential, parallel);
}
