//! Geo Query Router - deterministic intent routing for geospatial business-intelligence chat
//!
//! Routes a free-text business question to exactly one analysis capability (an endpoint such
//! as `/strategic-analysis` or `/scenario-analysis`), rejects out-of-domain questions, or
//! reports that the intent could not be determined. Rule-based and fully inspectable:
//! - Exact-match whitelist of known business queries (fixed 0.95 confidence)
//! - Narrow, literal out-of-scope categories that only reject on specific evidence
//! - Weighted boost/penalty phrases per capability with one-directional synonym expansion
//! - Saturating confidence, per-capability thresholds, registration-order tie-break
//!
//! All vocabulary, weights and thresholds live in one versioned JSON artifact that is
//! validated at startup and read-only afterwards.
//!
//! # Example
//! ```no_run
//! use geo_query_router::IntentEngine;
//!
//! let engine = IntentEngine::builtin()?;
//! let decision = engine.route("What if Red Bull changes its pricing strategy?");
//! println!("{} ({:.2})", decision.capability_id(), decision.confidence);
//! # Ok::<(), geo_query_router::ConfigurationError>(())
//! ```

pub mod engine;
pub mod error;
pub mod expansion;
pub mod normalizer;
pub mod predefined;
pub mod router;
pub mod scope;
pub mod scoring;
pub mod vocabulary;

pub use engine::{DecisionStage, IntentEngine, RouteRequest, RouteTrace};
pub use error::ConfigurationError;
pub use normalizer::QueryNormalizer;
pub use router::{DecisionPayload, RouteTarget, RoutingDecision};
pub use scoring::ScoredCandidate;
pub use vocabulary::{CapabilityDefinition, DomainVocabulary};
