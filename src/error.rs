//! Error types.
//!
//! Only configuration problems are errors. Out-of-scope and unroutable queries are ordinary
//! [`RoutingDecision`](crate::router::RoutingDecision) values.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// A malformed vocabulary artifact. Fatal at load time; never produced while routing.
#[derive(Error, Debug)]
pub enum ConfigurationError {
    #[error("Failed to read vocabulary from {path}: {source}")]
    Read { path: PathBuf, source: io::Error },

    #[error("Failed to parse vocabulary: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Vocabulary defines no capabilities")]
    EmptyRegistry,

    #[error("Capability id must not be empty")]
    EmptyCapabilityId,

    #[error("Duplicate capability id: {0}")]
    DuplicateCapability(String),

    #[error("Capability {id} has threshold {threshold}, expected a value in (0, 1]")]
    ThresholdOutOfRange { id: String, threshold: f64 },

    #[error("Capability {0} has no boost terms")]
    NoBoostTerms(String),

    #[error("Capability {id} has a term with no matchable tokens: '{term}'")]
    EmptyTerm { id: String, term: String },

    #[error("Capability {id} term '{term}' has weight {weight}, expected a finite value > 0")]
    InvalidWeight { id: String, term: String, weight: f64 },

    #[error("Penalty term '{term}' on {id} conflicts with unknown capability {target}")]
    DanglingConflict {
        id: String,
        term: String,
        target: String,
    },

    #[error("Domain term must not be empty")]
    EmptyDomainTerm,

    #[error("Synonym '{0}' has no variants")]
    EmptySynonym(String),

    #[error("Synonym canonical '{0}' is not used by any capability or domain term")]
    DanglingSynonym(String),

    #[error("Duplicate rejection category: {0}")]
    DuplicateCategory(String),

    #[error("Rejection category {category} has invalid pattern '{pattern}': {source}")]
    InvalidPattern {
        category: String,
        pattern: String,
        source: regex::Error,
    },

    #[error("Invalid filler phrase list: {0}")]
    InvalidFiller(regex::Error),

    #[error("Predefined query '{query}' routes to unknown capability {id}")]
    UnknownPredefinedTarget { query: String, id: String },

    #[error("Predefined query normalizes to an empty string: '{0}'")]
    EmptyPredefinedQuery(String),

    #[error("Predefined query '{query}' is mapped to both {first} and {second}")]
    ConflictingPredefinedQuery {
        query: String,
        first: String,
        second: String,
    },

    #[error("Saturation constant must be a finite value > 0, got {0}")]
    InvalidSaturation(f64),

    #[error("Predefined confidence must be in (0, 1], got {0}")]
    InvalidPredefinedConfidence(f64),
}
