//! Predefined query whitelist.
//!
//! Exact equality on normalized text, nothing fuzzy. A hit routes with a fixed confidence and
//! bypasses both the scope validator and scoring.

use crate::error::ConfigurationError;
use crate::normalizer::QueryNormalizer;
use serde::Deserialize;
use std::collections::HashMap;

/// Whitelist entry as it appears in the vocabulary artifact
#[derive(Debug, Clone, Deserialize)]
pub struct PredefinedQueryFile {
    /// Literal query text, normalized at load time
    pub query: String,

    /// Capability id the query is pinned to
    pub capability: String,
}

/// A whitelist hit
#[derive(Debug, Clone, PartialEq)]
pub struct PredefinedMatch {
    pub capability_id: String,
    pub confidence: f64,
}

/// Normalized literal → capability id
#[derive(Debug, Clone)]
pub struct PredefinedQueryMatcher {
    /// Entries in declaration order
    entries: Vec<(String, String)>,
    index: HashMap<String, usize>,
    confidence: f64,
}

impl PredefinedQueryMatcher {
    /// Normalize and validate whitelist entries.
    ///
    /// `is_known` reports whether a capability id exists in the registry.
    pub fn build(
        files: &[PredefinedQueryFile],
        normalizer: &QueryNormalizer,
        confidence: f64,
        is_known: impl Fn(&str) -> bool,
    ) -> Result<Self, ConfigurationError> {
        if !(confidence > 0.0 && confidence <= 1.0) {
            return Err(ConfigurationError::InvalidPredefinedConfidence(confidence));
        }

        let mut entries: Vec<(String, String)> = Vec::with_capacity(files.len());
        let mut index: HashMap<String, usize> = HashMap::with_capacity(files.len());

        for file in files {
            // Registry ids are stored trimmed
            let capability = file.capability.trim();
            if !is_known(capability) {
                return Err(ConfigurationError::UnknownPredefinedTarget {
                    query: file.query.clone(),
                    id: capability.to_string(),
                });
            }

            let normalized = normalizer.normalize(&file.query);
            if normalized.is_empty() {
                return Err(ConfigurationError::EmptyPredefinedQuery(file.query.clone()));
            }

            match index.get(&normalized).copied() {
                Some(existing) if entries[existing].1 != capability => {
                    return Err(ConfigurationError::ConflictingPredefinedQuery {
                        query: file.query.clone(),
                        first: entries[existing].1.clone(),
                        second: capability.to_string(),
                    });
                }
                // Same literal listed twice for the same capability
                Some(_) => continue,
                None => {
                    index.insert(normalized.clone(), entries.len());
                    entries.push((normalized, capability.to_string()));
                }
            }
        }

        Ok(Self {
            entries,
            index,
            confidence,
        })
    }

    /// Look up an already-normalized query
    pub fn lookup(&self, normalized: &str) -> Option<PredefinedMatch> {
        self.index.get(normalized).map(|&i| PredefinedMatch {
            capability_id: self.entries[i].1.clone(),
            confidence: self.confidence,
        })
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// (normalized literal, capability id) pairs in declaration order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(query, capability)| (query.as_str(), capability.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(query: &str, capability: &str) -> PredefinedQueryFile {
        PredefinedQueryFile {
            query: query.to_string(),
            capability: capability.to_string(),
        }
    }

    fn known(id: &str) -> bool {
        matches!(id, "/strategic-analysis" | "/scenario-analysis")
    }

    #[test]
    fn test_lookup_uses_normalized_literals() {
        let matcher = PredefinedQueryMatcher::build(
            &[entry(
                "Show me the top strategic markets for Red Bull energy drink expansion",
                "/strategic-analysis",
            )],
            &QueryNormalizer::default(),
            0.95,
            known,
        )
        .unwrap();

        let hit = matcher
            .lookup("show me the top strategic markets for red bull energy drink expansion")
            .unwrap();
        assert_eq!(hit.capability_id, "/strategic-analysis");
        assert_eq!(hit.confidence, 0.95);
    }

    #[test]
    fn test_lookup_is_exact_not_substring() {
        let matcher = PredefinedQueryMatcher::build(
            &[entry("top strategic markets", "/strategic-analysis")],
            &QueryNormalizer::default(),
            0.95,
            known,
        )
        .unwrap();

        assert!(matcher.lookup("top strategic markets").is_some());
        assert!(matcher.lookup("top strategic markets in texas").is_none());
        assert!(matcher.lookup("strategic markets").is_none());
    }

    #[test]
    fn test_rejects_unknown_capability() {
        let err = PredefinedQueryMatcher::build(
            &[entry("rank markets", "/does-not-exist")],
            &QueryNormalizer::default(),
            0.95,
            known,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigurationError::UnknownPredefinedTarget { .. }
        ));
    }

    #[test]
    fn test_capability_ids_are_trimmed() {
        let matcher = PredefinedQueryMatcher::build(
            &[entry("rank markets", " /strategic-analysis ")],
            &QueryNormalizer::default(),
            0.95,
            known,
        )
        .unwrap();
        assert_eq!(
            matcher.lookup("rank markets").unwrap().capability_id,
            "/strategic-analysis"
        );

        // Whitespace alone does not make two targets differ
        let matcher = PredefinedQueryMatcher::build(
            &[
                entry("rank markets", "/strategic-analysis"),
                entry("Rank markets!", "/strategic-analysis "),
            ],
            &QueryNormalizer::default(),
            0.95,
            known,
        )
        .unwrap();
        assert_eq!(matcher.len(), 1);
    }

    #[test]
    fn test_rejects_conflicting_duplicates() {
        let err = PredefinedQueryMatcher::build(
            &[
                entry("Rank markets?", "/strategic-analysis"),
                entry("rank markets", "/scenario-analysis"),
            ],
            &QueryNormalizer::default(),
            0.95,
            known,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigurationError::ConflictingPredefinedQuery { .. }
        ));
    }

    #[test]
    fn test_identical_duplicates_collapse() {
        let matcher = PredefinedQueryMatcher::build(
            &[
                entry("Rank markets?", "/strategic-analysis"),
                entry("rank markets", "/strategic-analysis"),
            ],
            &QueryNormalizer::default(),
            0.95,
            known,
        )
        .unwrap();
        assert_eq!(matcher.len(), 1);
    }

    #[test]
    fn test_rejects_empty_literal_and_bad_confidence() {
        let err = PredefinedQueryMatcher::build(
            &[entry("please?", "/strategic-analysis")],
            &QueryNormalizer::default(),
            0.95,
            known,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigurationError::EmptyPredefinedQuery(_)));

        let err =
            PredefinedQueryMatcher::build(&[], &QueryNormalizer::default(), 1.5, known).unwrap_err();
        assert!(matches!(
            err,
            ConfigurationError::InvalidPredefinedConfidence(_)
        ));
    }
}
