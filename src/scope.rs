//! Out-of-domain rejection.
//!
//! Categories are narrow and literal ("recipe", "troubleshoot", "write a poem"). The validator
//! rejects only on positive evidence: a query that matches a category but also names a primary
//! business term is ambiguous and passes through to scoring.

use crate::error::ConfigurationError;
use crate::expansion::{ExpandedQuery, Phrase};
use regex::{Regex, RegexBuilder};
use serde::Deserialize;
use std::collections::HashSet;
use tracing::debug;

/// Rejection category as it appears in the vocabulary artifact
#[derive(Debug, Clone, Deserialize)]
pub struct RejectionCategoryFile {
    pub name: String,

    /// Regex patterns, matched case-insensitively against the normalized query
    #[serde(default)]
    pub patterns: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct RejectionCategory {
    pub name: String,
    pub patterns: Vec<Regex>,
}

/// Outcome of scope validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScopeVerdict {
    InScope,
    /// A category matched, but the query also carries business vocabulary
    Ambiguous { category: String },
    Rejected { category: String },
}

impl ScopeVerdict {
    pub fn is_rejected(&self) -> bool {
        matches!(self, ScopeVerdict::Rejected { .. })
    }
}

#[derive(Debug, Clone)]
pub struct ScopeValidator {
    categories: Vec<RejectionCategory>,
    business_terms: Vec<Phrase>,
}

impl ScopeValidator {
    /// Compile category patterns. `business_terms` are the primary domain phrases whose
    /// presence makes a rejection ambiguous.
    pub fn build(
        files: &[RejectionCategoryFile],
        business_terms: Vec<Phrase>,
    ) -> Result<Self, ConfigurationError> {
        let mut seen: HashSet<&str> = HashSet::new();
        let mut categories = Vec::with_capacity(files.len());

        for file in files {
            if !seen.insert(file.name.as_str()) {
                return Err(ConfigurationError::DuplicateCategory(file.name.clone()));
            }

            let patterns = file
                .patterns
                .iter()
                .map(|pattern| {
                    RegexBuilder::new(pattern)
                        .case_insensitive(true)
                        .build()
                        .map_err(|source| ConfigurationError::InvalidPattern {
                            category: file.name.clone(),
                            pattern: pattern.clone(),
                            source,
                        })
                })
                .collect::<Result<Vec<_>, _>>()?;

            categories.push(RejectionCategory {
                name: file.name.clone(),
                patterns,
            });
        }

        Ok(Self {
            categories,
            business_terms,
        })
    }

    pub fn categories(&self) -> &[RejectionCategory] {
        &self.categories
    }

    /// Check a normalized query. Categories are tried in configuration order and the first
    /// match decides.
    pub fn check(&self, normalized: &str, expanded: &ExpandedQuery) -> ScopeVerdict {
        let Some(category) = self
            .categories
            .iter()
            .find(|c| c.patterns.iter().any(|re| re.is_match(normalized)))
        else {
            return ScopeVerdict::InScope;
        };

        if let Some(term) = self.business_terms.iter().find(|t| expanded.contains(t)) {
            debug!(
                "Category {} matched but business term '{}' is present; treating as in scope",
                category.name,
                term.join(" ")
            );
            return ScopeVerdict::Ambiguous {
                category: category.name.clone(),
            };
        }

        ScopeVerdict::Rejected {
            category: category.name.clone(),
        }
    }
}
