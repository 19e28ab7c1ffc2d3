//! Domain vocabulary: the single, versioned configuration artifact.
//!
//! The artifact is JSON (see `config/domain-vocabulary.json`). Loading parses it into the
//! `*File` structs, validates every invariant and compiles it into a [`DomainVocabulary`]:
//! an immutable arena of capabilities, terms, synonyms, rejection categories and whitelist
//! entries, referenced by index at request time and never mutated afterwards.

use crate::error::ConfigurationError;
use crate::expansion::{contains_phrase, phrase, ExpandedQuery, Phrase, SynonymEntry, SynonymTable};
use crate::normalizer::{QueryNormalizer, DEFAULT_FILLER_PHRASES};
use crate::predefined::{PredefinedQueryFile, PredefinedQueryMatcher};
use crate::scope::{RejectionCategoryFile, ScopeValidator};
use chrono::{DateTime, FixedOffset};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

// ============================================================================
// Constants
// ============================================================================

/// Vocabulary shipped with the binary
pub const BUILTIN_VOCABULARY: &str = include_str!("../config/domain-vocabulary.json");

/// Default saturation constant `k` in `score / (score + k)`
pub const DEFAULT_SATURATION_K: f64 = 1.0;

/// Default confidence reported for whitelist hits
pub const DEFAULT_PREDEFINED_CONFIDENCE: f64 = 0.95;

/// Default number of alternates carried on a decision
pub const DEFAULT_MAX_ALTERNATES: usize = 3;

// ============================================================================
// Artifact Types (as serialized)
// ============================================================================

/// The complete vocabulary artifact
#[derive(Debug, Clone, Deserialize)]
pub struct VocabularyFile {
    /// Artifact version
    pub version: String,

    /// When the artifact was generated (RFC 3339)
    #[serde(default)]
    pub generated: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub scoring: ScoringSettings,

    #[serde(default)]
    pub normalization: NormalizationSettings,

    #[serde(default)]
    pub domain_terms: DomainTermsFile,

    /// Ordered synonym table
    #[serde(default)]
    pub synonyms: Vec<SynonymFile>,

    /// Capability registry, in registration order
    pub capabilities: Vec<CapabilityFile>,

    #[serde(default)]
    pub rejection_categories: Vec<RejectionCategoryFile>,

    #[serde(default)]
    pub predefined_queries: Vec<PredefinedQueryFile>,
}

/// Scoring tunables
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ScoringSettings {
    /// Saturation constant `k`
    pub saturation_k: f64,

    /// Confidence reported for whitelist hits
    pub predefined_confidence: f64,

    /// Alternates carried on a decision
    pub max_alternates: usize,
}

impl Default for ScoringSettings {
    fn default() -> Self {
        Self {
            saturation_k: DEFAULT_SATURATION_K,
            predefined_confidence: DEFAULT_PREDEFINED_CONFIDENCE,
            max_alternates: DEFAULT_MAX_ALTERNATES,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NormalizationSettings {
    pub filler_phrases: Vec<String>,
}

impl Default for NormalizationSettings {
    fn default() -> Self {
        Self {
            filler_phrases: DEFAULT_FILLER_PHRASES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DomainTermsFile {
    pub primary: Vec<String>,
    pub secondary: Vec<String>,
    pub context: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SynonymFile {
    pub canonical: String,
    pub variants: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CapabilityFile {
    pub id: String,

    #[serde(default)]
    pub description: String,

    pub confidence_threshold: f64,

    #[serde(default)]
    pub boost_terms: Vec<TermFile>,

    #[serde(default)]
    pub penalty_terms: Vec<TermFile>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TermFile {
    pub term: String,
    pub weight: f64,

    /// Capability this penalty disambiguates against
    #[serde(default)]
    pub conflicts_with: Option<String>,
}

// ============================================================================
// Compiled Types
// ============================================================================

/// Tier of a global domain term
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TermTier {
    Primary,
    Secondary,
    Context,
}

impl TermTier {
    /// Contribution to the domain relevance signal
    pub fn weight(&self) -> f64 {
        match self {
            TermTier::Primary => 1.0,
            TermTier::Secondary => 0.5,
            TermTier::Context => 0.25,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TermTier::Primary => "primary",
            TermTier::Secondary => "secondary",
            TermTier::Context => "context",
        }
    }
}

#[derive(Debug, Clone)]
pub struct DomainTerm {
    pub text: String,
    pub phrase: Phrase,
    pub tier: TermTier,
}

/// A boost or penalty term
#[derive(Debug, Clone, PartialEq)]
pub struct WeightedTerm {
    pub text: String,
    pub phrase: Phrase,
    pub weight: f64,
    pub conflicts_with: Option<String>,
}

/// One routable capability
#[derive(Debug, Clone, PartialEq)]
pub struct CapabilityDefinition {
    pub id: String,
    pub description: String,
    pub confidence_threshold: f64,
    pub boost_terms: Vec<WeightedTerm>,
    pub penalty_terms: Vec<WeightedTerm>,
}

/// Validated, read-only vocabulary
#[derive(Debug, Clone)]
pub struct DomainVocabulary {
    version: String,
    generated: Option<DateTime<FixedOffset>>,
    description: String,
    scoring: ScoringSettings,
    normalizer: QueryNormalizer,
    domain_terms: Vec<DomainTerm>,
    synonyms: SynonymTable,
    capabilities: Vec<CapabilityDefinition>,
    capability_index: HashMap<String, usize>,
    scope: ScopeValidator,
    predefined: PredefinedQueryMatcher,
}

// ============================================================================
// Loading
// ============================================================================

impl DomainVocabulary {
    /// The vocabulary embedded in the binary
    pub fn builtin() -> Result<Self, ConfigurationError> {
        Self::from_json_str(BUILTIN_VOCABULARY)
    }

    /// Load and validate a vocabulary file
    pub fn from_path(path: &Path) -> Result<Self, ConfigurationError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigurationError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        debug!("Read vocabulary from {:?}", path);
        Self::from_json_str(&content)
    }

    pub fn from_json_str(content: &str) -> Result<Self, ConfigurationError> {
        let file: VocabularyFile = serde_json::from_str(content)?;
        Self::from_file(file)
    }

    /// Validate an already-parsed artifact
    pub fn from_file(file: VocabularyFile) -> Result<Self, ConfigurationError> {
        let k = file.scoring.saturation_k;
        if !(k.is_finite() && k > 0.0) {
            return Err(ConfigurationError::InvalidSaturation(k));
        }

        let normalizer = QueryNormalizer::new(&file.normalization.filler_phrases)
            .map_err(ConfigurationError::InvalidFiller)?;

        let (capabilities, capability_index) = compile_capabilities(&file.capabilities)?;
        let domain_terms = compile_domain_terms(&file.domain_terms)?;
        let synonyms = compile_synonyms(&file.synonyms, &capabilities, &domain_terms)?;

        let business_terms: Vec<Phrase> = domain_terms
            .iter()
            .filter(|t| t.tier == TermTier::Primary)
            .map(|t| t.phrase.clone())
            .collect();
        let scope = ScopeValidator::build(&file.rejection_categories, business_terms)?;

        let predefined = PredefinedQueryMatcher::build(
            &file.predefined_queries,
            &normalizer,
            file.scoring.predefined_confidence,
            |id| capability_index.contains_key(id),
        )?;

        let generated = if file.generated.is_empty() {
            None
        } else {
            match DateTime::parse_from_rfc3339(&file.generated) {
                Ok(ts) => Some(ts),
                Err(e) => {
                    warn!(
                        "Vocabulary 'generated' is not RFC 3339 ({}): {}",
                        file.generated, e
                    );
                    None
                }
            }
        };

        info!(
            "Loaded vocabulary v{}: {} capabilities, {} synonyms, {} rejection categories, {} predefined queries",
            file.version,
            capabilities.len(),
            synonyms.len(),
            scope.categories().len(),
            predefined.len()
        );

        Ok(Self {
            version: file.version,
            generated,
            description: file.description,
            scoring: file.scoring,
            normalizer,
            domain_terms,
            synonyms,
            capabilities,
            capability_index,
            scope,
            predefined,
        })
    }
}

fn compile_terms(id: &str, terms: &[TermFile]) -> Result<Vec<WeightedTerm>, ConfigurationError> {
    terms
        .iter()
        .map(|t| {
            if !(t.weight.is_finite() && t.weight > 0.0) {
                return Err(ConfigurationError::InvalidWeight {
                    id: id.to_string(),
                    term: t.term.clone(),
                    weight: t.weight,
                });
            }
            let compiled = phrase(&t.term);
            if compiled.is_empty() {
                return Err(ConfigurationError::EmptyTerm {
                    id: id.to_string(),
                    term: t.term.clone(),
                });
            }
            Ok(WeightedTerm {
                text: compiled.join(" "),
                phrase: compiled,
                weight: t.weight,
                conflicts_with: t
                    .conflicts_with
                    .as_deref()
                    .map(|target| target.trim().to_string()),
            })
        })
        .collect()
}

fn compile_capabilities(
    files: &[CapabilityFile],
) -> Result<(Vec<CapabilityDefinition>, HashMap<String, usize>), ConfigurationError> {
    if files.is_empty() {
        return Err(ConfigurationError::EmptyRegistry);
    }

    let mut capabilities = Vec::with_capacity(files.len());
    let mut index = HashMap::with_capacity(files.len());

    for file in files {
        let id = file.id.trim();
        if id.is_empty() {
            return Err(ConfigurationError::EmptyCapabilityId);
        }
        if index.contains_key(id) {
            return Err(ConfigurationError::DuplicateCapability(id.to_string()));
        }

        let threshold = file.confidence_threshold;
        if !(threshold > 0.0 && threshold <= 1.0) {
            return Err(ConfigurationError::ThresholdOutOfRange {
                id: id.to_string(),
                threshold,
            });
        }

        if file.boost_terms.is_empty() {
            return Err(ConfigurationError::NoBoostTerms(id.to_string()));
        }

        index.insert(id.to_string(), capabilities.len());
        capabilities.push(CapabilityDefinition {
            id: id.to_string(),
            description: file.description.clone(),
            confidence_threshold: threshold,
            boost_terms: compile_terms(id, &file.boost_terms)?,
            penalty_terms: compile_terms(id, &file.penalty_terms)?,
        });
    }

    // Conflicts can point forward, so check them once the registry is complete.
    for capability in &capabilities {
        for term in &capability.penalty_terms {
            if let Some(target) = &term.conflicts_with {
                if !index.contains_key(target.as_str()) {
                    return Err(ConfigurationError::DanglingConflict {
                        id: capability.id.clone(),
                        term: term.text.clone(),
                        target: target.clone(),
                    });
                }
            }
        }
    }

    Ok((capabilities, index))
}

fn compile_domain_terms(file: &DomainTermsFile) -> Result<Vec<DomainTerm>, ConfigurationError> {
    let tiers = [
        (TermTier::Primary, &file.primary),
        (TermTier::Secondary, &file.secondary),
        (TermTier::Context, &file.context),
    ];

    let mut terms = Vec::new();
    for (tier, texts) in tiers {
        for text in texts {
            let compiled = phrase(text);
            if compiled.is_empty() {
                return Err(ConfigurationError::EmptyDomainTerm);
            }
            terms.push(DomainTerm {
                text: compiled.join(" "),
                phrase: compiled,
                tier,
            });
        }
    }
    Ok(terms)
}

fn compile_synonyms(
    files: &[SynonymFile],
    capabilities: &[CapabilityDefinition],
    domain_terms: &[DomainTerm],
) -> Result<SynonymTable, ConfigurationError> {
    let mut entries = Vec::with_capacity(files.len());

    for file in files {
        let canonical_phrase = phrase(&file.canonical);
        let variants: Vec<Phrase> = file
            .variants
            .iter()
            .map(|v| phrase(v))
            .filter(|p| !p.is_empty())
            .collect();

        if canonical_phrase.is_empty() || variants.is_empty() {
            return Err(ConfigurationError::EmptySynonym(file.canonical.clone()));
        }

        // A canonical nothing can match is dead configuration.
        let used = capabilities
            .iter()
            .flat_map(|c| c.boost_terms.iter().chain(c.penalty_terms.iter()))
            .any(|t| contains_phrase(&t.phrase, &canonical_phrase))
            || domain_terms
                .iter()
                .any(|t| contains_phrase(&t.phrase, &canonical_phrase));
        if !used {
            return Err(ConfigurationError::DanglingSynonym(file.canonical.clone()));
        }

        entries.push(SynonymEntry {
            canonical: canonical_phrase.join(" "),
            canonical_phrase,
            variants,
        });
    }

    Ok(SynonymTable::new(entries))
}

// ============================================================================
// Accessors
// ============================================================================

impl DomainVocabulary {
    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn generated(&self) -> Option<DateTime<FixedOffset>> {
        self.generated
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn scoring(&self) -> &ScoringSettings {
        &self.scoring
    }

    pub fn normalizer(&self) -> &QueryNormalizer {
        &self.normalizer
    }

    pub fn domain_terms(&self) -> &[DomainTerm] {
        &self.domain_terms
    }

    pub fn synonyms(&self) -> &SynonymTable {
        &self.synonyms
    }

    /// Capabilities in registration order
    pub fn capabilities(&self) -> &[CapabilityDefinition] {
        &self.capabilities
    }

    pub fn capability(&self, id: &str) -> Option<&CapabilityDefinition> {
        self.capability_index
            .get(id)
            .map(|&i| &self.capabilities[i])
    }

    pub fn scope(&self) -> &ScopeValidator {
        &self.scope
    }

    pub fn predefined(&self) -> &PredefinedQueryMatcher {
        &self.predefined
    }

    /// Global business-vocabulary signal, independent of any capability.
    ///
    /// Each domain term present contributes its tier weight once.
    pub fn domain_relevance(&self, query: &ExpandedQuery) -> f64 {
        self.domain_terms
            .iter()
            .filter(|t| query.contains(&t.phrase))
            .map(|t| t.tier.weight())
            .sum()
    }
}
