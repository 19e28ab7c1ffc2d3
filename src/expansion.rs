//! Synonym expansion.
//!
//! Expansion is one-directional and non-recursive: a variant found among the query's original
//! tokens adds its canonical phrase as a separate segment. Original tokens are never replaced,
//! so literal matches survive expansion.

use crate::normalizer::tokenize;

/// A lowercase token sequence matched contiguously
pub type Phrase = Vec<String>;

/// Tokenize a configured term into a phrase
pub fn phrase(text: &str) -> Phrase {
    tokenize(text)
}

/// True when `needle` occurs as a contiguous run inside `haystack`
pub fn contains_phrase(haystack: &[String], needle: &[String]) -> bool {
    if needle.is_empty() || needle.len() > haystack.len() {
        return false;
    }
    haystack.windows(needle.len()).any(|window| window == needle)
}

/// One canonical phrase and the variants that expand to it
#[derive(Debug, Clone)]
pub struct SynonymEntry {
    pub canonical: String,
    pub canonical_phrase: Phrase,
    pub variants: Vec<Phrase>,
}

/// Ordered synonym table
#[derive(Debug, Clone, Default)]
pub struct SynonymTable {
    entries: Vec<SynonymEntry>,
}

impl SynonymTable {
    pub fn new(entries: Vec<SynonymEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[SynonymEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Expand query tokens, keeping the originals.
    ///
    /// Canonicals already present literally are not added again, and each canonical is added
    /// at most once, in table order.
    pub fn expand(&self, tokens: Vec<String>) -> ExpandedQuery {
        let mut expansions: Vec<Phrase> = Vec::new();

        for entry in &self.entries {
            if contains_phrase(&tokens, &entry.canonical_phrase)
                || expansions.contains(&entry.canonical_phrase)
            {
                continue;
            }
            if entry
                .variants
                .iter()
                .any(|variant| contains_phrase(&tokens, variant))
            {
                expansions.push(entry.canonical_phrase.clone());
            }
        }

        ExpandedQuery { tokens, expansions }
    }
}

/// Query tokens plus the canonical phrases they expanded to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpandedQuery {
    tokens: Vec<String>,
    expansions: Vec<Phrase>,
}

impl ExpandedQuery {
    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    pub fn expansions(&self) -> &[Phrase] {
        &self.expansions
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Phrase match against the original tokens or any single expansion.
    ///
    /// A phrase never spans two segments.
    pub fn contains(&self, phrase: &[String]) -> bool {
        contains_phrase(&self.tokens, phrase)
            || self
                .expansions
                .iter()
                .any(|expansion| contains_phrase(expansion, phrase))
    }

    /// Canonical expansions joined back into text, for traces
    pub fn expansion_labels(&self) -> Vec<String> {
        self.expansions.iter().map(|p| p.join(" ")).collect()
    }
}
