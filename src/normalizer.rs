//! Query normalization and tokenization.
//!
//! Normalization lowercases the query, strips conversational filler ("can you", "please",
//! "i was wondering", a leading "so"), collapses whitespace and trims punctuation at both ends.
//! It is pure and idempotent: `normalize(normalize(q)) == normalize(q)`.

use lazy_static::lazy_static;
use regex::Regex;

/// Filler phrases stripped when the vocabulary does not override them
pub const DEFAULT_FILLER_PHRASES: &[&str] = &[
    "i was wondering if",
    "i was wondering",
    "can you please",
    "could you please",
    "can you",
    "could you",
    "would you",
    "please",
    "just",
    "quickly",
];

lazy_static! {
    static ref RE_WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
    // Every leading "so" in one go; "so-called" is a word, not filler.
    static ref RE_LEADING_SO: Regex = Regex::new(r"^(?:so(?:[\s,.;:!?]+|$))+").unwrap();
}

/// Strips filler and canonicalizes case, whitespace and boundary punctuation
#[derive(Debug, Clone)]
pub struct QueryNormalizer {
    filler: Option<Regex>,
}

impl Default for QueryNormalizer {
    fn default() -> Self {
        // The default list is literal text and always compiles.
        Self::new(DEFAULT_FILLER_PHRASES).unwrap_or(Self { filler: None })
    }
}

impl QueryNormalizer {
    /// Build a normalizer for the given filler phrases.
    ///
    /// Phrases match on word boundaries only, longest first, so "can you please" is removed
    /// whole rather than leaving a stray "please" behind.
    pub fn new<S: AsRef<str>>(phrases: &[S]) -> Result<Self, regex::Error> {
        let mut alternatives: Vec<String> = phrases
            .iter()
            .map(|p| p.as_ref().trim().to_lowercase())
            .filter(|p| !p.is_empty())
            .collect();
        alternatives.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        alternatives.dedup();

        if alternatives.is_empty() {
            return Ok(Self { filler: None });
        }

        let pattern = alternatives
            .iter()
            .map(|p| {
                p.split_whitespace()
                    .map(regex::escape)
                    .collect::<Vec<_>>()
                    .join(r"\s+")
            })
            .collect::<Vec<_>>()
            .join("|");

        let filler = Regex::new(&format!(r"\b(?:{})\b", pattern))?;
        Ok(Self {
            filler: Some(filler),
        })
    }

    /// Normalize a raw query. May return an empty string.
    pub fn normalize(&self, raw: &str) -> String {
        let mut current = self.pass(raw);
        // Stripping one filler phrase can join the halves of another ("can can you you"),
        // so repeat until nothing changes. A pass over lowercased text either leaves it
        // untouched or makes it strictly shorter, so the loop terminates.
        loop {
            let next = self.pass(&current);
            if next == current {
                return current;
            }
            current = next;
        }
    }

    fn pass(&self, text: &str) -> String {
        let lower = text.to_lowercase();
        let collapsed = RE_WHITESPACE.replace_all(&lower, " ");

        let stripped = match &self.filler {
            Some(re) => re.replace_all(&collapsed, " ").into_owned(),
            None => collapsed.into_owned(),
        };

        let trimmed = trim_boundary(&stripped);
        let without_so = RE_LEADING_SO.replace(trimmed, "");
        let collapsed = RE_WHITESPACE.replace_all(&without_so, " ");

        trim_boundary(&collapsed).to_string()
    }
}

/// Drop every non-alphanumeric character at either end of the text
fn trim_boundary(text: &str) -> &str {
    text.trim_matches(|c: char| !c.is_alphanumeric())
}

/// Split text into lowercase alphanumeric tokens
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .collect()
}
