//! Lexical normalization: raw answer text to a stemmed term-frequency vector.
//!
//! Text is lower-cased, split into maximal runs of ASCII letters, cleaned of
//! common abbreviations and filler phrases, then stemmed with the English
//! Snowball (Porter2) algorithm. Placeholder answers such as "N/A" and
//! anything that is not free text carry no signal and produce an empty vector.

use std::collections::btree_map;
use std::collections::BTreeMap;

use rust_stemmers::{Algorithm, Stemmer};
use thiserror::Error;
use tracing::warn;

use crate::models::AnswerValue;

const PLACEHOLDERS: &[&str] = &["n/a", "na", "n.a", "n a", "none", "nothing", "no"];

const ABBREVIATIONS: &[(&str, &[&str])] = &[
    ("ppt", &["powerpoint"]),
    ("pdfs", &["pdf", "files"]),
    ("pharm", &["pharmacology"]),
    ("rx", &["prescription"]),
];

const FILLER_PHRASES: &[&[&str]] = &[
    &["in", "my", "opinion"],
    &["i", "feel", "that"],
    &["i", "think"],
    &["some", "of"],
    &["a", "bit"],
    &["n", "a"],
    &["just"],
];

/// Sparse stem -> count mapping. Keys iterate in sorted order, which keeps
/// every computation over a vector independent of insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TermFrequencyVector {
    terms: BTreeMap<String, u32>,
}

impl TermFrequencyVector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn get(&self, term: &str) -> u32 {
        self.terms.get(term).copied().unwrap_or(0)
    }

    pub fn insert(&mut self, term: impl Into<String>) {
        *self.terms.entry(term.into()).or_insert(0) += 1;
    }

    /// Adds every count of `other` into this vector.
    pub fn absorb(&mut self, other: &TermFrequencyVector) {
        for (term, count) in &other.terms {
            *self.terms.entry(term.clone()).or_insert(0) += count;
        }
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, u32> {
        self.terms.iter()
    }

    /// Sum of squared counts.
    pub fn magnitude_squared(&self) -> f64 {
        self.terms
            .values()
            .map(|&count| f64::from(count) * f64::from(count))
            .sum()
    }

    /// The `n` heaviest terms; equal counts fall back to lexicographic order.
    pub fn top_terms(&self, n: usize) -> Vec<String> {
        let mut ranked: Vec<(&String, u32)> =
            self.terms.iter().map(|(term, &count)| (term, count)).collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        ranked
            .into_iter()
            .take(n)
            .map(|(term, _)| term.clone())
            .collect()
    }
}

impl<S: Into<String>> FromIterator<S> for TermFrequencyVector {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut vector = TermFrequencyVector::new();
        for term in iter {
            vector.insert(term);
        }
        vector
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("cannot stem token `{token}`: {reason}")]
pub struct StemError {
    pub token: String,
    pub reason: &'static str,
}

/// A deterministic, locale-independent reduction of a word to its stem.
pub trait Stem {
    fn stem(&self, token: &str) -> Result<String, StemError>;
}

pub struct SnowballStemmer {
    inner: Stemmer,
}

impl SnowballStemmer {
    pub fn english() -> Self {
        Self {
            inner: Stemmer::create(Algorithm::English),
        }
    }
}

impl Default for SnowballStemmer {
    fn default() -> Self {
        Self::english()
    }
}

impl Stem for SnowballStemmer {
    fn stem(&self, token: &str) -> Result<String, StemError> {
        if token.is_empty() || !token.bytes().all(|b| b.is_ascii_lowercase()) {
            return Err(StemError {
                token: token.to_string(),
                reason: "expected lower-case ASCII letters",
            });
        }
        let stem = self.inner.stem(token);
        if stem.is_empty() {
            return Err(StemError {
                token: token.to_string(),
                reason: "stem is empty",
            });
        }
        Ok(stem.into_owned())
    }
}

pub struct Normalizer<S = SnowballStemmer> {
    stemmer: S,
}

impl Default for Normalizer<SnowballStemmer> {
    fn default() -> Self {
        Self::new(SnowballStemmer::english())
    }
}

impl<S: Stem> Normalizer<S> {
    pub fn new(stemmer: S) -> Self {
        Self { stemmer }
    }

    pub fn normalize(&self, text: &str) -> TermFrequencyVector {
        if is_placeholder(text) {
            return TermFrequencyVector::new();
        }

        let tokens = strip_fillers(expand_abbreviations(tokenize(text)));
        let mut vector = TermFrequencyVector::new();
        for token in tokens {
            match self.stemmer.stem(&token) {
                Ok(stem) => vector.insert(stem),
                Err(err) => warn!(error = %err, "skipping token"),
            }
        }
        vector
    }

    /// Likert values are not text and carry no lexical signal.
    pub fn normalize_answer(&self, value: &AnswerValue) -> TermFrequencyVector {
        match value {
            AnswerValue::Text(text) => self.normalize(text),
            AnswerValue::Likert(_) => TermFrequencyVector::new(),
        }
    }
}

pub fn normalize(text: &str) -> TermFrequencyVector {
    Normalizer::default().normalize(text)
}

/// True for blank answers and the usual "nothing to say" fillers.
pub fn is_placeholder(text: &str) -> bool {
    let trimmed = text
        .trim()
        .trim_matches(|c: char| c == '.' || c == '!')
        .trim()
        .to_ascii_lowercase();
    trimmed.is_empty() || PLACEHOLDERS.contains(&trimmed.as_str())
}

fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_ascii_alphabetic())
        .filter(|token| !token.is_empty())
        .map(|token| token.to_ascii_lowercase())
        .collect()
}

fn expand_abbreviations(tokens: Vec<String>) -> Vec<String> {
    let mut expanded = Vec::with_capacity(tokens.len());
    for token in tokens {
        match ABBREVIATIONS.iter().find(|(abbr, _)| *abbr == token) {
            Some((_, words)) => expanded.extend(words.iter().map(|word| word.to_string())),
            None => expanded.push(token),
        }
    }
    expanded
}

fn strip_fillers(tokens: Vec<String>) -> Vec<String> {
    let mut kept = Vec::with_capacity(tokens.len());
    let mut index = 0;
    while index < tokens.len() {
        let filler = FILLER_PHRASES.iter().find(|phrase| {
            tokens.len() - index >= phrase.len()
                && phrase
                    .iter()
                    .zip(&tokens[index..])
                    .all(|(word, token)| *word == token.as_str())
        });
        match filler {
            Some(phrase) => index += phrase.len(),
            None => {
                kept.push(tokens[index].clone());
                index += 1;
            }
        }
    }
    kept
}
