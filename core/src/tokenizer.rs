use crate::error::{Result, SearchError};
use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use std::collections::HashSet;

lazy_static! {
    static ref LETTERS: Regex = Regex::new(r"(?u)\p{L}+").expect("valid regex");
}

pub const DEFAULT_MIN_GRAM: usize = 1;
pub const DEFAULT_MAX_GRAM: usize = 3;

/// Text analysis pipeline shared by an index and every query run against it.
///
/// Both kinds split text into maximal runs of letters and lowercase each run.
/// `Ngram` then replaces every run by all of its contiguous substrings whose
/// length (in characters) lies in `min..=max`; runs shorter than `min` are
/// kept whole. `Word` keeps the runs as they are.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Analyzer {
    Ngram { min: usize, max: usize },
    Word,
}

impl Default for Analyzer {
    fn default() -> Self {
        Analyzer::Ngram { min: DEFAULT_MIN_GRAM, max: DEFAULT_MAX_GRAM }
    }
}

impl Analyzer {
    pub fn ngram(min: usize, max: usize) -> Result<Self> {
        if min == 0 {
            return Err(SearchError::InvalidAnalyzer { message: "min gram must be at least 1".into() });
        }
        if min > max {
            return Err(SearchError::InvalidAnalyzer { message: format!("min gram {min} exceeds max gram {max}") });
        }
        Ok(Analyzer::Ngram { min, max })
    }

    pub fn word() -> Self {
        Analyzer::Word
    }

    /// Build an analyzer from a kind name (`ngram` or `word`) and gram bounds.
    /// The bounds are ignored for `word`.
    pub fn from_parts(kind: &str, min: usize, max: usize) -> Result<Self> {
        match kind.trim().to_ascii_lowercase().as_str() {
            "ngram" | "n-gram" => Analyzer::ngram(min, max),
            "word" => Ok(Analyzer::Word),
            other => Err(SearchError::InvalidAnalyzer { message: format!("unknown analyzer kind: {other}") }),
        }
    }

    /// Whether a query term should also match every index term it prefixes.
    ///
    /// N-gram indices already contain every short substring, so exact lookup
    /// is enough there. Word indices need prefix expansion for `account` to
    /// find `accounts`.
    pub fn expands_prefixes(&self) -> bool {
        matches!(self, Analyzer::Word)
    }

    /// Tokenize text into (term, position); position is the index of the
    /// letter run the term came from.
    pub fn tokenize(&self, text: &str) -> Vec<(String, usize)> {
        let mut tokens = Vec::new();
        for (pos, mat) in LETTERS.find_iter(text).enumerate() {
            let segment = lowercase_letters(mat.as_str());
            match *self {
                Analyzer::Word => tokens.push((segment, pos)),
                Analyzer::Ngram { min, max } => push_ngrams(&segment, pos, min, max, &mut tokens),
            }
        }
        tokens
    }

    /// Distinct terms of `text` in order of first occurrence.
    pub fn terms(&self, text: &str) -> Vec<String> {
        let mut seen = HashSet::new();
        self.tokenize(text)
            .into_iter()
            .filter_map(|(term, _)| if seen.insert(term.clone()) { Some(term) } else { None })
            .collect()
    }
}

/// Per-character lowercasing that only ever yields letters. Full-string
/// lowercasing may expand a letter into a letter plus a combining mark
/// (`İ` becomes `i\u{307}`), which would leak marks into the grams.
fn lowercase_letters(segment: &str) -> String {
    segment.chars().flat_map(char::to_lowercase).filter(|c| c.is_alphabetic()).collect()
}

fn push_ngrams(segment: &str, pos: usize, min: usize, max: usize, out: &mut Vec<(String, usize)>) {
    let min = min.max(1);
    let chars: Vec<char> = segment.chars().collect();
    if chars.len() < min {
        out.push((segment.to_string(), pos));
        return;
    }
    for n in min..=max.min(chars.len()) {
        for window in chars.windows(n) {
            out.push((window.iter().collect(), pos));
        }
    }
}

/// Tokenize with the default 1-3 gram analyzer.
pub fn tokenize(text: &str) -> Vec<(String, usize)> {
    Analyzer::default().tokenize(text)
}
