//! Query evaluation: field-scoped AND/OR matching, term-frequency scoring,
//! pagination and hit hydration.

use crate::document::{Document, Field, HitFields};
use crate::error::{Result, SearchError};
use crate::index::{InvertedIndex, Posting};
use crate::DocId;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;

pub const DEFAULT_PAGE_SIZE: usize = 100;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operator {
    /// Every query term must occur in the field.
    #[default]
    And,
    /// Any query term occurring in the field is enough.
    Or,
}

impl Operator {
    pub fn parse(s: &str) -> Option<Operator> {
        match s.trim().to_ascii_lowercase().as_str() {
            "and" => Some(Operator::And),
            "or" => Some(Operator::Or),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub from: usize,
    pub size: usize,
}

impl Default for Page {
    fn default() -> Self {
        Page { from: 0, size: DEFAULT_PAGE_SIZE }
    }
}

impl Page {
    pub fn new(from: i64, size: i64) -> Result<Page> {
        if from < 0 || size <= 0 {
            return Err(SearchError::InvalidPagination { from, size });
        }
        Ok(Page { from: from as usize, size: size as usize })
    }
}

#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub text: String,
    pub fields: Vec<Field>,
    pub operator: Operator,
    pub page: Page,
}

impl SearchRequest {
    /// Conjunctive match on the merged `document` field, first page.
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into(), fields: vec![Field::Document], operator: Operator::And, page: Page::default() }
    }

    pub fn fields(mut self, fields: impl IntoIterator<Item = Field>) -> Self {
        self.fields = fields.into_iter().collect();
        self
    }

    pub fn operator(mut self, operator: Operator) -> Self {
        self.operator = operator;
        self
    }

    pub fn page(mut self, page: Page) -> Self {
        self.page = page;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredHit {
    pub id: String,
    pub score: f32,
    pub fields: HitFields,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub hits: Vec<ScoredHit>,
    /// Number of matching documents before pagination.
    pub total: usize,
}

/// Evaluate `request` against `index`.
///
/// The query is tokenized with the index's analyzer. Each scoped field is
/// matched independently and a document matches when any scoped field does;
/// its score is the summed frequency of the matched query terms over its
/// matching fields. Hits are ordered by score descending, then id ascending.
pub fn search<D: Document>(index: &InvertedIndex<D>, request: &SearchRequest) -> SearchResult {
    if request.text.trim().is_empty() {
        return SearchResult::default();
    }
    let analyzer = index.analyzer();
    let terms = analyzer.terms(&request.text);
    // Fields a document type does not declare have no postings, so scoping
    // to them matches nothing.
    let mut fields: Vec<Field> = request.fields.clone();
    fields.sort();
    fields.dedup();
    if terms.is_empty() || fields.is_empty() {
        return SearchResult::default();
    }
    tracing::debug!(kind = D::KIND, num_terms = terms.len(), ?fields, operator = ?request.operator, "evaluating query");

    // (doc, field) -> (number of query terms present, summed tf)
    let mut matches: HashMap<(DocId, Field), (usize, u32)> = HashMap::new();
    for term in &terms {
        let mut term_tf: HashMap<(DocId, Field), u32> = HashMap::new();
        let mut record = |postings: &[Posting]| {
            for p in postings.iter().filter(|p| fields.contains(&p.field)) {
                *term_tf.entry((p.doc_id, p.field)).or_insert(0) += p.tf;
            }
        };
        if analyzer.expands_prefixes() {
            for (_, postings) in index.postings_with_prefix(term) {
                record(postings);
            }
        } else {
            record(index.postings(term));
        }
        for (key, tf) in term_tf {
            let entry = matches.entry(key).or_insert((0, 0));
            entry.0 += 1;
            entry.1 += tf;
        }
    }

    let required = match request.operator {
        Operator::And => terms.len(),
        Operator::Or => 1,
    };
    let mut scores: HashMap<DocId, f32> = HashMap::new();
    for ((doc_id, _field), (present, tf)) in matches {
        if present >= required {
            *scores.entry(doc_id).or_insert(0.0) += tf as f32;
        }
    }

    let mut ranked: Vec<(&D, f32)> = scores
        .into_iter()
        .filter_map(|(doc_id, score)| index.document(doc_id).map(|doc| (doc, score)))
        .collect();
    ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal).then_with(|| a.0.id().cmp(b.0.id())));
    let total = ranked.len();

    let hits = ranked
        .into_iter()
        .skip(request.page.from)
        .take(request.page.size)
        .map(|(doc, score)| ScoredHit { id: doc.id().to_string(), score, fields: doc.hit_fields() })
        .collect();
    SearchResult { hits, total }
}
