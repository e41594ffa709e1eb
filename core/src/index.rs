use crate::document::{Document, Field};
use crate::error::{Result, SearchError};
use crate::tokenizer::Analyzer;
use crate::DocId;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Posting {
    pub doc_id: DocId,
    pub field: Field,
    /// Occurrences of the term in this document field.
    pub tf: u32,
}

/// Immutable term → postings mapping over one document type.
#[derive(Debug)]
pub struct InvertedIndex<D> {
    analyzer: Analyzer,
    terms: BTreeMap<String, Vec<Posting>>, // postings sorted by (doc_id, field)
    docs: Vec<D>,
    ids: HashMap<String, DocId>,
}

impl<D: Document> InvertedIndex<D> {
    /// Index every document in one pass.
    pub fn build(analyzer: Analyzer, documents: impl IntoIterator<Item = D>) -> Result<Self> {
        let mut builder = IndexBuilder::new(analyzer);
        for doc in documents {
            builder.add(doc)?;
        }
        Ok(builder.build())
    }

    pub fn analyzer(&self) -> Analyzer {
        self.analyzer
    }

    pub fn num_docs(&self) -> usize {
        self.docs.len()
    }

    pub fn num_terms(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    pub fn postings(&self, term: &str) -> &[Posting] {
        self.terms.get(term).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Every (term, postings) pair whose term starts with `prefix`, in term order.
    pub fn postings_with_prefix<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = (&'a str, &'a [Posting])> + 'a {
        self.terms
            .range::<str, _>((Bound::Included(prefix), Bound::Unbounded))
            .take_while(move |(term, _)| term.starts_with(prefix))
            .map(|(term, postings)| (term.as_str(), postings.as_slice()))
    }

    pub fn document(&self, doc_id: DocId) -> Option<&D> {
        self.docs.get(doc_id as usize)
    }

    pub fn get(&self, id: &str) -> Option<&D> {
        self.ids.get(id).and_then(|&doc_id| self.document(doc_id))
    }

    pub fn documents(&self) -> &[D] {
        &self.docs
    }
}

/// Accumulates postings; [`IndexBuilder::build`] freezes them into an [`InvertedIndex`].
pub struct IndexBuilder<D> {
    analyzer: Analyzer,
    terms: HashMap<String, Vec<Posting>>,
    docs: Vec<D>,
    ids: HashMap<String, DocId>,
}

impl<D: Document> IndexBuilder<D> {
    pub fn new(analyzer: Analyzer) -> Self {
        Self { analyzer, terms: HashMap::new(), docs: Vec::new(), ids: HashMap::new() }
    }

    /// Tokenize each declared field of `doc` and record its postings.
    pub fn add(&mut self, doc: D) -> Result<DocId> {
        if self.ids.contains_key(doc.id()) {
            return Err(SearchError::IndexBuild { kind: D::KIND, id: doc.id().to_string() });
        }
        let doc_id = self.docs.len() as DocId;
        for &field in D::FIELDS {
            let text = doc.text(field);
            let mut tf_counts: HashMap<String, u32> = HashMap::new();
            for (term, _pos) in self.analyzer.tokenize(&text) {
                *tf_counts.entry(term).or_insert(0) += 1;
            }
            for (term, tf) in tf_counts {
                self.terms.entry(term).or_default().push(Posting { doc_id, field, tf });
            }
        }
        self.ids.insert(doc.id().to_string(), doc_id);
        self.docs.push(doc);
        Ok(doc_id)
    }

    pub fn build(self) -> InvertedIndex<D> {
        let terms: BTreeMap<String, Vec<Posting>> = self
            .terms
            .into_iter()
            .map(|(term, mut plist)| {
                plist.sort_by_key(|p| (p.doc_id, p.field));
                (term, plist)
            })
            .collect();
        tracing::info!(kind = D::KIND, num_docs = self.docs.len(), num_terms = terms.len(), "built inverted index");
        InvertedIndex { analyzer: self.analyzer, terms, docs: self.docs, ids: self.ids }
    }
}
