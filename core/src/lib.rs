//! In-memory search over a dataset → table → column metadata catalog.
//!
//! A catalog snapshot is projected into one document per table and per
//! column, tokenized with an n-gram (or word) analyzer and indexed into two
//! independent inverted indices. [`SearchEngine`] owns the currently served
//! snapshot and swaps it atomically on rebuild.

pub mod catalog;
pub mod document;
pub mod engine;
pub mod error;
pub mod index;
pub mod loader;
pub mod query;
pub mod tokenizer;

pub use catalog::{Catalog, Column, Dataset, Table, ID_SEPARATOR};
pub use document::{ColumnDocument, Document, Field, HitFields, TableDocument};
pub use engine::{SearchEngine, Snapshot, SnapshotStats};
pub use error::{Result, SearchError};
pub use index::{IndexBuilder, InvertedIndex, Posting};
pub use loader::load_catalog_dir;
pub use query::{Operator, Page, ScoredHit, SearchRequest, SearchResult};
pub use tokenizer::{tokenize, Analyzer};

/// Ordinal of a stored document inside one inverted index.
pub type DocId = u32;
