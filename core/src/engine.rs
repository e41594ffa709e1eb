//! The served search state: one immutable [`Snapshot`] behind a swappable slot.
//!
//! Readers clone the `Arc<Snapshot>` and release the lock before evaluating a
//! query, so a rebuild that publishes a new snapshot never changes what an
//! in-flight query sees. A failed rebuild leaves the slot untouched.

use crate::catalog::{Catalog, Dataset, Table};
use crate::document::{project_columns, project_tables, ColumnDocument, TableDocument};
use crate::error::{Result, SearchError};
use crate::index::InvertedIndex;
use crate::query::{search, Page, SearchRequest, SearchResult};
use crate::tokenizer::Analyzer;
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::Arc;
use time::format_description::well_known::Rfc3339;

#[derive(Debug, Clone, Serialize)]
pub struct SnapshotStats {
    pub version: u64,
    pub built_at: String,
    pub analyzer: Analyzer,
    pub datasets: usize,
    pub tables: usize,
    pub columns: usize,
    pub table_terms: usize,
    pub column_terms: usize,
}

/// A catalog together with the two indices built from it.
#[derive(Debug)]
pub struct Snapshot {
    version: u64,
    built_at: String,
    catalog: Catalog,
    tables: InvertedIndex<TableDocument>,
    columns: InvertedIndex<ColumnDocument>,
}

impl Snapshot {
    /// Assign ids, project documents and build both indices concurrently.
    ///
    /// The version stays 0 until [`SearchEngine::rebuild`] publishes the
    /// snapshot.
    pub fn build(analyzer: Analyzer, datasets: Vec<Dataset>) -> Result<Snapshot> {
        let catalog = Catalog::new(datasets);
        let (tables, columns) = rayon::join(
            || InvertedIndex::build(analyzer, project_tables(&catalog)),
            || InvertedIndex::build(analyzer, project_columns(&catalog)),
        );
        let built_at = time::OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_default();
        Ok(Snapshot { version: 0, built_at, catalog, tables: tables?, columns: columns? })
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn tables_index(&self) -> &InvertedIndex<TableDocument> {
        &self.tables
    }

    pub fn columns_index(&self) -> &InvertedIndex<ColumnDocument> {
        &self.columns
    }

    pub fn search_tables(&self, request: &SearchRequest) -> SearchResult {
        search(&self.tables, request)
    }

    pub fn search_columns(&self, request: &SearchRequest) -> SearchResult {
        search(&self.columns, request)
    }

    pub fn stats(&self) -> SnapshotStats {
        SnapshotStats {
            version: self.version,
            built_at: self.built_at.clone(),
            analyzer: self.tables.analyzer(),
            datasets: self.catalog.datasets().len(),
            tables: self.tables.num_docs(),
            columns: self.columns.num_docs(),
            table_terms: self.tables.num_terms(),
            column_terms: self.columns.num_terms(),
        }
    }
}

pub struct SearchEngine {
    analyzer: Analyzer,
    current: RwLock<Option<Arc<Snapshot>>>,
}

impl SearchEngine {
    /// A new engine serves nothing until the first successful [`rebuild`](Self::rebuild).
    pub fn new(analyzer: Analyzer) -> Self {
        Self { analyzer, current: RwLock::new(None) }
    }

    pub fn analyzer(&self) -> Analyzer {
        self.analyzer
    }

    pub fn is_ready(&self) -> bool {
        self.current.read().is_some()
    }

    /// Build a new snapshot from `datasets` and publish it.
    pub fn rebuild(&self, datasets: Vec<Dataset>) -> Result<Arc<Snapshot>> {
        let mut snapshot = Snapshot::build(self.analyzer, datasets).map_err(|e| {
            tracing::warn!(error = %e, "index rebuild failed, keeping the served snapshot");
            e
        })?;
        let mut current = self.current.write();
        snapshot.version = current.as_ref().map_or(1, |prev| prev.version + 1);
        let snapshot = Arc::new(snapshot);
        *current = Some(snapshot.clone());
        drop(current);
        tracing::info!(
            version = snapshot.version,
            tables = snapshot.tables.num_docs(),
            columns = snapshot.columns.num_docs(),
            "published catalog snapshot"
        );
        Ok(snapshot)
    }

    /// The currently served snapshot.
    pub fn snapshot(&self) -> Result<Arc<Snapshot>> {
        self.current.read().clone().ok_or(SearchError::IndexNotReady)
    }

    pub fn search_tables(&self, query: &str, from: i64, size: i64) -> Result<SearchResult> {
        let page = Page::new(from, size)?;
        self.search_tables_with(&SearchRequest::new(query).page(page))
    }

    pub fn search_columns(&self, query: &str, from: i64, size: i64) -> Result<SearchResult> {
        let page = Page::new(from, size)?;
        self.search_columns_with(&SearchRequest::new(query).page(page))
    }

    pub fn search_tables_with(&self, request: &SearchRequest) -> Result<SearchResult> {
        Ok(self.snapshot()?.search_tables(request))
    }

    pub fn search_columns_with(&self, request: &SearchRequest) -> Result<SearchResult> {
        Ok(self.snapshot()?.search_columns(request))
    }

    pub fn dataset_names(&self) -> Result<Vec<String>> {
        Ok(self.snapshot()?.catalog.dataset_names())
    }

    pub fn table_names(&self, dataset: &str) -> Result<Option<Vec<String>>> {
        Ok(self.snapshot()?.catalog.table_names(dataset))
    }

    pub fn table(&self, dataset: &str, table: &str) -> Result<Option<Table>> {
        Ok(self.snapshot()?.catalog.table(dataset, table).cloned())
    }
}

impl Default for SearchEngine {
    fn default() -> Self {
        SearchEngine::new(Analyzer::default())
    }
}
