//! Error types for index construction and query evaluation.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SearchError {
    /// Two documents projected into the same index share an id.
    #[error("duplicate document id in {kind} index: {id}")]
    IndexBuild { kind: &'static str, id: String },

    /// No snapshot has been published yet.
    #[error("index not ready: no catalog snapshot has been built")]
    IndexNotReady,

    /// `from` is negative or `size` is not positive.
    #[error("invalid pagination: from={from}, size={size}")]
    InvalidPagination { from: i64, size: i64 },

    #[error("invalid analyzer: {message}")]
    InvalidAnalyzer { message: String },
}

pub type Result<T> = std::result::Result<T, SearchError>;
