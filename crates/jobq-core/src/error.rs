use thiserror::Error;

use crate::source::DataSourceError;

#[derive(Debug, Error)]
pub enum SearchError {
    /// Malformed filter value. The offending mutation is rejected and
    /// prior state is left untouched.
    #[error("invalid filter value: {0}")]
    Validation(String),

    /// Candidate fetch failed or timed out. Propagates uncached from
    /// `execute()`; the caller owns messaging and retry.
    #[error("data source error: {0}")]
    DataSource(#[from] DataSourceError),

    /// Load/delete of a saved search id that doesn't exist.
    #[error("saved search not found: {0}")]
    NotFound(u64),
}

pub type Result<T> = std::result::Result<T, SearchError>;
