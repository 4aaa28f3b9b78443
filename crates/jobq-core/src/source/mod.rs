//! Pluggable candidate-listing data source.
pub mod postgres;

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::time::timeout;

use crate::filters::FilterSet;
use crate::Listing;

#[derive(Debug, Error)]
pub enum DataSourceError {
    #[error("failed to get postgres connection: {0}")]
    Pool(#[from] deadpool_postgres::PoolError),
    #[error("postgres error: {0}")]
    Postgres(#[from] tokio_postgres::Error),
    #[error("failed to map listing row: {0}")]
    Mapping(String),
    #[error("candidate fetch timed out after {0:?}")]
    Timeout(Duration),
    #[error("data source unavailable: {0}")]
    Unavailable(String),
}

/// Raw query text a source MAY use for server-side pre-filtering. The
/// engine re-applies the full filter predicate regardless, so a source
/// is free to ignore these entirely.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryHints {
    pub keywords: Option<String>,
    pub location: Option<String>,
}

impl QueryHints {
    pub fn from_filters(filters: &FilterSet) -> Self {
        let non_empty = |text: &str| {
            let trimmed = text.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        };

        Self {
            keywords: non_empty(&filters.keywords),
            location: non_empty(&filters.location),
        }
    }
}

#[async_trait]
pub trait JobSource: Send + Sync {
    /// Fetches the ordered candidate set. A failure here is distinct
    /// from zero results.
    async fn fetch_candidates(&self, hints: &QueryHints) -> Result<Vec<Listing>, DataSourceError>;

    /// Cheap liveness probe for readiness checks.
    async fn healthcheck(&self) -> Result<(), DataSourceError> {
        Ok(())
    }
}

/// Bounds the fetch; a timeout surfaces as [`DataSourceError::Timeout`].
pub async fn fetch_with_timeout(
    source: &dyn JobSource,
    hints: &QueryHints,
    limit: Duration,
) -> Result<Vec<Listing>, DataSourceError> {
    timeout(limit, source.fetch_candidates(hints))
        .await
        .map_err(|_| DataSourceError::Timeout(limit))?
}

/// Static candidate set, used by tests and the seed-file demo mode.
/// Ignores hints entirely, which also exercises the engine-side
/// re-filtering guarantee.
#[derive(Debug, Default, Clone)]
pub struct InMemorySource {
    listings: Vec<Listing>,
}

impl InMemorySource {
    pub fn new(listings: Vec<Listing>) -> Self {
        Self { listings }
    }
}

#[async_trait]
impl JobSource for InMemorySource {
    async fn fetch_candidates(&self, _hints: &QueryHints) -> Result<Vec<Listing>, DataSourceError> {
        Ok(self.listings.clone())
    }
}
