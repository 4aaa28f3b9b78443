pub mod cache;
pub mod config;
pub mod error;
pub mod filters;
pub mod history;
pub mod logging;
pub mod persist;
pub mod query;
pub mod source;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumString};

pub use cache::ResultCache;
pub use config::EngineConfig;
pub use error::{Result, SearchError};
pub use filters::{ActiveFilter, FilterField, FilterSet, FilterValue, SortField, SortOrder, SortSpec};
pub use history::{RecentSearch, SavedSearch};
pub use query::engine::QueryEngine;
pub use query::page::Page;
pub use source::{DataSourceError, JobSource, QueryHints};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, AsRefStr, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum JobType {
    FullTime,
    PartTime,
    Contract,
    Internship,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, AsRefStr, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ExperienceLevel {
    Entry,
    Mid,
    Senior,
    Executive,
}

/// A job listing as supplied by the data source. Read-only to the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    pub id: i64,
    pub title: String,
    pub company: String,
    pub location: String,
    pub salary_min: u32,
    pub salary_max: u32,
    pub job_type: JobType,
    pub experience_level: ExperienceLevel,
    pub posted_at: DateTime<Utc>,
    pub remote: bool,
    pub skills: Vec<String>,
    pub description: String,
}
