// src/models/state.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Singleton progress marker updated at most once per scheduler run.
///
/// Observability only: eligibility for crawling is decided solely by
/// repository state, never by this record.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CrawlJobState {
    pub name: String,
    pub last_repo_id: Option<i64>,
    pub last_run_at: Option<DateTime<Utc>>,
}

impl CrawlJobState {
    /// Well-known name of the singleton record.
    pub const JOB_NAME: &'static str = "crawl_job";
}
