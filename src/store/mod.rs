// src/store/mod.rs

//! Store contracts for repository, link, cursor, and job-state persistence.
//!
//! The persistent store is the single source of truth and the only
//! cross-process coordination point. Schema and SQL live behind these
//! traits; [`MemoryStore`] backs tests and the CLI.

pub mod memory;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{CrawlJobState, LinkOccurrence, RepoRecord, SearchCursor};

// Re-export for convenience
pub use memory::MemoryStore;

/// Repository record persistence.
///
/// `(author, name)` is unique; `create` rejects duplicates. `update` fails
/// if the record was never loaded from the store — no blind upserts.
#[async_trait]
pub trait RepoStore: Send + Sync {
    /// Insert a new record, assigning its id. Fails on duplicate author/name.
    async fn create_repo(&self, repo: &RepoRecord) -> Result<RepoRecord>;

    /// Update an existing record. Fails if the id is unknown.
    async fn update_repo(&self, repo: &RepoRecord) -> Result<()>;

    /// Fetch one record by id.
    async fn get_repo(&self, id: i64) -> Result<RepoRecord>;

    /// Fetch every record, including deleted ones.
    async fn get_all_repos(&self) -> Result<Vec<RepoRecord>>;

    /// Fetch every record currently in state PENDING, in store order.
    async fn get_pending_repos(&self) -> Result<Vec<RepoRecord>>;

    /// Soft-delete a record (state → DELETED).
    async fn delete_repo(&self, id: i64) -> Result<()>;
}

/// Append-only link occurrence persistence.
#[async_trait]
pub trait LinkStore: Send + Sync {
    /// Insert a new occurrence, assigning its id.
    async fn create_link(&self, link: &LinkOccurrence) -> Result<LinkOccurrence>;

    /// Fetch every occurrence belonging to a repository.
    async fn get_links_for_repo(&self, repo_id: i64) -> Result<Vec<LinkOccurrence>>;
}

/// Singleton crawl-job progress record.
#[async_trait]
pub trait JobStateStore: Send + Sync {
    async fn get_job_state(&self) -> Result<CrawlJobState>;
    async fn set_job_state(&self, state: &CrawlJobState) -> Result<()>;
}

/// Saved search cursor persistence, keyed by name.
#[async_trait]
pub trait CursorStore: Send + Sync {
    /// Fetch a cursor by its name.
    async fn get_cursor(&self, name: &str) -> Result<Option<SearchCursor>>;

    /// Insert or update a cursor; conflict on name updates in place.
    async fn save_cursor(&self, cursor: &SearchCursor) -> Result<()>;
}
