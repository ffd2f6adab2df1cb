// src/models/mod.rs

//! Domain models for the linksweep application.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod cursor;
mod github;
mod link;
mod repo;
mod state;

// Re-export all public types
pub use cursor::{SearchCursor, SearchOptions};
pub use github::{GhOwner, GhRepo, GhUser, IssueRef, RateLimits, RateWindow, SearchPage};
pub use link::LinkOccurrence;
pub use repo::{RepoRecord, RepoState};
pub use state::CrawlJobState;

/// A repository joined with every link occurrence found in it.
///
/// DTO used for issue creation; mirrors what the store's join query returns.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct RepoWithLinks {
    pub repo: RepoRecord,
    pub links: Vec<LinkOccurrence>,
}
