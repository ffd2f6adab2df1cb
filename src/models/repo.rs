// src/models/repo.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of an ingested repository.
///
/// `Pending → Processing → {Completed, Error, Timeout}`; `Deleted` is only
/// reachable through the external deletion path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RepoState {
    Pending,
    Processing,
    Completed,
    Error,
    Timeout,
    Deleted,
}

impl RepoState {
    /// True for states from which the scheduler takes no further action.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Error | Self::Timeout)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Processing => "PROCESSING",
            Self::Completed => "COMPLETED",
            Self::Error => "ERROR",
            Self::Timeout => "TIMEOUT",
            Self::Deleted => "DELETED",
        }
    }
}

impl std::fmt::Display for RepoState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A GitHub repository ingested for crawling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoRecord {
    pub id: i64,
    pub name: String,
    pub author: String,
    pub state: RepoState,
    pub language: String,
    pub stars: i64,
    pub forks: i64,
    pub size: i64,
    pub last_push: Option<DateTime<Utc>>,
    pub api_url: String,
    pub gh_url: String,
    pub clone_url: String,
    pub error_msg: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RepoRecord {
    /// The unique `author/name` identity of this repository.
    pub fn key(&self) -> String {
        format!("{}/{}", self.author, self.name)
    }
}
