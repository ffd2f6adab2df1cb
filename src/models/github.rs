// src/models/github.rs

//! Deserialization targets for the GitHub REST API.
//!
//! Every field the remote may omit is optional; the ingestor defaults
//! missing values to zero/empty when building a [`super::RepoRecord`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Repository owner as returned by the search API.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GhOwner {
    pub login: Option<String>,
}

/// Repository item as returned by the search API.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GhRepo {
    pub name: Option<String>,
    pub owner: Option<GhOwner>,
    pub url: Option<String>,
    pub language: Option<String>,
    pub stargazers_count: Option<i64>,
    pub forks_count: Option<i64>,
    pub size: Option<i64>,
    pub pushed_at: Option<DateTime<Utc>>,
}

/// User as returned by the user search and profile endpoints.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GhUser {
    pub id: Option<i64>,
    pub login: Option<String>,
    pub url: Option<String>,
    pub avatar_url: Option<String>,
    pub name: Option<String>,
}

/// One window of the rate-limit report.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct RateWindow {
    pub limit: i64,
    pub remaining: i64,
    /// Unix epoch seconds at which the window resets
    pub reset: i64,
}

/// Rate limits for the API categories this application consumes.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct RateLimits {
    pub core: RateWindow,
    pub search: RateWindow,
}

/// One page of search results plus the API-provided next-page cursor.
#[derive(Debug, Clone)]
pub struct SearchPage<T> {
    pub items: Vec<T>,
    /// `None` when the API signals no further page
    pub next_page: Option<u32>,
}

/// Reference to a created issue.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IssueRef {
    pub url: Option<String>,
    pub html_url: Option<String>,
}
