// src/models/link.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single short-link occurrence found during a crawl.
///
/// Immutable once created; many-to-one with [`super::RepoRecord`].
/// `expanded_url` is never empty: it holds either the resolved absolute URL
/// or an `ERROR: …` marker when resolution failed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkOccurrence {
    pub id: i64,
    pub repo_id: i64,
    pub url: String,
    pub expanded_url: String,
    pub file: String,
    pub line_number: u32,
    pub github_url: String,
    pub path: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LinkOccurrence {
    /// Marker recorded in `expanded_url` when resolution fails.
    pub fn error_marker(message: impl std::fmt::Display) -> String {
        format!("ERROR: {message}")
    }

    /// Whether this occurrence carries a resolution error marker.
    pub fn is_resolution_error(&self) -> bool {
        self.expanded_url.starts_with("ERROR: ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_marker_format() {
        let marker = LinkOccurrence::error_marker("unexpected status code 404");
        assert_eq!(marker, "ERROR: unexpected status code 404");
    }
}
