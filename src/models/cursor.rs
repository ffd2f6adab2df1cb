// src/models/cursor.rs

use serde::{Deserialize, Serialize};

/// Sort/order/page-size options applied to a repository search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchOptions {
    #[serde(default)]
    pub sort: String,
    #[serde(default)]
    pub order: String,
    #[serde(default = "default_per_page")]
    pub per_page: u32,
}

fn default_per_page() -> u32 {
    50
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            sort: "updated".to_string(),
            order: "desc".to_string(),
            per_page: default_per_page(),
        }
    }
}

/// Persisted pagination position for a saved repository search.
///
/// Saved after every fetched page so a long search survives a restart;
/// read at the start of a run to resume from `current_page`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchCursor {
    pub name: String,
    pub query: String,
    #[serde(default)]
    pub options: SearchOptions,
    pub start_page: u32,
    pub current_page: u32,
    pub pages_to_process: u32,
}

impl SearchCursor {
    /// Create a fresh cursor starting at `start_page`.
    pub fn new(
        name: impl Into<String>,
        query: impl Into<String>,
        options: SearchOptions,
        start_page: u32,
        pages_to_process: u32,
    ) -> Self {
        Self {
            name: name.into(),
            query: query.into(),
            options,
            start_page,
            current_page: start_page,
            pages_to_process,
        }
    }

    /// Reject cursors the search cannot run with.
    pub fn validate(&self) -> crate::error::Result<()> {
        let mut missing = Vec::new();
        if self.query.trim().is_empty() {
            missing.push("query");
        }
        if self.pages_to_process == 0 {
            missing.push("pages_to_process");
        }
        if missing.is_empty() {
            Ok(())
        } else {
            Err(crate::error::AppError::validation(format!(
                "missing required fields: {}",
                missing.join(", ")
            )))
        }
    }
}
