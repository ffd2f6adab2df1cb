// src/config.rs

//! Application configuration structures.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// GitHub API access settings
    #[serde(default)]
    pub github: GithubConfig,

    /// Clone-and-scan behavior settings
    #[serde(default)]
    pub crawler: CrawlerConfig,

    /// Repository search defaults
    #[serde(default)]
    pub search: SearchConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.github.user_agent.trim().is_empty() {
            return Err(AppError::validation("github.user_agent is empty"));
        }
        if self.github.api_base.trim().is_empty() {
            return Err(AppError::validation("github.api_base is empty"));
        }
        if self.github.timeout_secs == 0 {
            return Err(AppError::validation("github.timeout_secs must be > 0"));
        }
        if self.crawler.shortener_domain.trim().is_empty() {
            return Err(AppError::validation("crawler.shortener_domain is empty"));
        }
        if self.crawler.crawl_timeout_secs == 0 {
            return Err(AppError::validation(
                "crawler.crawl_timeout_secs must be > 0",
            ));
        }
        if self.crawler.max_concurrent == 0 {
            return Err(AppError::validation("crawler.max_concurrent must be > 0"));
        }
        if self.crawler.max_file_size_mb == 0 {
            return Err(AppError::validation("crawler.max_file_size_mb must be > 0"));
        }
        if self.search.per_page == 0 {
            return Err(AppError::validation("search.per_page must be > 0"));
        }
        Ok(())
    }
}

/// GitHub API access settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GithubConfig {
    /// Personal access token; falls back to the GITHUB_TOKEN env var
    #[serde(default)]
    pub token: Option<String>,

    /// REST API base URL
    #[serde(default = "defaults::api_base")]
    pub api_base: String,

    /// User-Agent header for API requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,
}

impl GithubConfig {
    /// Resolve the API token from config or environment.
    pub fn resolve_token(&self) -> Option<String> {
        self.token
            .clone()
            .or_else(|| std::env::var("GITHUB_TOKEN").ok())
    }
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            token: None,
            api_base: defaults::api_base(),
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
        }
    }
}

/// Clone-and-scan behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlerConfig {
    /// Shortener domain token to hunt for in repository files
    #[serde(default = "defaults::shortener_domain")]
    pub shortener_domain: String,

    /// Wall-clock deadline for one repository crawl, in seconds
    #[serde(default = "defaults::crawl_timeout")]
    pub crawl_timeout_secs: u64,

    /// Maximum crawls running simultaneously within a scheduler run
    #[serde(default = "defaults::max_concurrent")]
    pub max_concurrent: usize,

    /// Files larger than this are skipped, in MiB
    #[serde(default = "defaults::max_file_size")]
    pub max_file_size_mb: u64,

    /// Consecutive scan errors tolerated per file before abandoning it
    #[serde(default = "defaults::scan_error_budget")]
    pub scan_error_budget: usize,

    /// Timeout for a single link-resolution request, in seconds
    #[serde(default = "defaults::resolver_timeout")]
    pub resolver_timeout_secs: u64,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            shortener_domain: defaults::shortener_domain(),
            crawl_timeout_secs: defaults::crawl_timeout(),
            max_concurrent: defaults::max_concurrent(),
            max_file_size_mb: defaults::max_file_size(),
            scan_error_budget: defaults::scan_error_budget(),
            resolver_timeout_secs: defaults::resolver_timeout(),
        }
    }
}

/// Repository search defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Results per search page
    #[serde(default = "defaults::per_page")]
    pub per_page: u32,

    /// Default sort field
    #[serde(default = "defaults::sort")]
    pub sort: String,

    /// Default sort order
    #[serde(default = "defaults::order")]
    pub order: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            per_page: defaults::per_page(),
            sort: defaults::sort(),
            order: defaults::order(),
        }
    }
}

mod defaults {
    // GitHub defaults
    pub fn api_base() -> String {
        "https://api.github.com".into()
    }
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; linksweep/1.0)".into()
    }
    pub fn timeout() -> u64 {
        30
    }

    // Crawler defaults
    pub fn shortener_domain() -> String {
        "goo.gl".into()
    }
    pub fn crawl_timeout() -> u64 {
        30
    }
    pub fn max_concurrent() -> usize {
        5
    }
    pub fn max_file_size() -> u64 {
        10
    }
    pub fn scan_error_budget() -> usize {
        3
    }
    pub fn resolver_timeout() -> u64 {
        10
    }

    // Search defaults
    pub fn per_page() -> u32 {
        50
    }
    pub fn sort() -> String {
        "updated".into()
    }
    pub fn order() -> String {
        "desc".into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_default_config_ok() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn validate_rejects_empty_user_agent() {
        let mut config = Config::default();
        config.github.user_agent = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_concurrency() {
        let mut config = Config::default();
        config.crawler.max_concurrent = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_crawl_timeout() {
        let mut config = Config::default();
        config.crawler.crawl_timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn default_shortener_domain_is_googl() {
        assert_eq!(Config::default().crawler.shortener_domain, "goo.gl");
    }
}
