// src/services/resolver.rs

//! Short-link resolution.
//!
//! Performs exactly one non-redirect-following fetch and reads the
//! redirect target out of the Location header.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::redirect;

use crate::config::CrawlerConfig;
use crate::error::{AppError, Result};

/// Network boundary for expanding a short link to its destination.
#[async_trait]
pub trait LinkResolver: Send + Sync {
    /// Resolve a short link with a single fetch; errors on any non-3xx
    /// response or a 3xx response without a Location header.
    async fn expand(&self, link: &str) -> Result<String>;
}

/// `LinkResolver` backed by a redirect-disabled reqwest client.
pub struct HttpLinkResolver {
    client: reqwest::Client,
}

impl HttpLinkResolver {
    pub fn new(config: &CrawlerConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .redirect(redirect::Policy::none())
            .timeout(Duration::from_secs(config.resolver_timeout_secs))
            .build()?;
        Ok(Self { client })
    }

    /// Normalize a short link to an explicit https scheme.
    pub fn normalize(link: &str) -> String {
        if let Some(rest) = link.strip_prefix("http://") {
            return format!("https://{rest}");
        }
        if link.starts_with("https://") {
            return link.to_string();
        }
        format!("https://{link}")
    }
}

#[async_trait]
impl LinkResolver for HttpLinkResolver {
    async fn expand(&self, link: &str) -> Result<String> {
        let link = Self::normalize(link);
        let response = self.client.get(&link).send().await?;

        let status = response.status();
        if status.is_redirection() {
            return match response
                .headers()
                .get(reqwest::header::LOCATION)
                .and_then(|v| v.to_str().ok())
            {
                Some(target) if !target.is_empty() => Ok(target.to_string()),
                _ => Err(AppError::remote_api(
                    link.clone(),
                    "redirect URL not found",
                )),
            };
        }

        Err(AppError::remote_api(
            link,
            format!("unexpected status code {}", status.as_u16()),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_adds_scheme() {
        assert_eq!(
            HttpLinkResolver::normalize("goo.gl/Y5VIoG"),
            "https://goo.gl/Y5VIoG"
        );
    }

    #[test]
    fn test_normalize_upgrades_insecure_scheme() {
        assert_eq!(
            HttpLinkResolver::normalize("http://goo.gl/Y5VIoG"),
            "https://goo.gl/Y5VIoG"
        );
    }

    #[test]
    fn test_normalize_keeps_secure_scheme() {
        assert_eq!(
            HttpLinkResolver::normalize("https://goo.gl/aoDfac"),
            "https://goo.gl/aoDfac"
        );
    }
}
