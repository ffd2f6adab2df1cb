// src/services/github.rs

//! GitHub REST API client.
//!
//! Covers the five remote operations the pipeline consumes: repository
//! search, user search, user profile fetch, issue creation, and the
//! rate-limit check. Pagination follows the `Link` response header.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::config::GithubConfig;
use crate::error::{AppError, Result};
use crate::models::{GhRepo, GhUser, IssueRef, RateLimits, SearchOptions, SearchPage};

/// Remote search API boundary.
#[async_trait]
pub trait GithubApi: Send + Sync {
    /// Fetch one page of repository search results.
    async fn search_repositories(
        &self,
        query: &str,
        options: &SearchOptions,
        page: u32,
    ) -> Result<SearchPage<GhRepo>>;

    /// Search users by name.
    async fn search_users(&self, username: &str) -> Result<Vec<GhUser>>;

    /// Fetch a single user profile.
    async fn get_user(&self, login: &str) -> Result<GhUser>;

    /// Create an issue on a repository.
    async fn create_issue(
        &self,
        owner: &str,
        repo: &str,
        title: &str,
        body: &str,
    ) -> Result<IssueRef>;

    /// Query current rate limits.
    async fn rate_limits(&self) -> Result<RateLimits>;
}

/// `GithubApi` backed by the REST v3 API over reqwest.
pub struct HttpGithubClient {
    client: reqwest::Client,
    api_base: String,
    token: Option<String>,
}

#[derive(Deserialize)]
struct SearchResponse<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
}

#[derive(Deserialize)]
struct RateLimitResponse {
    resources: RateLimits,
}

impl HttpGithubClient {
    pub fn new(config: &GithubConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            token: config.resolve_token(),
        })
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let mut builder = self
            .client
            .request(method, format!("{}{}", self.api_base, path))
            .header(reqwest::header::ACCEPT, "application/vnd.github+json");
        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token);
        }
        builder
    }

    async fn check_status(context: &str, response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(AppError::remote_api(
            context.to_string(),
            format!("status {}: {}", status.as_u16(), body.trim()),
        ))
    }

    /// Extract the `rel="next"` page number from a `Link` response header.
    ///
    /// Returns `None` when the header is absent or carries no next page,
    /// which the API uses to signal the end of pagination.
    fn parse_next_page(link_header: Option<&str>) -> Option<u32> {
        let header = link_header?;
        for part in header.split(',') {
            let mut segments = part.split(';');
            let target = segments.next()?.trim();
            let is_next = segments.any(|s| s.trim() == "rel=\"next\"");
            if !is_next {
                continue;
            }
            let url = target.trim_start_matches('<').trim_end_matches('>');
            let parsed = url::Url::parse(url).ok()?;
            return parsed
                .query_pairs()
                .find(|(k, _)| k == "page")
                .and_then(|(_, v)| v.parse().ok());
        }
        None
    }
}

#[async_trait]
impl GithubApi for HttpGithubClient {
    async fn search_repositories(
        &self,
        query: &str,
        options: &SearchOptions,
        page: u32,
    ) -> Result<SearchPage<GhRepo>> {
        let response = self
            .request(reqwest::Method::GET, "/search/repositories")
            .query(&[
                ("q", query),
                ("sort", &options.sort),
                ("order", &options.order),
                ("per_page", &options.per_page.to_string()),
                ("page", &page.to_string()),
            ])
            .send()
            .await?;

        let response = Self::check_status("repository search", response).await?;
        let next_page = Self::parse_next_page(
            response
                .headers()
                .get(reqwest::header::LINK)
                .and_then(|v| v.to_str().ok()),
        );

        let body: SearchResponse<GhRepo> = response.json().await?;
        Ok(SearchPage {
            items: body.items,
            next_page,
        })
    }

    async fn search_users(&self, username: &str) -> Result<Vec<GhUser>> {
        let response = self
            .request(reqwest::Method::GET, "/search/users")
            .query(&[("q", username)])
            .send()
            .await?;

        let response = Self::check_status("user search", response).await?;
        let body: SearchResponse<GhUser> = response.json().await?;
        Ok(body.items)
    }

    async fn get_user(&self, login: &str) -> Result<GhUser> {
        let response = self
            .request(reqwest::Method::GET, &format!("/users/{login}"))
            .send()
            .await?;

        let response = Self::check_status("user profile fetch", response).await?;
        Ok(response.json().await?)
    }

    async fn create_issue(
        &self,
        owner: &str,
        repo: &str,
        title: &str,
        body: &str,
    ) -> Result<IssueRef> {
        let response = self
            .request(
                reqwest::Method::POST,
                &format!("/repos/{owner}/{repo}/issues"),
            )
            .json(&serde_json::json!({ "title": title, "body": body }))
            .send()
            .await?;

        let response = Self::check_status("issue creation", response).await?;
        Ok(response.json().await?)
    }

    async fn rate_limits(&self) -> Result<RateLimits> {
        let response = self
            .request(reqwest::Method::GET, "/rate_limit")
            .send()
            .await?;

        let response = Self::check_status("rate limit check", response).await?;
        let body: RateLimitResponse = response.json().await?;
        Ok(body.resources)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_next_page_present() {
        let header = "<https://api.github.com/search/repositories?q=rust&page=3>; \
                      rel=\"next\", <https://api.github.com/search/repositories?q=rust&page=10>; rel=\"last\"";
        assert_eq!(HttpGithubClient::parse_next_page(Some(header)), Some(3));
    }

    #[test]
    fn test_parse_next_page_last_page() {
        let header =
            "<https://api.github.com/search/repositories?q=rust&page=9>; rel=\"prev\", \
             <https://api.github.com/search/repositories?q=rust&page=1>; rel=\"first\"";
        assert_eq!(HttpGithubClient::parse_next_page(Some(header)), None);
    }

    #[test]
    fn test_parse_next_page_missing_header() {
        assert_eq!(HttpGithubClient::parse_next_page(None), None);
    }

    #[test]
    fn test_client_builds_from_default_config() {
        let config = GithubConfig::default();
        assert!(HttpGithubClient::new(&config).is_ok());
    }
}
