// src/services/ingest.rs

//! Search ingestion: paginated repository discovery, cache-gated
//! persistence, user search enrichment, and issue creation.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use chrono::Utc;
use futures::FutureExt;
use futures::future::join_all;

use crate::error::{AppError, Result};
use crate::models::{GhRepo, GhUser, RepoRecord, RepoState, RepoWithLinks, SearchCursor};
use crate::services::cache::RepoCache;
use crate::services::github::GithubApi;
use crate::store::{CursorStore, RepoStore};

/// Result of one paginated search run.
///
/// A page-fetch error aborts remaining pages but preserves what was
/// already accumulated, so both travel together.
#[derive(Debug, Default)]
pub struct SearchOutcome {
    pub repos: Vec<RepoRecord>,
    pub pages_fetched: u32,
    pub error: Option<AppError>,
}

/// Result of one ingest run.
#[derive(Debug, Default)]
pub struct IngestSummary {
    pub fetched: usize,
    pub created: usize,
    pub skipped: usize,
    pub error: Option<AppError>,
}

/// Append repository-size and star guards the search should always carry.
pub fn normalize_query(query: &str) -> String {
    let mut query = query.trim().to_string();
    if !query.contains("size:") {
        query.push_str(" size:<=50000");
    }
    if !query.contains("stars") {
        query.push_str(" stars:>300");
    }
    query
}

/// Discovers repositories through the search API and persists them PENDING.
pub struct SearchIngestor {
    api: Arc<dyn GithubApi>,
    repo_store: Arc<dyn RepoStore>,
    cursor_store: Arc<dyn CursorStore>,
    cache: Arc<RepoCache>,
}

impl SearchIngestor {
    pub fn new(
        api: Arc<dyn GithubApi>,
        repo_store: Arc<dyn RepoStore>,
        cursor_store: Arc<dyn CursorStore>,
        cache: Arc<RepoCache>,
    ) -> Self {
        Self {
            api,
            repo_store,
            cursor_store,
            cache,
        }
    }

    /// Run the paginated search described by `cursor`.
    ///
    /// The cursor is persisted after every fetched page so the search can
    /// resume from `current_page` after a crash. A panic anywhere in page
    /// processing is recovered and surfaced as an internal error.
    pub async fn find_repositories(&self, cursor: &mut SearchCursor) -> Result<SearchOutcome> {
        match AssertUnwindSafe(self.find_repositories_inner(cursor))
            .catch_unwind()
            .await
        {
            Ok(result) => result,
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                log::error!("Panic occurred in find_repositories: {}", message);
                Err(AppError::internal(format!("panic occurred: {message}")))
            }
        }
    }

    async fn find_repositories_inner(&self, cursor: &mut SearchCursor) -> Result<SearchOutcome> {
        cursor.validate()?;

        // Repository search cannot proceed without knowing remaining quota.
        let limits = self.api.rate_limits().await.map_err(|e| {
            AppError::remote_api("rate limit check before search", e)
        })?;
        log::info!(
            "Current search rate limits: {}/{} - Resets: {}",
            limits.search.remaining,
            limits.search.limit,
            limits.search.reset
        );
        log::info!(
            "Current core rate limits: {}/{} - Resets: {}",
            limits.core.remaining,
            limits.core.limit,
            limits.core.reset
        );

        let mut outcome = SearchOutcome::default();

        while outcome.pages_fetched < cursor.pages_to_process {
            let page = match self
                .api
                .search_repositories(&cursor.query, &cursor.options, cursor.current_page)
                .await
            {
                Ok(page) => page,
                Err(e) => {
                    log::error!("Error searching repositories: {}", e);
                    outcome.error = Some(e);
                    return Ok(outcome);
                }
            };
            outcome.pages_fetched += 1;
            log::info!(
                "Found {} repos from API (Page {})",
                page.items.len(),
                cursor.current_page
            );

            for item in &page.items {
                match build_record(item) {
                    Ok(record) => outcome.repos.push(record),
                    Err(e) => {
                        // One malformed item never aborts its page.
                        log::error!("Error parsing repo item: {}", e);
                    }
                }
            }

            // Persisted before advancing, regardless of downstream outcome,
            // so current_page always names the last page fetched.
            if let Err(e) = self.cursor_store.save_cursor(cursor).await {
                log::error!("Error saving search cursor '{}': {}", cursor.name, e);
            }

            match page.next_page {
                Some(next) => cursor.current_page = next,
                None => break,
            }
        }

        log::info!("Found {} repos total", outcome.repos.len());
        Ok(outcome)
    }

    /// Run the search and persist each new repository PENDING, gated by the
    /// advisory cache. The cache is marked only after a confirmed save.
    pub async fn ingest(&self, cursor: &mut SearchCursor) -> Result<IngestSummary> {
        let outcome = self.find_repositories(cursor).await?;

        let mut summary = IngestSummary {
            fetched: outcome.repos.len(),
            error: outcome.error,
            ..IngestSummary::default()
        };

        for repo in outcome.repos {
            let key = repo.key();
            if self.cache.exists(&key) {
                log::debug!("[{}] Already known, skipping", key);
                summary.skipped += 1;
                continue;
            }

            match self.repo_store.create_repo(&repo).await {
                Ok(created) => {
                    self.cache.set(created.key());
                    summary.created += 1;
                }
                Err(e) => {
                    log::error!("[{}] Error saving repo: {}", key, e);
                    summary.skipped += 1;
                }
            }
        }

        log::info!(
            "Ingest complete: {} fetched, {} created, {} skipped",
            summary.fetched,
            summary.created,
            summary.skipped
        );
        Ok(summary)
    }

    /// Search users by name, enriching each candidate with a profile fetch.
    ///
    /// Profile fetches run concurrently, bounded only by the result width;
    /// a single failure excludes that candidate without failing the call.
    pub async fn find_users(&self, username: &str) -> Result<Vec<GhUser>> {
        if username.trim().is_empty() {
            return Err(AppError::validation("missing required field: username"));
        }

        let candidates = self
            .api
            .search_users(username)
            .await
            .map_err(|e| AppError::remote_api(format!("user search '{username}'"), e))?;
        log::info!("Found {} users from API", candidates.len());

        let fetches = candidates
            .into_iter()
            .filter_map(|candidate| candidate.login)
            .map(|login| {
                let api = Arc::clone(&self.api);
                async move {
                    match api.get_user(&login).await {
                        Ok(profile) => Some(profile),
                        Err(e) => {
                            log::warn!("Excluding user '{}': profile fetch failed: {}", login, e);
                            None
                        }
                    }
                }
            });

        let users: Vec<GhUser> = join_all(fetches).await.into_iter().flatten().collect();

        match self.api.rate_limits().await {
            Ok(limits) => log::info!(
                "Current core rate limits: {}/{} - Resets: {}",
                limits.core.remaining,
                limits.core.limit,
                limits.core.reset
            ),
            Err(e) => log::warn!("Error checking rate limit: {}", e),
        }

        Ok(users)
    }

    /// Render and file a remediation issue; returns its browsable URL.
    pub async fn create_issue_from_repo(&self, repo: &RepoWithLinks) -> Result<String> {
        let title = issue_title();
        let body = render_issue_body(repo);

        let issue = self
            .api
            .create_issue(&repo.repo.author, &repo.repo.name, &title, &body)
            .await
            .map_err(|e| AppError::remote_api(format!("issue creation for {}", repo.repo.key()), e))?;

        issue
            .html_url
            .filter(|url| !url.is_empty())
            .ok_or_else(|| AppError::internal("created issue carries no browsable URL"))
    }
}

fn build_record(item: &GhRepo) -> Result<RepoRecord> {
    let name = item
        .name
        .clone()
        .filter(|n| !n.is_empty())
        .ok_or_else(|| AppError::validation("repository item missing name"))?;
    let author = item
        .owner
        .as_ref()
        .and_then(|o| o.login.clone())
        .filter(|l| !l.is_empty())
        .ok_or_else(|| AppError::validation("repository item missing owner login"))?;

    let now = Utc::now();
    Ok(RepoRecord {
        id: 0,
        gh_url: format!("https://github.com/{author}/{name}"),
        clone_url: format!("https://github.com/{author}/{name}.git"),
        api_url: item.url.clone().unwrap_or_default(),
        language: item.language.clone().unwrap_or_default(),
        stars: item.stargazers_count.unwrap_or(0),
        forks: item.forks_count.unwrap_or(0),
        size: item.size.unwrap_or(0),
        last_push: item.pushed_at,
        state: RepoState::Pending,
        error_msg: String::new(),
        name,
        author,
        created_at: now,
        updated_at: now,
    })
}

fn issue_title() -> String {
    "Replace goo.gl links in repository".to_string()
}

fn render_issue_body(repo: &RepoWithLinks) -> String {
    let mut body = String::from(
        "## Goo.gl Link Replacement Required\n\n\
         Google is sunsetting the goo.gl URL shortener service. This repository contains \
         goo.gl links that need to be replaced to ensure continued functionality.\n\n\
         ### Why this is important\n\
         [Google URL Shortener links will no longer be available](https://developers.googleblog.com/en/google-url-shortener-links-will-no-longer-be-available/)\n\n\
         ### Links found in this repository:\n\n\
         | File | Line | goo.gl Link | Real Link | GitHub URL |\n\
         |------|------|-------------|-----------|------------|\n",
    );

    for link in &repo.links {
        body.push_str(&format!(
            "| `{}` | {} | {} | {} | [View in File]({}) |\n",
            link.file, link.line_number, link.url, link.expanded_url, link.github_url
        ));
    }

    body.push_str(&format!(
        "\n### Action required\n\
         Please replace these goo.gl links with direct URLs or an alternative URL shortener service.\n\n\
         ### Additional Information\n\
         - Total links found: {}\n\
         - Repository: {}\n\
         - Last scanned: {}\n",
        repo.links.len(),
        repo.repo.name,
        Utc::now().to_rfc3339(),
    ));

    body
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use crate::models::{GhOwner, IssueRef, LinkOccurrence, RateLimits, SearchOptions, SearchPage};
    use crate::store::MemoryStore;

    /// Scripted GithubApi double.
    #[derive(Default)]
    struct MockGithubApi {
        pages: Mutex<VecDeque<Result<SearchPage<GhRepo>>>>,
        search_calls: AtomicUsize,
        rate_limit_fails: bool,
        users: Vec<GhUser>,
        failing_profiles: Vec<&'static str>,
        issues: Mutex<Vec<(String, String, String, String)>>,
    }

    #[async_trait]
    impl GithubApi for MockGithubApi {
        async fn search_repositories(
            &self,
            _query: &str,
            _options: &SearchOptions,
            _page: u32,
        ) -> Result<SearchPage<GhRepo>> {
            self.search_calls.fetch_add(1, Ordering::SeqCst);
            self.pages
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(AppError::internal("no scripted page left")))
        }

        async fn search_users(&self, _username: &str) -> Result<Vec<GhUser>> {
            Ok(self.users.clone())
        }

        async fn get_user(&self, login: &str) -> Result<GhUser> {
            if self.failing_profiles.contains(&login) {
                return Err(AppError::remote_api(
                    format!("user profile fetch {login}"),
                    "status 502",
                ));
            }
            Ok(GhUser {
                login: Some(login.to_string()),
                name: Some(format!("Profile of {login}")),
                ..GhUser::default()
            })
        }

        async fn create_issue(
            &self,
            owner: &str,
            repo: &str,
            title: &str,
            body: &str,
        ) -> Result<IssueRef> {
            self.issues.lock().unwrap().push((
                owner.to_string(),
                repo.to_string(),
                title.to_string(),
                body.to_string(),
            ));
            Ok(IssueRef {
                url: Some(format!("https://api.github.com/repos/{owner}/{repo}/issues/1")),
                html_url: Some(format!("https://github.com/{owner}/{repo}/issues/1")),
            })
        }

        async fn rate_limits(&self) -> Result<RateLimits> {
            if self.rate_limit_fails {
                return Err(AppError::remote_api("rate limit check", "status 503"));
            }
            Ok(RateLimits::default())
        }
    }

    fn gh_repo(author: &str, name: &str) -> GhRepo {
        GhRepo {
            name: Some(name.to_string()),
            owner: Some(GhOwner {
                login: Some(author.to_string()),
            }),
            url: Some(format!("https://api.github.com/repos/{author}/{name}")),
            language: Some("Rust".to_string()),
            stargazers_count: Some(400),
            forks_count: Some(7),
            size: Some(1024),
            pushed_at: None,
        }
    }

    fn page(items: Vec<GhRepo>, next_page: Option<u32>) -> Result<SearchPage<GhRepo>> {
        Ok(SearchPage { items, next_page })
    }

    fn make_ingestor(
        api: MockGithubApi,
        store: Arc<MemoryStore>,
        cache: Arc<RepoCache>,
    ) -> SearchIngestor {
        SearchIngestor::new(
            Arc::new(api),
            store.clone() as Arc<dyn RepoStore>,
            store as Arc<dyn CursorStore>,
            cache,
        )
    }

    fn make_cursor(pages_to_process: u32) -> SearchCursor {
        SearchCursor::new(
            "nightly",
            "language:rust stars:>300",
            SearchOptions::default(),
            1,
            pages_to_process,
        )
    }

    #[tokio::test]
    async fn test_terminator_stops_after_two_fetches() {
        let api = MockGithubApi {
            pages: Mutex::new(VecDeque::from([
                page(vec![gh_repo("alice", "one")], Some(2)),
                page(vec![gh_repo("bob", "two")], None),
            ])),
            ..MockGithubApi::default()
        };
        let store = Arc::new(MemoryStore::new());
        let ingestor = make_ingestor(api, store.clone(), Arc::new(RepoCache::new()));
        let mut cursor = make_cursor(5);

        let outcome = ingestor.find_repositories(&mut cursor).await.unwrap();

        assert_eq!(outcome.pages_fetched, 2);
        assert_eq!(outcome.repos.len(), 2);
        assert!(outcome.error.is_none());

        // The persisted cursor names the last page fetched.
        let saved = store.get_cursor("nightly").await.unwrap().unwrap();
        assert_eq!(saved.current_page, 2);
    }

    #[tokio::test]
    async fn test_pages_to_process_caps_fetches() {
        let api = MockGithubApi {
            pages: Mutex::new(VecDeque::from([
                page(vec![gh_repo("alice", "one")], Some(2)),
                page(vec![gh_repo("bob", "two")], Some(3)),
                page(vec![gh_repo("carol", "three")], Some(4)),
            ])),
            ..MockGithubApi::default()
        };
        let store = Arc::new(MemoryStore::new());
        let ingestor = make_ingestor(api, store.clone(), Arc::new(RepoCache::new()));
        let mut cursor = make_cursor(2);

        let outcome = ingestor.find_repositories(&mut cursor).await.unwrap();

        assert_eq!(outcome.pages_fetched, 2);
        let saved = store.get_cursor("nightly").await.unwrap().unwrap();
        assert_eq!(saved.current_page, 2);
        // In memory the cursor already points at the next page to fetch.
        assert_eq!(cursor.current_page, 3);
    }

    #[tokio::test]
    async fn test_page_error_returns_accumulated_records() {
        let api = MockGithubApi {
            pages: Mutex::new(VecDeque::from([
                page(vec![gh_repo("alice", "one")], Some(2)),
                Err(AppError::remote_api("repository search", "status 502")),
            ])),
            ..MockGithubApi::default()
        };
        let store = Arc::new(MemoryStore::new());
        let ingestor = make_ingestor(api, store, Arc::new(RepoCache::new()));
        let mut cursor = make_cursor(5);

        let outcome = ingestor.find_repositories(&mut cursor).await.unwrap();

        assert_eq!(outcome.repos.len(), 1);
        assert!(outcome.error.is_some());
    }

    #[tokio::test]
    async fn test_malformed_item_is_skipped_not_fatal() {
        let broken = GhRepo {
            name: Some("orphan".to_string()),
            owner: None,
            ..GhRepo::default()
        };
        let api = MockGithubApi {
            pages: Mutex::new(VecDeque::from([page(
                vec![broken, gh_repo("alice", "one")],
                None,
            )])),
            ..MockGithubApi::default()
        };
        let store = Arc::new(MemoryStore::new());
        let ingestor = make_ingestor(api, store, Arc::new(RepoCache::new()));
        let mut cursor = make_cursor(1);

        let outcome = ingestor.find_repositories(&mut cursor).await.unwrap();
        assert_eq!(outcome.repos.len(), 1);
        assert_eq!(outcome.repos[0].key(), "alice/one");
    }

    #[tokio::test]
    async fn test_rate_limit_failure_halts_run() {
        let api = MockGithubApi {
            rate_limit_fails: true,
            ..MockGithubApi::default()
        };
        let store = Arc::new(MemoryStore::new());
        let ingestor = make_ingestor(api, store, Arc::new(RepoCache::new()));
        let mut cursor = make_cursor(1);

        assert!(ingestor.find_repositories(&mut cursor).await.is_err());
    }

    #[tokio::test]
    async fn test_ingest_skips_cached_and_marks_created() {
        let api = MockGithubApi {
            pages: Mutex::new(VecDeque::from([page(
                vec![gh_repo("alice", "known"), gh_repo("bob", "fresh")],
                None,
            )])),
            ..MockGithubApi::default()
        };
        let store = Arc::new(MemoryStore::new());
        let cache = Arc::new(RepoCache::new());
        cache.set("alice/known");

        let ingestor = make_ingestor(api, store.clone(), cache.clone());
        let mut cursor = make_cursor(1);

        let summary = ingestor.ingest(&mut cursor).await.unwrap();

        assert_eq!(summary.fetched, 2);
        assert_eq!(summary.created, 1);
        assert_eq!(summary.skipped, 1);
        assert!(cache.exists("bob/fresh"));
        assert_eq!(store.get_all_repos().await.unwrap().len(), 1);
        assert_eq!(store.get_pending_repos().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_ingest_duplicate_key_is_noop() {
        let api = MockGithubApi {
            pages: Mutex::new(VecDeque::from([page(vec![gh_repo("alice", "one")], None)])),
            ..MockGithubApi::default()
        };
        let store = Arc::new(MemoryStore::new());
        // Already in the store but the cache missed it: the uniqueness
        // constraint rejects the insert and the run continues.
        let existing = build_record(&gh_repo("alice", "one")).unwrap();
        store.create_repo(&existing).await.unwrap();

        let ingestor = make_ingestor(api, store.clone(), Arc::new(RepoCache::new()));
        let mut cursor = make_cursor(1);

        let summary = ingestor.ingest(&mut cursor).await.unwrap();

        assert_eq!(summary.created, 0);
        assert_eq!(summary.skipped, 1);
        assert_eq!(store.get_all_repos().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_find_users_excludes_failed_profiles() {
        let api = MockGithubApi {
            users: vec![
                GhUser {
                    login: Some("alice".to_string()),
                    ..GhUser::default()
                },
                GhUser {
                    login: Some("broken".to_string()),
                    ..GhUser::default()
                },
            ],
            failing_profiles: vec!["broken"],
            ..MockGithubApi::default()
        };
        let store = Arc::new(MemoryStore::new());
        let ingestor = make_ingestor(api, store, Arc::new(RepoCache::new()));

        let users = ingestor.find_users("ali").await.unwrap();

        assert_eq!(users.len(), 1);
        assert_eq!(users[0].login.as_deref(), Some("alice"));
        assert_eq!(users[0].name.as_deref(), Some("Profile of alice"));
    }

    #[tokio::test]
    async fn test_find_users_rejects_empty_username() {
        let store = Arc::new(MemoryStore::new());
        let ingestor = make_ingestor(
            MockGithubApi::default(),
            store,
            Arc::new(RepoCache::new()),
        );
        assert!(matches!(
            ingestor.find_users("  ").await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_create_issue_returns_html_url() {
        let api = MockGithubApi::default();
        let store = Arc::new(MemoryStore::new());
        let ingestor = make_ingestor(api, store, Arc::new(RepoCache::new()));

        let repo = build_record(&gh_repo("alice", "fixture")).unwrap();
        let link = LinkOccurrence {
            id: 1,
            repo_id: repo.id,
            url: "http://goo.gl/Y5VIoG".to_string(),
            expanded_url: "http://google.com/".to_string(),
            file: "README.md".to_string(),
            line_number: 5,
            github_url: "https://github.com/alice/fixture/blob/main/README.md?plain=1#L5"
                .to_string(),
            path: "/tmp/clone/README.md".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let with_links = RepoWithLinks {
            repo,
            links: vec![link],
        };

        let url = ingestor.create_issue_from_repo(&with_links).await.unwrap();
        assert_eq!(url, "https://github.com/alice/fixture/issues/1");
    }

    #[test]
    fn test_issue_body_lists_each_occurrence() {
        let repo = build_record(&gh_repo("alice", "fixture")).unwrap();
        let link = LinkOccurrence {
            id: 1,
            repo_id: 0,
            url: "http://goo.gl/Y5VIoG".to_string(),
            expanded_url: "http://google.com/".to_string(),
            file: "README.md".to_string(),
            line_number: 5,
            github_url: "https://github.com/alice/fixture/blob/main/README.md?plain=1#L5"
                .to_string(),
            path: String::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let body = render_issue_body(&RepoWithLinks {
            repo,
            links: vec![link],
        });

        assert!(body.contains("| `README.md` | 5 | http://goo.gl/Y5VIoG | http://google.com/ |"));
        assert!(body.contains("Total links found: 1"));
        assert!(body.contains("Repository: fixture"));
    }

    #[test]
    fn test_build_record_defaults_missing_metadata() {
        let item = GhRepo {
            name: Some("bare".to_string()),
            owner: Some(GhOwner {
                login: Some("alice".to_string()),
            }),
            ..GhRepo::default()
        };
        let record = build_record(&item).unwrap();

        assert_eq!(record.stars, 0);
        assert_eq!(record.forks, 0);
        assert_eq!(record.language, "");
        assert_eq!(record.state, RepoState::Pending);
        assert_eq!(record.gh_url, "https://github.com/alice/bare");
        assert_eq!(record.clone_url, "https://github.com/alice/bare.git");
    }

    #[test]
    fn test_normalize_query_appends_guards() {
        assert_eq!(
            normalize_query("language:go"),
            "language:go size:<=50000 stars:>300"
        );
        assert_eq!(
            normalize_query("language:go size:<=100 stars:>10"),
            "language:go size:<=100 stars:>10"
        );
    }
}
