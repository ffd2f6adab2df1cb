// src/pipeline/scheduler.rs

//! Bounded fan-out crawl scheduler.
//!
//! Drains the PENDING backlog up to a caller-supplied limit, runs each
//! crawl under a hard deadline, and persists the terminal state of every
//! admitted repository before recording run-level bookkeeping.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::{StreamExt, stream};
use tokio::time::Instant;

use crate::config::CrawlerConfig;
use crate::error::AppError;
use crate::models::{CrawlJobState, RepoRecord, RepoState};
use crate::services::Crawler;
use crate::store::{JobStateStore, LinkStore, RepoStore};

/// Sentinel limit that turns a scheduler run into a no-op.
pub const LIMIT_DISABLED: i64 = -1;

/// What one admitted repository ended up as.
struct CrawlOutcome {
    repo_id: i64,
    state: RepoState,
    finished_at: Instant,
}

/// Runs crawls over the pending backlog with bounded concurrency.
pub struct CrawlScheduler {
    crawler: Arc<dyn Crawler>,
    repo_store: Arc<dyn RepoStore>,
    link_store: Arc<dyn LinkStore>,
    state_store: Arc<dyn JobStateStore>,
    config: CrawlerConfig,
}

impl CrawlScheduler {
    pub fn new(
        crawler: Arc<dyn Crawler>,
        repo_store: Arc<dyn RepoStore>,
        link_store: Arc<dyn LinkStore>,
        state_store: Arc<dyn JobStateStore>,
        config: CrawlerConfig,
    ) -> Self {
        Self {
            crawler,
            repo_store,
            link_store,
            state_store,
            config,
        }
    }

    /// Crawl up to `limit` pending repositories.
    ///
    /// Every admitted repository reaches a terminal state; repositories
    /// beyond the limit are left PENDING for the next run. The run itself
    /// never fails: per-repository errors land in the record, store errors
    /// are logged.
    pub async fn run(&self, limit: i64) {
        if limit == LIMIT_DISABLED {
            log::info!("Crawl limit is disabled, skipping run");
            return;
        }

        let pending = match self.repo_store.get_pending_repos().await {
            Ok(pending) => pending,
            Err(e) => {
                log::error!("Error fetching pending repos: {}", e);
                return;
            }
        };
        if pending.is_empty() {
            log::info!("No pending repos to crawl");
            return;
        }

        let admitted: Vec<RepoRecord> = pending.into_iter().take(limit.max(0) as usize).collect();
        log::info!("Crawling {} repos", admitted.len());

        let outcomes: Vec<CrawlOutcome> = stream::iter(admitted)
            .map(|repo| self.process_one(repo))
            .buffer_unordered(self.config.max_concurrent.max(1))
            .collect()
            .await;

        // The repo recorded in the job state is the one whose crawl finished
        // last, not the last one admitted.
        let last_finished = outcomes
            .iter()
            .filter(|o| o.state.is_terminal())
            .max_by_key(|o| o.finished_at);

        if let Some(outcome) = last_finished {
            let state = CrawlJobState {
                name: CrawlJobState::JOB_NAME.to_string(),
                last_repo_id: Some(outcome.repo_id),
                last_run_at: Some(Utc::now()),
            };
            if let Err(e) = self.state_store.set_job_state(&state).await {
                log::error!("Error updating job state: {}", e);
            }
        }

        log::info!("Crawl run complete: {} repos processed", outcomes.len());
    }

    /// Drive one repository from PENDING to a terminal state.
    async fn process_one(&self, mut repo: RepoRecord) -> CrawlOutcome {
        let key = repo.key();

        repo.state = RepoState::Processing;
        repo.updated_at = Utc::now();
        if let Err(e) = self.repo_store.update_repo(&repo).await {
            log::error!("[{}] Error marking repo processing: {}", key, e);
        }

        let deadline = Duration::from_secs(self.config.crawl_timeout_secs);
        // Dropping the crawl future at the deadline cancels its in-flight
        // work; the clone directory is removed by its TempDir guard.
        let crawled = tokio::time::timeout(deadline, self.crawler.crawl(&repo)).await;

        match crawled {
            Ok(Ok(links)) => {
                log::info!("[{}] Found {} links", key, links.len());
                for mut link in links {
                    link.repo_id = repo.id;
                    if let Err(e) = self.link_store.create_link(&link).await {
                        log::error!("[{}] Error saving link {}: {}", key, link.url, e);
                    }
                }
                repo.state = RepoState::Completed;
                repo.error_msg = String::new();
            }
            Ok(Err(e)) => {
                log::error!("[{}] Error crawling repo: {}", key, e);
                repo.state = RepoState::Error;
                repo.error_msg = e.to_string();
            }
            Err(_) => {
                let e = AppError::Timeout(self.config.crawl_timeout_secs);
                log::error!("[{}] {}", key, e);
                repo.state = RepoState::Timeout;
                repo.error_msg = e.to_string();
            }
        }

        repo.updated_at = Utc::now();
        if let Err(e) = self.repo_store.update_repo(&repo).await {
            log::error!("[{}] Error persisting terminal state: {}", key, e);
        }

        CrawlOutcome {
            repo_id: repo.id,
            state: repo.state,
            finished_at: Instant::now(),
        }
    }
}
