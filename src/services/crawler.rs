// src/services/crawler.rs

//! Repository crawling: clone, walk the tree, extract and resolve
//! short links.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use regex::Regex;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::config::CrawlerConfig;
use crate::error::{AppError, Result};
use crate::models::{LinkOccurrence, RepoRecord};
use crate::services::git::GitClient;
use crate::services::resolver::LinkResolver;

/// One crawl attempt over a single repository.
#[async_trait]
pub trait Crawler: Send + Sync {
    /// Clone `repo`, scan its files, and return every short-link
    /// occurrence in filesystem-walk order.
    async fn crawl(&self, repo: &RepoRecord) -> Result<Vec<LinkOccurrence>>;
}

/// Crawler that shallow-clones into a temp directory and scans line by line.
pub struct RepoCrawler {
    git: Arc<dyn GitClient>,
    resolver: Arc<dyn LinkResolver>,
    config: CrawlerConfig,
    /// Case-insensitive short-link pattern: optional scheme, the shortener
    /// domain, then a token of letters/digits/underscore/hyphen.
    link_pattern: Regex,
    /// Fast per-line containment check before running the regex.
    domain_token: String,
}

impl RepoCrawler {
    pub fn new(
        git: Arc<dyn GitClient>,
        resolver: Arc<dyn LinkResolver>,
        config: CrawlerConfig,
    ) -> Result<Self> {
        let pattern = format!(
            r"(?i)(?:https?://)?{}/[a-zA-Z0-9_-]+",
            regex::escape(&config.shortener_domain)
        );
        let link_pattern = Regex::new(&pattern)
            .map_err(|e| AppError::config(format!("invalid shortener domain: {e}")))?;
        let domain_token = format!("{}/", config.shortener_domain);

        Ok(Self {
            git,
            resolver,
            config,
            link_pattern,
            domain_token,
        })
    }

    /// Extract the first short link on a line, if any.
    fn extract_link(&self, line: &str) -> Option<String> {
        self.link_pattern.find(line).map(|m| m.as_str().to_string())
    }

    /// Permalink into the checked-out branch at an exact file and line.
    fn permalink(repo: &RepoRecord, branch: &str, file: &str, line: u32) -> String {
        format!("{}/blob/{}/{}?plain=1#L{}", repo.gh_url, branch, file, line)
    }

    /// Walk the checked-out tree, scanning every regular file.
    async fn scan_tree(
        &self,
        repo: &RepoRecord,
        branch: &str,
        root: &Path,
    ) -> Result<Vec<LinkOccurrence>> {
        let key = repo.key();
        log::info!("[{}] Scanning files", key);

        let max_bytes = self.config.max_file_size_mb * 1024 * 1024;
        let mut found = Vec::new();
        let mut dirs = vec![root.to_path_buf()];

        while let Some(dir) = dirs.pop() {
            let mut entries = match tokio::fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) => {
                    log::error!("[{}] Error walking dir {:?}: {}", key, dir, e);
                    continue;
                }
            };

            loop {
                let entry = match entries.next_entry().await {
                    Ok(Some(entry)) => entry,
                    Ok(None) => break,
                    Err(e) => {
                        log::error!("[{}] Error walking dir {:?}: {}", key, dir, e);
                        break;
                    }
                };

                let path = entry.path();
                let meta = match entry.metadata().await {
                    Ok(meta) => meta,
                    Err(e) => {
                        log::error!("[{}] Error reading metadata for {:?}: {}", key, path, e);
                        continue;
                    }
                };

                if meta.is_dir() {
                    dirs.push(path);
                    continue;
                }

                if meta.len() > max_bytes {
                    log::info!(
                        "[{}] Skipping large file: {:?} ({:.2} MB)",
                        key,
                        path,
                        meta.len() as f64 / (1024.0 * 1024.0)
                    );
                    continue;
                }

                if let Err(e) = self
                    .scan_file(repo, branch, root, &path, &mut found)
                    .await
                {
                    // A failed file never fails the repository.
                    log::error!("[{}] Error scanning file {:?}: {}", key, path, e);
                }
            }
        }

        Ok(found)
    }

    /// Scan one file line by line, recording every short-link occurrence.
    ///
    /// Lines that are not valid UTF-8 count against a consecutive-error
    /// budget; exhausting it abandons this file only.
    async fn scan_file(
        &self,
        repo: &RepoRecord,
        branch: &str,
        root: &Path,
        path: &PathBuf,
        found: &mut Vec<LinkOccurrence>,
    ) -> Result<()> {
        let relative = path
            .strip_prefix(root)
            .unwrap_or(path)
            .to_string_lossy()
            .to_string();

        let file = tokio::fs::File::open(path).await?;
        let mut reader = BufReader::new(file);
        let mut buf = Vec::new();
        let mut line_number: u32 = 0;
        let mut consecutive_errors = 0usize;

        loop {
            buf.clear();
            let read = reader.read_until(b'\n', &mut buf).await?;
            if read == 0 {
                break;
            }
            line_number += 1;

            let trimmed = buf
                .strip_suffix(b"\n")
                .map(|b| b.strip_suffix(b"\r").unwrap_or(b))
                .unwrap_or(&buf);

            let line = match std::str::from_utf8(trimmed) {
                Ok(line) => {
                    consecutive_errors = 0;
                    line
                }
                Err(e) => {
                    consecutive_errors += 1;
                    if consecutive_errors > self.config.scan_error_budget {
                        return Err(AppError::scan(
                            relative,
                            format!(
                                "{consecutive_errors} consecutive unreadable lines (line {line_number}): {e}"
                            ),
                        ));
                    }
                    continue;
                }
            };

            if !line.contains(&self.domain_token) {
                continue;
            }
            let Some(url) = self.extract_link(line) else {
                continue;
            };

            let expanded_url = match self.resolver.expand(&url).await {
                Ok(expanded) => expanded,
                Err(e) => {
                    log::error!("Error expanding url '{}': {}", url, e);
                    LinkOccurrence::error_marker(e)
                }
            };

            let now = Utc::now();
            found.push(LinkOccurrence {
                id: 0,
                repo_id: repo.id,
                github_url: Self::permalink(repo, branch, &relative, line_number),
                url,
                expanded_url,
                file: relative.clone(),
                line_number,
                path: path.to_string_lossy().to_string(),
                created_at: now,
                updated_at: now,
            });
        }

        Ok(())
    }
}

#[async_trait]
impl Crawler for RepoCrawler {
    async fn crawl(&self, repo: &RepoRecord) -> Result<Vec<LinkOccurrence>> {
        let key = repo.key();
        log::info!("[{}] Crawling repo", key);

        // TempDir removes the clone on every exit path, including clone
        // failures and cancellation at the scheduler's deadline.
        let temp = tempfile::Builder::new()
            .prefix(&format!("repo-clone-{}-{}-", repo.author, repo.name))
            .tempdir()?;

        let branch = self.git.clone_repo(&repo.clone_url, temp.path()).await?;
        let links = self.scan_tree(repo, &branch, temp.path()).await?;

        Ok(links)
    }
}
