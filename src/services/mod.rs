// src/services/mod.rs

//! Service layer for the linksweep application.
//!
//! This module contains the business logic for:
//! - GitHub API access (`GithubApi` / `HttpGithubClient`)
//! - Shallow cloning (`GitClient` / `GitCli`)
//! - Short-link resolution (`LinkResolver` / `HttpLinkResolver`)
//! - Known-repository cache (`RepoCache`)
//! - Repository scanning (`RepoCrawler`)
//! - Search ingestion (`SearchIngestor`)

mod cache;
mod crawler;
mod git;
mod github;
mod ingest;
mod resolver;

pub use cache::RepoCache;
pub use crawler::{Crawler, RepoCrawler};
pub use git::{GitCli, GitClient};
pub use github::{GithubApi, HttpGithubClient};
pub use ingest::{IngestSummary, SearchIngestor, SearchOutcome, normalize_query};
pub use resolver::{HttpLinkResolver, LinkResolver};
