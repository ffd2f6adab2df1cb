// src/bin/cli.rs

//! linksweep CLI entry point.
//!
//! Wires the in-memory store behind the ingestion and crawl paths for
//! local runs: search seeds the backlog, crawl drains it.

use std::sync::Arc;

use clap::{Parser, Subcommand};

use linksweep::config::Config;
use linksweep::error::Result;
use linksweep::models::{SearchCursor, SearchOptions};
use linksweep::pipeline::CrawlScheduler;
use linksweep::services::{
    GitCli, HttpGithubClient, HttpLinkResolver, RepoCache, RepoCrawler, SearchIngestor,
    normalize_query,
};
use linksweep::store::{CursorStore, JobStateStore, LinkStore, MemoryStore, RepoStore};

#[derive(Parser, Debug)]
#[command(
    name = "linksweep",
    version,
    about = "Finds sunset goo.gl links across GitHub repositories"
)]
struct Cli {
    #[arg(short, long, default_value = "data/config.toml")]
    config: String,

    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Search repositories and persist them as pending work
    Search {
        /// Search query; size and star guards are appended if absent
        query: String,
        /// Number of result pages to process this run
        #[arg(long, default_value_t = 1)]
        pages: u32,
        /// Name under which the search cursor is persisted and resumed
        #[arg(long, default_value = "default")]
        name: String,
    },
    /// Crawl pending repositories for short links
    Crawl {
        /// Maximum repositories to crawl; -1 disables the run
        #[arg(long, default_value_t = 10)]
        limit: i64,
    },
    /// Search then crawl in one run
    Pipeline {
        query: String,
        #[arg(long, default_value_t = 1)]
        pages: u32,
        #[arg(long, default_value_t = 10)]
        limit: i64,
    },
    /// Search users by name
    Users { username: String },
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = Config::load_or_default(&cli.config);
    config.validate()?;

    let store = Arc::new(MemoryStore::new());
    let cache = Arc::new(RepoCache::build(store.as_ref()).await?);

    let api = Arc::new(HttpGithubClient::new(&config.github)?);
    let ingestor = SearchIngestor::new(
        api,
        store.clone() as Arc<dyn RepoStore>,
        store.clone() as Arc<dyn CursorStore>,
        cache,
    );

    let crawler = Arc::new(RepoCrawler::new(
        Arc::new(GitCli::new()),
        Arc::new(HttpLinkResolver::new(&config.crawler)?),
        config.crawler.clone(),
    )?);
    let scheduler = CrawlScheduler::new(
        crawler,
        store.clone() as Arc<dyn RepoStore>,
        store.clone() as Arc<dyn LinkStore>,
        store.clone() as Arc<dyn JobStateStore>,
        config.crawler.clone(),
    );

    let search_options = SearchOptions {
        sort: config.search.sort.clone(),
        order: config.search.order.clone(),
        per_page: config.search.per_page,
    };

    match cli.command {
        Command::Search { query, pages, name } => {
            let mut cursor = resume_cursor(
                store.as_ref(),
                &name,
                &normalize_query(&query),
                search_options,
                pages,
            )
            .await?;
            let summary = ingestor.ingest(&mut cursor).await?;
            log::info!(
                "Search done: {} fetched, {} created, {} skipped",
                summary.fetched,
                summary.created,
                summary.skipped
            );
            if let Some(e) = summary.error {
                log::warn!("Search ended early: {}", e);
            }
        }
        Command::Crawl { limit } => {
            scheduler.run(limit).await;
        }
        Command::Pipeline { query, pages, limit } => {
            let mut cursor = resume_cursor(
                store.as_ref(),
                "pipeline",
                &normalize_query(&query),
                search_options,
                pages,
            )
            .await?;
            let summary = ingestor.ingest(&mut cursor).await?;
            log::info!(
                "Search done: {} fetched, {} created, {} skipped",
                summary.fetched,
                summary.created,
                summary.skipped
            );
            scheduler.run(limit).await;
        }
        Command::Users { username } => {
            let users = ingestor.find_users(&username).await?;
            for user in &users {
                println!(
                    "{} {}",
                    user.login.as_deref().unwrap_or("-"),
                    user.url.as_deref().unwrap_or("")
                );
            }
            log::info!("Found {} users", users.len());
        }
    }

    Ok(())
}

/// Load the named cursor if one was persisted, otherwise start fresh.
///
/// A resumed cursor keeps its saved page position but adopts the
/// query and page count given on this invocation.
async fn resume_cursor(
    store: &dyn CursorStore,
    name: &str,
    query: &str,
    options: SearchOptions,
    pages: u32,
) -> Result<SearchCursor> {
    match store.get_cursor(name).await? {
        Some(mut saved) => {
            saved.query = query.to_string();
            saved.pages_to_process = pages;
            Ok(saved)
        }
        None => Ok(SearchCursor::new(name, query, options, 1, pages)),
    }
}
