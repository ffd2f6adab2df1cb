// src/pipeline/mod.rs

//! Crawl scheduling over pending repositories.

pub mod scheduler;

pub use scheduler::{CrawlScheduler, LIMIT_DISABLED};
