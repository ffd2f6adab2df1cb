// src/services/git.rs

//! Shallow-clone execution via the system `git` binary.

use std::path::Path;

use async_trait::async_trait;
use tokio::process::Command;

use crate::error::{AppError, Result};

/// External-process boundary for repository cloning.
#[async_trait]
pub trait GitClient: Send + Sync {
    /// Shallow-clone `url` into `dest` and return the checked-out branch.
    async fn clone_repo(&self, url: &str, dest: &Path) -> Result<String>;
}

/// `GitClient` backed by the `git` command line.
#[derive(Debug, Default, Clone)]
pub struct GitCli;

impl GitCli {
    pub fn new() -> Self {
        Self
    }

    async fn run_git(context: &str, args: &[&str]) -> Result<Vec<u8>> {
        // kill_on_drop: a crawl cancelled at its deadline must not leave a
        // clone running in the background.
        let output = Command::new("git")
            .args(args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| AppError::process(context.to_string(), e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AppError::process(
                context.to_string(),
                stderr.trim().to_string(),
            ));
        }

        Ok(output.stdout)
    }
}

#[async_trait]
impl GitClient for GitCli {
    async fn clone_repo(&self, url: &str, dest: &Path) -> Result<String> {
        let dest_str = dest.to_string_lossy();
        log::info!("Cloning repo '{}' into '{}'", url, dest_str);

        Self::run_git(
            &format!("clone {url}"),
            &["clone", "--depth", "1", url, &dest_str],
        )
        .await?;

        let stdout = Self::run_git(
            &format!("branch query for {url}"),
            &["-C", &dest_str, "rev-parse", "--abbrev-ref", "HEAD"],
        )
        .await?;

        let branch = String::from_utf8_lossy(&stdout).trim().to_string();
        log::info!(
            "Cloned repo '{}' into '{}'. Current branch: {}",
            url,
            dest_str,
            branch
        );

        Ok(branch)
    }
}
