// src/store/memory.rs

//! In-memory store backing tests and local CLI runs.
//!
//! Enforces the same contracts a SQL-backed store would: unique
//! `(author, name)` on create, update-only-if-loaded, append-only links.

use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;

use crate::error::{AppError, Result};
use crate::models::{CrawlJobState, LinkOccurrence, RepoRecord, RepoState, SearchCursor};
use crate::store::{CursorStore, JobStateStore, LinkStore, RepoStore};

/// In-memory implementation of every store contract.
#[derive(Default)]
pub struct MemoryStore {
    repos: RwLock<BTreeMap<i64, RepoRecord>>,
    links: RwLock<Vec<LinkOccurrence>>,
    cursors: RwLock<HashMap<String, SearchCursor>>,
    job_state: RwLock<CrawlJobState>,
    next_repo_id: RwLock<i64>,
    next_link_id: RwLock<i64>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_repo_id(&self) -> i64 {
        let mut id = self.next_repo_id.write().expect("lock poisoned");
        *id += 1;
        *id
    }

    fn next_link_id(&self) -> i64 {
        let mut id = self.next_link_id.write().expect("lock poisoned");
        *id += 1;
        *id
    }
}

#[async_trait]
impl RepoStore for MemoryStore {
    async fn create_repo(&self, repo: &RepoRecord) -> Result<RepoRecord> {
        let mut repos = self.repos.write().expect("lock poisoned");

        let duplicate = repos
            .values()
            .any(|r| r.author == repo.author && r.name == repo.name);
        if duplicate {
            return Err(AppError::store(format!(
                "duplicate key: repository {} already exists",
                repo.key()
            )));
        }

        let mut created = repo.clone();
        created.id = self.next_repo_id();
        created.created_at = Utc::now();
        created.updated_at = created.created_at;
        repos.insert(created.id, created.clone());
        Ok(created)
    }

    async fn update_repo(&self, repo: &RepoRecord) -> Result<()> {
        let mut repos = self.repos.write().expect("lock poisoned");
        match repos.get_mut(&repo.id) {
            Some(existing) => {
                let mut updated = repo.clone();
                updated.created_at = existing.created_at;
                updated.updated_at = Utc::now();
                *existing = updated;
                Ok(())
            }
            None => Err(AppError::store(format!(
                "cannot update repository {}: not found",
                repo.id
            ))),
        }
    }

    async fn get_repo(&self, id: i64) -> Result<RepoRecord> {
        self.repos
            .read()
            .expect("lock poisoned")
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::not_found(format!("repository {id}")))
    }

    async fn get_all_repos(&self) -> Result<Vec<RepoRecord>> {
        Ok(self
            .repos
            .read()
            .expect("lock poisoned")
            .values()
            .cloned()
            .collect())
    }

    async fn get_pending_repos(&self) -> Result<Vec<RepoRecord>> {
        Ok(self
            .repos
            .read()
            .expect("lock poisoned")
            .values()
            .filter(|r| r.state == RepoState::Pending)
            .cloned()
            .collect())
    }

    async fn delete_repo(&self, id: i64) -> Result<()> {
        let mut repos = self.repos.write().expect("lock poisoned");
        match repos.get_mut(&id) {
            Some(existing) => {
                existing.state = RepoState::Deleted;
                existing.updated_at = Utc::now();
                Ok(())
            }
            None => Err(AppError::not_found(format!("repository {id}"))),
        }
    }
}

#[async_trait]
impl LinkStore for MemoryStore {
    async fn create_link(&self, link: &LinkOccurrence) -> Result<LinkOccurrence> {
        let mut links = self.links.write().expect("lock poisoned");
        let mut created = link.clone();
        created.id = self.next_link_id();
        created.created_at = Utc::now();
        created.updated_at = created.created_at;
        links.push(created.clone());
        Ok(created)
    }

    async fn get_links_for_repo(&self, repo_id: i64) -> Result<Vec<LinkOccurrence>> {
        Ok(self
            .links
            .read()
            .expect("lock poisoned")
            .iter()
            .filter(|l| l.repo_id == repo_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl JobStateStore for MemoryStore {
    async fn get_job_state(&self) -> Result<CrawlJobState> {
        Ok(self.job_state.read().expect("lock poisoned").clone())
    }

    async fn set_job_state(&self, state: &CrawlJobState) -> Result<()> {
        *self.job_state.write().expect("lock poisoned") = state.clone();
        Ok(())
    }
}

#[async_trait]
impl CursorStore for MemoryStore {
    async fn get_cursor(&self, name: &str) -> Result<Option<SearchCursor>> {
        Ok(self
            .cursors
            .read()
            .expect("lock poisoned")
            .get(name)
            .cloned())
    }

    async fn save_cursor(&self, cursor: &SearchCursor) -> Result<()> {
        self.cursors
            .write()
            .expect("lock poisoned")
            .insert(cursor.name.clone(), cursor.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_repo(author: &str, name: &str) -> RepoRecord {
        RepoRecord {
            id: 0,
            name: name.to_string(),
            author: author.to_string(),
            state: RepoState::Pending,
            language: "Rust".to_string(),
            stars: 10,
            forks: 2,
            size: 100,
            last_push: None,
            api_url: format!("https://api.github.com/repos/{author}/{name}"),
            gh_url: format!("https://github.com/{author}/{name}"),
            clone_url: format!("https://github.com/{author}/{name}.git"),
            error_msg: String::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_create_assigns_ids() {
        let store = MemoryStore::new();
        let a = store.create_repo(&make_repo("alice", "one")).await.unwrap();
        let b = store.create_repo(&make_repo("alice", "two")).await.unwrap();
        assert!(a.id > 0);
        assert!(b.id > a.id);
    }

    #[tokio::test]
    async fn test_create_rejects_duplicate_key() {
        let store = MemoryStore::new();
        store.create_repo(&make_repo("alice", "one")).await.unwrap();
        let err = store.create_repo(&make_repo("alice", "one")).await;
        assert!(matches!(err, Err(AppError::Store(_))));
    }

    #[tokio::test]
    async fn test_update_requires_existing_record() {
        let store = MemoryStore::new();
        let mut ghost = make_repo("alice", "one");
        ghost.id = 42;
        assert!(store.update_repo(&ghost).await.is_err());
    }

    #[tokio::test]
    async fn test_get_pending_excludes_other_states() {
        let store = MemoryStore::new();
        let a = store.create_repo(&make_repo("alice", "one")).await.unwrap();
        store.create_repo(&make_repo("bob", "two")).await.unwrap();

        let mut done = a.clone();
        done.state = RepoState::Completed;
        store.update_repo(&done).await.unwrap();

        let pending = store.get_pending_repos().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].author, "bob");
    }

    #[tokio::test]
    async fn test_soft_delete_keeps_record() {
        let store = MemoryStore::new();
        let a = store.create_repo(&make_repo("alice", "one")).await.unwrap();
        store.delete_repo(a.id).await.unwrap();

        let loaded = store.get_repo(a.id).await.unwrap();
        assert_eq!(loaded.state, RepoState::Deleted);
        assert_eq!(store.get_all_repos().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_cursor_upsert_by_name() {
        let store = MemoryStore::new();
        let mut cursor = SearchCursor::new(
            "nightly",
            "language:rust",
            Default::default(),
            1,
            5,
        );
        store.save_cursor(&cursor).await.unwrap();

        cursor.current_page = 3;
        store.save_cursor(&cursor).await.unwrap();

        let loaded = store.get_cursor("nightly").await.unwrap().unwrap();
        assert_eq!(loaded.current_page, 3);
    }

    #[tokio::test]
    async fn test_links_filtered_by_repo() {
        let store = MemoryStore::new();
        let link = LinkOccurrence {
            id: 0,
            repo_id: 7,
            url: "https://goo.gl/abc".to_string(),
            expanded_url: "https://example.com/".to_string(),
            file: "README.md".to_string(),
            line_number: 5,
            github_url: String::new(),
            path: "/tmp/x/README.md".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        store.create_link(&link).await.unwrap();

        assert_eq!(store.get_links_for_repo(7).await.unwrap().len(), 1);
        assert!(store.get_links_for_repo(8).await.unwrap().is_empty());
    }
}
