// src/services/cache.rs

//! Advisory cache of repository identities already present in the store.
//!
//! Membership is a best-effort hint: a false negative only costs a
//! duplicate-insert attempt rejected by the store's uniqueness constraint.
//! Callers must never treat a miss as proof of absence.

use std::collections::HashSet;
use std::sync::RwLock;

use crate::error::Result;
use crate::models::RepoState;
use crate::store::RepoStore;

/// Concurrent set of known `author/name` keys.
///
/// Built once at startup and shared by `Arc` between the ingestion and
/// crawl paths; internally synchronized, no external locking required.
#[derive(Debug, Default)]
pub struct RepoCache {
    keys: RwLock<HashSet<String>>,
}

impl RepoCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Preload the cache with every non-deleted repository in the store.
    pub async fn build(store: &dyn RepoStore) -> Result<Self> {
        let cache = Self::new();
        let repos = store.get_all_repos().await?;
        {
            let mut keys = cache.keys.write().expect("lock poisoned");
            for repo in repos {
                if repo.state != RepoState::Deleted {
                    keys.insert(repo.key());
                }
            }
        }
        log::info!("Repo cache loaded");
        Ok(cache)
    }

    pub fn exists(&self, key: &str) -> bool {
        self.keys.read().expect("lock poisoned").contains(key)
    }

    pub fn set(&self, key: impl Into<String>) {
        self.keys.write().expect("lock poisoned").insert(key.into());
    }

    pub fn delete(&self, key: &str) {
        self.keys.write().expect("lock poisoned").remove(key);
    }

    pub fn len(&self) -> usize {
        self.keys.read().expect("lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use chrono::Utc;

    fn make_repo(author: &str, name: &str) -> crate::models::RepoRecord {
        crate::models::RepoRecord {
            id: 0,
            name: name.to_string(),
            author: author.to_string(),
            state: RepoState::Pending,
            language: String::new(),
            stars: 0,
            forks: 0,
            size: 0,
            last_push: None,
            api_url: String::new(),
            gh_url: String::new(),
            clone_url: String::new(),
            error_msg: String::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_set_and_exists() {
        let cache = RepoCache::new();
        assert!(!cache.exists("alice/repo"));
        cache.set("alice/repo");
        assert!(cache.exists("alice/repo"));
    }

    #[test]
    fn test_delete_clears_membership() {
        let cache = RepoCache::new();
        cache.set("alice/repo");
        cache.delete("alice/repo");
        assert!(!cache.exists("alice/repo"));
    }

    #[tokio::test]
    async fn test_build_preloads_non_deleted() {
        let store = MemoryStore::new();
        let kept = store.create_repo(&make_repo("alice", "kept")).await.unwrap();
        let gone = store.create_repo(&make_repo("bob", "gone")).await.unwrap();
        store.delete_repo(gone.id).await.unwrap();

        let cache = RepoCache::build(&store).await.unwrap();
        assert!(cache.exists(&kept.key()));
        assert!(!cache.exists("bob/gone"));
        assert_eq!(cache.len(), 1);
    }
}
