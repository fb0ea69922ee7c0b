use std::sync::Arc;

use ab_core::{ArticleRecord, ArticleStorage, InsertOutcome, Result};
use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::index::{merge_into_archive, withdraw_from_archive, ArticleIndex, DEFAULT_CAP};

struct MemoryStore {
    index: ArticleIndex,
    archive: Vec<ArticleRecord>,
}

/// Index kept in process memory. Used for dry runs and tests.
#[derive(Clone)]
pub struct MemoryStorage {
    store: Arc<RwLock<MemoryStore>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::with_cap(DEFAULT_CAP)
    }

    pub fn with_cap(cap: usize) -> Self {
        Self::seeded(Vec::new(), cap)
    }

    pub fn seeded(articles: Vec<ArticleRecord>, cap: usize) -> Self {
        Self {
            store: Arc::new(RwLock::new(MemoryStore {
                index: ArticleIndex::new(articles, cap),
                archive: Vec::new(),
            })),
        }
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ArticleStorage for MemoryStorage {
    async fn insert_article(&self, article: &ArticleRecord) -> Result<InsertOutcome> {
        let mut store = self.store.write().await;
        let outcome = store.index.insert(article.clone());
        withdraw_from_archive(&mut store.archive, &article.title);
        merge_into_archive(&mut store.archive, outcome.archived.clone());
        Ok(outcome)
    }

    async fn list_articles(&self) -> Result<Vec<ArticleRecord>> {
        let store = self.store.read().await;
        Ok(store.index.articles().to_vec())
    }

    async fn list_archive(&self) -> Result<Vec<ArticleRecord>> {
        let store = self.store.read().await;
        Ok(store.archive.clone())
    }
}
