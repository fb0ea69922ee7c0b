use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::types::ArticleRecord;
use crate::Result;

/// What happened to the index on insert.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct InsertOutcome {
    /// An older record with the same title was replaced.
    pub replaced: bool,
    /// Records pushed past the cap, newest first.
    pub archived: Vec<ArticleRecord>,
    pub total: usize,
}

#[async_trait]
pub trait ArticleStorage: Send + Sync {
    /// Insert a record at position 0, replacing any record with the same title.
    async fn insert_article(&self, article: &ArticleRecord) -> Result<InsertOutcome>;

    /// Articles in index order, newest first.
    async fn list_articles(&self) -> Result<Vec<ArticleRecord>>;

    async fn list_archive(&self) -> Result<Vec<ArticleRecord>>;

    /// Lowercased titles of every indexed article.
    async fn existing_titles(&self) -> Result<Vec<String>> {
        Ok(self
            .list_articles()
            .await?
            .into_iter()
            .map(|a| a.title.to_lowercase())
            .collect())
    }
}

/// Keyword to image URL memo. Entries are never evicted.
#[async_trait]
pub trait ImageCache: Send + Sync {
    async fn get(&self, keyword: &str) -> Result<Option<String>>;

    async fn insert(&self, keyword: &str, url: &str) -> Result<()>;

    async fn entries(&self) -> Result<BTreeMap<String, String>>;
}
