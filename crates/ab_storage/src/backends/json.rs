use std::path::{Path, PathBuf};

use ab_core::{ArticleIndexFile, ArticleRecord, ArticleStorage, InsertOutcome, Result};
use async_trait::async_trait;
use chrono::Utc;
use tokio::fs;
use tokio::sync::Mutex;

use crate::atomic::write_atomic;
use crate::index::{merge_into_archive, withdraw_from_archive, ArticleIndex, DEFAULT_CAP};

pub const DATA_FILE: &str = "data.json";
pub const ARCHIVE_FILE: &str = "archive.json";

/// Article index persisted as `data.json` with overflow in `archive.json`.
///
/// Every insert reads both files, applies the change and writes them back.
/// Writers in this process are serialized; other processes are last-writer-wins.
pub struct JsonFileStorage {
    data_path: PathBuf,
    archive_path: PathBuf,
    cap: usize,
    lock: Mutex<()>,
}

impl JsonFileStorage {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self::with_cap(dir, DEFAULT_CAP)
    }

    pub fn with_cap(dir: impl AsRef<Path>, cap: usize) -> Self {
        let dir = dir.as_ref();
        Self {
            data_path: dir.join(DATA_FILE),
            archive_path: dir.join(ARCHIVE_FILE),
            cap,
            lock: Mutex::new(()),
        }
    }

    pub fn data_path(&self) -> &Path {
        &self.data_path
    }

    pub fn archive_path(&self) -> &Path {
        &self.archive_path
    }

    async fn read(path: &Path) -> Result<ArticleIndexFile> {
        match fs::read_to_string(path).await {
            Ok(raw) => ArticleIndexFile::from_json(&raw),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ArticleIndexFile::default()),
            Err(e) => Err(e.into()),
        }
    }

    async fn write(path: &Path, file: &ArticleIndexFile) -> Result<()> {
        let raw = serde_json::to_string_pretty(file)?;
        write_atomic(path, raw.as_bytes()).await
    }
}

#[async_trait]
impl ArticleStorage for JsonFileStorage {
    async fn insert_article(&self, article: &ArticleRecord) -> Result<InsertOutcome> {
        let _guard = self.lock.lock().await;
        let now = Utc::now().to_rfc3339();

        let data = Self::read(&self.data_path).await?;
        let mut index = ArticleIndex::new(data.articles, self.cap);
        let outcome = index.insert(article.clone());

        let mut archive = Self::read(&self.archive_path).await?;
        let withdrawn = withdraw_from_archive(&mut archive.articles, &article.title);
        if withdrawn {
            tracing::info!("♻️ '{}' republished, removed its archived copy", article.title);
        }
        if withdrawn || !outcome.archived.is_empty() {
            let added = merge_into_archive(&mut archive.articles, outcome.archived.clone());
            archive.updated_at = Some(now.clone());
            archive.total_articles = archive.articles.len();
            Self::write(&self.archive_path, &archive).await?;
            if added > 0 {
                tracing::info!(
                    "📦 Archived {} article(s), {} kept in {}",
                    added,
                    archive.articles.len(),
                    self.archive_path.display()
                );
            }
        }

        let articles = index.into_articles();
        let data = ArticleIndexFile {
            updated_at: Some(now),
            total_articles: articles.len(),
            has_archive: !archive.articles.is_empty(),
            articles,
        };
        Self::write(&self.data_path, &data).await?;
        tracing::debug!("Wrote {} article(s) to {}", data.total_articles, self.data_path.display());

        Ok(outcome)
    }

    async fn list_articles(&self) -> Result<Vec<ArticleRecord>> {
        Ok(Self::read(&self.data_path).await?.articles)
    }

    async fn list_archive(&self) -> Result<Vec<ArticleRecord>> {
        Ok(Self::read(&self.archive_path).await?.articles)
    }
}
