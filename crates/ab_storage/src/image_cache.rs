use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use ab_core::{ImageCache, Result};
use async_trait::async_trait;
use tokio::fs;
use tokio::sync::RwLock;

use crate::atomic::write_atomic;

pub const IMAGE_CACHE_FILE: &str = "generated_images.json";

/// Keyword → URL memo stored as a flat JSON object.
pub struct JsonImageCache {
    path: PathBuf,
    entries: RwLock<BTreeMap<String, String>>,
}

impl JsonImageCache {
    /// Loads the cache file; a missing file starts an empty cache.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let entries = match fs::read_to_string(&path).await {
            Ok(raw) if raw.trim().is_empty() => BTreeMap::new(),
            Ok(raw) => serde_json::from_str(&raw)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };
        tracing::debug!("Loaded {} cached image(s) from {}", entries.len(), path.display());
        Ok(Self {
            path,
            entries: RwLock::new(entries),
        })
    }

    pub async fn open_in(dir: impl AsRef<Path>) -> Result<Self> {
        Self::open(dir.as_ref().join(IMAGE_CACHE_FILE)).await
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ImageCache for JsonImageCache {
    async fn get(&self, keyword: &str) -> Result<Option<String>> {
        Ok(self.entries.read().await.get(keyword).cloned())
    }

    async fn insert(&self, keyword: &str, url: &str) -> Result<()> {
        let mut entries = self.entries.write().await;
        entries.insert(keyword.to_string(), url.to_string());
        write_atomic(&self.path, serde_json::to_string_pretty(&*entries)?.as_bytes()).await
    }

    async fn entries(&self) -> Result<BTreeMap<String, String>> {
        Ok(self.entries.read().await.clone())
    }
}

#[derive(Default)]
pub struct MemoryImageCache {
    entries: RwLock<BTreeMap<String, String>>,
}

impl MemoryImageCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seeded<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            entries: RwLock::new(
                entries
                    .into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
        }
    }
}

#[async_trait]
impl ImageCache for MemoryImageCache {
    async fn get(&self, keyword: &str) -> Result<Option<String>> {
        Ok(self.entries.read().await.get(keyword).cloned())
    }

    async fn insert(&self, keyword: &str, url: &str) -> Result<()> {
        self.entries
            .write()
            .await
            .insert(keyword.to_string(), url.to_string());
        Ok(())
    }

    async fn entries(&self) -> Result<BTreeMap<String, String>> {
        Ok(self.entries.read().await.clone())
    }
}
