use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use ab_core::{ArticleStorage, Error, Result};

mod atomic;
pub mod backends;
pub mod image_cache;
pub mod index;

pub use backends::*;
pub use image_cache::{JsonImageCache, MemoryImageCache, IMAGE_CACHE_FILE};
pub use index::{merge_into_archive, withdraw_from_archive, ArticleIndex, DEFAULT_CAP};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StorageKind {
    #[default]
    Json,
    Memory,
}

impl FromStr for StorageKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "memory" => Ok(Self::Memory),
            other => Err(Error::Storage(format!(
                "unknown storage backend '{}', expected json or memory",
                other
            ))),
        }
    }
}

pub fn create_storage(kind: StorageKind, dir: &Path, cap: usize) -> Arc<dyn ArticleStorage> {
    match kind {
        StorageKind::Json => {
            tracing::info!("💾 Using JSON index in {}", dir.display());
            Arc::new(JsonFileStorage::with_cap(dir, cap))
        }
        StorageKind::Memory => {
            tracing::info!("💾 Using in-memory index");
            Arc::new(MemoryStorage::with_cap(cap))
        }
    }
}

pub mod prelude {
    pub use super::backends::*;
    pub use super::{create_storage, StorageKind};
}
