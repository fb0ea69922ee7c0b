use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use ab_core::Error;
use ab_inference::RetryPolicy;
use ab_storage::DEFAULT_CAP;

/// Shape the writer is asked to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputSchema {
    /// JSON list of typed sections, images audited before publishing.
    #[default]
    Sections,
    /// HTML body with inline `[IMAGE:...]` and `[IMAGE_PLACEHOLDER_n]` markers.
    Html,
}

impl FromStr for OutputSchema {
    type Err = Error;

    fn from_str(s: &str) -> ab_core::Result<Self> {
        match s.to_lowercase().as_str() {
            "sections" => Ok(Self::Sections),
            "html" => Ok(Self::Html),
            other => Err(Error::Pipeline(format!(
                "unknown schema '{}', expected sections or html",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

pub const CONTENT_IMAGE_SIZE: ImageSize = ImageSize {
    width: 1365,
    height: 768,
};

pub const THUMBNAIL_SIZE: ImageSize = ImageSize {
    width: 1280,
    height: 720,
};

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Holds `data.json`, `archive.json` and `generated_images.json`.
    pub data_dir: PathBuf,
    /// Markdown output, one file per article.
    pub contents_dir: PathBuf,
    pub image_dir: PathBuf,
    /// Path written into pages for files under `image_dir`.
    pub image_url_prefix: String,
    /// Step outputs are dumped here when set.
    pub intermediate_dir: Option<PathBuf>,
    pub schema: OutputSchema,
    pub index_cap: usize,
    pub category: String,
    pub source_label: String,
    pub time_label: String,
    pub min_chars: usize,
    pub max_images: usize,
    /// Pause between image requests.
    pub image_delay: Duration,
    /// Used when topic generation fails. Without it the run aborts.
    pub fallback_topic: Option<String>,
    pub retry: RetryPolicy,
}

impl PipelineConfig {
    pub fn with_data_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            data_dir: dir.to_path_buf(),
            contents_dir: dir.join("contents"),
            image_dir: dir.join("automation").join("generated_images"),
            image_url_prefix: "automation/generated_images".to_string(),
            intermediate_dir: None,
            schema: OutputSchema::default(),
            index_cap: DEFAULT_CAP,
            category: "ai".to_string(),
            source_label: "AI/Tech".to_string(),
            time_label: "just now".to_string(),
            min_chars: 3000,
            max_images: 5,
            image_delay: Duration::from_secs(2),
            fallback_topic: None,
            retry: RetryPolicy::default(),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::with_data_dir(".")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_follows_data_dir() {
        let config = PipelineConfig::with_data_dir("/srv/blog");
        assert_eq!(config.contents_dir, PathBuf::from("/srv/blog/contents"));
        assert_eq!(
            config.image_dir,
            PathBuf::from("/srv/blog/automation/generated_images")
        );
        assert_eq!(config.index_cap, 50);
    }

    #[test]
    fn test_schema_parsing() {
        assert_eq!("HTML".parse::<OutputSchema>().unwrap(), OutputSchema::Html);
        assert!("markdown".parse::<OutputSchema>().is_err());
    }
}
