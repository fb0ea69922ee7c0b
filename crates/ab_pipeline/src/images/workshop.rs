use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use ab_core::text::short_digest;
use ab_core::{Error, ImageCache, ImageGenerator, Result};
use ab_inference::prompts::IMAGE_QUALITY_SUFFIX;
use ab_inference::RetryPolicy;
use tokio::fs;
use url::form_urlencoded::byte_serialize;

use crate::config::{ImageSize, PipelineConfig, CONTENT_IMAGE_SIZE};

/// An image written under the image directory.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedImage {
    pub path: PathBuf,
    /// Site-relative URL, e.g. `automation/generated_images/img_1_0a1b2c3d.png`.
    pub url: String,
    pub bytes: Vec<u8>,
}

/// Stock photo URL used when a keyword image cannot be generated.
pub fn stock_image_url(keyword: &str) -> String {
    let query = keyword
        .split_whitespace()
        .map(|w| byte_serialize(w.as_bytes()).collect::<String>())
        .collect::<Vec<_>>()
        .join(",");
    format!("https://source.unsplash.com/1280x720/?{}", query)
}

/// Keeps file names to `[A-Za-z0-9_-]`.
fn file_prefix(prefix: &str) -> String {
    let clean: String = prefix
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .collect();
    if clean.is_empty() {
        "img".to_string()
    } else {
        clean
    }
}

/// Generates images and stores them where the site serves them from.
pub struct ImageWorkshop {
    generator: Arc<dyn ImageGenerator>,
    cache: Arc<dyn ImageCache>,
    image_dir: PathBuf,
    url_prefix: String,
    retry: RetryPolicy,
    delay: Duration,
}

impl ImageWorkshop {
    pub fn new(
        generator: Arc<dyn ImageGenerator>,
        cache: Arc<dyn ImageCache>,
        config: &PipelineConfig,
    ) -> Self {
        Self {
            generator,
            cache,
            image_dir: config.image_dir.clone(),
            url_prefix: config.image_url_prefix.trim_end_matches('/').to_string(),
            retry: config.retry,
            delay: config.image_delay,
        }
    }

    pub fn image_dir(&self) -> &Path {
        &self.image_dir
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub async fn pause(&self) {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
    }

    /// Generates `prompt` and writes it to `{prefix}_{digest}.png`.
    pub async fn generate(&self, prompt: &str, prefix: &str, size: ImageSize) -> Result<GeneratedImage> {
        let bytes = self
            .retry
            .run(self.generator.name(), || {
                self.generator.generate_image(prompt, size.width, size.height)
            })
            .await?;
        if bytes.is_empty() {
            return Err(Error::ImageGeneration("empty image body".to_string()));
        }

        let name = format!("{}_{}.png", file_prefix(prefix), short_digest(prompt, 8));
        fs::create_dir_all(&self.image_dir).await?;
        let path = self.image_dir.join(&name);
        fs::write(&path, &bytes).await?;
        tracing::debug!("Wrote {} ({} bytes)", path.display(), bytes.len());

        Ok(GeneratedImage {
            path,
            url: format!("{}/{}", self.url_prefix, name),
            bytes,
        })
    }

    /// Images for keywords, memoized in the cache. Cached keywords are not regenerated.
    pub async fn generate_for_keywords(&self, keywords: &[String]) -> Result<BTreeMap<String, String>> {
        let mut urls = BTreeMap::new();
        for (i, keyword) in keywords.iter().enumerate() {
            if let Some(url) = self.cache.get(keyword).await? {
                tracing::info!("[{}/{}] '{}' already cached", i + 1, keywords.len(), keyword);
                urls.insert(keyword.clone(), url);
                continue;
            }

            let prompt = format!("{}, {}", keyword, IMAGE_QUALITY_SUFFIX);
            let url = match self.generate(&prompt, "keyword", CONTENT_IMAGE_SIZE).await {
                Ok(image) => {
                    tracing::info!("[{}/{}] '{}' → {}", i + 1, keywords.len(), keyword, image.url);
                    image.url
                }
                Err(e) => {
                    tracing::warn!("[{}/{}] '{}' failed: {}", i + 1, keywords.len(), keyword, e);
                    stock_image_url(keyword)
                }
            };
            self.cache.insert(keyword, &url).await?;
            urls.insert(keyword.clone(), url);

            if i + 1 < keywords.len() {
                self.pause().await;
            }
        }
        Ok(urls)
    }
}
