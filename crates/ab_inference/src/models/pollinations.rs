use std::fmt;
use std::time::Duration;

use ab_core::{Error, ImageGenerator, Result};
use async_trait::async_trait;
use reqwest::Client;
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://image.pollinations.ai";

/// Keyless image API: the prompt goes in the path, raw bytes come back.
pub struct PollinationsImageModel {
    client: Client,
    base_url: String,
}

impl fmt::Debug for PollinationsImageModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PollinationsImageModel")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl PollinationsImageModel {
    pub fn new(base_url: Option<String>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        })
    }

    pub fn request_url(&self, prompt: &str, width: u32, height: u32) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)?;
        url.path_segments_mut()
            .map_err(|_| Error::InvalidUrl(format!("{} cannot take a path", self.base_url)))?
            .pop_if_empty()
            .push("prompt")
            .push(prompt);
        url.query_pairs_mut()
            .append_pair("width", &width.to_string())
            .append_pair("height", &height.to_string())
            .append_pair("nologo", "true")
            .append_pair("enhance", "true");
        Ok(url)
    }
}

#[async_trait]
impl ImageGenerator for PollinationsImageModel {
    fn name(&self) -> &str {
        "Pollinations"
    }

    async fn generate_image(&self, prompt: &str, width: u32, height: u32) -> Result<Vec<u8>> {
        let url = self.request_url(prompt, width, height)?;
        tracing::debug!("requesting image {}", url);

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::ImageGeneration(format!("HTTP {}", status.as_u16())));
        }

        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return Err(Error::ImageGeneration("empty image body".to_string()));
        }
        Ok(bytes.to_vec())
    }
}
