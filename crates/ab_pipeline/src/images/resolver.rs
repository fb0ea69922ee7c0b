use std::sync::Arc;

use ab_core::text::short_digest;
use ab_core::{ImageCache, Result};

/// Key used when nothing more specific is cached.
pub const DEFAULT_IMAGE_KEY: &str = "futuristic AI assistant interface with personalized data";

/// Substring of a keyword → cached descriptions that fit it, tried in order.
pub const KEYWORD_PATTERNS: &[(&str, &[&str])] = &[
    ("ai", &["AI algorithm processing diverse data types", "futuristic AI assistant interface with personalized data"]),
    ("brain", &["AI brain generating creative ideas", "creative thought process with AI integration"]),
    ("creative", &["AI brain generating creative ideas", "creative thought process with AI integration"]),
    ("idea", &["AI brain generating creative ideas", "futuristic brainstorming session with holographic AI interface"]),
    ("brainstorm", &["futuristic brainstorming session with holographic AI interface", "diverse professionals using AI for problem solving"]),
    ("thinking", &["AI brain generating creative ideas", "creative thought process with AI integration"]),
    ("work", &["professional working on computer with AI assistant dashboard", "person using productivity tools on computer"]),
    ("productivity", &["person using productivity tools on computer", "professional working on computer with AI assistant dashboard"]),
    ("dashboard", &["data dashboard with automated report", "professional working on computer with AI assistant dashboard"]),
    ("report", &["data dashboard with automated report", "AI analyzing complex financial documents"]),
    ("document", &["AI analyzing complex financial documents", "person using productivity tools on computer"]),
    ("tool", &["various AI tools icons on a digital screen", "person using productivity tools on computer"]),
    ("interface", &["futuristic AI assistant interface with personalized data", "smart home interface showing AI assistant controlling devices"]),
    ("chatbot", &["person typing complex prompt into an AI chatbot", "person typing detailed prompt into AI interface"]),
    ("assistant", &["futuristic AI assistant interface with personalized data", "professional working on computer with AI assistant dashboard"]),
    ("team", &["diverse professionals using AI for problem solving", "futuristic brainstorming session with holographic AI interface"]),
    ("collaboration", &["diverse professionals using AI for problem solving", "product manager brainstorming app features with AI"]),
    ("professional", &["diverse professionals using AI for problem solving", "professional working on computer with AI assistant dashboard"]),
    ("smart", &["smart home interface showing AI assistant controlling devices", "futuristic AI assistant interface with personalized data"]),
    ("home", &["smart home interface showing AI assistant controlling devices", "person using productivity tools on computer"]),
    ("warning", &["warning sign over AI robot head"]),
    ("synergy", &["synergy between human and AI intelligence", "diverse professionals using AI for problem solving"]),
    ("flowchart", &["flowchart illustrating AI-guided brainstorming steps", "data dashboard with automated report"]),
];

/// Placeholder image for a keyword with no cached match. Same keyword, same URL.
pub fn fallback_image_url(keyword: &str) -> String {
    format!(
        "https://picsum.photos/seed/{}/1280/720",
        short_digest(&keyword.to_lowercase(), 16)
    )
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Exact,
    Pattern {
        pattern: &'static str,
        key: &'static str,
    },
    Default,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedImage {
    pub url: String,
    pub via: Resolution,
}

/// Maps keywords to already known images.
pub struct ImageResolver {
    cache: Arc<dyn ImageCache>,
}

impl ImageResolver {
    pub fn new(cache: Arc<dyn ImageCache>) -> Self {
        Self { cache }
    }

    /// Cache lookup: exact key, then the pattern table, then the default key.
    pub async fn lookup(&self, keyword: &str) -> Result<Option<ResolvedImage>> {
        if let Some(url) = self.cache.get(keyword).await? {
            return Ok(Some(ResolvedImage {
                url,
                via: Resolution::Exact,
            }));
        }

        let lowered = keyword.to_lowercase();
        for &(pattern, keys) in KEYWORD_PATTERNS {
            if !lowered.contains(pattern) {
                continue;
            }
            for &key in keys {
                if let Some(url) = self.cache.get(key).await? {
                    tracing::debug!("Image for '{}' via pattern '{}' → '{}'", keyword, pattern, key);
                    return Ok(Some(ResolvedImage {
                        url,
                        via: Resolution::Pattern { pattern, key },
                    }));
                }
            }
        }

        Ok(self
            .cache
            .get(DEFAULT_IMAGE_KEY)
            .await?
            .map(|url| ResolvedImage {
                url,
                via: Resolution::Default,
            }))
    }

    /// Like `lookup`, but always produces a URL.
    pub async fn resolve(&self, keyword: &str) -> Result<ResolvedImage> {
        Ok(match self.lookup(keyword).await? {
            Some(found) => found,
            None => ResolvedImage {
                url: fallback_image_url(keyword),
                via: Resolution::Fallback,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ab_storage::MemoryImageCache;

    fn resolver(entries: &[(&str, &str)]) -> ImageResolver {
        ImageResolver::new(Arc::new(MemoryImageCache::seeded(entries.iter().copied())))
    }

    #[tokio::test]
    async fn test_exact_match_wins() {
        let r = resolver(&[("weekly report", "exact.png"), ("data dashboard with automated report", "pattern.png")]);
        let found = r.resolve("weekly report").await.unwrap();
        assert_eq!(found.url, "exact.png");
        assert_eq!(found.via, Resolution::Exact);
    }

    #[tokio::test]
    async fn test_pattern_match() {
        let r = resolver(&[("AI analyzing complex financial documents", "docs.png")]);
        let found = r.resolve("Quarterly Report review").await.unwrap();
        assert_eq!(found.url, "docs.png");
        assert_eq!(
            found.via,
            Resolution::Pattern {
                pattern: "report",
                key: "AI analyzing complex financial documents"
            }
        );
    }

    #[tokio::test]
    async fn test_default_key_before_fallback() {
        let r = resolver(&[(DEFAULT_IMAGE_KEY, "default.png")]);
        let found = r.resolve("desert road").await.unwrap();
        assert_eq!(found.via, Resolution::Default);
        assert_eq!(found.url, "default.png");
    }

    #[tokio::test]
    async fn test_fallback_is_deterministic() {
        let r = resolver(&[]);
        let first = r.resolve("Mountain Lake").await.unwrap();
        let second = r.resolve("mountain lake").await.unwrap();
        assert_eq!(first.via, Resolution::Fallback);
        assert_eq!(first.url, second.url);
        assert_eq!(first.url, fallback_image_url("mountain lake"));
        assert!(first.url.starts_with("https://picsum.photos/seed/"));
        assert!(first.url.ends_with("/1280/720"));
        assert_ne!(first.url, fallback_image_url("sunset beach"));
    }
}
