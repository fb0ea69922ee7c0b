use std::sync::Arc;
use std::time::Duration;

use ab_core::{AcceptAll, ArticleStorage, ImageGenerator, Result, Section, TextGenerator};
use ab_inference::{Models, PromptTemplates, RetryPolicy};
use ab_pipeline::render::parse_front_matter_title;
use ab_pipeline::{PipelineConfig, PipelineManager};
use ab_storage::{JsonFileStorage, JsonImageCache};
use async_trait::async_trait;
use tempfile::tempdir;

const TOPIC: &str = "Gamma drafts a client deck before lunch";

/// Always answers with two sections, one of them an image placeholder.
struct StubWriter;

#[async_trait]
impl TextGenerator for StubWriter {
    fn name(&self) -> &str {
        "stub"
    }

    async fn generate(&self, _prompt: &str) -> Result<String> {
        Ok(r#"{
            "sections": [
                {"type": "paragraph", "content": "Slides used to take a whole afternoon."},
                {"type": "image_placeholder", "id": "img_1", "description": "laptop showing a slide deck"}
            ],
            "summary": "A quicker way to build decks.",
            "tags": ["AI", "Slides"]
        }"#
        .to_string())
    }
}

struct StubImages;

#[async_trait]
impl ImageGenerator for StubImages {
    fn name(&self) -> &str {
        "stub"
    }

    async fn generate_image(&self, _prompt: &str, _width: u32, _height: u32) -> Result<Vec<u8>> {
        Ok(vec![0x89, b'P', b'N', b'G'])
    }
}

#[tokio::test]
async fn fixed_topic_is_published_to_markdown_and_index() {
    let dir = tempdir().unwrap();
    let mut config = PipelineConfig::with_data_dir(dir.path());
    config.image_delay = Duration::ZERO;
    config.retry = RetryPolicy::none();
    config.intermediate_dir = Some(dir.path().join("intermediate"));

    let storage = Arc::new(JsonFileStorage::new(dir.path()));
    let cache = Arc::new(JsonImageCache::open_in(dir.path()).await.unwrap());
    let models = Models {
        text: Arc::new(StubWriter),
        images: Arc::new(StubImages),
        auditor: Arc::new(AcceptAll),
    };
    let manager = PipelineManager::new(config, PromptTemplates::default(), models, storage.clone(), cache);

    storage
        .insert_article(&ab_core::ArticleRecord::new("An older post"))
        .await
        .unwrap();

    let published = manager.run_with_topic(TOPIC).await.unwrap();

    let markdown = std::fs::read_to_string(&published.markdown_path).unwrap();
    assert_eq!(parse_front_matter_title(&markdown).as_deref(), Some(TOPIC));
    assert!(markdown.contains("<p>Slides used to take a whole afternoon.</p>"));
    assert!(markdown.contains("<img src=\"/automation/generated_images/img_1_"));
    assert!(published
        .markdown_path
        .file_name()
        .and_then(|n| n.to_str())
        .map_or(false, |n| n.ends_with("-gamma-drafts-a-client-deck-before-lunch.md")));

    let raw = std::fs::read_to_string(dir.path().join("data.json")).unwrap();
    let index: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(index["totalArticles"], 2);
    assert_eq!(index["articles"][0]["title"], TOPIC);
    assert_eq!(index["articles"][0]["type"], "ai_generated");
    assert_eq!(index["articles"][1]["title"], "An older post");

    let record = &published.record;
    assert!(record.link.starts_with("/article.html?slug="));
    let data = record.article_data().unwrap();
    assert!(data.sections.iter().any(|s| matches!(s, Section::Image { .. })));
    assert!(!data.sections.iter().any(|s| s.is_placeholder()));
    assert_eq!(data.stats.map(|s| s.passed), Some(1));

    for step in ["step1_topic.json", "step2_draft.json", "step3_validated.json"] {
        assert!(dir.path().join("intermediate").join(step).exists(), "{} missing", step);
    }
}
