use std::fmt;

use ab_core::{ImageGenerator, Result, TextGenerator};

/// Offline text model. Answers by looking at what the prompt asks for, so the
/// whole pipeline can run without credentials.
pub struct DummyModel;

impl fmt::Debug for DummyModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DummyModel").finish()
    }
}

pub const DUMMY_TOPIC: &str = "Offline draft: automating weekly reports with AI";

const DUMMY_SECTIONS: &str = r#"```json
{
  "sections": [
    {"type": "heading", "level": 2, "content": "Automating weekly reports"},
    {"type": "paragraph", "content": "Weekly reports eat an afternoon every Friday. This draft was produced offline."},
    {"type": "image_placeholder", "id": "img_1", "description": "office worker reviewing an automated report dashboard, natural light, professional photography", "position": "after_intro"},
    {"type": "tip_box", "content": "Start with one report and one data source."},
    {"type": "warning_box", "content": "Check generated numbers before sending them."}
  ],
  "summary": "An offline sample post about report automation.",
  "tags": ["AI", "Automation"]
}
```"#;

const DUMMY_HTML: &str = r#"```html
<h2>Automating weekly reports</h2>
<p>Weekly reports eat an afternoon every Friday. This draft was produced offline.</p>
[IMAGE:data dashboard with automated report]
<h3>Where to start</h3>
<p><strong>TIP:</strong> Start with one report and one data source.</p>
```"#;

impl DummyModel {
    pub fn new() -> Self {
        Self
    }
}

impl Default for DummyModel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl TextGenerator for DummyModel {
    fn name(&self) -> &str {
        "Dummy"
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        if prompt.contains("\"sections\"") {
            return Ok(DUMMY_SECTIONS.to_string());
        }
        if prompt.contains("[IMAGE:") {
            return Ok(DUMMY_HTML.to_string());
        }
        if prompt.contains("PASS") && prompt.contains("FAIL") {
            return Ok("PASS".to_string());
        }
        if prompt.starts_with("Summarize") {
            // Take first 20 words of the quoted text
            let body = prompt.split_once("\n\n").map(|(_, b)| b).unwrap_or(prompt);
            let words: Vec<&str> = body.split_whitespace().take(20).collect();
            return Ok(words.join(" "));
        }
        Ok(DUMMY_TOPIC.to_string())
    }
}

/// Offline image model returning the same small PNG for every prompt.
#[derive(Debug, Default)]
pub struct DummyImageModel;

/// 1x1 transparent PNG.
pub const DUMMY_PNG: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44, 0x52,
    0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1F, 0x15, 0xC4,
    0x89, 0x00, 0x00, 0x00, 0x0A, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9C, 0x63, 0x00, 0x01, 0x00, 0x00,
    0x05, 0x00, 0x01, 0x0D, 0x0A, 0x2D, 0xB4, 0x00, 0x00, 0x00, 0x00, 0x49, 0x45, 0x4E, 0x44, 0xAE,
    0x42, 0x60, 0x82,
];

#[async_trait::async_trait]
impl ImageGenerator for DummyImageModel {
    fn name(&self) -> &str {
        "Dummy"
    }

    async fn generate_image(&self, _prompt: &str, _width: u32, _height: u32) -> Result<Vec<u8>> {
        Ok(DUMMY_PNG.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompts::{render, PromptTemplates};
    use ab_core::text::strip_code_fence;
    use ab_core::Section;

    #[tokio::test]
    async fn test_dummy_model() {
        let model = DummyModel::new();
        let prompts = PromptTemplates::default();

        let topic = model
            .generate(&render(&prompts.topic, &[("date", "2025-01-01"), ("existing_titles", "- none")]))
            .await
            .unwrap();
        assert_eq!(topic, DUMMY_TOPIC);

        let draft = model
            .generate(&render(&prompts.writer, &[("topic", DUMMY_TOPIC)]))
            .await
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&strip_code_fence(&draft)).unwrap();
        let sections: Vec<Section> = serde_json::from_value(value["sections"].clone()).unwrap();
        assert_eq!(sections.iter().filter(|s| s.is_placeholder()).count(), 1);

        let html = model
            .generate(&render(&prompts.html_writer, &[("topic", DUMMY_TOPIC)]))
            .await
            .unwrap();
        assert!(html.contains("[IMAGE:"));

        let summary = model
            .generate(&render(&prompts.summary, &[("text", "one two three")]))
            .await
            .unwrap();
        assert_eq!(summary, "one two three");
    }

    #[tokio::test]
    async fn test_dummy_image_model() {
        let bytes = DummyImageModel.generate_image("anything", 10, 10).await.unwrap();
        assert!(bytes.starts_with(b"\x89PNG"));
    }
}
