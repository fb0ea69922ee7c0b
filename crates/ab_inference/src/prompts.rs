//! Prompt templates. `{name}` markers are filled by [`render`]; anything else,
//! including JSON braces, is passed through untouched.

use std::path::Path;

use ab_core::Result;
use tokio::fs;

pub const TOPIC_PROMPT: &str = r#"# Role
You are a technology trend analyst writing for office workers in their 30s and 40s.

# Task
As of {date}, pick ONE AI tool that is currently trending on YouTube and tech blogs
and write a single blog post title that turns it into a practical work guide.

# Filtering rules
1. Do not repeat any of these existing titles:
{existing_titles}
2. Avoid get-rich-quick or stock topics, sign-up tutorials and developer-only setup guides.

# Output format
Print exactly one line: the title. No explanation, no quotes, no list.
"#;

pub const WRITER_PROMPT: &str = r#"# Role
You are a top tech blogger and the art director responsible for the visuals of the post.

# Topic
{topic}

# Task
Write the post as structured JSON in exactly this shape:
{
  "sections": [
    {"type": "heading", "level": 2, "content": "Title"},
    {"type": "paragraph", "content": "Introduction, no greeting"},
    {"type": "image_placeholder", "id": "img_1", "description": "English description", "position": "after_intro"},
    {"type": "heading", "level": 3, "content": "Section title"},
    {"type": "paragraph", "content": "Section body"},
    {"type": "list", "items": ["step one", "step two"]},
    {"type": "tip_box", "content": "In practice..."},
    {"type": "warning_box", "content": "Careful: ..."},
    {"type": "code_block", "language": "python", "content": "example"}
  ],
  "summary": "Two or three sentence summary",
  "tags": ["AI", "Automation"]
}

# Writing rules
1. At least {min_chars} characters across all paragraphs.
2. Introduction, 4-6 body sections, a practical tip, a warning, a summary.
3. At least one tip_box and one warning_box.

# Image rules
1. img_1 right after the introduction, at most {max_images} placeholders in total.
2. Descriptions in English, concrete, with subject, setting, lighting and
   "professional photography, 8k quality".

# Output
JSON only. No comments, no prose around it.
"#;

pub const HTML_WRITER_PROMPT: &str = r#"Write a blog post of at least {min_chars} characters about: {topic}

Rules:
- Start directly, no greeting. Title in <h2>, sections in <h3> with <p> or <ul><li>.
- Allowed tags: <h2>, <h3>, <p>, <ul>, <li>, <strong>, <mark>, <pre>.
- After each major section insert one image marker line: [IMAGE:english description]
- Practical tips go in a paragraph starting with <strong>TIP:</strong>.
- Close with limitations and a short summary. No emoji.
"#;

pub const AUDIT_PROMPT: &str = r#"You are a pragmatic image QA reviewer.

Requested description: "{description}"

Check only two things:
1. Does the image show the core subject of the description? Details may be ignored.
2. Is it free of fatal defects (broken image, severe distortion, unrelated subject)?

Answer with a single line starting with PASS, or FAIL: reason.
"#;

pub const THUMBNAIL_PROMPT: &str =
    "{topic}, professional blog thumbnail, modern design, tech aesthetic, high quality, 16:9";

pub const SUMMARY_PROMPT: &str = "Summarize the following post in two or three sentences:\n\n{text}";

pub const CONTEXT_IMAGE_PROMPT: &str = r#"Read this blog section and write one English image-generation prompt
(10-15 words, concrete subject and setting, professional and modern) that illustrates it.

Section:
{context}

Print the prompt only."#;

/// Suffix appended to every prompt sent to the image API.
pub const IMAGE_QUALITY_SUFFIX: &str =
    "professional photography, high quality, detailed, vibrant colors, 16:9 aspect ratio";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplates {
    pub topic: String,
    pub writer: String,
    pub html_writer: String,
    pub audit: String,
    pub thumbnail: String,
    pub summary: String,
    pub context_image: String,
}

impl Default for PromptTemplates {
    fn default() -> Self {
        Self {
            topic: TOPIC_PROMPT.to_string(),
            writer: WRITER_PROMPT.to_string(),
            html_writer: HTML_WRITER_PROMPT.to_string(),
            audit: AUDIT_PROMPT.to_string(),
            thumbnail: THUMBNAIL_PROMPT.to_string(),
            summary: SUMMARY_PROMPT.to_string(),
            context_image: CONTEXT_IMAGE_PROMPT.to_string(),
        }
    }
}

impl PromptTemplates {
    /// Replaces the topic template with the contents of `path`.
    pub async fn with_topic_file(mut self, path: &Path) -> Result<Self> {
        self.topic = fs::read_to_string(path).await?;
        Ok(self)
    }

    /// Replaces the writer template (for the active schema) with the contents of `path`.
    pub async fn with_writer_file(mut self, path: &Path, html: bool) -> Result<Self> {
        let template = fs::read_to_string(path).await?;
        if html {
            self.html_writer = template;
        } else {
            self.writer = template;
        }
        Ok(self)
    }
}

/// Fills `{name}` markers in one pass over the template. Substituted values
/// are never scanned again.
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let known = after.find('}').and_then(|close| {
            let name = &after[..close];
            vars.iter()
                .find(|(var, _)| *var == name)
                .map(|(_, value)| (close, *value))
        });
        match known {
            Some((close, value)) => {
                out.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}
