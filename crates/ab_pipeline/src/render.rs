use std::path::Path;

use ab_core::text::truncate_chars;
use ab_core::{Error, Result, Section};
use serde::{Deserialize, Serialize};
use tokio::fs;

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Makes a path under the site root absolute so pages in subdirectories load it.
pub fn site_path(url: &str) -> String {
    if url.is_empty() || url.starts_with('/') || url.contains("://") || url.starts_with("data:") {
        url.to_string()
    } else {
        format!("/{}", url)
    }
}

/// Renders sections as the article body.
///
/// Text content may carry inline markup from the writer and is emitted as is.
/// Code is escaped. Placeholders that never went through the audit render nothing.
pub fn sections_to_html(sections: &[Section]) -> String {
    let mut parts = Vec::with_capacity(sections.len());
    for section in sections {
        match section {
            Section::Heading { level, content } => {
                let level = (*level).clamp(1, 6);
                parts.push(format!("<h{level}>{}</h{level}>", content));
            }
            Section::Paragraph { content } => parts.push(format!("<p>{}</p>", content)),
            Section::List { items, ordered } => {
                let tag = if *ordered { "ol" } else { "ul" };
                let items: String = items.iter().map(|i| format!("<li>{}</li>", i)).collect();
                parts.push(format!("<{tag}>{}</{tag}>", items));
            }
            Section::Image { url, description, .. } => {
                parts.push(format!(
                    r#"<img src="{}" alt="{}..." style="max-width:100%; height:auto; margin:20px 0;" />"#,
                    escape_html(&site_path(url)),
                    escape_html(truncate_chars(description, 50))
                ));
            }
            Section::TipBox { content } => parts.push(format!(
                r#"<p style="border-left:4px solid #3b82f6; background:#f0f9ff; padding:15px; border-radius:4px; margin:15px 0;"><strong>💡 TIP:</strong> {}</p>"#,
                content
            )),
            Section::WarningBox { content } => parts.push(format!(
                r#"<p style="border-left:4px solid #ef4444; background:#fef2f2; padding:15px; border-radius:4px; margin:15px 0;"><strong>⚠️ Caution:</strong> {}</p>"#,
                content
            )),
            Section::CodeBlock { language, content } => parts.push(format!(
                r#"<pre style="background:#1e293b; color:#e2e8f0; padding:15px; border-radius:8px; white-space:pre-wrap; word-wrap:break-word; line-height:1.6; border:1px solid #334155; margin:15px 0;"><code class="language-{}">{}</code></pre>"#,
                escape_html(language),
                escape_html(content)
            )),
            Section::ImagePlaceholder { .. } => {}
        }
    }
    parts.join("\n")
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FrontMatter {
    pub title: String,
    pub date: String,
    pub category: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    pub image: String,
    pub tags: Vec<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

pub fn render_markdown(front: &FrontMatter, body: &str) -> Result<String> {
    let yaml = serde_yaml::to_string(front)
        .map_err(|e| Error::Pipeline(format!("cannot write front matter: {}", e)))?;
    Ok(format!("---\n{}---\n\n{}\n", yaml, body.trim_end()))
}

/// The YAML block between the opening and closing `---` lines.
fn front_matter_block(raw: &str) -> Option<String> {
    let mut lines = raw.lines();
    if lines.next()?.trim() != "---" {
        return None;
    }
    let mut block = Vec::new();
    for line in lines {
        if line.trim() == "---" {
            return Some(block.join("\n"));
        }
        block.push(line);
    }
    None
}

/// Parsed front matter, `None` when the block is missing or not valid YAML.
pub fn parse_front_matter(raw: &str) -> Option<serde_yaml::Value> {
    serde_yaml::from_str(&front_matter_block(raw)?).ok()
}

pub fn parse_front_matter_title(raw: &str) -> Option<String> {
    let front = parse_front_matter(raw)?;
    let title = front.get("title")?.as_str()?.trim();
    (!title.is_empty()).then(|| title.to_string())
}

pub async fn read_front_matter_title(path: &Path) -> Result<Option<String>> {
    let raw = fs::read_to_string(path).await?;
    Ok(parse_front_matter_title(&raw))
}

/// Titles of every Markdown file in `dir`. A missing directory yields nothing.
pub async fn markdown_titles(dir: &Path) -> Result<Vec<String>> {
    let mut entries = match fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };
    let mut titles = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("md") {
            continue;
        }
        match read_front_matter_title(&path).await {
            Ok(Some(title)) => titles.push(title),
            Ok(None) => {}
            Err(e) => tracing::debug!("Skipping {}: {}", path.display(), e),
        }
    }
    titles.sort();
    Ok(titles)
}
