use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::{Error, Result};

/// Generation tag stored in the `type` field of an article record.
///
/// Tags written by other tools are kept verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ArticleKind {
    #[default]
    AiGenerated,
    Rss,
    Other(String),
}

impl ArticleKind {
    pub fn as_str(&self) -> &str {
        match self {
            ArticleKind::AiGenerated => "ai_generated",
            ArticleKind::Rss => "rss",
            ArticleKind::Other(tag) => tag,
        }
    }
}

impl From<&str> for ArticleKind {
    fn from(tag: &str) -> Self {
        match tag {
            "ai_generated" => ArticleKind::AiGenerated,
            "rss" => ArticleKind::Rss,
            other => ArticleKind::Other(other.to_string()),
        }
    }
}

impl fmt::Display for ArticleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ArticleKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ArticleKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let tag = String::deserialize(deserializer)?;
        Ok(ArticleKind::from(tag.as_str()))
    }
}

/// One entry of the site's article index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleRecord {
    pub title: String,
    #[serde(default)]
    pub source: String,
    /// Relative timestamp shown by the front end, e.g. "just now".
    #[serde(default)]
    pub time: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default = "default_link")]
    pub link: String,
    #[serde(default)]
    pub image: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default)]
    pub category: String,
    #[serde(rename = "type", default)]
    pub kind: ArticleKind,
    #[serde(default)]
    pub created_at: String,
    /// Kept as raw JSON so records written by older runs or other tools
    /// never make the index unreadable. See [`ArticleRecord::article_data`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    /// Fields written by other tools; kept so a rewrite does not drop them.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_link() -> String {
    "#".to_string()
}

impl ArticleRecord {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            source: String::new(),
            time: String::new(),
            summary: String::new(),
            link: default_link(),
            image: String::new(),
            content: None,
            category: String::new(),
            kind: ArticleKind::default(),
            created_at: String::new(),
            data: None,
            extra: Map::new(),
        }
    }

    pub fn set_data(&mut self, data: &ArticleData) -> Result<()> {
        self.data = Some(serde_json::to_value(data)?);
        Ok(())
    }

    /// Typed view of `data`, `None` when absent or not in the current layout.
    pub fn article_data(&self) -> Option<ArticleData> {
        self.data
            .as_ref()
            .and_then(|raw| serde_json::from_value(raw.clone()).ok())
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ArticleData {
    #[serde(default)]
    pub sections: Vec<Section>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stats: Option<ImageStats>,
}

/// On-disk layout of `data.json` and `archive.json`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleIndexFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub total_articles: usize,
    #[serde(default)]
    pub has_archive: bool,
    #[serde(default)]
    pub articles: Vec<ArticleRecord>,
}

impl ArticleIndexFile {
    /// Parses either `{"articles": [...]}` or a bare array of records.
    pub fn from_json(raw: &str) -> Result<Self> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        match serde_json::from_str::<Value>(raw)? {
            Value::Array(_) => {
                let articles: Vec<ArticleRecord> = serde_json::from_str(raw)?;
                Ok(Self {
                    total_articles: articles.len(),
                    articles,
                    ..Self::default()
                })
            }
            Value::Object(_) => Ok(serde_json::from_str(raw)?),
            other => Err(Error::Storage(format!(
                "article index must be an array or an object, found {}",
                json_kind(&other)
            ))),
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// A block of generated content.
///
/// Decoding is exhaustive: a `type` outside this list is rejected instead of
/// being skipped at render time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Section {
    Heading {
        #[serde(default = "default_heading_level")]
        level: u8,
        content: String,
    },
    Paragraph {
        content: String,
    },
    List {
        items: Vec<String>,
        #[serde(default)]
        ordered: bool,
    },
    ImagePlaceholder {
        id: String,
        description: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        position: Option<String>,
    },
    Image {
        id: String,
        description: String,
        url: String,
        #[serde(default)]
        audit_status: String,
        #[serde(default)]
        audit_timestamp: String,
    },
    TipBox {
        content: String,
    },
    WarningBox {
        content: String,
    },
    CodeBlock {
        #[serde(default)]
        language: String,
        content: String,
    },
}

fn default_heading_level() -> u8 {
    2
}

impl Section {
    pub fn is_placeholder(&self) -> bool {
        matches!(self, Section::ImagePlaceholder { .. })
    }
}

/// Output of the writer stage, refined by the image stage.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Draft {
    pub title: String,
    pub sections: Vec<Section>,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub generated_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stats: Option<ImageStats>,
    /// Pre-rendered body, set when the writer produced HTML directly.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
    /// Thumbnail picked while writing, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
}

impl Draft {
    pub fn placeholder_count(&self) -> usize {
        self.sections.iter().filter(|s| s.is_placeholder()).count()
    }

    pub fn paragraph_chars(&self) -> usize {
        self.sections
            .iter()
            .map(|s| match s {
                Section::Paragraph { content } => content.chars().count(),
                _ => 0,
            })
            .sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageStats {
    pub total_placeholders: usize,
    pub generated: usize,
    pub passed: usize,
    pub failed: usize,
    pub removed: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topic {
    pub title: String,
    pub generated_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_section_decoding() {
        let raw = r#"[
            {"type": "heading", "level": 3, "content": "Setup"},
            {"type": "paragraph", "content": "Body"},
            {"type": "image_placeholder", "id": "img_1", "description": "desk", "position": "after_intro"},
            {"type": "code_block", "content": "ls"}
        ]"#;
        let sections: Vec<Section> = serde_json::from_str(raw).unwrap();
        assert_eq!(sections.len(), 4);
        assert_eq!(sections[0], Section::Heading { level: 3, content: "Setup".to_string() });
        assert!(sections[2].is_placeholder());
        assert_eq!(
            sections[3],
            Section::CodeBlock { language: String::new(), content: "ls".to_string() }
        );
    }

    #[test]
    fn test_unknown_section_type_is_rejected() {
        let raw = r#"{"type": "carousel", "content": "x"}"#;
        assert!(serde_json::from_str::<Section>(raw).is_err());
    }

    #[test]
    fn test_record_keeps_unknown_fields() {
        let raw = r#"{"title": "A", "type": "rss", "views": 12}"#;
        let record: ArticleRecord = serde_json::from_str(raw).unwrap();
        assert_eq!(record.kind, ArticleKind::Rss);
        assert_eq!(record.link, "#");
        assert_eq!(record.extra.get("views"), Some(&Value::from(12)));

        let written = serde_json::to_value(&record).unwrap();
        assert_eq!(written["views"], 12);
        assert_eq!(written["type"], "rss");
    }

    #[test]
    fn test_index_file_shapes() {
        let bare = ArticleIndexFile::from_json(r#"[{"title": "A"}, {"title": "B"}]"#).unwrap();
        assert_eq!(bare.articles.len(), 2);

        let wrapped = ArticleIndexFile::from_json(
            r#"{"updatedAt": "2025-01-01 10:00", "articles": [{"title": "A", "type": "newsletter"}]}"#,
        )
        .unwrap();
        assert_eq!(wrapped.articles[0].kind, ArticleKind::Other("newsletter".to_string()));
        assert_eq!(wrapped.updated_at.as_deref(), Some("2025-01-01 10:00"));

        assert!(ArticleIndexFile::from_json("").unwrap().articles.is_empty());
        assert!(matches!(ArticleIndexFile::from_json("42"), Err(Error::Storage(_))));
    }

    #[test]
    fn test_foreign_type_tag_survives_rewrite() {
        let record: ArticleRecord =
            serde_json::from_str(r#"{"title": "A", "type": "newsletter"}"#).unwrap();
        let written = serde_json::to_value(&record).unwrap();
        assert_eq!(written["type"], "newsletter");
        assert_eq!(ArticleKind::from("ai_generated"), ArticleKind::AiGenerated);
    }

    #[test]
    fn test_legacy_data_does_not_break_the_index() {
        let raw = r#"{"articles": [{
            "title": "Old",
            "data": {
                "sections": [
                    {"type": "heading", "level": "2", "content": "Intro"},
                    {"type": "carousel", "slides": []}
                ],
                "stats": {}
            }
        }]}"#;
        let file = ArticleIndexFile::from_json(raw).unwrap();
        let record = &file.articles[0];
        assert_eq!(record.title, "Old");
        assert!(record.article_data().is_none());

        let written = serde_json::to_value(record).unwrap();
        assert_eq!(written["data"]["sections"][0]["level"], "2");
        assert_eq!(written["data"]["sections"][1]["type"], "carousel");
    }

    #[test]
    fn test_record_data_round_trip() {
        let mut record = ArticleRecord::new("T");
        let data = ArticleData {
            sections: vec![Section::Paragraph { content: "p".to_string() }],
            tags: vec!["ai".to_string()],
            stats: Some(ImageStats { passed: 1, ..ImageStats::default() }),
        };
        record.set_data(&data).unwrap();
        assert_eq!(record.article_data(), Some(data));

        let stats: ImageStats = serde_json::from_str("{}").unwrap();
        assert_eq!(stats, ImageStats::default());
    }

    #[test]
    fn test_draft_counters() {
        let draft = Draft {
            title: "T".to_string(),
            sections: vec![
                Section::Paragraph { content: "abc".to_string() },
                Section::ImagePlaceholder {
                    id: "img_1".to_string(),
                    description: "d".to_string(),
                    position: None,
                },
                Section::Paragraph { content: "de".to_string() },
            ],
            ..Draft::default()
        };
        assert_eq!(draft.placeholder_count(), 1);
        assert_eq!(draft.paragraph_chars(), 5);
    }
}
