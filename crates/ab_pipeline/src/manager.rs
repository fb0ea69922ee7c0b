use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use ab_core::text::{collapse_whitespace, slugify, strip_code_fence, strip_html_tags, truncate_chars};
use ab_core::{
    ArticleData, ArticleKind, ArticleRecord, ArticleStorage, Draft, Error, ImageAuditor, ImageCache,
    InsertOutcome, Result, Section, TextGenerator, Topic,
};
use ab_inference::prompts::{render, IMAGE_QUALITY_SUFFIX};
use ab_inference::{Models, PromptTemplates};
use chrono::Local;
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::config::{OutputSchema, PipelineConfig, CONTENT_IMAGE_SIZE, THUMBNAIL_SIZE};
use crate::images::{audit_sections, fallback_image_url, ImageResolver, ImageWorkshop};
use crate::logging::Logger;
use crate::placeholders::{
    context_before, extract_image_keywords, extract_placeholder_numbers, normalize_keyword,
    placeholder_marker, render_figure, replace_image_keywords, replace_placeholders, strip_markers,
    CONTEXT_CHARS,
};
use crate::render::{markdown_titles, render_markdown, sections_to_html, site_path, FrontMatter};

const TOPIC_MIN_CHARS: usize = 15;
const TOPIC_MAX_CHARS: usize = 80;
/// Existing titles quoted in the topic prompt.
const TOPIC_PROMPT_TITLES: usize = 20;
const SUMMARY_MAX_CHARS: usize = 200;
const SUMMARY_INPUT_CHARS: usize = 1000;

/// What the writer returns for the sections schema.
#[derive(Debug, Deserialize)]
pub struct WriterReply {
    pub sections: Vec<Section>,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Decodes a sections reply, tolerating a code fence around the JSON.
pub fn parse_writer_reply(raw: &str) -> Result<WriterReply> {
    let body = strip_code_fence(raw);
    let value: serde_json::Value = serde_json::from_str(&body)
        .map_err(|e| Error::MalformedResponse(format!("writer reply is not JSON: {}", e)))?;
    if value.get("sections").is_none() {
        return Err(Error::MalformedResponse("writer reply has no sections".to_string()));
    }
    serde_json::from_value(value)
        .map_err(|e| Error::MalformedResponse(format!("invalid writer reply: {}", e)))
}

fn clean_topic(raw: &str) -> String {
    raw.trim().trim_matches('"').trim().to_string()
}

fn topic_is_well_formed(topic: &str) -> bool {
    let chars = topic.chars().count();
    (TOPIC_MIN_CHARS..=TOPIC_MAX_CHARS).contains(&chars) && !topic.contains('\n')
}

/// Result of a completed run.
#[derive(Debug, Clone)]
pub struct Published {
    pub record: ArticleRecord,
    pub markdown_path: PathBuf,
    pub outcome: InsertOutcome,
}

/// Drives topic → draft → image audit → publish.
pub struct PipelineManager {
    config: PipelineConfig,
    prompts: PromptTemplates,
    text: Arc<dyn TextGenerator>,
    auditor: Arc<dyn ImageAuditor>,
    storage: Arc<dyn ArticleStorage>,
    resolver: ImageResolver,
    workshop: ImageWorkshop,
}

impl PipelineManager {
    pub fn new(
        config: PipelineConfig,
        prompts: PromptTemplates,
        models: Models,
        storage: Arc<dyn ArticleStorage>,
        cache: Arc<dyn ImageCache>,
    ) -> Self {
        let workshop = ImageWorkshop::new(models.images, cache.clone(), &config);
        Self {
            resolver: ImageResolver::new(cache),
            workshop,
            text: models.text,
            auditor: models.auditor,
            storage,
            prompts,
            config,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn storage(&self) -> &Arc<dyn ArticleStorage> {
        &self.storage
    }

    pub fn resolver(&self) -> &ImageResolver {
        &self.resolver
    }

    pub fn workshop(&self) -> &ImageWorkshop {
        &self.workshop
    }

    async fn ask(&self, label: &str, prompt: &str) -> Result<String> {
        self.config
            .retry
            .run(label, || self.text.generate(prompt))
            .await
    }

    async fn save_intermediate<T: Serialize>(&self, name: &str, value: &T) -> Result<()> {
        let Some(dir) = &self.config.intermediate_dir else {
            return Ok(());
        };
        fs::create_dir_all(dir).await?;
        let path = dir.join(name);
        fs::write(&path, serde_json::to_string_pretty(value)?).await?;
        tracing::debug!("💾 Saved {}", path.display());
        Ok(())
    }

    /// Lowercased titles from the index and the contents directory, without duplicates.
    pub async fn existing_titles(&self) -> Result<Vec<String>> {
        let mut titles = self.storage.existing_titles().await?;
        for title in markdown_titles(&self.config.contents_dir).await? {
            let title = title.to_lowercase();
            if !titles.contains(&title) {
                titles.push(title);
            }
        }
        Ok(titles)
    }

    async fn fresh_topic(&self, logger: &Logger) -> Result<String> {
        let titles = self.existing_titles().await?;
        let listed = if titles.is_empty() {
            "(none)".to_string()
        } else {
            titles
                .iter()
                .take(TOPIC_PROMPT_TITLES)
                .map(|t| format!("- {}", t))
                .collect::<Vec<_>>()
                .join("\n")
        };
        let today = Local::now().format("%Y-%m-%d").to_string();
        let prompt = render(&self.prompts.topic, &[("date", today.as_str()), ("existing_titles", listed.as_str())]);

        let mut topic = clean_topic(&self.ask("topic", &prompt).await?);
        if !topic_is_well_formed(&topic) {
            logger.warn(&format!(
                "⚠️ Ill-formed topic ({} chars), regenerating",
                topic.chars().count()
            ));
            topic = clean_topic(&self.ask("topic", &prompt).await?);
        }
        if let Some((first, _)) = topic.split_once('\n') {
            topic = clean_topic(first);
            logger.warn(&format!("⚠️ Multi-line topic, keeping first line: {}", topic));
        }
        if topic.is_empty() {
            return Err(Error::MalformedResponse("empty topic".to_string()));
        }
        Ok(topic)
    }

    pub async fn generate_topic(&self) -> Result<Topic> {
        let logger = Logger::stage("topic");
        let title = match self.fresh_topic(&logger).await {
            Ok(title) => title,
            Err(e) => match &self.config.fallback_topic {
                Some(fallback) => {
                    logger.warn(&format!("Topic generation failed ({}), using fallback", e));
                    fallback.clone()
                }
                None => {
                    logger.error(&format!("❌ Topic generation failed: {}", e));
                    return Err(e);
                }
            },
        };
        logger.info(&format!("📌 {}", title));

        let topic = Topic {
            title,
            generated_at: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        };
        self.save_intermediate("step1_topic.json", &topic).await?;
        Ok(topic)
    }

    async fn summarize(&self, body: &str) -> String {
        let plain = collapse_whitespace(&strip_html_tags(&strip_markers(body)));
        if plain.chars().count() <= SUMMARY_MAX_CHARS {
            return plain;
        }
        let prompt = render(
            &self.prompts.summary,
            &[("text", truncate_chars(&plain, SUMMARY_INPUT_CHARS))],
        );
        match self.ask("summary", &prompt).await {
            Ok(summary) if !summary.trim().is_empty() => summary.trim().to_string(),
            Ok(_) | Err(_) => format!("{}...", truncate_chars(&plain, SUMMARY_MAX_CHARS)),
        }
    }

    pub async fn write_draft(&self, topic: &Topic) -> Result<Draft> {
        let logger = Logger::stage("writer");
        let draft = match self.config.schema {
            OutputSchema::Sections => self.write_sections(topic, &logger).await?,
            OutputSchema::Html => self.write_html(topic, &logger).await?,
        };
        self.save_intermediate("step2_draft.json", &draft).await?;
        Ok(draft)
    }

    async fn write_sections(&self, topic: &Topic, logger: &Logger) -> Result<Draft> {
        let min_chars = self.config.min_chars.to_string();
        let max_images = self.config.max_images.to_string();
        let prompt = render(
            &self.prompts.writer,
            &[
                ("topic", topic.title.as_str()),
                ("min_chars", min_chars.as_str()),
                ("max_images", max_images.as_str()),
            ],
        );
        let reply = parse_writer_reply(&self.ask("writer", &prompt).await?)?;

        let mut draft = Draft {
            title: topic.title.clone(),
            sections: reply.sections,
            summary: reply.summary,
            tags: reply.tags,
            generated_at: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            ..Draft::default()
        };
        if draft.summary.trim().is_empty() {
            let html = sections_to_html(&draft.sections);
            draft.summary = self.summarize(&html).await;
        }
        logger.info(&format!(
            "✅ {} section(s), {} paragraph chars, {} image placeholder(s)",
            draft.sections.len(),
            draft.paragraph_chars(),
            draft.placeholder_count()
        ));
        Ok(draft)
    }

    async fn write_html(&self, topic: &Topic, logger: &Logger) -> Result<Draft> {
        let min_chars = self.config.min_chars.to_string();
        let prompt = render(
            &self.prompts.html_writer,
            &[("topic", topic.title.as_str()), ("min_chars", min_chars.as_str())],
        );
        let raw = strip_code_fence(&self.ask("writer", &prompt).await?);
        if raw.is_empty() {
            return Err(Error::MalformedResponse("empty HTML body".to_string()));
        }

        let keywords: Vec<String> = extract_image_keywords(&raw, self.config.max_images)
            .iter()
            .map(|k| normalize_keyword(k))
            .collect();
        let mut urls = BTreeMap::new();
        for keyword in &keywords {
            let resolved = self.resolver.resolve(keyword).await?;
            logger.debug(&format!("'{}' → {:?}", keyword, resolved.via));
            urls.insert(keyword.clone(), resolved.url);
        }
        let html = replace_image_keywords(&raw, |keyword| {
            let keyword = normalize_keyword(keyword);
            let url = urls
                .get(&keyword)
                .cloned()
                .unwrap_or_else(|| fallback_image_url(&keyword));
            render_figure(&site_path(&url), &keyword, "Related image")
        });
        let html = self.fill_placeholders(html).await?;
        logger.info(&format!("✅ HTML body with {} keyword image(s)", keywords.len()));

        let summary = self.summarize(&raw).await;
        Ok(Draft {
            title: topic.title.clone(),
            summary,
            generated_at: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            thumbnail: keywords.first().and_then(|k| urls.get(k).cloned()),
            html: Some(html),
            ..Draft::default()
        })
    }

    async fn context_image_prompt(&self, context: &str) -> String {
        if context.is_empty() {
            return format!("abstract technology illustration, {}", IMAGE_QUALITY_SUFFIX);
        }
        let prompt = render(
            &self.prompts.context_image,
            &[("context", truncate_chars(context, CONTEXT_CHARS))],
        );
        match self.ask("image prompt", &prompt).await {
            Ok(reply) if !reply.trim().is_empty() => format!(
                "{}, {}",
                reply.trim().trim_matches(|c| c == '"' || c == '\''),
                IMAGE_QUALITY_SUFFIX
            ),
            Ok(_) | Err(_) => {
                let words: Vec<&str> = context.split_whitespace().take(5).collect();
                format!("{}, professional illustration, high quality, 16:9", words.join(" "))
            }
        }
    }

    /// Replaces numbered placeholders with images generated from the text before them.
    /// A placeholder whose image cannot be generated is removed.
    async fn fill_placeholders(&self, html: String) -> Result<String> {
        let numbers = extract_placeholder_numbers(&html);
        if numbers.is_empty() {
            return Ok(html);
        }
        let logger = Logger::stage("images");
        let mut figures = BTreeMap::new();
        for (i, n) in numbers.iter().enumerate() {
            let marker = placeholder_marker(*n);
            let context = context_before(&html, &marker, CONTEXT_CHARS).unwrap_or_default();
            let prompt = self.context_image_prompt(&context).await;
            match self
                .workshop
                .generate(&prompt, &format!("context_img_{}", n), CONTENT_IMAGE_SIZE)
                .await
            {
                Ok(image) => {
                    logger.info(&format!("[{}/{}] {} → {}", i + 1, numbers.len(), marker, image.url));
                    figures.insert(*n, render_figure(&site_path(&image.url), &context, "AI Generated Image"));
                }
                Err(e) => logger.warn(&format!("[{}/{}] {} dropped: {}", i + 1, numbers.len(), marker, e)),
            }
            if i + 1 < numbers.len() {
                self.workshop.pause().await;
            }
        }
        Ok(replace_placeholders(&html, |n| {
            figures.get(&n).cloned().unwrap_or_default()
        }))
    }

    /// Generates and audits the draft's placeholder images. HTML drafts pass through.
    pub async fn audit_images(&self, mut draft: Draft) -> Result<Draft> {
        if self.config.schema == OutputSchema::Sections {
            let sections = std::mem::take(&mut draft.sections);
            let (sections, stats) =
                audit_sections(&self.workshop, self.auditor.as_ref(), sections).await?;
            draft.sections = sections;
            draft.stats = Some(stats);
        }
        self.save_intermediate("step3_validated.json", &draft).await?;
        Ok(draft)
    }

    async fn thumbnail(&self, title: &str, logger: &Logger) -> String {
        let prompt = render(&self.prompts.thumbnail, &[("topic", title)]);
        match self.workshop.generate(&prompt, "thumbnail", THUMBNAIL_SIZE).await {
            Ok(image) => image.url,
            Err(e) => {
                logger.warn(&format!("⚠️ Thumbnail generation failed ({}), using fallback", e));
                fallback_image_url(title)
            }
        }
    }

    /// Writes the Markdown file and puts the article at the top of the index.
    pub async fn publish(&self, draft: &Draft) -> Result<Published> {
        let logger = Logger::stage("publish");
        let thumbnail = match &draft.thumbnail {
            Some(url) => url.clone(),
            None => self.thumbnail(&draft.title, &logger).await,
        };
        let image = site_path(&thumbnail);

        let now = Local::now();
        let date = now.format("%Y-%m-%d").to_string();
        let slug = slugify(&draft.title)
            .unwrap_or_else(|| format!("{}-article-{}", self.config.category, now.format("%H%M%S")));
        let stem = format!("{}-{}", date, slug);
        let summary = truncate_chars(draft.summary.trim(), SUMMARY_MAX_CHARS).to_string();

        let body = match &draft.html {
            Some(html) => html.clone(),
            None => sections_to_html(&draft.sections),
        };
        let front = FrontMatter {
            title: draft.title.clone(),
            date: date.clone(),
            category: self.config.category.clone(),
            tags: draft.tags.clone(),
            image: image.clone(),
            summary: (!summary.is_empty()).then(|| summary.clone()),
            source: Some(self.config.source_label.clone()),
            kind: Some(ArticleKind::AiGenerated.to_string()),
        };
        fs::create_dir_all(&self.config.contents_dir).await?;
        let markdown_path = self.config.contents_dir.join(format!("{}.md", stem));
        fs::write(&markdown_path, render_markdown(&front, &body)?).await?;
        logger.info(&format!("📄 {}", markdown_path.display()));

        let mut record = ArticleRecord::new(draft.title.clone());
        record.source = self.config.source_label.clone();
        record.time = self.config.time_label.clone();
        record.summary = summary;
        record.link = format!("/article.html?slug={}", stem);
        record.image = image;
        record.content = draft.html.clone();
        record.category = self.config.category.clone();
        record.kind = ArticleKind::AiGenerated;
        record.created_at = now.format("%Y-%m-%d %H:%M:%S").to_string();
        record.set_data(&ArticleData {
            sections: draft.sections.clone(),
            tags: draft.tags.clone(),
            stats: draft.stats,
        })?;

        let outcome = self.storage.insert_article(&record).await?;
        logger.info(&format!(
            "💾 Indexed '{}' ({} article(s){}{})",
            record.title,
            outcome.total,
            if outcome.replaced { ", replaced older copy" } else { "" },
            if outcome.archived.is_empty() {
                String::new()
            } else {
                format!(", {} archived", outcome.archived.len())
            }
        ));

        Ok(Published {
            record,
            markdown_path,
            outcome,
        })
    }

    async fn run_stages(&self, topic: Topic) -> Result<Published> {
        let draft = self.write_draft(&topic).await?;
        let draft = self.audit_images(draft).await?;
        self.publish(&draft).await
    }

    pub async fn run(&self) -> Result<Published> {
        let topic = self.generate_topic().await?;
        self.run_stages(topic).await
    }

    /// Skips topic generation.
    pub async fn run_with_topic(&self, title: &str) -> Result<Published> {
        let title = title.trim();
        if title.is_empty() {
            return Err(Error::Pipeline("topic must not be empty".to_string()));
        }
        let topic = Topic {
            title: title.to_string(),
            generated_at: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        };
        self.save_intermediate("step1_topic.json", &topic).await?;
        self.run_stages(topic).await
    }

    /// Generates and caches images for `keywords`. Returns keyword → URL.
    pub async fn generate_images(&self, keywords: &[String]) -> Result<BTreeMap<String, String>> {
        let keywords: Vec<String> = keywords.iter().map(|k| normalize_keyword(k)).collect();
        self.workshop.generate_for_keywords(&keywords).await
    }
}
