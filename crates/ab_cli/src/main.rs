use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use ab_core::{ImageCache, Result};
use ab_inference::{create_models, ImageModelKind, InferenceConfig, PromptTemplates, TextModelKind};
use ab_pipeline::{handle_command, init_logging, OutputSchema, PipelineCommands, PipelineConfig, PipelineManager};
use ab_storage::{create_storage, JsonImageCache, MemoryImageCache, StorageKind};
use clap::Parser;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(author, version, about = "Generates illustrated blog posts and keeps the site index up to date", long_about = None)]
pub struct Cli {
    /// Site root holding data.json, contents/ and the generated images
    #[arg(long, env = "AUTOBLOG_DATA_DIR", default_value = ".")]
    data_dir: PathBuf,
    /// Text model: gemini or dummy
    #[arg(long, env = "AUTOBLOG_MODEL", default_value = "gemini")]
    model: TextModelKind,
    /// Model name passed to the text API
    #[arg(long, env = "AUTOBLOG_MODEL_NAME")]
    model_name: Option<String>,
    #[arg(long, env = "AUTOBLOG_MODEL_URL")]
    model_url: Option<String>,
    /// Image model: pollinations or dummy
    #[arg(long, env = "AUTOBLOG_IMAGE_MODEL", default_value = "pollinations")]
    image_model: ImageModelKind,
    #[arg(long, env = "AUTOBLOG_IMAGE_URL")]
    image_url: Option<String>,
    /// Writer output: sections (audited images) or html (inline markers)
    #[arg(long, env = "AUTOBLOG_SCHEMA", default_value = "sections")]
    schema: OutputSchema,
    /// Article index backend: json or memory
    #[arg(long, env = "AUTOBLOG_STORAGE", default_value = "json")]
    storage: StorageKind,
    /// Skip the vision audit and keep every generated image
    #[arg(long, env = "AUTOBLOG_NO_AUDIT")]
    no_audit: bool,
    /// Topic to fall back to when topic generation fails
    #[arg(long, env = "AUTOBLOG_FALLBACK_TOPIC")]
    fallback_topic: Option<String>,
    /// Replace the topic prompt with the contents of this file
    #[arg(long, env = "AUTOBLOG_TOPIC_PROMPT")]
    topic_prompt: Option<PathBuf>,
    /// Replace the writer prompt with the contents of this file
    #[arg(long, env = "AUTOBLOG_WRITER_PROMPT")]
    writer_prompt: Option<PathBuf>,
    /// Seconds to wait between image requests
    #[arg(long, env = "AUTOBLOG_IMAGE_DELAY", default_value_t = 2)]
    image_delay: u64,
    #[command(subcommand)]
    command: PipelineCommands,
}

async fn prompt_templates(cli: &Cli) -> Result<PromptTemplates> {
    let mut prompts = PromptTemplates::default();
    if let Some(path) = &cli.topic_prompt {
        prompts = prompts.with_topic_file(path).await?;
    }
    if let Some(path) = &cli.writer_prompt {
        prompts = prompts.with_writer_file(path, cli.schema == OutputSchema::Html).await?;
    }
    Ok(prompts)
}

async fn build_manager(cli: &Cli) -> Result<PipelineManager> {
    let mut config = PipelineConfig::with_data_dir(&cli.data_dir);
    config.schema = cli.schema;
    config.fallback_topic = cli.fallback_topic.clone();
    config.image_delay = Duration::from_secs(cli.image_delay);
    if let PipelineCommands::Run { intermediate, .. } = &cli.command {
        config.intermediate_dir = intermediate.clone();
    }

    let prompts = prompt_templates(cli).await?;
    let inference = InferenceConfig {
        text_model: cli.model,
        model_name: cli.model_name.clone(),
        model_url: cli.model_url.clone(),
        image_model: cli.image_model,
        image_url: cli.image_url.clone(),
        audit: !cli.no_audit,
        prompts: prompts.clone(),
        ..InferenceConfig::default()
    };
    let models = create_models(&inference)?;
    info!("🧠 Text model: {}, image model: {}", models.text.name(), models.images.name());

    let storage = create_storage(cli.storage, &config.data_dir, config.index_cap);
    let cache: Arc<dyn ImageCache> = match cli.storage {
        StorageKind::Json => Arc::new(JsonImageCache::open_in(&config.data_dir).await?),
        StorageKind::Memory => Arc::new(MemoryImageCache::new()),
    };

    Ok(PipelineManager::new(config, prompts, models, storage, cache))
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    let manager = build_manager(&cli).await?;

    match &cli.command {
        PipelineCommands::Run {
            interval: Some(interval),
            ..
        } => {
            info!("Running in periodic mode with {}s interval", interval.0.as_secs());
            loop {
                info!("Starting generation cycle");
                if let Err(e) = handle_command(&cli.command, &manager).await {
                    error!("❌ Generation cycle failed: {}", e);
                }
                info!("Waiting {}s before next cycle", interval.0.as_secs());
                tokio::time::sleep(interval.0).await;
            }
        }
        command => handle_command(command, &manager).await,
    }
}
