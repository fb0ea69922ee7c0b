use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use ab_core::Result;
use clap::Subcommand;

use crate::manager::PipelineManager;

/// Durations like `90`, `45s`, `30m`, `1h30m` or `1d`. A bare number is seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HumanDuration(pub Duration);

impl FromStr for HumanDuration {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let mut total_seconds = 0u64;
        let mut current_number = String::new();
        let mut has_unit = false;

        for c in s.chars() {
            if c.is_ascii_digit() {
                current_number.push(c);
            } else if let Ok(num) = current_number.parse::<u64>() {
                match c {
                    's' => total_seconds += num,
                    'm' => total_seconds += num * 60,
                    'h' => total_seconds += num * 3600,
                    'd' => total_seconds += num * 86400,
                    _ => return Err(format!("Invalid duration unit: {}", c)),
                }
                current_number.clear();
                has_unit = true;
            } else if !c.is_whitespace() {
                return Err(format!("Invalid character in duration: {}", c));
            }
        }

        if !current_number.is_empty() {
            match current_number.parse::<u64>() {
                Ok(num) => {
                    total_seconds += num;
                    has_unit = true;
                }
                Err(_) => return Err("Invalid number in duration".to_string()),
            }
        }

        if !has_unit {
            return Err("Duration must include a number".to_string());
        }
        if total_seconds == 0 {
            return Err("Duration must be positive".to_string());
        }

        Ok(HumanDuration(Duration::from_secs(total_seconds)))
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum PipelineCommands {
    /// Generate, illustrate and publish an article
    Run {
        /// Use this topic instead of generating one
        #[arg(long)]
        topic: Option<String>,
        /// Keep running, one article per interval (e.g. 6h, 1h30m, 1d)
        #[arg(long)]
        interval: Option<HumanDuration>,
        /// Write each step's output as JSON into this directory
        #[arg(long, env = "AUTOBLOG_INTERMEDIATE_DIR")]
        intermediate: Option<PathBuf>,
    },
    /// Print a freshly generated topic without writing anything
    Topic,
    /// Generate images for keywords and store them in the image cache
    Images {
        #[arg(required = true)]
        keywords: Vec<String>,
    },
    /// Print the image URL a keyword resolves to
    Resolve { keyword: String },
    /// List indexed articles
    List {
        /// Show the archive instead of the main index
        #[arg(long)]
        archive: bool,
    },
}

/// Runs one command. The `run` interval is handled by the caller.
pub async fn handle_command(command: &PipelineCommands, manager: &PipelineManager) -> Result<()> {
    match command {
        PipelineCommands::Run { topic, .. } => {
            let published = match topic {
                Some(topic) => manager.run_with_topic(topic).await?,
                None => manager.run().await?,
            };
            println!(
                "✅ {} → {} ({})",
                published.record.title,
                published.markdown_path.display(),
                published.record.link
            );
        }
        PipelineCommands::Topic => {
            let topic = manager.generate_topic().await?;
            println!("{}", topic.title);
        }
        PipelineCommands::Images { keywords } => {
            let urls = manager.generate_images(keywords).await?;
            for (keyword, url) in urls {
                println!("{}\t{}", keyword, url);
            }
        }
        PipelineCommands::Resolve { keyword } => {
            let resolved = manager.resolver().resolve(keyword).await?;
            println!("{}\t{:?}", resolved.url, resolved.via);
        }
        PipelineCommands::List { archive } => {
            let articles = if *archive {
                manager.storage().list_archive().await?
            } else {
                manager.storage().list_articles().await?
            };
            if articles.is_empty() {
                println!("No articles");
            }
            for (i, article) in articles.iter().enumerate() {
                println!("{:>3}. {} [{}] {}", i + 1, article.title, article.created_at, article.link);
            }
        }
    }
    Ok(())
}
