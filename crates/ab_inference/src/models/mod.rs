use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use ab_core::{AcceptAll, Error, ImageAuditor, ImageGenerator, Result, TextGenerator};

use crate::credentials::KeyRing;
use crate::prompts::PromptTemplates;
use crate::rotation::RotatingModel;

pub mod dummy;
pub mod gemini;
pub mod pollinations;

pub use dummy::{DummyImageModel, DummyModel};
pub use gemini::{GeminiAuditor, GeminiBackend};
pub use pollinations::PollinationsImageModel;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextModelKind {
    Gemini,
    Dummy,
}

impl FromStr for TextModelKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "gemini" => Ok(Self::Gemini),
            "dummy" => Ok(Self::Dummy),
            other => Err(Error::Inference(format!(
                "unknown text model '{}', expected gemini or dummy",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageModelKind {
    Pollinations,
    Dummy,
}

impl FromStr for ImageModelKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "pollinations" => Ok(Self::Pollinations),
            "dummy" => Ok(Self::Dummy),
            other => Err(Error::Inference(format!(
                "unknown image model '{}', expected pollinations or dummy",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct InferenceConfig {
    pub text_model: TextModelKind,
    pub model_name: Option<String>,
    pub model_url: Option<String>,
    pub image_model: ImageModelKind,
    pub image_url: Option<String>,
    /// Run generated images through the vision audit.
    pub audit: bool,
    pub text_timeout: Duration,
    pub image_timeout: Duration,
    pub prompts: PromptTemplates,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            text_model: TextModelKind::Gemini,
            model_name: None,
            model_url: None,
            image_model: ImageModelKind::Pollinations,
            image_url: None,
            audit: true,
            text_timeout: Duration::from_secs(60),
            image_timeout: Duration::from_secs(60),
            prompts: PromptTemplates::default(),
        }
    }
}

/// Text, image and audit models for one run.
pub struct Models {
    pub text: Arc<dyn TextGenerator>,
    pub images: Arc<dyn ImageGenerator>,
    pub auditor: Arc<dyn ImageAuditor>,
}

/// Builds the text model. Gemini requires credentials and fails fast without them.
pub fn create_model(config: &InferenceConfig) -> Result<Arc<dyn TextGenerator>> {
    match config.text_model {
        TextModelKind::Gemini => {
            let ring = KeyRing::from_env()?;
            tracing::info!("🧠 Gemini ready with {} credential(s)", ring.len());
            let backend = GeminiBackend::new(
                config.model_name.clone(),
                config.model_url.clone(),
                config.text_timeout,
            )?;
            Ok(Arc::new(RotatingModel::new(backend, ring)))
        }
        TextModelKind::Dummy => Ok(Arc::new(DummyModel::new())),
    }
}

pub fn create_image_model(config: &InferenceConfig) -> Result<Arc<dyn ImageGenerator>> {
    match config.image_model {
        ImageModelKind::Pollinations => Ok(Arc::new(PollinationsImageModel::new(
            config.image_url.clone(),
            config.image_timeout,
        )?)),
        ImageModelKind::Dummy => Ok(Arc::new(DummyImageModel)),
    }
}

/// Vision audit only runs against Gemini; every other setup accepts all images.
pub fn create_auditor(config: &InferenceConfig) -> Result<Arc<dyn ImageAuditor>> {
    if !config.audit || config.text_model != TextModelKind::Gemini {
        return Ok(Arc::new(AcceptAll));
    }
    let backend = GeminiBackend::new(
        config.model_name.clone(),
        config.model_url.clone(),
        config.text_timeout,
    )?;
    Ok(Arc::new(GeminiAuditor::new(
        backend,
        KeyRing::from_env()?,
        &config.prompts,
    )))
}

pub fn create_models(config: &InferenceConfig) -> Result<Models> {
    Ok(Models {
        text: create_model(config)?,
        images: create_image_model(config)?,
        auditor: create_auditor(config)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_kind_parsing() {
        assert_eq!("Gemini".parse::<TextModelKind>().unwrap(), TextModelKind::Gemini);
        assert_eq!("dummy".parse::<ImageModelKind>().unwrap(), ImageModelKind::Dummy);
        assert!("ollama".parse::<TextModelKind>().is_err());
    }

    #[tokio::test]
    async fn test_offline_models() {
        let config = InferenceConfig {
            text_model: TextModelKind::Dummy,
            image_model: ImageModelKind::Dummy,
            ..InferenceConfig::default()
        };
        let models = create_models(&config).unwrap();
        assert_eq!(models.text.name(), "Dummy");
        assert_eq!(models.images.name(), "Dummy");
        assert!(models.auditor.audit(&[], "anything").await.unwrap().passed());
    }
}
