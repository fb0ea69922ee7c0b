pub mod credentials;
pub mod models;
pub mod prompts;
pub mod retry;
pub mod rotation;

pub use credentials::KeyRing;
pub use models::{
    create_auditor, create_image_model, create_model, create_models, ImageModelKind,
    InferenceConfig, Models, TextModelKind,
};
pub use prompts::PromptTemplates;
pub use retry::RetryPolicy;
pub use rotation::{call_with_rotation, generate_with_rotation, KeyedTextBackend, RotatingModel};

pub mod prelude {
    pub use super::{InferenceConfig, KeyRing, PromptTemplates, RetryPolicy};
    pub use super::models::create_model;
    pub use ab_core::{Error, ImageGenerator, Result, TextGenerator};
}
