pub mod audit;
pub mod resolver;
pub mod workshop;

pub use audit::audit_sections;
pub use resolver::{fallback_image_url, ImageResolver, Resolution, ResolvedImage, DEFAULT_IMAGE_KEY};
pub use workshop::{stock_image_url, GeneratedImage, ImageWorkshop};
