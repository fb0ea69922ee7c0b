pub mod error;
pub mod models;
pub mod storage;
pub mod text;
pub mod types;

pub use error::{classify_error_text, Error, Result};
pub use models::{AcceptAll, AuditVerdict, ImageAuditor, ImageGenerator, TextGenerator};
pub use storage::{ArticleStorage, ImageCache, InsertOutcome};
pub use types::{
    ArticleData, ArticleIndexFile, ArticleKind, ArticleRecord, Draft, ImageStats, Section, Topic,
};
