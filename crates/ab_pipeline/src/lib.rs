pub mod cli;
pub mod config;
pub mod images;
pub mod logging;
pub mod manager;
pub mod placeholders;
pub mod render;

pub use cli::{handle_command, HumanDuration, PipelineCommands};
pub use config::{OutputSchema, PipelineConfig};
pub use logging::{init_logging, Logger};
pub use manager::{PipelineManager, Published};

pub mod prelude {
    pub use super::{OutputSchema, PipelineConfig, PipelineManager};
    pub use ab_core::{Error, Result};
}
