pub mod analysis;
pub mod canvas;
pub mod config;
pub mod error;
pub mod export;
pub mod library;
pub mod project;
pub mod store;
pub mod types;

pub use analysis::*;
pub use canvas::*;
pub use config::{
    CanvasConfig, ConfigManager, LibraryConfig, LogFormat, LoggingConfig, ServerConfig, Settings,
};
pub use error::*;
pub use export::*;
pub use library::*;
pub use project::*;
pub use store::*;
pub use types::*;
