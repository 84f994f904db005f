pub mod rendering;

use std::path::PathBuf;
use thiserror::Error;

pub use rendering::{FogParams, RenderConfig, RenderSettings};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Couldn't determine project directory")]
    NoProjectDirs,
    #[error("Config I/O failed for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}
