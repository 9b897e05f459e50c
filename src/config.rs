//! Startup configuration errors and directory bootstrapping

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Fatal configuration problems, reported before any processing starts
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(
        "API_KEY not found. Set API_KEY (or GEMINI_API_KEY) in the environment or in a .env file next to where you run the command"
    )]
    MissingApiKey,

    #[error("input directory '{}' not found", .0.display())]
    InputNotFound(PathBuf),

    #[error("failed to create directory '{}': {source}", .path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Create `path` and its parents if missing
pub fn ensure_dir(path: &Path) -> Result<(), ConfigError> {
    std::fs::create_dir_all(path).map_err(|source| ConfigError::CreateDir {
        path: path.to_path_buf(),
        source,
    })
}

/// Fail unless `path` is an existing directory
pub fn require_dir(path: &Path) -> Result<(), ConfigError> {
    if path.is_dir() {
        Ok(())
    } else {
        Err(ConfigError::InputNotFound(path.to_path_buf()))
    }
}
