//! Classifier boundary
//!
//! The sorter only sees this trait. A classification either yields a
//! [`ClassificationResult`] or one of a closed set of [`ClassifyError`]s;
//! nothing else crosses into batch orchestration.

use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;

use crate::ai::gemini::types::ClassificationResult;

/// Why a single file could not be classified
#[derive(Debug, Error)]
pub enum ClassifyError {
    /// The file is not an image; skipped without contacting the service
    #[error("skipped non-image file ({mime})")]
    NotAnImage { mime: String },

    #[error("failed to read file: {0}")]
    Io(#[from] std::io::Error),

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("model returned no content")]
    EmptyResponse,

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("response is missing required field `{0}`")]
    MissingField(&'static str),
}

impl ClassifyError {
    /// Whether this is a deliberate skip rather than a service failure
    pub fn is_skip(&self) -> bool {
        matches!(self, Self::NotAnImage { .. })
    }
}

/// Classifies one document image
#[async_trait]
pub trait DocumentClassifier: Send + Sync {
    /// Classify the file at `path`. Makes a single attempt; never retries.
    async fn classify(&self, path: &Path) -> Result<ClassificationResult, ClassifyError>;
}
