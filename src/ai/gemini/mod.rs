//! Gemini vision classifier
//!
//! ```text
//! path ──► vision::image_mime_type ──► upload (Files API)
//!                                        │
//!            parse_classification ◄── generateContent
//!                                        │
//!                                     delete staged file
//! ```

mod client;
mod utils;
mod vision;

pub mod types;

pub use client::{parse_classification, GeminiClient, StagedFile};
pub use types::{ClassificationResult, DocumentType, GeminiConfig, NOT_AVAILABLE};
pub use vision::{guess_mime_type, image_mime_type};
