pub mod classifier;
pub mod credentials;
pub mod gemini;
pub mod http_client;
pub mod prompts;

pub use classifier::*;
pub use gemini::{ClassificationResult, DocumentType, GeminiClient, GeminiConfig};
