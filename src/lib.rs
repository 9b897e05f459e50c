pub mod ai;
pub mod config;
pub mod jobs;
pub mod services;
pub mod sorter;

pub use ai::{ClassificationResult, DocumentClassifier, DocumentType, GeminiClient, GeminiConfig};
pub use config::ConfigError;
pub use sorter::{ConflictPolicy, SortConfig, SortOutcome, SortSummary, Sorter};

use tracing_subscriber::EnvFilter;

/// Default filter: warn for dependencies, info for our crates
const DEFAULT_LOG_FILTER: &str = "warn,docsort_lib=info,docsort=info,docsort_watch=info";
const VERBOSE_LOG_FILTER: &str = "warn,docsort_lib=debug,docsort=debug,docsort_watch=debug";

/// Initialize tracing. `RUST_LOG` wins when set.
pub fn init_tracing(verbose: bool) {
    let fallback = if verbose {
        VERBOSE_LOG_FILTER
    } else {
        DEFAULT_LOG_FILTER
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback)),
        )
        .with_writer(std::io::stderr)
        .init();
}
