//! Sorter
//!
//! Classifies every file directly inside an input directory through a
//! bounded worker pool and moves each one to exactly one terminal place:
//!
//! - `output/<type>/<type>_<serial><.ext>` when the classification is
//!   confident (known type AND a serial number)
//! - `output/_failed_to_process/<original name>` otherwise
//!
//! Workers only classify; moves happen as results come in, so no two moves
//! ever race on the same destination.

pub mod naming;
pub mod placement;

use futures::stream::{FuturesUnordered, StreamExt};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

use crate::ai::{ClassificationResult, DocumentClassifier};
use crate::config::{ensure_dir, require_dir, ConfigError};

pub use placement::ConflictPolicy;

/// Folder (under the output directory) for everything that could not be sorted
pub const FAILED_DIR_NAME: &str = "_failed_to_process";

/// Default number of classifications in flight
pub const DEFAULT_CONCURRENCY: usize = 5;

/// Configuration for a sorter run
#[derive(Debug, Clone)]
pub struct SortConfig {
    /// Maximum concurrent classifications
    pub concurrency: usize,
    /// How to handle "destination already exists"
    pub on_collision: ConflictPolicy,
}

impl Default for SortConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            on_collision: ConflictPolicy::default(),
        }
    }
}

/// Terminal state of one input file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SortOutcome {
    /// Filed under its type folder
    Sorted { destination: PathBuf },
    /// Routed to the failed folder; `destination` is `None` if even that move failed
    Failed {
        reason: String,
        destination: Option<PathBuf>,
    },
}

impl SortOutcome {
    pub fn is_sorted(&self) -> bool {
        matches!(self, Self::Sorted { .. })
    }
}

/// Outcome for a single source file
#[derive(Debug, Clone)]
pub struct FileReport {
    pub source: PathBuf,
    pub outcome: SortOutcome,
}

/// Result of a sorter run
#[derive(Debug, Clone, Default)]
pub struct SortSummary {
    pub success_count: usize,
    pub failure_count: usize,
    /// One report per input file, in completion order
    pub reports: Vec<FileReport>,
}

impl SortSummary {
    fn record(&mut self, report: FileReport) {
        if report.outcome.is_sorted() {
            self.success_count += 1;
        } else {
            self.failure_count += 1;
        }
        self.reports.push(report);
    }

    pub fn total(&self) -> usize {
        self.reports.len()
    }
}

/// Regular files directly inside `dir`, sorted by name. No recursion.
pub fn list_input_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(false)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(error = %e, "Skipping unreadable directory entry");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .collect();
    files.sort();
    files
}

/// Classifies and files documents
pub struct Sorter {
    classifier: Arc<dyn DocumentClassifier>,
    config: SortConfig,
}

impl Sorter {
    pub fn new(classifier: Arc<dyn DocumentClassifier>, config: SortConfig) -> Self {
        Self { classifier, config }
    }

    /// Sort every file in `input_dir` into `output_dir`.
    ///
    /// Only a missing input directory or an uncreatable output directory is
    /// an error; per-file problems end up in the summary.
    pub async fn sort(
        &self,
        input_dir: &Path,
        output_dir: &Path,
    ) -> Result<SortSummary, ConfigError> {
        require_dir(input_dir)?;
        ensure_dir(output_dir)?;
        let failed_dir = output_dir.join(FAILED_DIR_NAME);
        ensure_dir(&failed_dir)?;

        let files = list_input_files(input_dir);
        let total = files.len();
        if total == 0 {
            info!(input = %input_dir.display(), "No files to process");
            return Ok(SortSummary::default());
        }

        let concurrency = self.config.concurrency.max(1);
        info!(
            files = total,
            workers = concurrency,
            input = %input_dir.display(),
            output = %output_dir.display(),
            "Processing files"
        );

        let semaphore = Arc::new(Semaphore::new(concurrency));
        let mut pending = FuturesUnordered::new();

        for path in files {
            let sem = Arc::clone(&semaphore);
            let classifier = Arc::clone(&self.classifier);
            let task_path = path.clone();

            let handle = tokio::spawn(async move {
                let _permit = sem.acquire_owned().await.ok();
                debug!(file = %task_path.display(), "Analyzing");
                classifier.classify(&task_path).await
            });

            pending.push(async move { (path, handle.await) });
        }

        let mut summary = SortSummary::default();
        while let Some((source, joined)) = pending.next().await {
            let verdict = match joined {
                Ok(Ok(result)) => Ok(result),
                Ok(Err(e)) => Err(e.to_string()),
                Err(e) => Err(format!("classification task failed: {}", e)),
            };

            let outcome = self.file_document(&source, output_dir, &failed_dir, verdict);
            let done = summary.total() + 1;
            match &outcome {
                SortOutcome::Sorted { destination } => info!(
                    done,
                    total,
                    file = %display_name(&source),
                    destination = %destination.display(),
                    "Sorted"
                ),
                SortOutcome::Failed { reason, .. } => warn!(
                    done,
                    total,
                    file = %display_name(&source),
                    reason = %reason,
                    "Could not sort; moved to failed folder"
                ),
            }

            summary.record(FileReport { source, outcome });
        }

        info!(
            sorted = summary.success_count,
            failed = summary.failure_count,
            "Processing complete"
        );
        Ok(summary)
    }

    fn file_document(
        &self,
        source: &Path,
        output_dir: &Path,
        failed_dir: &Path,
        verdict: Result<ClassificationResult, String>,
    ) -> SortOutcome {
        let reason = match verdict {
            Ok(result) => match result.rejection_reason() {
                None => {
                    let destination = naming::sorted_destination(output_dir, &result, source);
                    match placement::place(source, destination, self.config.on_collision) {
                        Ok(destination) => return SortOutcome::Sorted { destination },
                        Err(e) => e.to_string(),
                    }
                }
                Some(reason) => reason.to_string(),
            },
            Err(reason) => reason,
        };

        self.file_failed(source, failed_dir, reason)
    }

    fn file_failed(&self, source: &Path, failed_dir: &Path, reason: String) -> SortOutcome {
        // The failed folder must never refuse a file.
        let policy = match self.config.on_collision {
            ConflictPolicy::Overwrite => ConflictPolicy::Overwrite,
            ConflictPolicy::AutoRename | ConflictPolicy::Fail => ConflictPolicy::AutoRename,
        };
        let destination = failed_dir.join(source.file_name().unwrap_or_default());

        match placement::place(source, destination, policy) {
            Ok(destination) => SortOutcome::Failed {
                reason,
                destination: Some(destination),
            },
            Err(e) => {
                error!(
                    file = %source.display(),
                    error = %e,
                    "Failed to move file to failed folder"
                );
                SortOutcome::Failed {
                    reason: format!("{}; could not move to failed folder: {}", reason, e),
                    destination: None,
                }
            }
        }
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
