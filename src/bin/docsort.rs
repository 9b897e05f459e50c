//! Sort scanned documents into folders by type.
//!
//! Usage:
//!     docsort ./inbox --output-directory ./sorted_documents

use clap::builder::RangedU64ValueParser;
use clap::Parser;
use docsort_lib::ai::credentials::load_dotenv;
use docsort_lib::sorter::{SortOutcome, SortSummary, DEFAULT_CONCURRENCY, FAILED_DIR_NAME};
use docsort_lib::{init_tracing, ConflictPolicy, GeminiClient, GeminiConfig, SortConfig, Sorter};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(
    name = "docsort",
    version,
    about = "Classify document images with Gemini and file them by type and serial number"
)]
struct Args {
    /// Directory containing the documents to sort
    input_directory: PathBuf,

    /// Where sorted folders are created
    #[arg(
        short = 'o',
        long = "output-directory",
        visible_alias = "output-dir",
        default_value = "sorted_documents"
    )]
    output_directory: PathBuf,

    /// Maximum classifications in flight
    #[arg(
        short = 'j',
        long,
        default_value_t = DEFAULT_CONCURRENCY,
        value_parser = RangedU64ValueParser::<usize>::new().range(1..)
    )]
    concurrency: usize,

    /// What to do when a sorted file name is already taken
    #[arg(long, value_enum, default_value_t = ConflictPolicy::Overwrite)]
    on_collision: ConflictPolicy,

    /// Debug logging for this tool
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    load_dotenv();
    let args = Args::parse();
    init_tracing(args.verbose);

    let gemini = match GeminiConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    tracing::debug!(base_url = %gemini.base_url, "Using Gemini");

    let client = GeminiClient::new(gemini);
    tracing::info!(model = client.model(), "Classifying with Gemini");

    let sorter = Sorter::new(
        Arc::new(client),
        SortConfig {
            concurrency: args.concurrency,
            on_collision: args.on_collision,
        },
    );

    println!(
        "Sorting '{}' into '{}'",
        args.input_directory.display(),
        args.output_directory.display()
    );

    match sorter.sort(&args.input_directory, &args.output_directory).await {
        Ok(summary) => {
            print_summary(&summary);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn print_summary(summary: &SortSummary) {
    for report in &summary.reports {
        let name = report
            .source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        match &report.outcome {
            SortOutcome::Sorted { destination } => {
                println!("  {} -> {}", name, destination.display());
            }
            SortOutcome::Failed {
                reason,
                destination: Some(destination),
            } => {
                println!("  {} -> {} ({})", name, destination.display(), reason);
            }
            SortOutcome::Failed {
                reason,
                destination: None,
            } => {
                println!("  {} left in place ({})", name, reason);
            }
        }
    }

    println!("--- Processing Complete ---");
    println!("Successfully moved and sorted: {} files.", summary.success_count);
    println!(
        "Failed or skipped: {} files (moved to '{}' folder).",
        summary.failure_count, FAILED_DIR_NAME
    );
}
