//! Watch an inbox and run `docsort` once it has been quiet for a while.
//!
//! Usage:
//!     docsort-watch --watch-dir ./my_docs --output-dir ./finished --debounce 60

use clap::Parser;
use docsort_lib::config::ensure_dir;
use docsort_lib::init_tracing;
use docsort_lib::jobs::{default_processor_program, ProcessorJob};
use docsort_lib::services::{DebounceWatcher, WatcherConfig};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(
    name = "docsort-watch",
    version,
    about = "Run the document sorter on an inbox after a period of inactivity"
)]
struct Args {
    /// Directory to watch for new documents
    #[arg(long, default_value = "my_docs")]
    watch_dir: PathBuf,

    /// Processor to run (defaults to the docsort binary next to this one)
    #[arg(long)]
    processor_script: Option<PathBuf>,

    /// Output directory passed to the processor
    #[arg(long, default_value = "finished")]
    output_dir: PathBuf,

    /// Seconds without new files before the processor runs
    #[arg(long, default_value_t = 60)]
    debounce: u64,

    /// Seconds between countdown checks
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u64).range(1..))]
    poll_interval: u64,

    /// Kill the processor after this many seconds
    #[arg(long)]
    job_timeout: Option<u64>,

    /// Debug logging for this tool
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.verbose);

    for dir in [&args.watch_dir, &args.output_dir] {
        if let Err(e) = ensure_dir(dir) {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    }

    let program = args
        .processor_script
        .unwrap_or_else(default_processor_program);
    let job = ProcessorJob::new(program).with_timeout(args.job_timeout.map(Duration::from_secs));
    tracing::info!(processor = %job.program().display(), "Using processor");

    let config = WatcherConfig {
        watch_dir: args.watch_dir,
        output_dir: args.output_dir,
        debounce: Duration::from_secs(args.debounce),
        poll_interval: Duration::from_secs(args.poll_interval),
        ..WatcherConfig::default()
    };
    let watcher = DebounceWatcher::new(config, Arc::new(job));

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    match watcher.run(shutdown).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
