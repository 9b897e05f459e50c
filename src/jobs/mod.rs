//! Batch jobs triggered by the watcher
//!
//! The watcher only knows [`BatchJob`]: run once against (input, output),
//! report success or failure. [`ProcessorJob`] is the production
//! implementation and launches the sorter binary as a child process.

use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Output;
use std::time::{Duration, Instant};
use thiserror::Error;

/// How often a running child is checked against its timeout
const TIMEOUT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Captured result of a successful job run
#[derive(Debug, Clone, Default)]
pub struct JobReport {
    pub stdout: String,
    pub stderr: String,
    pub elapsed: Duration,
}

#[derive(Debug, Error)]
pub enum JobError {
    #[error("processor '{}' not found", .0.display())]
    NotFound(PathBuf),

    #[error("failed to start processor '{}': {source}", .program.display())]
    Spawn {
        program: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("processor exited with {}", exit_label(*.code))]
    Exited { code: Option<i32>, stderr: String },

    #[error("processor timed out after {}s", .0.as_secs())]
    TimedOut(Duration),

    #[error("I/O error while waiting for processor: {0}")]
    Io(#[from] io::Error),

    #[error("job task failed: {0}")]
    Task(String),
}

fn exit_label(code: Option<i32>) -> String {
    match code {
        Some(code) => format!("status {}", code),
        None => "no status (terminated by signal)".to_string(),
    }
}

impl JobError {
    /// Captured stderr, when the process got far enough to write any
    pub fn stderr(&self) -> Option<&str> {
        match self {
            Self::Exited { stderr, .. } if !stderr.trim().is_empty() => Some(stderr),
            _ => None,
        }
    }
}

/// One batch run over a directory. Implementations block until done.
pub trait BatchJob: Send + Sync {
    fn run(&self, input_dir: &Path, output_dir: &Path) -> Result<JobReport, JobError>;

    /// Short description for logs
    fn describe(&self) -> String;
}

/// Runs `<program> <input_dir> --output-directory <output_dir>`
#[derive(Debug, Clone)]
pub struct ProcessorJob {
    program: PathBuf,
    timeout: Option<Duration>,
}

impl ProcessorJob {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            timeout: None,
        }
    }

    /// Kill the child if it runs longer than `timeout`
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// A bare name like `docsort` has no directory part and is looked up on `PATH`
    fn is_bare_name(&self) -> bool {
        self.program
            .parent()
            .map(|parent| parent.as_os_str().is_empty())
            .unwrap_or(false)
    }

    fn expression(&self, input_dir: &Path, output_dir: &Path) -> duct::Expression {
        let args = Self::args(input_dir, output_dir);
        // duct anchors a `Path` to the working directory; an `OsStr` is searched on `PATH`
        if self.is_bare_name() {
            duct::cmd(self.program.as_os_str(), args)
        } else {
            duct::cmd(&self.program, args)
        }
    }

    fn args(input_dir: &Path, output_dir: &Path) -> Vec<OsString> {
        vec![
            input_dir.as_os_str().to_owned(),
            OsString::from("--output-directory"),
            output_dir.as_os_str().to_owned(),
        ]
    }

    fn wait_with_timeout(handle: &duct::Handle, timeout: Duration) -> Result<Output, JobError> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(output) = handle.try_wait()? {
                return Ok(output.clone());
            }
            if Instant::now() >= deadline {
                return Err(timed_out(handle.kill(), timeout));
            }
            std::thread::sleep(TIMEOUT_POLL_INTERVAL);
        }
    }
}

impl BatchJob for ProcessorJob {
    fn run(&self, input_dir: &Path, output_dir: &Path) -> Result<JobReport, JobError> {
        let started = Instant::now();

        let handle = self
            .expression(input_dir, output_dir)
            .stdout_capture()
            .stderr_capture()
            .unchecked()
            .start()
            .map_err(|source| {
                if source.kind() == io::ErrorKind::NotFound {
                    JobError::NotFound(self.program.clone())
                } else {
                    JobError::Spawn {
                        program: self.program.clone(),
                        source,
                    }
                }
            })?;

        let output = match self.timeout {
            Some(timeout) => Self::wait_with_timeout(&handle, timeout)?,
            None => handle.wait()?.clone(),
        };

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if !output.status.success() {
            return Err(JobError::Exited {
                code: output.status.code(),
                stderr,
            });
        }

        Ok(JobReport {
            stdout,
            stderr,
            elapsed: started.elapsed(),
        })
    }

    fn describe(&self) -> String {
        self.program.display().to_string()
    }
}

/// A timeout stays a timeout even if the child could not be killed
fn timed_out(kill: io::Result<()>, timeout: Duration) -> JobError {
    if let Err(e) = kill {
        tracing::warn!(error = %e, "Failed to kill timed-out processor");
    }
    JobError::TimedOut(timeout)
}

/// The `docsort` binary next to the running executable, else `docsort` on PATH
pub fn default_processor_program() -> PathBuf {
    let name = format!("docsort{}", std::env::consts::EXE_SUFFIX);
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(&name)))
        .filter(|candidate| candidate.is_file())
        .unwrap_or_else(|| PathBuf::from(name))
}
