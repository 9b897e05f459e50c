//! Moving files to their destination

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Policy for handling a destination that already exists
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum ConflictPolicy {
    /// Replace the existing file (plain rename semantics)
    #[default]
    Overwrite,
    /// Generate unique name (_1, _2, etc.) and proceed
    AutoRename,
    /// Refuse the move; the document is routed to the failed folder
    Fail,
}

#[derive(Debug, Error)]
pub enum PlacementError {
    #[error("failed to create directory '{}': {source}", .path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("destination '{}' already exists", .0.display())]
    DestinationExists(PathBuf),

    #[error("failed to move to '{}': {source}", .destination.display())]
    Move {
        destination: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Move `source` to `destination`, creating the parent directory if needed.
///
/// Returns the path the file actually landed at, which differs from
/// `destination` only under [`ConflictPolicy::AutoRename`].
pub fn place(
    source: &Path,
    destination: PathBuf,
    policy: ConflictPolicy,
) -> Result<PathBuf, PlacementError> {
    if let Some(parent) = destination.parent() {
        // create_dir_all tolerates concurrent creators of the same directory
        fs::create_dir_all(parent).map_err(|source| PlacementError::CreateDir {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let destination = match policy {
        ConflictPolicy::Overwrite => destination,
        ConflictPolicy::AutoRename => unique_destination(destination),
        ConflictPolicy::Fail if destination.exists() => {
            return Err(PlacementError::DestinationExists(destination))
        }
        ConflictPolicy::Fail => destination,
    };

    move_file(source, &destination).map_err(|source| PlacementError::Move {
        destination: destination.clone(),
        source,
    })?;

    Ok(destination)
}

/// Rename, falling back to copy + delete (e.g. across filesystems)
pub fn move_file(source: &Path, destination: &Path) -> io::Result<()> {
    move_file_with(source, destination, |from, to| fs::rename(from, to))
}

fn move_file_with<R>(source: &Path, destination: &Path, rename: R) -> io::Result<()>
where
    R: FnOnce(&Path, &Path) -> io::Result<()>,
{
    match rename(source, destination) {
        Ok(()) => Ok(()),
        Err(rename_err) => {
            if !source.is_file() {
                return Err(rename_err);
            }
            fs::copy(source, destination)?;
            fs::remove_file(source)
        }
    }
}

/// First free path among `name.ext`, `name_1.ext`, `name_2.ext`, ...
pub fn unique_destination(path: PathBuf) -> PathBuf {
    if !path.exists() {
        return path;
    }

    let parent = path.parent().map(Path::to_path_buf).unwrap_or_default();
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    let mut counter = 1u32;
    loop {
        let candidate = parent.join(format!("{}_{}{}", stem, counter, ext));
        if !candidate.exists() {
            return candidate;
        }
        counter += 1;
    }
}
