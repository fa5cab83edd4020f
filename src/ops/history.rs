//! Reconstruction of a file's history from the backup chain.
//!
//! Every snapshot in the chain that contains the file is restored into a git
//! working tree in chain order. A commit is made whenever the restored state
//! differs from the previous commit, so the resulting log holds one commit per
//! distinct version, dated at the snapshot that first held it.

use crate::engine::{restore_time_arg, Duplicity};
use crate::errors::{AppError, AppResult};
use crate::vcs::GitRepo;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info};

/// Summary of a completed reconstruction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HistoryReport {
    /// Snapshots reported by the engine
    pub examined: usize,
    /// Snapshots that contained the file
    pub present: usize,
    /// Commits written to the repository
    pub commits: usize,
}

/// Replays every version of `file` into `repo` at `target`.
///
/// `file` names the backed-up path; a leading `/` is optional. `target` is
/// relative to the repository or an absolute path inside it.
///
/// # Errors
///
/// Returns `AppError::InvalidTarget` when `target` escapes the repository and
/// `AppError::TargetNotEmpty` when the repository directory already has
/// content. Both are checked before any command runs. Any later failure stops
/// the reconstruction with the commits made so far left in place.
pub fn restore_history(
    engine: &Duplicity,
    repo: &GitRepo,
    file: &str,
    target: &Path,
) -> AppResult<HistoryReport> {
    let file = file.trim_start_matches('/');
    let relative = relative_target(repo.dir(), target)?;
    prepare_repository(repo.dir())?;

    repo.init()?;
    let mut report = HistoryReport::default();
    let restored = repo.dir().join(&relative);

    for time in engine.chain_timestamps()? {
        report.examined += 1;
        if !engine.file_at_timestamp(file, &time)? {
            debug!("{} is not in the snapshot of {}", file, time);
            continue;
        }
        report.present += 1;

        remove_artifact(&restored)?;
        if let Some(parent) = restored.parent() {
            fs::create_dir_all(parent)?;
        }
        engine.restore(&restored, Some(file), Some(&restore_time_arg(&time)))?;
        repo.add(&relative)?;

        if repo.has_staged_change(&relative)? {
            repo.commit(&time)?;
            report.commits += 1;
            info!("Recorded version of {} from {}", file, time);
        } else {
            debug!("{} unchanged at {}", file, time);
        }
    }

    info!(
        "Reconstructed {} versions of {} from {} snapshots ({} contained it)",
        report.commits, file, report.examined, report.present
    );
    Ok(report)
}

/// Resolves `target` to a non-empty path below the repository root.
fn relative_target(repository: &Path, target: &Path) -> AppResult<PathBuf> {
    let invalid = || AppError::InvalidTarget {
        path: target.to_path_buf(),
        repository: repository.to_path_buf(),
    };

    let relative = if target.is_absolute() {
        target.strip_prefix(repository).map_err(|_| invalid())?
    } else {
        target
    };

    let mut clean = PathBuf::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => clean.push(part),
            Component::CurDir => {}
            _ => return Err(invalid()),
        }
    }
    if clean.as_os_str().is_empty() {
        return Err(invalid());
    }
    Ok(clean)
}

/// Creates the repository directory, which must be missing or empty.
fn prepare_repository(dir: &Path) -> AppResult<()> {
    match fs::read_dir(dir) {
        Ok(mut entries) => {
            if entries.next().is_some() {
                return Err(AppError::TargetNotEmpty {
                    path: dir.to_path_buf(),
                });
            }
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            fs::create_dir_all(dir)?;
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

/// Removes whatever a previous step restored at `path`.
fn remove_artifact(path: &Path) -> AppResult<()> {
    let metadata = match fs::symlink_metadata(path) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e.into()),
    };
    if metadata.is_dir() {
        fs::remove_dir_all(path)?;
    } else {
        fs::remove_file(path)?;
    }
    Ok(())
}
