//! The git working tree that receives reconstructed history.

use crate::constants::{COMMIT_TIME_FORMAT, HISTORY_COMMITTER};
use crate::errors::AppResult;
use crate::process::{CommandLine, CommandRunner};
use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tracing::debug;

/// Index status codes that mean the staged tree differs from `HEAD`.
const STAGED_CHANGE_CODES: &[char] = &['M', 'A', 'D', 'R', 'T'];

/// Thin wrapper over the `git` command line, rooted at one directory.
pub struct GitRepo {
    program: String,
    dir: PathBuf,
    runner: Rc<dyn CommandRunner>,
}

impl GitRepo {
    pub fn new(program: impl Into<String>, dir: impl Into<PathBuf>, runner: Rc<dyn CommandRunner>) -> Self {
        Self {
            program: program.into(),
            dir: dir.into(),
            runner,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn git(&self) -> CommandLine {
        CommandLine::new(self.program.as_str()).current_dir(self.dir.as_path())
    }

    /// Creates the repository and sets the fixed committer identity.
    pub fn init(&self) -> AppResult<()> {
        self.runner.run(&self.git().args(["init", "-q"]))?;
        self.runner
            .run(&self.git().args(["config", "user.name", HISTORY_COMMITTER]))?;
        self.runner
            .run(&self.git().args(["config", "user.email", HISTORY_COMMITTER]))
    }

    /// Stages `path`, including removals below it.
    pub fn add(&self, path: &Path) -> AppResult<()> {
        self.runner
            .run(&self.git().args(["add", "--"]).arg(path.to_string_lossy().into_owned()))
    }

    /// Whether the staged state of `path` differs from `HEAD`.
    pub fn has_staged_change(&self, path: &Path) -> AppResult<bool> {
        let lines = self.runner.capture(
            &self
                .git()
                .args(["status", "--porcelain=v2", "--"])
                .arg(path.to_string_lossy().into_owned()),
        )?;
        Ok(staged_change(&lines))
    }

    /// Commits everything staged as the state observed at `time`.
    ///
    /// Author and committer dates are set to `time` so the same snapshots
    /// always produce the same history.
    pub fn commit(&self, time: &DateTime<Local>) -> AppResult<()> {
        let message = commit_message(time);
        let date = time.format("%s %z").to_string();
        debug!("Committing '{}'", message);
        self.runner.run(
            &self
                .git()
                .args(["commit", "-q", "-m"])
                .arg(message)
                .env("GIT_AUTHOR_DATE", date.as_str())
                .env("GIT_COMMITTER_DATE", date),
        )
    }
}

/// `Time: <ctime>` message of the commit for a snapshot.
pub fn commit_message(time: &DateTime<Local>) -> String {
    format!("Time: {}", time.format(COMMIT_TIME_FORMAT))
}

/// Reads `git status --porcelain=v2` output.
///
/// Ordinary (`1`) and rename/copy (`2`) entries carry an `XY` field where
/// `.` means unchanged; only the index side `X` is inspected. Untracked,
/// ignored and unmerged entries never count.
pub fn staged_change<S: AsRef<str>>(lines: &[S]) -> bool {
    lines.iter().any(|line| {
        let mut fields = line.as_ref().split(' ');
        match (fields.next(), fields.next()) {
            (Some("1") | Some("2"), Some(xy)) => xy
                .chars()
                .next()
                .map_or(false, |x| STAGED_CHANGE_CODES.contains(&x)),
            _ => false,
        }
    })
}
