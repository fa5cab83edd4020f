//! Backup engine invocations.
//!
//! [`Duplicity`] turns the resolved destination, the configured sources and
//! the passphrase into engine command lines and runs them. The full versus
//! incremental decision, backup, restore, verify and listing live here; the
//! parsing of collection status lives in [`status`].

pub mod destination;
pub mod status;

pub use destination::Destination;
pub use status::{parse_snapshot_line, restore_time_arg, Snapshot, SnapshotKind};

use crate::constants::{
    DEFAULT_ENGINE_PROGRAM, ENGINE_PASSPHRASE_VAR, FULL_SIGNATURES_MARKER,
};
use crate::errors::AppResult;
use crate::passphrase::Passphrase;
use crate::process::{CommandLine, CommandRunner, Lines};
use crate::remote::RemoteShell;
use std::fmt;
use std::path::Path;
use std::rc::Rc;
use tracing::info;

/// Kind of backup the engine is asked to make.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackupMode {
    Full,
    Incremental,
}

impl BackupMode {
    /// Engine subcommand for this mode.
    pub fn subcommand(self) -> &'static str {
        match self {
            BackupMode::Full => "full",
            BackupMode::Incremental => "incr",
        }
    }
}

impl fmt::Display for BackupMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackupMode::Full => write!(f, "full"),
            BackupMode::Incremental => write!(f, "incremental"),
        }
    }
}

/// Drives the duplicity command line against one destination.
pub struct Duplicity {
    program: String,
    dest: Destination,
    sources: Vec<String>,
    verbosity: u8,
    passphrase: Passphrase,
    remote: RemoteShell,
    runner: Rc<dyn CommandRunner>,
}

impl Duplicity {
    pub fn new(
        dest: Destination,
        sources: Vec<String>,
        remote: RemoteShell,
        runner: Rc<dyn CommandRunner>,
    ) -> Self {
        Self {
            program: DEFAULT_ENGINE_PROGRAM.to_string(),
            dest,
            sources,
            verbosity: 0,
            passphrase: Passphrase::empty(),
            remote,
            runner,
        }
    }

    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub fn with_verbosity(mut self, verbosity: u8) -> Self {
        self.verbosity = verbosity;
        self
    }

    pub fn with_passphrase(mut self, passphrase: Passphrase) -> Self {
        self.passphrase = passphrase;
        self
    }

    pub fn destination(&self) -> &Destination {
        &self.dest
    }

    /// `<engine> <subcommand>` plus the key and verbosity arguments every
    /// invocation carries.
    fn base_command(&self, subcommand: &str) -> CommandLine {
        CommandLine::new(self.program.as_str())
            .arg(subcommand)
            .args(["--encrypt-key", self.dest.key_id.as_str()])
            .args(["--encrypt-sign-key", self.dest.key_id.as_str()])
            .args(["--verbosity".to_string(), self.verbosity.to_string()])
            .env(ENGINE_PASSPHRASE_VAR, self.passphrase.expose())
    }

    /// One `--include` per source followed by `--exclude /`.
    fn filespec(&self) -> Vec<String> {
        let mut spec = Vec::with_capacity(self.sources.len() * 2 + 2);
        for source in &self.sources {
            spec.push("--include".to_string());
            spec.push(source.clone());
        }
        spec.push("--exclude".to_string());
        spec.push("/".to_string());
        spec
    }

    /// Picks `Incremental` once the backup root holds a full signature set.
    ///
    /// This only checks for a file name containing
    /// `duplicity-full-signatures`; an incomplete signature file still counts.
    pub fn decide_mode(&self) -> AppResult<BackupMode> {
        let entries = self.remote.list(self.dest.root_dir())?;
        if entries.iter().any(|entry| entry.contains(FULL_SIGNATURES_MARKER)) {
            Ok(BackupMode::Incremental)
        } else {
            Ok(BackupMode::Full)
        }
    }

    /// Backs up every configured source, returning the mode that was used.
    ///
    /// `extra_args` go to the engine ahead of the file selection, e.g.
    /// `--gpg-options --trust-model=always`.
    pub fn backup(&self, extra_args: &[String]) -> AppResult<BackupMode> {
        let mode = self.decide_mode()?;
        info!("Starting {} backup of {} sources", mode, self.sources.len());

        let cmd = self
            .base_command(mode.subcommand())
            .args(extra_args.iter().cloned())
            .args(self.filespec())
            .arg("/")
            .arg(self.dest.url());
        self.runner.run(&cmd)?;
        Ok(mode)
    }

    /// Restores into `target`.
    ///
    /// Without `file` the whole backed-up tree is restored; without `time`
    /// the latest state is used. `file` is given the way the engine lists it
    /// (relative to `/`).
    pub fn restore(&self, target: &Path, file: Option<&str>, time: Option<&str>) -> AppResult<()> {
        let mut cmd = self.base_command("restore");
        if let Some(file) = file {
            cmd = cmd.args(["--file-to-restore", file]);
        }
        if let Some(time) = time {
            cmd = cmd.args(["--restore-time", time]);
        }
        let cmd = cmd
            .arg(self.dest.url())
            .arg(target.to_string_lossy().into_owned());
        self.runner.run(&cmd)
    }

    /// Compares the backup with the local sources.
    ///
    /// # Errors
    ///
    /// A difference makes the engine exit nonzero, which surfaces as
    /// `AppError::CommandFailed`.
    pub fn verify(&self) -> AppResult<()> {
        let cmd = self
            .base_command("verify")
            .args(self.filespec())
            .arg(self.dest.url())
            .arg("/");
        self.runner.run(&cmd)
    }

    /// Streams the engine's file listing, optionally at a past time.
    pub fn list_files(&self, time: Option<&str>) -> AppResult<Lines> {
        let mut cmd = self.base_command("list");
        if let Some(time) = time {
            cmd = cmd.args(["--restore-time", time]);
        }
        self.runner.stream(&cmd.arg(self.dest.url()))
    }

    /// Streams the raw collection status.
    pub fn collection_status(&self) -> AppResult<Lines> {
        let cmd = self.base_command("collection-status").arg(self.dest.url());
        self.runner.stream(&cmd)
    }
}
