//! Error handling utilities for the doublewrap application.
//!
//! This module provides the central error type `AppError` which represents all
//! possible error conditions that might occur while driving the backup engine,
//! the transport and git, as well as the convenience type alias `AppResult`.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Represents the ways launching an external program can fail.
///
/// These errors occur before the child process runs at all. A program that
/// starts and then exits unsuccessfully is reported as
/// [`AppError::CommandFailed`] instead.
///
/// # Examples
///
/// ```
/// use doublewrap::errors::LaunchError;
/// use std::io::{self, ErrorKind};
///
/// let error = LaunchError::CommandNotFound {
///     program: "duplicity".to_string(),
///     source: io::Error::new(ErrorKind::NotFound, "No such file or directory"),
/// };
///
/// assert!(format!("{}", error).contains("not found"));
/// assert!(format!("{}", error).contains("duplicity"));
/// ```
#[derive(Debug, Error)]
pub enum LaunchError {
    /// The program does not exist or is not on the PATH.
    #[error("Program '{program}' not found: {source}. Please check that it is installed and available in your PATH.")]
    CommandNotFound {
        /// The program that was not found
        program: String,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },

    /// The program exists but may not be executed by this user.
    #[error("Permission denied when trying to execute '{program}': {source}")]
    PermissionDenied {
        /// The program that could not be executed
        program: String,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },

    /// Any other failure while spawning the child process.
    #[error("Failed to execute '{program}': {source}")]
    ExecutionFailed {
        /// The program that failed to start
        program: String,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },
}

impl LaunchError {
    /// Classifies a spawn error by its I/O error kind.
    pub fn from_spawn(program: &str, source: io::Error) -> Self {
        let program = program.to_string();
        match source.kind() {
            io::ErrorKind::NotFound => LaunchError::CommandNotFound { program, source },
            io::ErrorKind::PermissionDenied => LaunchError::PermissionDenied { program, source },
            _ => LaunchError::ExecutionFailed { program, source },
        }
    }
}

/// Represents all possible errors that can occur in the doublewrap application.
///
/// Note: This type does not implement `Clone` to avoid losing error context when
/// cloning `std::io::Error` values.
///
/// # Examples
///
/// ```
/// use doublewrap::errors::AppError;
///
/// let error = AppError::Config("keyid not found in [auth]".to_string());
/// assert_eq!(format!("{}", error), "Configuration error: keyid not found in [auth]");
/// ```
#[derive(Debug, Error)]
pub enum AppError {
    /// Missing or invalid settings in the configuration file.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Input/output errors from local filesystem operations.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// An external program could not be started.
    #[error("Launch error: {0}")]
    Launch(#[from] LaunchError),

    /// An external program ran and exited unsuccessfully.
    ///
    /// The exit code and standard error are carried verbatim. A child killed
    /// by a signal reports an exit code of -1.
    #[error("Command '{command}' exited with status {exit_code}: {stderr}")]
    CommandFailed {
        /// The command line that failed, without its environment
        command: String,
        /// The child's exit status
        exit_code: i32,
        /// Everything the child wrote to standard error
        stderr: String,
    },

    /// The transport could not reach the backup host.
    #[error("Remote host {host} is unreachable: {reason}")]
    RemoteUnreachable {
        /// The host that was contacted
        host: String,
        /// What the transport reported
        reason: String,
    },

    /// A remote mkdir reported success but the directory never appeared.
    #[error("Unable to create {name} in '{parent}' at remote")]
    RemoteDirectoryCreateFailed {
        /// Directory in which creation was attempted
        parent: String,
        /// Name of the directory that should exist
        name: String,
    },

    /// History reconstruction needs an empty or missing working directory.
    #[error("{} exists and is not empty", path.display())]
    TargetNotEmpty {
        /// The offending directory
        path: PathBuf,
    },

    /// A restore target that would land outside the history repository.
    #[error("Restore target {} is outside repository {}", path.display(), repository.display())]
    InvalidTarget {
        /// The requested target
        path: PathBuf,
        /// The repository it must live in
        repository: PathBuf,
    },
}

impl AppError {
    /// Renders the error on a single line for terminal output.
    ///
    /// Multi-line standard error captured from children is folded with `"; "`.
    pub fn one_line(&self) -> String {
        self.to_string()
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// A type alias for `Result<T, AppError>` to simplify function signatures.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_error_from_io_error() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let app_error: AppError = io_error.into();

        match app_error {
            AppError::Io(inner) => {
                assert_eq!(inner.kind(), io::ErrorKind::NotFound);
            }
            _ => panic!("Expected AppError::Io variant"),
        }
    }

    #[test]
    fn test_launch_error_classification() {
        let not_found = LaunchError::from_spawn(
            "duplicity",
            io::Error::new(io::ErrorKind::NotFound, "missing"),
        );
        assert!(matches!(not_found, LaunchError::CommandNotFound { .. }));

        let denied = LaunchError::from_spawn(
            "ssh",
            io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(matches!(denied, LaunchError::PermissionDenied { .. }));
        assert!(format!("{}", denied).contains("ssh"));

        let other = LaunchError::from_spawn("git", io::Error::other("boom"));
        assert!(matches!(other, LaunchError::ExecutionFailed { .. }));
        assert!(format!("{}", other).contains("Failed to execute 'git'"));
    }

    #[test]
    fn test_app_error_display() {
        let error = AppError::CommandFailed {
            command: "duplicity verify".to_string(),
            exit_code: 1,
            stderr: "Difference found: File home/a/f has mtime".to_string(),
        };
        let message = format!("{}", error);
        assert!(message.contains("duplicity verify"));
        assert!(message.contains("status 1"));
        assert!(message.contains("Difference found"));

        let error = AppError::TargetNotEmpty {
            path: PathBuf::from("/tmp/history"),
        };
        assert_eq!(format!("{}", error), "/tmp/history exists and is not empty");

        let error = AppError::RemoteDirectoryCreateFailed {
            parent: "backups".to_string(),
            name: "laptop".to_string(),
        };
        assert_eq!(
            format!("{}", error),
            "Unable to create laptop in 'backups' at remote"
        );
    }

    #[test]
    fn test_one_line_folds_stderr() {
        let error = AppError::CommandFailed {
            command: "ssh -q host ls -1a".to_string(),
            exit_code: 2,
            stderr: "ls: cannot access 'x'\n\n  second line\n".to_string(),
        };
        let line = error.one_line();
        assert!(!line.contains('\n'));
        assert!(line.ends_with("ls: cannot access 'x'; second line"));
    }
}
