//! Remote directory queries over the transport.
//!
//! The backup host is reached by running single commands through the
//! transport client (`ssh -q [-p port] [user@]host <command>`). Every call
//! opens its own session.

use crate::constants::TRANSPORT_FAILURE_EXIT_CODE;
use crate::engine::Destination;
use crate::errors::{AppError, AppResult};
use crate::process::{CommandLine, CommandRunner};
use std::collections::BTreeSet;
use std::rc::Rc;
use tracing::info;

/// Lists and creates directories on the backup host.
pub struct RemoteShell {
    program: String,
    host: String,
    connection: Vec<String>,
    runner: Rc<dyn CommandRunner>,
}

impl RemoteShell {
    pub fn new(program: impl Into<String>, dest: &Destination, runner: Rc<dyn CommandRunner>) -> Self {
        let mut connection = vec!["-q".to_string()];
        if let Some(port) = dest.port {
            connection.push("-p".to_string());
            connection.push(port.to_string());
        }
        connection.push(dest.ssh_target());

        Self {
            program: program.into(),
            host: dest.host.clone(),
            connection,
            runner,
        }
    }

    fn remote_command(&self) -> CommandLine {
        CommandLine::new(self.program.as_str()).args(self.connection.iter().cloned())
    }

    /// Names of the entries in `dir`, or in the login directory when `None`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::RemoteUnreachable` when the transport cannot be
    /// started or reports a connection failure. A listing that fails on the
    /// remote side (e.g. a missing directory) surfaces as
    /// `AppError::CommandFailed`.
    pub fn list(&self, dir: Option<&str>) -> AppResult<BTreeSet<String>> {
        let mut cmd = self.remote_command().args(["ls", "-1a"]);
        if let Some(dir) = dir {
            cmd = cmd.arg(dir);
        }

        match self.runner.capture(&cmd) {
            Ok(lines) => Ok(lines.into_iter().filter(|l| !l.is_empty()).collect()),
            Err(AppError::Launch(e)) => Err(AppError::RemoteUnreachable {
                host: self.host.clone(),
                reason: e.to_string(),
            }),
            Err(AppError::CommandFailed {
                exit_code, stderr, ..
            }) if exit_code == TRANSPORT_FAILURE_EXIT_CODE => Err(AppError::RemoteUnreachable {
                host: self.host.clone(),
                reason: if stderr.trim().is_empty() {
                    format!("transport exited with status {}", exit_code)
                } else {
                    stderr.trim().to_string()
                },
            }),
            Err(e) => Err(e),
        }
    }

    /// Makes sure `parent/name` exists, creating it if needed.
    ///
    /// Returns `true` if the directory was already there and `false` if it
    /// was created by this call.
    ///
    /// # Errors
    ///
    /// Returns `AppError::RemoteDirectoryCreateFailed` if the directory is
    /// still missing after a successful `mkdir`.
    pub fn ensure(&self, parent: &str, name: &str) -> AppResult<bool> {
        let parent_dir = if parent.is_empty() { None } else { Some(parent) };

        if self.list(parent_dir)?.contains(name) {
            return Ok(true);
        }

        let target = match parent_dir {
            Some("/") => format!("/{}", name),
            Some(parent) => format!("{}/{}", parent.trim_end_matches('/'), name),
            None => name.to_string(),
        };
        info!("Creating {} on remote", target);
        self.runner
            .run(&self.remote_command().args(["mkdir", target.as_str()]))?;

        if !self.list(parent_dir)?.contains(name) {
            return Err(AppError::RemoteDirectoryCreateFailed {
                parent: parent.to_string(),
                name: name.to_string(),
            });
        }
        Ok(false)
    }
}
