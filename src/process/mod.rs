//! External process execution with line-oriented output.
//!
//! Everything doublewrap does to the outside world (the backup engine, the
//! transport, git) goes through a [`CommandRunner`]. A runner turns a
//! [`CommandLine`] into a lazy stream of trimmed stdout [`Lines`]; the eager
//! helpers `run` and `capture` are built on top of that stream.
//!
//! A stream always reaps its child. Exhausting it, calling [`Lines::close`]
//! or simply dropping it all wait for the process and collect its stderr; a
//! nonzero exit becomes [`AppError::CommandFailed`]. Only `Drop` cannot return
//! that error, so it is logged instead.

use crate::constants::ENV_VAR_PASSPHRASE;
use crate::errors::{AppError, AppResult, LaunchError};
use std::fmt;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdout, Command, Stdio};
use std::thread::JoinHandle;
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

#[cfg(test)]
pub(crate) mod scripted;

/// A program invocation: argument vector, child environment and working directory.
///
/// The `Display` form is the program followed by its arguments and never
/// includes environment values, so it is safe to log and to embed in errors.
///
/// # Examples
///
/// ```
/// use doublewrap::process::CommandLine;
///
/// let cmd = CommandLine::new("git")
///     .arg("status")
///     .args(["--porcelain", "notes.txt"])
///     .env("TOKEN", "hunter2");
///
/// assert_eq!(cmd.to_string(), "git status --porcelain notes.txt");
/// ```
#[derive(Clone)]
pub struct CommandLine {
    program: String,
    args: Vec<String>,
    env: Vec<(String, Zeroizing<String>)>,
    cwd: Option<PathBuf>,
}

impl CommandLine {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
            cwd: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Adds a variable visible only to this child. Values are zeroized on drop
    /// and never shown by `Display` or `Debug`.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), Zeroizing::new(value.into())));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    pub fn get_cwd(&self) -> Option<&Path> {
        self.cwd.as_deref()
    }

    /// Looks up a variable set with [`CommandLine::env`].
    pub fn get_env(&self, key: &str) -> Option<&str> {
        self.env
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.as_str())
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

impl fmt::Debug for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let env_keys: Vec<&str> = self.env.iter().map(|(key, _)| key.as_str()).collect();
        f.debug_struct("CommandLine")
            .field("program", &self.program)
            .field("args", &self.args)
            .field("env", &env_keys)
            .field("cwd", &self.cwd)
            .finish()
    }
}

/// One producer of output lines for [`Lines`].
///
/// `finish` reaps whatever sits behind the source and reports its outcome. It
/// is called exactly once by [`Lines`].
pub trait LineSource {
    fn next_line(&mut self) -> Option<AppResult<String>>;
    fn finish(&mut self) -> AppResult<()>;
}

/// Lazy, pull-based stdout of one command.
///
/// Iterating yields `Ok(line)` for each trimmed stdout line. After the last
/// line, a failed command yields one final `Err`. Stopping early is fine:
/// [`Lines::close`] reaps the child and returns the failure, and dropping the
/// stream reaps it too.
pub struct Lines {
    source: Box<dyn LineSource>,
    finished: bool,
}

impl Lines {
    pub fn new(source: Box<dyn LineSource>) -> Self {
        Self {
            source,
            finished: false,
        }
    }

    /// A stream over output that has already been produced.
    ///
    /// This is how test doubles of [`CommandRunner`] answer a command: the
    /// lines are yielded as given and a nonzero `exit_code` surfaces as
    /// [`AppError::CommandFailed`] once the stream ends or is closed.
    pub fn replay(
        command: &CommandLine,
        stdout: Vec<String>,
        exit_code: i32,
        stderr: impl Into<String>,
    ) -> Self {
        Self::new(Box::new(ReplayedOutput {
            command: command.to_string(),
            lines: stdout.into_iter(),
            exit_code,
            stderr: stderr.into(),
        }))
    }

    /// Stops reading, reaps the command and reports how it ended.
    pub fn close(mut self) -> AppResult<()> {
        self.finish_once()
    }

    /// Consumes every remaining line.
    pub fn drain(self) -> AppResult<()> {
        for line in self {
            line?;
        }
        Ok(())
    }

    fn finish_once(&mut self) -> AppResult<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;
        self.source.finish()
    }
}

impl Iterator for Lines {
    type Item = AppResult<String>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.source.next_line() {
            Some(Ok(line)) => Some(Ok(line)),
            Some(Err(e)) => {
                // A read error ends the stream; the child is still reaped.
                if let Err(reap) = self.finish_once() {
                    warn!("Discarding failure after read error: {}", reap);
                }
                Some(Err(e))
            }
            None => self.finish_once().err().map(Err),
        }
    }
}

impl Drop for Lines {
    fn drop(&mut self) {
        if let Err(e) = self.finish_once() {
            warn!("Command failed after its output was abandoned: {}", e);
        }
    }
}

/// Executes command lines.
///
/// Implementors only provide [`CommandRunner::stream`]; the eager forms are
/// derived from it.
pub trait CommandRunner {
    /// Starts the command and returns its output as a lazy stream.
    fn stream(&self, cmd: &CommandLine) -> AppResult<Lines>;

    /// Runs the command to completion, discarding its output.
    fn run(&self, cmd: &CommandLine) -> AppResult<()> {
        self.stream(cmd)?.drain()
    }

    /// Runs the command to completion and collects its output lines.
    fn capture(&self, cmd: &CommandLine) -> AppResult<Vec<String>> {
        self.stream(cmd)?.collect()
    }
}

/// Runs commands as real child processes.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn stream(&self, cmd: &CommandLine) -> AppResult<Lines> {
        info!("Running command {}", cmd);

        let mut command = Command::new(cmd.program());
        command
            .args(cmd.get_args())
            .env_remove(ENV_VAR_PASSPHRASE)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        for (key, value) in &cmd.env {
            command.env(key, value.as_str());
        }
        if let Some(dir) = cmd.get_cwd() {
            command.current_dir(dir);
        }

        let mut child = command
            .spawn()
            .map_err(|e| LaunchError::from_spawn(cmd.program(), e))?;

        let stdout = child.stdout.take().map(BufReader::new);
        let stderr_reader = child.stderr.take().map(|mut pipe| {
            std::thread::spawn(move || {
                let mut buf = Vec::new();
                // A read error here only truncates the diagnostic text.
                let _ = pipe.read_to_end(&mut buf);
                String::from_utf8_lossy(&buf).into_owned()
            })
        });

        Ok(Lines::new(Box::new(ChildLines {
            program: cmd.program().to_string(),
            command: cmd.to_string(),
            child,
            stdout,
            stderr_reader,
        })))
    }
}

/// A running child whose stdout is read one line at a time.
struct ChildLines {
    program: String,
    command: String,
    child: Child,
    stdout: Option<BufReader<ChildStdout>>,
    stderr_reader: Option<JoinHandle<String>>,
}

impl ChildLines {
    fn read_line(&mut self) -> Option<AppResult<String>> {
        let reader = self.stdout.as_mut()?;
        let mut buf = Vec::new();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) => {
                self.stdout = None;
                None
            }
            Ok(_) => Some(Ok(String::from_utf8_lossy(&buf).trim().to_string())),
            Err(e) => {
                self.stdout = None;
                Some(Err(e.into()))
            }
        }
    }
}

impl LineSource for ChildLines {
    fn next_line(&mut self) -> Option<AppResult<String>> {
        let line = self.read_line();
        if let Some(Ok(text)) = &line {
            debug!(program = %self.program, "{}", text);
        }
        line
    }

    fn finish(&mut self) -> AppResult<()> {
        // Drain instead of closing the pipe so the exit status is the child's
        // own verdict rather than a broken pipe.
        while let Some(line) = self.read_line() {
            if let Ok(text) = line {
                debug!(program = %self.program, "{}", text);
            }
        }

        let stderr = self
            .stderr_reader
            .take()
            .map(|handle| handle.join().unwrap_or_default())
            .unwrap_or_default();
        let status = self.child.wait()?;

        if status.success() {
            Ok(())
        } else {
            Err(AppError::CommandFailed {
                command: self.command.clone(),
                exit_code: status.code().unwrap_or(-1),
                stderr,
            })
        }
    }
}

struct ReplayedOutput {
    command: String,
    lines: std::vec::IntoIter<String>,
    exit_code: i32,
    stderr: String,
}

impl LineSource for ReplayedOutput {
    fn next_line(&mut self) -> Option<AppResult<String>> {
        self.lines.next().map(|line| Ok(line.trim().to_string()))
    }

    fn finish(&mut self) -> AppResult<()> {
        if self.exit_code == 0 {
            Ok(())
        } else {
            Err(AppError::CommandFailed {
                command: self.command.clone(),
                exit_code: self.exit_code,
                stderr: std::mem::take(&mut self.stderr),
            })
        }
    }
}
