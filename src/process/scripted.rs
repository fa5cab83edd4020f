//! Scripted [`CommandRunner`] used by unit tests.

use super::{CommandLine, CommandRunner, Lines};
use crate::errors::AppResult;
use std::cell::RefCell;

/// Canned outcome of one command.
pub(crate) struct Reply {
    pub stdout: Vec<String>,
    pub exit_code: i32,
    pub stderr: String,
}

impl Reply {
    pub fn ok<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Reply {
            stdout: lines.into_iter().map(Into::into).collect(),
            exit_code: 0,
            stderr: String::new(),
        }
    }

    pub fn empty() -> Self {
        Self::ok(Vec::<String>::new())
    }

    pub fn fail(exit_code: i32, stderr: &str) -> Self {
        Reply {
            stdout: Vec::new(),
            exit_code,
            stderr: stderr.to_string(),
        }
    }
}

/// Records every command and answers it from a closure.
pub(crate) struct ScriptedRunner {
    calls: RefCell<Vec<CommandLine>>,
    handler: RefCell<Box<dyn FnMut(&CommandLine) -> Reply>>,
}

impl ScriptedRunner {
    pub fn new(handler: impl FnMut(&CommandLine) -> Reply + 'static) -> Self {
        Self {
            calls: RefCell::new(Vec::new()),
            handler: RefCell::new(Box::new(handler)),
        }
    }

    /// Every command seen so far, rendered without its environment.
    pub fn commands(&self) -> Vec<String> {
        self.calls.borrow().iter().map(|c| c.to_string()).collect()
    }

    pub fn calls(&self) -> Vec<CommandLine> {
        self.calls.borrow().clone()
    }
}

impl CommandRunner for ScriptedRunner {
    fn stream(&self, cmd: &CommandLine) -> AppResult<Lines> {
        self.calls.borrow_mut().push(cmd.clone());
        let reply = (self.handler.borrow_mut())(cmd);
        Ok(Lines::replay(cmd, reply.stdout, reply.exit_code, reply.stderr))
    }
}
