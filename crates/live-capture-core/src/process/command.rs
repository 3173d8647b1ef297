use std::{fmt, path::PathBuf};

use serde::Serialize;

/// Part of a capture pipeline a child process plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessRole {
    /// Pulls the live stream.
    Fetcher,
    /// Cuts the fetched stream into numbered files.
    Segmenter,
}

impl fmt::Display for ProcessRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessRole::Fetcher => f.write_str("fetcher"),
            ProcessRole::Segmenter => f.write_str("segmenter"),
        }
    }
}

/// Program and argument vector for one child process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    /// Executable, resolved through `PATH` when relative.
    pub program: PathBuf,
    /// Arguments in order.
    pub args: Vec<String>,
}

impl CommandSpec {
    /// Start a command with no arguments.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Append one argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}
