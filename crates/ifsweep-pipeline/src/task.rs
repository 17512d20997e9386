//! Isolated unit-of-work definitions.

use serde::{Deserialize, Serialize};

/// What to do with one output stream of a task.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum OutputMode {
    /// Pass through to the parent's stream.
    #[default]
    Inherit,

    /// Discard.
    Null,

    /// Collect into the task outcome.
    Capture,
}

/// Configuration for a single isolated task.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaskSpec {
    /// Human-readable task name, used in logs.
    pub name: String,

    /// Command to execute (first element is executable).
    pub command: Vec<String>,

    pub stdout: OutputMode,

    pub stderr: OutputMode,
}

impl TaskSpec {
    /// Create a task that inherits both output streams.
    pub fn new(name: impl Into<String>, command: Vec<String>) -> Self {
        Self {
            name: name.into(),
            command,
            stdout: OutputMode::Inherit,
            stderr: OutputMode::Inherit,
        }
    }

    pub fn with_stdout(mut self, mode: OutputMode) -> Self {
        self.stdout = mode;
        self
    }

    pub fn with_stderr(mut self, mode: OutputMode) -> Self {
        self.stderr = mode;
        self
    }

    /// Command with `args` appended.
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.command.extend(args.into_iter().map(Into::into));
        self
    }
}
