//! Task execution behind a failure boundary.
//!
//! A [`TaskRunner`] turns a [`TaskSpec`] into a [`TaskOutcome`]. Whatever
//! happens inside the task (non-zero exit, crash, panic), the caller only
//! sees an exit code; pipeline state is never shared with the task.

use crate::task::{OutputMode, TaskSpec};
use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::FutureExt;
use std::future::Future;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Instant;
use tokio::process::Command;
use tracing::{debug, warn};

/// Exit code reported when a task terminated without one (signal, cancellation).
pub const NO_EXIT_CODE: i32 = -1;

/// Exit code reported for a panicked in-process task.
pub const PANIC_EXIT_CODE: i32 = 101;

/// Result of a task execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskOutcome {
    pub task_name: String,

    /// Exit code (0 = success).
    pub exit_code: i32,

    /// Captured stdout (empty unless captured).
    pub stdout: String,

    /// Captured stderr (empty unless captured).
    pub stderr: String,

    /// Duration in milliseconds.
    pub duration_ms: u64,

    /// Whether execution succeeded.
    pub success: bool,
}

impl TaskOutcome {
    /// Whether this task passed (exit code 0).
    pub fn passed(&self) -> bool {
        self.success && self.exit_code == 0
    }
}

/// Runs one isolated unit of work.
///
/// `Err` means the task could not be started at all; everything that happens
/// once it runs is reported through [`TaskOutcome`].
#[async_trait]
pub trait TaskRunner: Send + Sync {
    async fn run(&self, spec: &TaskSpec) -> anyhow::Result<TaskOutcome>;
}

fn stdio(mode: OutputMode) -> Stdio {
    match mode {
        OutputMode::Inherit => Stdio::inherit(),
        OutputMode::Null => Stdio::null(),
        OutputMode::Capture => Stdio::piped(),
    }
}

/// Runs tasks as child processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

#[async_trait]
impl TaskRunner for ProcessRunner {
    async fn run(&self, spec: &TaskSpec) -> anyhow::Result<TaskOutcome> {
        let start = Instant::now();

        let Some((exe, args)) = spec.command.split_first() else {
            anyhow::bail!("Task {} has empty command", spec.name);
        };

        debug!(task = %spec.name, command = ?spec.command, "Spawning task process");
        let child = Command::new(exe)
            .args(args)
            .stdin(Stdio::null())
            .stdout(stdio(spec.stdout))
            .stderr(stdio(spec.stderr))
            .spawn()
            .map_err(|e| anyhow::anyhow!("Failed to spawn {}: {}", exe, e))?;

        let output = child.wait_with_output().await?;

        Ok(TaskOutcome {
            task_name: spec.name.clone(),
            exit_code: output.status.code().unwrap_or(NO_EXIT_CODE),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            duration_ms: start.elapsed().as_millis() as u64,
            success: output.status.success(),
        })
    }
}

type Handler = Arc<dyn Fn(Vec<String>) -> BoxFuture<'static, anyhow::Result<i32>> + Send + Sync>;

/// Runs tasks inside the current process, each on its own tokio task.
///
/// The handler receives the task command and returns an exit code. An `Err`
/// maps to exit code 1 and a panic to [`PANIC_EXIT_CODE`]; neither escapes
/// the runner.
#[derive(Clone)]
pub struct InProcessRunner {
    handler: Handler,
}

impl InProcessRunner {
    pub fn new<F, Fut>(handler: F) -> Self
    where
        F: Fn(Vec<String>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<i32>> + Send + 'static,
    {
        Self {
            handler: Arc::new(move |command| handler(command).boxed()),
        }
    }
}

impl std::fmt::Debug for InProcessRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InProcessRunner").finish_non_exhaustive()
    }
}

#[async_trait]
impl TaskRunner for InProcessRunner {
    async fn run(&self, spec: &TaskSpec) -> anyhow::Result<TaskOutcome> {
        let start = Instant::now();
        let fut = (self.handler)(spec.command.clone());

        let (exit_code, stderr) = match tokio::spawn(fut).await {
            Ok(Ok(code)) => (code, String::new()),
            Ok(Err(e)) => (1, format!("{:#}", e)),
            Err(e) if e.is_panic() => {
                warn!(task = %spec.name, "In-process task panicked");
                (PANIC_EXIT_CODE, "task panicked".to_string())
            }
            Err(e) => (NO_EXIT_CODE, e.to_string()),
        };

        Ok(TaskOutcome {
            task_name: spec.name.clone(),
            exit_code,
            stdout: String::new(),
            stderr,
            duration_ms: start.elapsed().as_millis() as u64,
            success: exit_code == 0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(command: &[&str]) -> TaskSpec {
        TaskSpec::new("test", command.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn test_task_outcome_passed() {
        let outcome = TaskOutcome {
            task_name: "infer".to_string(),
            exit_code: 0,
            stdout: String::new(),
            stderr: String::new(),
            duration_ms: 100,
            success: true,
        };
        assert!(outcome.passed());
    }

    #[tokio::test]
    async fn test_process_captures_stdout() {
        let task = spec(&["echo", "hello"]).with_stdout(OutputMode::Capture);
        let outcome = ProcessRunner.run(&task).await.expect("run failed");
        assert!(outcome.passed());
        assert!(outcome.stdout.contains("hello"));
    }

    #[tokio::test]
    async fn test_process_failing_command() {
        let outcome = ProcessRunner.run(&spec(&["false"])).await.expect("run failed");
        assert!(!outcome.success);
        assert_ne!(outcome.exit_code, 0);
    }

    #[tokio::test]
    async fn test_process_exit_code_preserved() {
        let task = spec(&["sh", "-c", "echo oops >&2; exit 3"]).with_stderr(OutputMode::Capture);
        let outcome = ProcessRunner.run(&task).await.expect("run failed");
        assert_eq!(outcome.exit_code, 3);
        assert!(outcome.stderr.contains("oops"));
    }

    #[tokio::test]
    async fn test_process_empty_command_is_error() {
        assert!(ProcessRunner.run(&spec(&[])).await.is_err());
    }

    #[tokio::test]
    async fn test_process_missing_executable_is_error() {
        let task = spec(&["/nonexistent/ifsweep-worker"]);
        assert!(ProcessRunner.run(&task).await.is_err());
    }

    #[tokio::test]
    async fn test_in_process_exit_codes() {
        let runner = InProcessRunner::new(|command: Vec<String>| async move {
            match command.last().map(String::as_str) {
                Some("ok") => Ok::<i32, anyhow::Error>(0),
                Some("fail") => anyhow::bail!("model failed to load"),
                _ => Ok(7),
            }
        });

        assert!(runner.run(&spec(&["ok"])).await.unwrap().passed());

        let failed = runner.run(&spec(&["fail"])).await.unwrap();
        assert_eq!(failed.exit_code, 1);
        assert!(failed.stderr.contains("model failed to load"));

        assert_eq!(runner.run(&spec(&["other"])).await.unwrap().exit_code, 7);
    }

    #[tokio::test]
    async fn test_in_process_panic_is_contained() {
        let runner = InProcessRunner::new(|_command: Vec<String>| async move {
            if true {
                panic!("engine crashed");
            }
            Ok::<i32, anyhow::Error>(0)
        });

        let outcome = runner.run(&spec(&["x"])).await.unwrap();
        assert_eq!(outcome.exit_code, PANIC_EXIT_CODE);
        assert!(!outcome.success);
    }
}
