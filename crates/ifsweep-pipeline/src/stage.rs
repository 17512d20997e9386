//! Inference and evaluation stages.
//!
//! Both stages run their work through a [`TaskRunner`] and fold every
//! result, including a task that could not be started, into an outcome.
//! Neither returns an error.

use crate::runner::{TaskRunner, NO_EXIT_CODE};
use crate::task::{OutputMode, TaskSpec};
use async_trait::async_trait;
use ifsweep_core::{DataLayout, ModelDescriptor};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

/// Flag naming the model on the worker command line.
pub const MODEL_NAME_FLAG: &str = "--model-name";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InferenceOutcome {
    Success(Duration),
    Failure(i32),
}

impl InferenceOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationOutcome {
    Success,
    Failure {
        exit_code: i32,
        /// Scorer diagnostics, never parsed.
        stderr: String,
    },
    Skipped(String),
}

impl EvaluationOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

#[async_trait]
pub trait InferenceStep: Send + Sync {
    async fn run(&self, model: &ModelDescriptor) -> InferenceOutcome;
}

#[async_trait]
pub trait EvaluationStep: Send + Sync {
    async fn run(&self, model: &ModelDescriptor) -> EvaluationOutcome;
}

/// Runs the inference worker for one model as an isolated task.
///
/// Success means the task exited with status 0. The response file is not
/// checked here.
pub struct InferenceStage {
    runner: Arc<dyn TaskRunner>,
    program: Vec<String>,
}

impl InferenceStage {
    /// `program` is the worker command; `--model-name <model>` is appended.
    pub fn new(runner: Arc<dyn TaskRunner>, program: Vec<String>) -> Self {
        Self { runner, program }
    }

    pub fn task(&self, model: &ModelDescriptor) -> TaskSpec {
        TaskSpec::new(format!("inference:{}", model), self.program.clone())
            .with_args([MODEL_NAME_FLAG, model.as_str()])
    }
}

#[async_trait]
impl InferenceStep for InferenceStage {
    async fn run(&self, model: &ModelDescriptor) -> InferenceOutcome {
        let start = Instant::now();
        info!(model = %model, stage = "inference", "Starting isolated inference");

        match self.runner.run(&self.task(model)).await {
            Ok(outcome) if outcome.passed() => {
                let elapsed = start.elapsed();
                info!(
                    model = %model,
                    stage = "inference",
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Inference finished"
                );
                InferenceOutcome::Success(elapsed)
            }
            Ok(outcome) => {
                warn!(
                    model = %model,
                    stage = "inference",
                    exit_code = outcome.exit_code,
                    "Inference failed"
                );
                InferenceOutcome::Failure(outcome.exit_code)
            }
            Err(e) => {
                error!(model = %model, stage = "inference", error = %e, "Inference could not start");
                InferenceOutcome::Failure(NO_EXIT_CODE)
            }
        }
    }
}

/// Scores a model's response file against the clean reference corpus.
pub struct EvaluationStage {
    runner: Arc<dyn TaskRunner>,
    scorer: Vec<String>,
    layout: DataLayout,
}

impl EvaluationStage {
    pub fn new(runner: Arc<dyn TaskRunner>, scorer: Vec<String>, layout: DataLayout) -> Self {
        Self {
            runner,
            scorer,
            layout,
        }
    }
}

#[async_trait]
impl EvaluationStep for EvaluationStage {
    async fn run(&self, model: &ModelDescriptor) -> EvaluationOutcome {
        let safe_name = model.safe_name();
        let response = self.layout.response_file(&safe_name);
        let reference = self.layout.clean_corpus();

        if !response.is_file() {
            warn!(model = %model, path = %response.display(), "Response file not found");
            return EvaluationOutcome::Skipped("response file not found".to_string());
        }
        if !reference.is_file() {
            warn!(model = %model, path = %reference.display(), "Reference corpus not found");
            return EvaluationOutcome::Skipped("reference corpus not found".to_string());
        }

        let output_dir = self.layout.evaluation_dir(&safe_name);
        if let Err(e) = std::fs::create_dir_all(&output_dir) {
            error!(model = %model, path = %output_dir.display(), error = %e, "Cannot create evaluation directory");
            return EvaluationOutcome::Failure {
                exit_code: NO_EXIT_CODE,
                stderr: e.to_string(),
            };
        }

        let task = TaskSpec::new(format!("evaluation:{}", model), self.scorer.clone())
            .with_args([
                "--input_data".to_string(),
                reference.display().to_string(),
                "--input_response_data".to_string(),
                response.display().to_string(),
                "--output_dir".to_string(),
                output_dir.display().to_string(),
            ])
            .with_stdout(OutputMode::Null)
            .with_stderr(OutputMode::Capture);

        info!(model = %model, safe_name = %safe_name, stage = "evaluation", "Scoring responses");
        match self.runner.run(&task).await {
            Ok(outcome) if outcome.passed() => {
                info!(model = %model, stage = "evaluation", "Metrics computed");
                EvaluationOutcome::Success
            }
            Ok(outcome) => {
                warn!(
                    model = %model,
                    stage = "evaluation",
                    exit_code = outcome.exit_code,
                    stderr = %outcome.stderr.trim(),
                    "Scorer failed"
                );
                EvaluationOutcome::Failure {
                    exit_code: outcome.exit_code,
                    stderr: outcome.stderr,
                }
            }
            Err(e) => {
                error!(model = %model, stage = "evaluation", error = %e, "Scorer could not start");
                EvaluationOutcome::Failure {
                    exit_code: NO_EXIT_CODE,
                    stderr: e.to_string(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::TaskOutcome;
    use std::sync::Mutex;

    /// Records every task and answers with a fixed exit code.
    struct RecordingRunner {
        exit_code: i32,
        tasks: Mutex<Vec<TaskSpec>>,
    }

    impl RecordingRunner {
        fn new(exit_code: i32) -> Arc<Self> {
            Arc::new(Self {
                exit_code,
                tasks: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl TaskRunner for RecordingRunner {
        async fn run(&self, spec: &TaskSpec) -> anyhow::Result<TaskOutcome> {
            self.tasks.lock().unwrap().push(spec.clone());
            Ok(TaskOutcome {
                task_name: spec.name.clone(),
                exit_code: self.exit_code,
                stdout: String::new(),
                stderr: "traceback".to_string(),
                duration_ms: 1,
                success: self.exit_code == 0,
            })
        }
    }

    struct BrokenRunner;

    #[async_trait]
    impl TaskRunner for BrokenRunner {
        async fn run(&self, _spec: &TaskSpec) -> anyhow::Result<TaskOutcome> {
            anyhow::bail!("no such file")
        }
    }

    fn layout(dir: &std::path::Path) -> DataLayout {
        DataLayout::new(dir.join("data"), dir.join("evaluations"), "pt")
    }

    #[tokio::test]
    async fn test_inference_passes_model_name() {
        let runner = RecordingRunner::new(0);
        let stage = InferenceStage::new(runner.clone(), vec!["ifsweep".into(), "infer".into()]);

        let outcome = stage.run(&ModelDescriptor::new("a/b")).await;
        assert!(outcome.is_success());

        let tasks = runner.tasks.lock().unwrap();
        assert_eq!(tasks[0].command, vec!["ifsweep", "infer", "--model-name", "a/b"]);
        assert_eq!(tasks[0].stdout, OutputMode::Inherit);
    }

    #[tokio::test]
    async fn test_inference_nonzero_exit_is_failure() {
        let stage = InferenceStage::new(RecordingRunner::new(1), vec!["w".into()]);
        assert_eq!(
            stage.run(&ModelDescriptor::new("a/b")).await,
            InferenceOutcome::Failure(1)
        );
    }

    #[tokio::test]
    async fn test_inference_spawn_error_is_failure() {
        let stage = InferenceStage::new(Arc::new(BrokenRunner), vec!["w".into()]);
        assert_eq!(
            stage.run(&ModelDescriptor::new("a/b")).await,
            InferenceOutcome::Failure(NO_EXIT_CODE)
        );
    }

    #[tokio::test]
    async fn test_evaluation_skipped_without_response_file() {
        let dir = tempfile::tempdir().unwrap();
        let runner = RecordingRunner::new(0);
        let stage = EvaluationStage::new(runner.clone(), vec!["scorer".into()], layout(dir.path()));

        let outcome = stage.run(&ModelDescriptor::new("a/b")).await;
        assert_eq!(
            outcome,
            EvaluationOutcome::Skipped("response file not found".to_string())
        );
        assert!(runner.tasks.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_evaluation_skipped_without_reference_corpus() {
        let dir = tempfile::tempdir().unwrap();
        let layout = layout(dir.path());
        let model = ModelDescriptor::new("a/b");
        std::fs::create_dir_all(layout.data_dir()).unwrap();
        std::fs::write(layout.response_file(&model.safe_name()), "{}\n").unwrap();

        let runner = RecordingRunner::new(0);
        let stage = EvaluationStage::new(runner.clone(), vec!["scorer".into()], layout);
        assert!(matches!(stage.run(&model).await, EvaluationOutcome::Skipped(_)));
        assert!(runner.tasks.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_evaluation_scorer_arguments_and_failure() {
        let dir = tempfile::tempdir().unwrap();
        let layout = layout(dir.path());
        let model = ModelDescriptor::new("a/b");
        std::fs::create_dir_all(layout.data_dir()).unwrap();
        std::fs::write(layout.response_file(&model.safe_name()), "{}\n").unwrap();
        std::fs::write(layout.clean_corpus(), "{}\n").unwrap();

        let runner = RecordingRunner::new(2);
        let stage = EvaluationStage::new(runner.clone(), vec!["scorer".into()], layout.clone());

        assert_eq!(
            stage.run(&model).await,
            EvaluationOutcome::Failure {
                exit_code: 2,
                stderr: "traceback".to_string()
            }
        );

        let tasks = runner.tasks.lock().unwrap();
        let command = &tasks[0].command;
        assert_eq!(command[1], "--input_data");
        assert_eq!(command[2], layout.clean_corpus().display().to_string());
        assert_eq!(command[4], layout.response_file(&model.safe_name()).display().to_string());
        assert_eq!(command[6], layout.evaluation_dir(&model.safe_name()).display().to_string());
        assert_eq!(tasks[0].stdout, OutputMode::Null);
        assert_eq!(tasks[0].stderr, OutputMode::Capture);
        assert!(layout.evaluation_dir(&model.safe_name()).is_dir());
    }
}
