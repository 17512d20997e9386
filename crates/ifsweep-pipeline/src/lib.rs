//! ifsweep pipeline - per-model benchmark sweep
//!
//! Sequences, for every configured model:
//! - isolated inference (child process or in-process failure boundary)
//! - scoring of the response file
//! - reclamation of the model's cached artifacts, unconditionally

pub mod pipeline;
pub mod runner;
pub mod stage;
pub mod task;

pub use pipeline::{BenchmarkPipeline, ModelState, PipelineRecord, SweepReport};
pub use runner::{
    InProcessRunner, ProcessRunner, TaskOutcome, TaskRunner, NO_EXIT_CODE, PANIC_EXIT_CODE,
};
pub use stage::{
    EvaluationOutcome, EvaluationStage, EvaluationStep, InferenceOutcome, InferenceStage,
    InferenceStep, MODEL_NAME_FLAG,
};
pub use task::{OutputMode, TaskSpec};
