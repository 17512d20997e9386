//! Per-model benchmark sweep.
//!
//! Each model goes through
//! `Pending → InferenceRunning → {InferenceFailed | EvaluationRunning → EvaluationDone}
//! → CleanupRunning → Done`, strictly one model at a time. Cache reclamation
//! runs for every model whatever happened upstream, and no model's failure
//! ends the sweep.

use crate::stage::{EvaluationOutcome, EvaluationStep, InferenceOutcome, InferenceStep};
use chrono::{DateTime, Utc};
use ifsweep_core::{CacheReclaim, ModelDescriptor, SafeName};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelState {
    Pending,
    InferenceRunning,
    InferenceFailed,
    EvaluationRunning,
    EvaluationDone,
    CleanupRunning,
    Done,
}

/// Run state of one model's cycle.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineRecord {
    pub model: ModelDescriptor,
    pub safe_name: SafeName,
    pub started_at: DateTime<Utc>,
    pub state: ModelState,
    /// Every state entered, in order.
    pub history: Vec<ModelState>,
    pub inference: Option<InferenceOutcome>,
    pub evaluation: Option<EvaluationOutcome>,
    pub evaluation_elapsed: Option<Duration>,
    pub cleanup_performed: bool,
    /// Cached repositories removed during cleanup.
    pub removed: usize,
    pub elapsed: Duration,
}

impl PipelineRecord {
    pub fn new(model: ModelDescriptor) -> Self {
        Self {
            safe_name: model.safe_name(),
            model,
            started_at: Utc::now(),
            state: ModelState::Pending,
            history: vec![ModelState::Pending],
            inference: None,
            evaluation: None,
            evaluation_elapsed: None,
            cleanup_performed: false,
            removed: 0,
            elapsed: Duration::ZERO,
        }
    }

    fn enter(&mut self, state: ModelState) {
        debug!(model = %self.model, from = ?self.state, to = ?state, "Model state transition");
        self.state = state;
        self.history.push(state);
    }

    pub fn passed_through(&self, state: ModelState) -> bool {
        self.history.contains(&state)
    }

    pub fn inference_succeeded(&self) -> bool {
        self.inference.as_ref().is_some_and(InferenceOutcome::is_success)
    }

    pub fn evaluation_succeeded(&self) -> bool {
        self.evaluation.as_ref().is_some_and(EvaluationOutcome::is_success)
    }
}

/// Result of one full pass over the model list.
#[derive(Debug, Clone, Serialize)]
pub struct SweepReport {
    pub sweep_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub records: Vec<PipelineRecord>,
    pub elapsed: Duration,
}

impl SweepReport {
    /// Models whose inference succeeded.
    pub fn inferred_count(&self) -> usize {
        self.records.iter().filter(|r| r.inference_succeeded()).count()
    }

    /// Models whose evaluation succeeded.
    pub fn evaluated_count(&self) -> usize {
        self.records.iter().filter(|r| r.evaluation_succeeded()).count()
    }

    /// Models without a successful evaluation.
    pub fn failed_count(&self) -> usize {
        self.records.len() - self.evaluated_count()
    }
}

pub struct BenchmarkPipeline {
    models: Vec<ModelDescriptor>,
    inference: Arc<dyn InferenceStep>,
    evaluation: Arc<dyn EvaluationStep>,
    reclaimer: Arc<dyn CacheReclaim>,
}

impl BenchmarkPipeline {
    pub fn new(
        models: Vec<ModelDescriptor>,
        inference: Arc<dyn InferenceStep>,
        evaluation: Arc<dyn EvaluationStep>,
        reclaimer: Arc<dyn CacheReclaim>,
    ) -> Self {
        Self {
            models,
            inference,
            evaluation,
            reclaimer,
        }
    }

    pub fn models(&self) -> &[ModelDescriptor] {
        &self.models
    }

    /// Run the sweep over every configured model.
    pub async fn run(&self) -> SweepReport {
        self.run_with_progress(|_| {}).await
    }

    /// Run the sweep, calling `on_model_done` as each model's cycle completes.
    pub async fn run_with_progress<F>(&self, mut on_model_done: F) -> SweepReport
    where
        F: FnMut(&PipelineRecord),
    {
        let sweep_id = Uuid::new_v4();
        let started_at = Utc::now();
        let start = Instant::now();
        info!(sweep_id = %sweep_id, models = self.models.len(), "Starting benchmark sweep");

        let mut records = Vec::with_capacity(self.models.len());
        for (idx, model) in self.models.iter().enumerate() {
            info!(
                model = %model,
                position = idx + 1,
                total = self.models.len(),
                "Starting model cycle"
            );
            let record = self.run_model(model.clone()).await;
            on_model_done(&record);
            records.push(record);
        }

        let elapsed = start.elapsed();
        info!(
            sweep_id = %sweep_id,
            elapsed_ms = elapsed.as_millis() as u64,
            "Benchmark sweep complete"
        );

        SweepReport {
            sweep_id,
            started_at,
            records,
            elapsed,
        }
    }

    async fn run_model(&self, model: ModelDescriptor) -> PipelineRecord {
        let start = Instant::now();
        let mut record = PipelineRecord::new(model);

        record.enter(ModelState::InferenceRunning);
        let inference = self.inference.run(&record.model).await;
        let inference_ok = inference.is_success();
        record.inference = Some(inference);

        if inference_ok {
            record.enter(ModelState::EvaluationRunning);
            let eval_start = Instant::now();
            let evaluation = self.evaluation.run(&record.model).await;
            record.evaluation = Some(evaluation);
            record.evaluation_elapsed = Some(eval_start.elapsed());
            record.enter(ModelState::EvaluationDone);
        } else {
            warn!(model = %record.model, "Skipping evaluation after failed inference");
            record.enter(ModelState::InferenceFailed);
        }

        record.enter(ModelState::CleanupRunning);
        record.removed = self.reclaim(&record.model).await;
        record.cleanup_performed = true;
        record.enter(ModelState::Done);

        record.elapsed = start.elapsed();
        info!(
            model = %record.model,
            elapsed_ms = record.elapsed.as_millis() as u64,
            "Model cycle finished"
        );
        record
    }

    /// Reclamation touches the filesystem synchronously, so it runs on the
    /// blocking pool. A panic there counts as nothing removed.
    async fn reclaim(&self, model: &ModelDescriptor) -> usize {
        let reclaimer = Arc::clone(&self.reclaimer);
        let target = model.clone();
        match tokio::task::spawn_blocking(move || reclaimer.reclaim(&target)).await {
            Ok(removed) => removed,
            Err(e) => {
                warn!(model = %model, error = %e, "Cache reclamation aborted");
                0
            }
        }
    }
}
