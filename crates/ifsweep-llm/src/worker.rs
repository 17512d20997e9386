//! Inference worker: answers every corpus prompt with one model.
//!
//! Runs inside the isolated process launched by the benchmark pipeline. The
//! response file is written atomically at the end, so it exists only when
//! every prompt was answered.

use crate::backend::{ChatBackend, ChatMessage, ChatRequest, HttpChatBackend};
use crate::config::ChatParams;
use crate::error::WorkerError;
use async_trait::async_trait;
use ifsweep_core::{extract_prompt, DataLayout, ModelDescriptor, ResponseRecord};
use serde_json::Value;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// Raw text generation for one model.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Make sure `model` can serve requests.
    async fn load(&self, model: &ModelDescriptor) -> Result<(), WorkerError>;

    async fn generate(&self, model: &ModelDescriptor, prompt: &str) -> Result<String, String>;
}

/// [`TextGenerator`] backed by an OpenAI-compatible endpoint serving the model.
pub struct ChatGenerator {
    backend: HttpChatBackend,
    params: ChatParams,
}

impl ChatGenerator {
    pub fn new(backend: HttpChatBackend, params: ChatParams) -> Self {
        Self { backend, params }
    }
}

#[async_trait]
impl TextGenerator for ChatGenerator {
    async fn load(&self, model: &ModelDescriptor) -> Result<(), WorkerError> {
        let served = self
            .backend
            .list_models()
            .await
            .map_err(|e| WorkerError::ModelLoad {
                model: model.to_string(),
                reason: e.to_string(),
            })?;

        if served.iter().any(|id| id == model.as_str()) {
            Ok(())
        } else {
            Err(WorkerError::ModelLoad {
                model: model.to_string(),
                reason: format!(
                    "not served by {} (available: {})",
                    self.backend.base_url(),
                    served.join(", ")
                ),
            })
        }
    }

    async fn generate(&self, model: &ModelDescriptor, prompt: &str) -> Result<String, String> {
        let request = ChatRequest {
            model: model.to_string(),
            messages: vec![ChatMessage::user(prompt)],
            params: self.params.clone(),
        };
        self.backend
            .complete(&request)
            .await
            .map_err(|e| e.to_string())
    }
}

/// Summary of a completed worker run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerReport {
    pub input: PathBuf,
    pub output: PathBuf,
    pub responses: usize,
}

pub struct InferenceWorker {
    layout: DataLayout,
    generator: Arc<dyn TextGenerator>,
}

impl InferenceWorker {
    pub fn new(layout: DataLayout, generator: Arc<dyn TextGenerator>) -> Self {
        Self { layout, generator }
    }

    pub async fn run(&self, model: &ModelDescriptor) -> Result<WorkerReport, WorkerError> {
        let start = Instant::now();
        info!(model = %model, "Worker starting");

        self.generator.load(model).await?;

        let input = self
            .layout
            .resolve_inference_input()
            .ok_or_else(|| WorkerError::NoInput {
                data_dir: self.layout.data_dir().to_path_buf(),
            })?;
        info!(input = %input.display(), "Using input corpus");

        let prompts = read_prompts(&std::fs::read_to_string(&input)?)?;
        if let Some((field, _, _)) = prompts.first() {
            info!(prompt_field = %field, count = prompts.len(), "Prompts loaded");
        }

        let mut records = Vec::with_capacity(prompts.len());
        for (field, line, prompt) in prompts {
            let response = self
                .generator
                .generate(model, &prompt)
                .await
                .map_err(|reason| WorkerError::Generation { line, reason })?;
            debug!(line, chars = response.len(), "Response generated");
            records.push(ResponseRecord {
                prompt_field: field.to_string(),
                prompt,
                response,
            });
        }

        let output = self.layout.response_file(&model.safe_name());
        write_responses(&output, &records)?;

        info!(
            model = %model,
            output = %output.display(),
            responses = records.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Response file saved"
        );

        Ok(WorkerReport {
            input,
            output,
            responses: records.len(),
        })
    }
}

/// Parse corpus text into `(prompt field, line number, prompt)` triples.
/// Blank lines are ignored.
fn read_prompts(text: &str) -> Result<Vec<(&'static str, usize, String)>, WorkerError> {
    let mut prompts = Vec::new();
    for (idx, raw) in text.lines().enumerate() {
        let line = idx + 1;
        if raw.trim().is_empty() {
            continue;
        }
        let value: Value = serde_json::from_str(raw)
            .map_err(|source| WorkerError::MalformedInput { line, source })?;
        let (field, prompt) = extract_prompt(&value).ok_or(WorkerError::MissingPrompt { line })?;
        prompts.push((field, line, prompt.to_string()));
    }
    Ok(prompts)
}

fn write_responses(output: &std::path::Path, records: &[ResponseRecord]) -> Result<(), WorkerError> {
    let dir = match output.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => std::path::Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let mut writer = BufWriter::new(NamedTempFile::new_in(dir)?);
    for record in records {
        serde_json::to_writer(&mut writer, &record.to_json())
            .map_err(|e| WorkerError::Io(e.into()))?;
        writer.write_all(b"\n")?;
    }
    let tmp = writer.into_inner().map_err(|e| e.into_error())?;
    tmp.persist(output).map_err(|e| e.error)?;
    Ok(())
}
