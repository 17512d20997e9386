//! Sweep configuration.
//!
//! `SweepConfig` is built once by the binary and handed to every component.
//! Values come from built-in defaults overridden by environment variables.

use crate::domain::{ModelDescriptor, Result, SweepError};
use crate::layout::DataLayout;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Models benchmarked when `IFSWEEP_MODELS` is not set, in sweep order.
pub const DEFAULT_MODELS: &[&str] = &[
    "gpt-4o-mini-2024-07-18",
    "gpt-4o-2024-08-06",
    "o1-preview-2024-09-12",
    "o1-mini-2024-09-12",
    "claude-3-haiku-20240307",
    "claude-3-5-sonnet-20240620",
    "claude-3-opus-20240229",
    "gemini-1.5-pro-002",
    "gemini-1.5-flash-002",
    "CohereForAI/c4ai-command-r-plus-4bit",
    "CohereForAI/c4ai-command-r-v01-4bit",
    "CohereForAI/aya-23-8B",
    "Qwen/Qwen2.5-0.5B-Instruct-GPTQ-Int4",
    "Qwen/Qwen2.5-1.5B-Instruct-GPTQ-Int4",
    "Qwen/Qwen2.5-3B-Instruct-GPTQ-Int4",
    "Qwen/Qwen2.5-7B-Instruct-GPTQ-Int4",
    "Qwen/Qwen2.5-14B-Instruct-GPTQ-Int4",
    "Qwen/Qwen2.5-32B-Instruct-GPTQ-Int4",
    "Qwen/Qwen2.5-72B-Instruct-GPTQ-Int4",
    "hugging-quants/Meta-Llama-3.1-70B-Instruct-AWQ-INT4",
    "hugging-quants/Meta-Llama-3.1-8B-Instruct-AWQ-INT4",
    "mistralai/Mistral-7B-Instruct-v0.3",
    "deepseek-ai/deepseek-llm-7b-chat",
];

/// Instruction ids whose records are dropped from the reference corpus.
pub const DEFAULT_KILL_LIST: &[&str] = &["pt:detectable_format:constrained_response"];

/// Scorer invoked by the evaluation stage (followed by its three path flags).
pub const DEFAULT_SCORER_COMMAND: &[&str] = &["python3", "-m", "evaluation_main"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepConfig {
    /// Models in sweep order.
    pub models: Vec<ModelDescriptor>,

    /// Language tag prefixing corpus and response files.
    pub lang: String,

    pub data_dir: PathBuf,

    pub evaluations_dir: PathBuf,

    pub kill_list: Vec<String>,

    /// Scorer program and leading arguments.
    pub scorer_command: Vec<String>,

    /// Inference worker program and leading arguments; `None` means
    /// "re-invoke the current executable".
    pub worker_command: Option<Vec<String>>,

    /// Local cache of downloaded model repositories.
    pub model_cache_dir: PathBuf,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            models: DEFAULT_MODELS.iter().map(|m| ModelDescriptor::new(*m)).collect(),
            lang: "pt".to_string(),
            data_dir: PathBuf::from("data"),
            evaluations_dir: PathBuf::from("evaluations"),
            kill_list: DEFAULT_KILL_LIST.iter().map(|s| s.to_string()).collect(),
            scorer_command: DEFAULT_SCORER_COMMAND.iter().map(|s| s.to_string()).collect(),
            worker_command: None,
            model_cache_dir: PathBuf::from(".cache/huggingface/hub"),
        }
    }
}

impl SweepConfig {
    /// Build a config from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(models) = get("IFSWEEP_MODELS") {
            config.models = models
                .split(',')
                .map(str::trim)
                .filter(|m| !m.is_empty())
                .map(ModelDescriptor::new)
                .collect();
        }
        if let Some(lang) = get("IFSWEEP_LANG") {
            config.lang = lang;
        }
        if let Some(dir) = get("IFSWEEP_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }
        if let Some(dir) = get("IFSWEEP_EVAL_DIR") {
            config.evaluations_dir = PathBuf::from(dir);
        }
        if let Some(cmd) = get("IFSWEEP_SCORER_CMD") {
            config.scorer_command = split_command(&cmd);
        }
        if let Some(cmd) = get("IFSWEEP_WORKER_CMD") {
            config.worker_command = Some(split_command(&cmd));
        }
        if let Some(dir) = resolve_model_cache_dir(&get) {
            config.model_cache_dir = dir;
        }

        config
    }

    /// File layout derived from this config.
    pub fn layout(&self) -> DataLayout {
        DataLayout::new(&self.data_dir, &self.evaluations_dir, &self.lang)
    }

    /// Reject configurations the sweep cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.models.is_empty() {
            return Err(SweepError::InvalidConfig("model list is empty".to_string()));
        }
        if self.scorer_command.is_empty() {
            return Err(SweepError::InvalidConfig(
                "scorer command is empty".to_string(),
            ));
        }
        if matches!(&self.worker_command, Some(cmd) if cmd.is_empty()) {
            return Err(SweepError::InvalidConfig(
                "worker command is empty".to_string(),
            ));
        }

        let mut seen: HashMap<String, &ModelDescriptor> = HashMap::new();
        for model in &self.models {
            let safe = model.safe_name().as_str().to_string();
            if let Some(first) = seen.get(&safe) {
                return Err(SweepError::SafeNameCollision {
                    first: first.to_string(),
                    second: model.to_string(),
                    safe_name: safe,
                });
            }
            seen.insert(safe, model);
        }
        Ok(())
    }
}

fn split_command(cmd: &str) -> Vec<String> {
    cmd.split_whitespace().map(str::to_string).collect()
}

/// Hub cache resolution: `HF_HUB_CACHE`, `HF_HOME/hub`,
/// `XDG_CACHE_HOME/huggingface/hub`, `HOME/.cache/huggingface/hub`.
fn resolve_model_cache_dir<F>(get: &F) -> Option<PathBuf>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(dir) = get("HF_HUB_CACHE") {
        return Some(PathBuf::from(dir));
    }
    if let Some(home) = get("HF_HOME") {
        return Some(PathBuf::from(home).join("hub"));
    }
    if let Some(xdg) = get("XDG_CACHE_HOME") {
        return Some(PathBuf::from(xdg).join("huggingface").join("hub"));
    }
    get("HOME").map(|home| {
        PathBuf::from(home)
            .join(".cache")
            .join("huggingface")
            .join("hub")
    })
}
