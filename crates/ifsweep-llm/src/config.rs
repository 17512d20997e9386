//! Endpoint and sampling configuration for chat backends.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::str::FromStr;
use tracing::warn;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8020/v1";
pub const DEFAULT_API_KEY: &str = "no-key-needed";
pub const DEFAULT_TEMPERATURE: f32 = 1.0;
pub const DEFAULT_TOP_P: f32 = 1.0;
pub const DEFAULT_MAX_TOKENS: u32 = 8192;

/// Stop sequences sent with every data-generation request.
pub const DEFAULT_STOP: &[&str] = &["<|im_end|>", "<|end_of_text|>"];

/// Key of the chat-template options in the request body.
pub const CHAT_TEMPLATE_KWARGS: &str = "chat_template_kwargs";

/// Sampling used by the inference worker.
pub const WORKER_TEMPERATURE: f32 = 0.0;
pub const WORKER_MAX_TOKENS: u32 = 2048;

/// Chat endpoint settings.
///
/// | Variable | Default |
/// |----------|---------|
/// | `VLLM_BASE_URL` | `http://localhost:8020/v1` |
/// | `VLLM_API_KEY` | `no-key-needed` |
/// | `RESP_TEMPERATURE` | `1.0` |
/// | `RESP_TOP_P` | `1.0` |
/// | `RESP_MAX_TOKENS` | `8192` |
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatConfig {
    pub base_url: String,
    pub api_key: String,
    pub temperature: f32,
    pub top_p: f32,
    pub max_tokens: u32,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: DEFAULT_API_KEY.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            top_p: DEFAULT_TOP_P,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

impl ChatConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            base_url: lookup("VLLM_BASE_URL").unwrap_or(defaults.base_url),
            api_key: lookup("VLLM_API_KEY").unwrap_or(defaults.api_key),
            temperature: parse_or(&lookup, "RESP_TEMPERATURE", defaults.temperature),
            top_p: parse_or(&lookup, "RESP_TOP_P", defaults.top_p),
            max_tokens: parse_or(&lookup, "RESP_MAX_TOKENS", defaults.max_tokens),
        }
    }

    /// Data-generation parameters: configured sampling, default stop
    /// sequences, reasoning disabled.
    pub fn chat_params(&self) -> ChatParams {
        ChatParams {
            temperature: self.temperature,
            top_p: self.top_p,
            max_tokens: self.max_tokens,
            stop: DEFAULT_STOP.iter().map(|s| s.to_string()).collect(),
            extra: reasoning_flag(false),
        }
    }

    /// Benchmark-inference parameters: greedy decoding, bounded output.
    pub fn worker_params(&self) -> ChatParams {
        ChatParams {
            temperature: WORKER_TEMPERATURE,
            top_p: DEFAULT_TOP_P,
            max_tokens: WORKER_MAX_TOKENS,
            stop: Vec::new(),
            extra: Map::new(),
        }
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + Copy + std::fmt::Display,
{
    match lookup(key) {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!(variable = key, value = %raw, default = %default, "Unparseable value, using default");
            default
        }),
    }
}

/// `{"chat_template_kwargs": {"enable_thinking": <enabled>}}`
pub fn reasoning_flag(enabled: bool) -> Map<String, Value> {
    let mut extra = Map::new();
    extra.insert(
        CHAT_TEMPLATE_KWARGS.to_string(),
        json!({ "enable_thinking": enabled }),
    );
    extra
}

/// Sampling parameters of a chat request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatParams {
    pub temperature: f32,
    pub top_p: f32,
    pub max_tokens: u32,
    pub stop: Vec<String>,
    /// Backend-specific top-level body fields.
    pub extra: Map<String, Value>,
}

impl ChatParams {
    /// Copy of these parameters with `overrides` replacing top-level extra fields.
    pub fn merged(&self, overrides: &Map<String, Value>) -> Self {
        let mut merged = self.clone();
        for (k, v) in overrides {
            merged.extra.insert(k.clone(), v.clone());
        }
        merged
    }
}
