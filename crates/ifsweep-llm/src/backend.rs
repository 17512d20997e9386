//! Chat-completion backends.
//!
//! [`ChatBackend`] is the single-request seam: one call, one classified
//! outcome, no retries. [`HttpChatBackend`] speaks the OpenAI-compatible
//! `/chat/completions` protocol served by vLLM and similar engines.

use crate::config::{ChatConfig, ChatParams};
use crate::error::CallError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// A fully specified chat request.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub params: ChatParams,
}

impl ChatRequest {
    /// Wire body. Extra parameters are merged last and win over sampling keys.
    pub fn to_body(&self) -> Value {
        let mut body = json!({
            "model": self.model,
            "messages": self.messages,
            "temperature": self.params.temperature,
            "top_p": self.params.top_p,
            "max_tokens": self.params.max_tokens,
        });
        if let Some(obj) = body.as_object_mut() {
            if !self.params.stop.is_empty() {
                obj.insert("stop".to_string(), json!(self.params.stop));
            }
            for (k, v) in &self.params.extra {
                obj.insert(k.clone(), v.clone());
            }
        }
        body
    }
}

/// Sends one chat request and classifies the outcome.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn complete(&self, request: &ChatRequest) -> Result<String, CallError>;
}

/// OpenAI-compatible HTTP backend.
pub struct HttpChatBackend {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl HttpChatBackend {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self, CallError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("ifsweep/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client,
        })
    }

    pub fn from_config(config: &ChatConfig) -> Result<Self, CallError> {
        Self::new(&config.base_url, &config.api_key)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Ids of the models the endpoint currently serves.
    pub async fn list_models(&self) -> Result<Vec<String>, CallError> {
        let url = format!("{}/models", self.base_url);
        let resp = self
            .client
            .get(&url)
            .bearer_auth(&self.api_key)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(CallError::from_status(status.as_u16(), body));
        }

        let json: Value = resp.json().await?;
        let ids = json
            .get("data")
            .and_then(Value::as_array)
            .ok_or_else(|| CallError::Other("model list response missing data".to_string()))?
            .iter()
            .filter_map(|m| m.get("id").and_then(Value::as_str).map(str::to_string))
            .collect();
        Ok(ids)
    }

    /// First model advertised by the endpoint.
    pub async fn first_model_id(&self) -> Result<String, CallError> {
        self.list_models()
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| CallError::Other("no models available at endpoint".to_string()))
    }
}

#[async_trait]
impl ChatBackend for HttpChatBackend {
    async fn complete(&self, request: &ChatRequest) -> Result<String, CallError> {
        let url = format!("{}/chat/completions", self.base_url);
        debug!(model = %request.model, url = %url, "Sending chat request");

        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request.to_body())
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(CallError::from_status(status.as_u16(), body));
        }

        let json: Value = resp.json().await?;
        let message = json
            .pointer("/choices/0/message")
            .ok_or_else(|| CallError::Other("response missing choices[0].message".to_string()))?;

        // A null content is an empty completion, not an error.
        Ok(message
            .get("content")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::reasoning_flag;

    fn request() -> ChatRequest {
        ChatRequest {
            model: "m".to_string(),
            messages: vec![ChatMessage::system("check this")],
            params: ChatConfig::default().chat_params(),
        }
    }

    #[test]
    fn test_body_carries_sampling_and_extra() {
        let body = request().to_body();
        assert_eq!(body["model"], "m");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["max_tokens"], 8192);
        assert_eq!(body["stop"][0], "<|im_end|>");
        assert_eq!(body["chat_template_kwargs"]["enable_thinking"], false);
    }

    #[test]
    fn test_body_omits_empty_stop() {
        let mut req = request();
        req.params = ChatConfig::default().worker_params();
        let body = req.to_body();
        assert!(body.get("stop").is_none());
        assert!(body.get("chat_template_kwargs").is_none());
        assert_eq!(body["temperature"], 0.0);
    }

    #[test]
    fn test_body_with_fallback_override() {
        let mut req = request();
        req.params = req.params.merged(&reasoning_flag(true));
        assert_eq!(req.to_body()["chat_template_kwargs"]["enable_thinking"], true);
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let backend = HttpChatBackend::new("http://localhost:8020/v1/", "k").unwrap();
        assert_eq!(backend.base_url(), "http://localhost:8020/v1");
    }
}
