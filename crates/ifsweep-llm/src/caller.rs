//! Resilient chat calls: bounded retry plus one parameter fallback.
//!
//! Contract of [`ResilientCaller::call`]:
//! 1. The primary request (default parameters, reasoning disabled) is tried up
//!    to `max_attempts` times with a fixed delay, whatever the failure.
//! 2. If the primary tier ends in [`CallError::MalformedRequest`], exactly one
//!    more request is sent with the fallback overrides merged on top of the
//!    defaults. It is not retried.
//! 3. Every other outcome that is not a text becomes `None`.

use crate::backend::{ChatBackend, ChatMessage, ChatRequest};
use crate::config::{reasoning_flag, ChatParams};
use crate::error::CallError;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Fixed-delay retry bound for the primary tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_millis(100),
        }
    }
}

/// One request issued by the caller.
#[derive(Debug, Clone)]
pub struct CallAttempt<'a> {
    pub messages: &'a [ChatMessage],
    pub model_id: &'a str,
    pub overrides: Option<&'a Map<String, Value>>,
    pub attempt: u32,
}

impl CallAttempt<'_> {
    fn request(&self, defaults: &ChatParams) -> ChatRequest {
        let params = match self.overrides {
            Some(o) => defaults.merged(o),
            None => defaults.clone(),
        };
        ChatRequest {
            model: self.model_id.to_string(),
            messages: self.messages.to_vec(),
            params,
        }
    }
}

pub struct ResilientCaller {
    backend: Arc<dyn ChatBackend>,
    params: ChatParams,
    retry: RetryPolicy,
    fallback_overrides: Map<String, Value>,
}

impl ResilientCaller {
    /// Caller with the default retry policy and the reasoning-enabled fallback.
    pub fn new(backend: Arc<dyn ChatBackend>, params: ChatParams) -> Self {
        Self {
            backend,
            params,
            retry: RetryPolicy::default(),
            fallback_overrides: reasoning_flag(true),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_fallback_overrides(mut self, overrides: Map<String, Value>) -> Self {
        self.fallback_overrides = overrides;
        self
    }

    /// Returns the completion text, or `None` when the item should be skipped.
    pub async fn call(&self, messages: &[ChatMessage], model_id: &str) -> Option<String> {
        match self.try_call(messages, model_id).await {
            Ok(text) => Some(text),
            Err(e) => {
                warn!(model = model_id, error = %e, "Chat call abandoned");
                None
            }
        }
    }

    /// Same policy as [`call`](Self::call) but keeps the final error.
    pub async fn try_call(
        &self,
        messages: &[ChatMessage],
        model_id: &str,
    ) -> Result<String, CallError> {
        match self.primary(messages, model_id).await {
            Ok(text) => Ok(text),
            Err(e) if e.is_malformed_request() => {
                info!(model = model_id, error = %e, "Request rejected, retrying with fallback parameters");
                let attempt = CallAttempt {
                    messages,
                    model_id,
                    overrides: Some(&self.fallback_overrides),
                    attempt: 1,
                };
                self.backend.complete(&attempt.request(&self.params)).await
            }
            Err(e) => Err(e),
        }
    }

    async fn primary(&self, messages: &[ChatMessage], model_id: &str) -> Result<String, CallError> {
        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            let call = CallAttempt {
                messages,
                model_id,
                overrides: None,
                attempt,
            };
            match self.backend.complete(&call.request(&self.params)).await {
                Ok(text) => return Ok(text),
                Err(e) if attempt < max_attempts => {
                    debug!(
                        model = model_id,
                        attempt = call.attempt,
                        max_attempts,
                        error = %e,
                        "Chat attempt failed, retrying"
                    );
                    attempt += 1;
                    tokio::time::sleep(self.retry.delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
