//! Error types for ifsweep-llm

use std::path::PathBuf;
use thiserror::Error;

/// Failure of a single chat-completion request, tagged by how the caller
/// should react to it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CallError {
    /// Network trouble, timeouts, rate limits, server-side errors.
    #[error("transient backend failure: {0}")]
    Transient(String),

    /// The backend rejected the shape of the request.
    #[error("backend rejected request: {0}")]
    MalformedRequest(String),

    /// Anything else (auth, missing model, undecodable response).
    #[error("backend call failed: {0}")]
    Other(String),
}

impl CallError {
    pub fn is_malformed_request(&self) -> bool {
        matches!(self, Self::MalformedRequest(_))
    }

    /// Classify an HTTP status returned by the backend.
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            400 => Self::MalformedRequest(body),
            408 | 429 | 500..=599 => Self::Transient(format!("HTTP {}: {}", status, body)),
            _ => Self::Other(format!("HTTP {}: {}", status, body)),
        }
    }
}

impl From<reqwest::Error> for CallError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_builder() || err.is_decode() {
            CallError::Other(err.to_string())
        } else {
            CallError::Transient(err.to_string())
        }
    }
}

/// Errors that abort the inference worker (exit status 1).
#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("failed to load model {model}: {reason}")]
    ModelLoad { model: String, reason: String },

    #[error("no input corpus found in {}", .data_dir.display())]
    NoInput { data_dir: PathBuf },

    #[error("malformed corpus line {line}: {source}")]
    MalformedInput {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("corpus line {line} has no prompt field")]
    MissingPrompt { line: usize },

    #[error("generation failed on corpus line {line}: {reason}")]
    Generation { line: usize, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while generating a synthetic corpus.
#[derive(Error, Debug)]
pub enum GenerateError {
    #[error("unknown instruction id: {0}")]
    UnknownInstruction(String),

    #[error("instruction catalog has no ids with prefix {0:?}")]
    EmptyCatalog(String),

    #[error("backend error: {0}")]
    Backend(#[from] CallError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert!(CallError::from_status(400, "bad".into()).is_malformed_request());
        assert!(matches!(
            CallError::from_status(503, String::new()),
            CallError::Transient(_)
        ));
        assert!(matches!(
            CallError::from_status(429, String::new()),
            CallError::Transient(_)
        ));
        assert!(matches!(
            CallError::from_status(401, String::new()),
            CallError::Other(_)
        ));
    }

    #[test]
    fn test_worker_error_display() {
        let err = WorkerError::ModelLoad {
            model: "a/b".into(),
            reason: "not served".into(),
        };
        assert_eq!(err.to_string(), "failed to load model a/b: not served");
    }
}
