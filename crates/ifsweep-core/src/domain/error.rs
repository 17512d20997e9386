//! Error taxonomy for ifsweep core operations.

use std::path::PathBuf;

/// Errors produced by configuration, layout and corpus handling.
#[derive(Debug, thiserror::Error)]
pub enum SweepError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("safe name collision: {first} and {second} both map to {safe_name}")]
    SafeNameCollision {
        first: String,
        second: String,
        safe_name: String,
    },

    #[error("input file not found: {}", .0.display())]
    InputNotFound(PathBuf),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for ifsweep core operations.
pub type Result<T> = std::result::Result<T, SweepError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collision_error_names_both_models() {
        let err = SweepError::SafeNameCollision {
            first: "a/b".to_string(),
            second: "a__b".to_string(),
            safe_name: "a__b".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("a/b"));
        assert!(msg.contains("a__b"));
    }

    #[test]
    fn test_input_not_found_shows_path() {
        let err = SweepError::InputNotFound(PathBuf::from("data/pt_input_data.jsonl"));
        assert!(err.to_string().contains("data/pt_input_data.jsonl"));
    }
}
