//! Model descriptors and their filesystem-safe names.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Separator between namespace and name in a model descriptor (`org/model`).
pub const NAMESPACE_SEPARATOR: char = '/';

/// Replacement for the namespace separator in file names.
pub const SAFE_SEPARATOR: &str = "__";

/// Opaque identifier of a model backend, e.g. `Qwen/Qwen2.5-7B-Instruct`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModelDescriptor(String);

impl ModelDescriptor {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Derive the name used for every file belonging to this model.
    pub fn safe_name(&self) -> SafeName {
        SafeName(self.0.replace(NAMESPACE_SEPARATOR, SAFE_SEPARATOR))
    }
}

impl fmt::Display for ModelDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ModelDescriptor {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for ModelDescriptor {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Separator-normalized form of a [`ModelDescriptor`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SafeName(String);

impl SafeName {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SafeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_name_replaces_namespace_separator() {
        let model = ModelDescriptor::new("Qwen/Qwen2.5-7B-Instruct");
        assert_eq!(model.safe_name().as_str(), "Qwen__Qwen2.5-7B-Instruct");
    }

    #[test]
    fn test_safe_name_without_namespace_is_unchanged() {
        let model = ModelDescriptor::new("gpt-4o-mini-2024-07-18");
        assert_eq!(model.safe_name().as_str(), "gpt-4o-mini-2024-07-18");
    }

    #[test]
    fn test_safe_name_is_deterministic() {
        let model = ModelDescriptor::from("a/b/c");
        assert_eq!(model.safe_name(), model.safe_name());
        assert_eq!(model.safe_name().as_str(), "a__b__c");
    }

    #[test]
    fn test_descriptor_serializes_as_plain_string() {
        let model = ModelDescriptor::new("org/model");
        let json = serde_json::to_string(&model).unwrap();
        assert_eq!(json, "\"org/model\"");
    }
}
