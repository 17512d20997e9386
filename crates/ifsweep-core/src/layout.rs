//! On-disk naming of corpus, response and evaluation artifacts.
//!
//! Layout for language `pt`:
//! - raw corpus: `<data>/pt_input_data.jsonl`
//! - cleaned corpus: `<data>/pt_input_data_FINAL_CLEAN.jsonl`
//! - responses: `<data>/pt_input_response_data_<SafeName>.jsonl`
//! - scores: `<evaluations>/pt_input_response_data_<SafeName>/`

use crate::domain::SafeName;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataLayout {
    data_dir: PathBuf,
    evaluations_dir: PathBuf,
    lang: String,
}

impl DataLayout {
    pub fn new(
        data_dir: impl Into<PathBuf>,
        evaluations_dir: impl Into<PathBuf>,
        lang: impl Into<String>,
    ) -> Self {
        Self {
            data_dir: data_dir.into(),
            evaluations_dir: evaluations_dir.into(),
            lang: lang.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn evaluations_dir(&self) -> &Path {
        &self.evaluations_dir
    }

    pub fn lang(&self) -> &str {
        &self.lang
    }

    /// Corpus as produced by data generation.
    pub fn raw_corpus(&self) -> PathBuf {
        self.data_dir.join(format!("{}_input_data.jsonl", self.lang))
    }

    /// Legacy intermediate cleaned corpus, still accepted as inference input.
    pub fn intermediate_corpus(&self) -> PathBuf {
        self.data_dir
            .join(format!("{}_input_data_clean.jsonl", self.lang))
    }

    /// Reference corpus after kill-list filtering.
    pub fn clean_corpus(&self) -> PathBuf {
        self.data_dir
            .join(format!("{}_input_data_FINAL_CLEAN.jsonl", self.lang))
    }

    /// Inference inputs in priority order.
    pub fn inference_inputs(&self) -> [PathBuf; 3] {
        [
            self.clean_corpus(),
            self.intermediate_corpus(),
            self.raw_corpus(),
        ]
    }

    /// First inference input that exists on disk.
    pub fn resolve_inference_input(&self) -> Option<PathBuf> {
        self.inference_inputs().into_iter().find(|p| p.is_file())
    }

    fn response_stem(&self, safe_name: &SafeName) -> String {
        format!("{}_input_response_data_{}", self.lang, safe_name)
    }

    pub fn response_file(&self, safe_name: &SafeName) -> PathBuf {
        self.data_dir
            .join(format!("{}.jsonl", self.response_stem(safe_name)))
    }

    pub fn evaluation_dir(&self, safe_name: &SafeName) -> PathBuf {
        self.evaluations_dir.join(self.response_stem(safe_name))
    }
}

impl Default for DataLayout {
    fn default() -> Self {
        Self::new("data", "evaluations", "pt")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ModelDescriptor;

    #[test]
    fn test_response_and_evaluation_paths() {
        let layout = DataLayout::default();
        let safe = ModelDescriptor::new("Qwen/Qwen2.5-7B").safe_name();
        assert_eq!(
            layout.response_file(&safe),
            PathBuf::from("data/pt_input_response_data_Qwen__Qwen2.5-7B.jsonl")
        );
        assert_eq!(
            layout.evaluation_dir(&safe),
            PathBuf::from("evaluations/pt_input_response_data_Qwen__Qwen2.5-7B")
        );
    }

    #[test]
    fn test_corpus_paths_follow_language() {
        let layout = DataLayout::new("d", "e", "en");
        assert_eq!(layout.raw_corpus(), PathBuf::from("d/en_input_data.jsonl"));
        assert_eq!(
            layout.clean_corpus(),
            PathBuf::from("d/en_input_data_FINAL_CLEAN.jsonl")
        );
    }

    #[test]
    fn test_resolve_inference_input_priority() {
        let dir = tempfile::tempdir().unwrap();
        let layout = DataLayout::new(dir.path(), dir.path().join("evals"), "pt");
        assert!(layout.resolve_inference_input().is_none());

        std::fs::write(layout.raw_corpus(), "{}\n").unwrap();
        assert_eq!(layout.resolve_inference_input(), Some(layout.raw_corpus()));

        std::fs::write(layout.intermediate_corpus(), "{}\n").unwrap();
        assert_eq!(
            layout.resolve_inference_input(),
            Some(layout.intermediate_corpus())
        );

        std::fs::write(layout.clean_corpus(), "{}\n").unwrap();
        assert_eq!(layout.resolve_inference_input(), Some(layout.clean_corpus()));
    }
}
