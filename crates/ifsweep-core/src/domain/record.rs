//! Corpus and response records (line-delimited JSON).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Field carrying the prompt text in a corpus record.
pub const PROMPT_FIELD: &str = "prompt";

/// Fields consulted, in order, when a record has no [`PROMPT_FIELD`].
pub const PROMPT_FALLBACK_FIELDS: [&str; 3] = ["instruction", "pergunta", "input"];

/// Field holding the generated text in a response record.
pub const RESPONSE_FIELD: &str = "response";

/// One input example of the benchmark corpus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorpusRecord {
    /// Sequence id.
    pub key: i64,

    /// Instruction identifiers the prompt must satisfy.
    pub instruction_id_list: Vec<String>,

    /// Prompt text shown to the model.
    pub prompt: String,

    /// Per-instruction arguments, parallel to `instruction_id_list`. An
    /// instruction without arguments is `null`.
    #[serde(default)]
    pub kwargs: Vec<Value>,
}

impl CorpusRecord {
    /// Whether any of this record's instruction ids is in `kill_list`.
    pub fn matches_any<S: AsRef<str>>(&self, kill_list: &[S]) -> bool {
        self.instruction_id_list
            .iter()
            .any(|id| kill_list.iter().any(|k| k.as_ref() == id))
    }
}

/// Locate the prompt in a raw record, honouring the fallback order.
///
/// Returns the field name that was used together with its text.
pub fn extract_prompt(record: &Value) -> Option<(&'static str, &str)> {
    std::iter::once(PROMPT_FIELD)
        .chain(PROMPT_FALLBACK_FIELDS)
        .find_map(|field| {
            record
                .get(field)
                .and_then(Value::as_str)
                .map(|text| (field, text))
        })
}

/// A prompt paired with the model's response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseRecord {
    /// Name of the field the prompt was read from (kept on output).
    pub prompt_field: String,
    pub prompt: String,
    pub response: String,
}

impl ResponseRecord {
    pub fn to_json(&self) -> Value {
        let mut obj = Map::new();
        obj.insert(self.prompt_field.clone(), Value::String(self.prompt.clone()));
        obj.insert(
            RESPONSE_FIELD.to_string(),
            Value::String(self.response.clone()),
        );
        Value::Object(obj)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_corpus_record_parses_without_kwargs() {
        let rec: CorpusRecord =
            serde_json::from_str(r#"{"key":1,"instruction_id_list":["a"],"prompt":"p"}"#).unwrap();
        assert_eq!(rec.key, 1);
        assert!(rec.kwargs.is_empty());
    }

    #[test]
    fn test_corpus_record_accepts_null_kwargs() {
        let rec: CorpusRecord = serde_json::from_str(
            r#"{"key":7,"instruction_id_list":["pt:a","pt:b"],"prompt":"p","kwargs":[null,{"num_words":50}]}"#,
        )
        .unwrap();
        assert_eq!(rec.kwargs, vec![Value::Null, json!({"num_words": 50})]);
    }

    #[test]
    fn test_matches_any() {
        let rec = CorpusRecord {
            key: 1,
            instruction_id_list: vec!["pt:a".into(), "pt:b".into()],
            prompt: "p".into(),
            kwargs: vec![],
        };
        assert!(rec.matches_any(&["pt:b"]));
        assert!(!rec.matches_any(&["pt:c"]));
        assert!(!rec.matches_any::<&str>(&[]));
    }

    #[test]
    fn test_extract_prompt_prefers_prompt_field() {
        let rec = json!({"prompt": "primary", "instruction": "secondary"});
        assert_eq!(extract_prompt(&rec), Some(("prompt", "primary")));
    }

    #[test]
    fn test_extract_prompt_fallback_order() {
        let rec = json!({"input": "last", "pergunta": "third"});
        assert_eq!(extract_prompt(&rec), Some(("pergunta", "third")));

        let rec = json!({"input": "last"});
        assert_eq!(extract_prompt(&rec), Some(("input", "last")));

        let rec = json!({"text": "nope"});
        assert_eq!(extract_prompt(&rec), None);
    }

    #[test]
    fn test_response_record_keeps_prompt_field_name() {
        let rec = ResponseRecord {
            prompt_field: "instruction".into(),
            prompt: "do it".into(),
            response: "done".into(),
        };
        assert_eq!(
            rec.to_json(),
            json!({"instruction": "do it", "response": "done"})
        );
    }
}
