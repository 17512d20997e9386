//! End-to-end corpus cleaning through the filesystem.

use ifsweep_core::{CorpusRecord, DataCleaner};
use std::fs;
use std::path::Path;

fn record_line(key: i64, ids: &[&str]) -> String {
    let record = CorpusRecord {
        key,
        instruction_id_list: ids.iter().map(|s| s.to_string()).collect(),
        prompt: format!("prompt {}", key),
        kwargs: ids.iter().map(|_| serde_json::json!({})).collect(),
    };
    format!("{}\n", serde_json::to_string(&record).unwrap())
}

fn write_corpus(path: &Path, lines: &[String]) {
    fs::write(path, lines.concat()).unwrap();
}

#[test]
fn test_three_records_one_killed() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("pt_input_data.jsonl");
    let output = dir.path().join("pt_input_data_FINAL_CLEAN.jsonl");
    write_corpus(
        &input,
        &[
            record_line(1, &["pt:a"]),
            record_line(2, &["x"]),
            record_line(3, &["pt:b"]),
        ],
    );

    let report = DataCleaner::new(["x"]).clean(&input, &output).unwrap();
    assert_eq!((report.total, report.kept, report.removed), (3, 2, 1));

    let cleaned = fs::read_to_string(&output).unwrap();
    let keys: Vec<i64> = cleaned
        .lines()
        .map(|l| serde_json::from_str::<CorpusRecord>(l).unwrap().key)
        .collect();
    assert_eq!(keys, vec![1, 3]);
}

#[test]
fn test_removed_counts_any_intersection() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.jsonl");
    let output = dir.path().join("out.jsonl");
    let lines = vec![
        record_line(1, &["a", "b"]),
        record_line(2, &["c"]),
        record_line(3, &["d", "k2"]),
        record_line(4, &["k1", "k2"]),
        record_line(5, &[]),
        "{broken\n".to_string(),
    ];
    write_corpus(&input, &lines);

    let report = DataCleaner::new(["k1", "k2"]).clean(&input, &output).unwrap();
    assert_eq!(report.total, 6);
    assert_eq!(report.removed, 2);
    assert_eq!(report.kept, 3);
    assert_eq!(report.wellformed(), 5);
}

#[test]
fn test_cleaning_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.jsonl");
    let first = dir.path().join("first.jsonl");
    let second = dir.path().join("second.jsonl");
    write_corpus(
        &input,
        &[
            record_line(1, &["keep"]),
            record_line(2, &["drop"]),
            record_line(3, &["keep", "drop"]),
            "garbage\n".to_string(),
        ],
    );

    let cleaner = DataCleaner::new(["drop"]);
    let report1 = cleaner.clean(&input, &first).unwrap();
    let report2 = cleaner.clean(&first, &second).unwrap();

    assert_eq!(report1.removed, 2);
    assert_eq!(report2.removed, 0);
    assert_eq!(report2.kept, report1.kept);
    assert_eq!(fs::read(&first).unwrap(), fs::read(&second).unwrap());
}

#[test]
fn test_clean_creates_output_directory() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.jsonl");
    let output = dir.path().join("nested/out/clean.jsonl");
    write_corpus(&input, &[record_line(1, &["a"])]);

    let report = DataCleaner::new(["x"]).clean(&input, &output).unwrap();
    assert_eq!(report.kept, 1);
    assert!(output.is_file());
}

#[test]
fn test_null_kwargs_entries_are_kept() {
    let corpus = concat!(
        r#"{"key":164,"instruction_id_list":["pt:length_constraints:number_words","pt:change_case:english_lowercase"],"prompt":"a","kwargs":[{"num_words":50,"relation":"less than"},null]}"#,
        "\n",
        r#"{"key":165,"instruction_id_list":["pt:startend:quotation"],"prompt":"b","kwargs":[null]}"#,
        "\n",
    );

    let mut out = Vec::new();
    let report = DataCleaner::new(["pt:detectable_format:constrained_response"])
        .filter(corpus.as_bytes(), &mut out)
        .unwrap();

    assert_eq!((report.total, report.kept, report.removed, report.malformed), (2, 2, 0, 0));
    assert_eq!(out, corpus.as_bytes());
}

mod laws {
    use super::*;
    use proptest::prelude::*;

    const IDS: [&str; 5] = ["pt:a", "pt:b", "pt:c", "pt:d", "pt:e"];

    /// A corpus line: either a record over a subset of `IDS` (with optional
    /// null kwargs) or a malformed line.
    fn line() -> impl Strategy<Value = (Option<Vec<usize>>, String)> {
        prop_oneof![
            4 => (prop::collection::vec(0..IDS.len(), 0..4), any::<bool>()).prop_map(|(ids, nulls)| {
                let id_list: Vec<&str> = ids.iter().map(|i| IDS[*i]).collect();
                let kwargs: Vec<serde_json::Value> = ids
                    .iter()
                    .map(|_| if nulls { serde_json::Value::Null } else { serde_json::json!({}) })
                    .collect();
                let text = serde_json::json!({
                    "key": 1,
                    "instruction_id_list": id_list,
                    "prompt": "p",
                    "kwargs": kwargs,
                })
                .to_string();
                (Some(ids), format!("{}\n", text))
            }),
            1 => "[a-z{ ]{0,8}".prop_map(|junk| (None, format!("{{{}\n", junk))),
        ]
    }

    proptest! {
        #[test]
        fn test_counts_match_kill_list_intersections(
            lines in prop::collection::vec(line(), 0..40),
            kill in prop::collection::vec(0..IDS.len(), 0..3),
        ) {
            let kill_list: Vec<&str> = kill.iter().map(|i| IDS[*i]).collect();
            let corpus: String = lines.iter().map(|(_, text)| text.as_str()).collect();
            let wellformed = lines.iter().filter(|(ids, _)| ids.is_some()).count();
            let expected_removed = lines
                .iter()
                .filter_map(|(ids, _)| ids.as_ref())
                .filter(|ids| ids.iter().any(|i| kill.contains(i)))
                .count();

            let cleaner = DataCleaner::new(kill_list.iter().copied());
            let mut out = Vec::new();
            let report = cleaner.filter(corpus.as_bytes(), &mut out).unwrap();

            prop_assert_eq!(report.total, lines.len());
            prop_assert_eq!(report.kept + report.removed, wellformed);
            prop_assert_eq!(report.removed, expected_removed);

            let mut again = Vec::new();
            let second = cleaner.filter(out.as_slice(), &mut again).unwrap();
            prop_assert_eq!(second.removed, 0);
            prop_assert_eq!(second.kept, report.kept);
            prop_assert_eq!(again, out);
        }
    }
}
