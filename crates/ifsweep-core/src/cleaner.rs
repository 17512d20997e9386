//! Kill-list filtering of the benchmark corpus.
//!
//! Kept lines are copied byte-for-byte; lines that do not parse as a
//! [`CorpusRecord`] are dropped and only show up in `total`.

use crate::domain::{CorpusRecord, Result, SweepError};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// Counters produced by one cleaning pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanReport {
    /// Lines read.
    pub total: usize,
    pub kept: usize,
    pub removed: usize,
    /// Lines that were not well-formed records.
    pub malformed: usize,
}

impl CleanReport {
    /// Well-formed records seen (`kept + removed`).
    pub fn wellformed(&self) -> usize {
        self.kept + self.removed
    }
}

/// Filters corpus records whose instruction ids intersect a kill-list.
#[derive(Debug, Clone)]
pub struct DataCleaner {
    kill_list: Vec<String>,
}

impl DataCleaner {
    pub fn new<I, S>(kill_list: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            kill_list: kill_list.into_iter().map(Into::into).collect(),
        }
    }

    /// Clean `input` into `output`.
    ///
    /// The output is written to a temporary file next to `output` and renamed
    /// into place, so a failed pass never leaves a truncated corpus behind.
    pub fn clean(&self, input: &Path, output: &Path) -> Result<CleanReport> {
        if !input.is_file() {
            return Err(SweepError::InputNotFound(input.to_path_buf()));
        }

        let reader = BufReader::new(File::open(input)?);
        let out_dir = match output.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(out_dir)?;
        let tmp = NamedTempFile::new_in(out_dir)?;
        let mut writer = BufWriter::new(tmp);

        let report = self.filter(reader, &mut writer)?;

        let tmp = writer.into_inner().map_err(|e| e.into_error())?;
        tmp.persist(output).map_err(|e| e.error)?;

        info!(
            input = %input.display(),
            output = %output.display(),
            total = report.total,
            kept = report.kept,
            removed = report.removed,
            "Corpus cleaned"
        );
        Ok(report)
    }

    /// Stream records from `reader` to `writer`, applying the kill-list.
    pub fn filter<R: BufRead, W: Write>(&self, mut reader: R, writer: &mut W) -> Result<CleanReport> {
        let mut report = CleanReport::default();
        let mut line = Vec::new();

        loop {
            line.clear();
            if reader.read_until(b'\n', &mut line)? == 0 {
                break;
            }
            report.total += 1;

            let record: CorpusRecord = match serde_json::from_slice(&line) {
                Ok(r) => r,
                Err(e) => {
                    debug!(line = report.total, error = %e, "Dropping malformed corpus line");
                    report.malformed += 1;
                    continue;
                }
            };

            if record.matches_any(&self.kill_list) {
                report.removed += 1;
            } else {
                writer.write_all(&line)?;
                report.kept += 1;
            }
        }

        writer.flush()?;
        Ok(report)
    }
}
