use indexmap::IndexMap;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use tagclass_core::{clean_label, Detection};

use crate::error::Result;

/// Labels shorter than this (after cleaning) are dropped
pub const MIN_LABEL_LENGTH: usize = 3;

#[derive(Deserialize)]
#[serde(untagged)]
enum CorpusRow {
    Object { label: String, engines: Vec<String> },
    Pair(String, Vec<String>),
}

impl CorpusRow {
    fn into_parts(self) -> (String, Vec<String>) {
        match self {
            Self::Object { label, engines } => (label, engines),
            Self::Pair(label, engines) => (label, engines),
        }
    }
}

/// Read a JSON-lines corpus of `{"label", "engines"}` objects or
/// `["label", ["engine", ...]]` pairs.
///
/// Engines of repeated labels are merged and sorted, labels keep their
/// first-seen order. Malformed lines are skipped with a warning.
pub fn parse_corpus<R: BufRead>(reader: R) -> Result<Vec<Detection>> {
    let mut merged: IndexMap<String, BTreeSet<String>> = IndexMap::new();
    let mut skipped = 0usize;

    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let row: CorpusRow = match serde_json::from_str(line) {
            Ok(row) => row,
            Err(e) => {
                log::warn!("Skipping corpus line {}: {e}", idx + 1);
                skipped += 1;
                continue;
            }
        };
        let (label, engines) = row.into_parts();
        let label = clean_label(&label);
        if label.len() < MIN_LABEL_LENGTH {
            continue;
        }
        let engines: Vec<String> = engines
            .into_iter()
            .map(|e| e.trim().to_string())
            .filter(|e| !e.is_empty())
            .collect();
        if engines.is_empty() {
            log::warn!("Skipping corpus line {}: no engines for `{label}`", idx + 1);
            skipped += 1;
            continue;
        }
        merged.entry(label).or_default().extend(engines);
    }

    if skipped > 0 {
        log::warn!("Skipped {skipped} corpus lines");
    }
    Ok(merged
        .into_iter()
        .map(|(label, engines)| Detection::new(label, engines))
        .collect())
}

pub fn load_corpus(path: &Path) -> Result<Vec<Detection>> {
    let file = File::open(path)?;
    let corpus = parse_corpus(BufReader::new(file))?;
    log::info!("Loaded {} labels from {}", corpus.len(), path.display());
    Ok(corpus)
}

/// Write `[label, value]` JSON lines
pub fn write_jsonl<W, T>(mut writer: W, rows: &[(String, T)]) -> Result<()>
where
    W: Write,
    T: serde::Serialize,
{
    for (label, value) in rows {
        serde_json::to_writer(&mut writer, &(label, value))?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}
