//! TOML vocabulary snapshots.
//!
//! One table per token, fields equal to their defaults omitted:
//!
//! ```toml
//! [ransom]
//! entity = "behavior"
//! score = 10
//!
//! [upx]
//! entity = "misc"
//! path = "packeric"
//! score = 10
//! ```

use indexmap::IndexMap;
use std::fs;
use std::path::Path;

use tagclass_core::{ExportOptions, TagEntity, TagRecord, Vocabulary};

use crate::error::{Result, StoreError};

/// Rows of a snapshot in file order
pub type SnapshotRows = IndexMap<String, TagRecord>;

pub fn parse_snapshot(text: &str) -> std::result::Result<SnapshotRows, toml::de::Error> {
    toml::from_str(text)
}

/// Merge one snapshot text into `voc`; `origin` only labels errors
pub fn extend_from_str(
    voc: &mut Vocabulary,
    text: &str,
    origin: &Path,
    unconfirmed_ok: bool,
) -> Result<usize> {
    let rows = parse_snapshot(text).map_err(|source| StoreError::InvalidSnapshot {
        path: origin.to_path_buf(),
        source,
    })?;
    Ok(voc.load_records(rows, unconfirmed_ok)?)
}

/// Load and merge snapshot files in order.
///
/// A token defined twice across the files is fatal, as is any row below
/// `Confirmed` unless `unconfirmed_ok` (then such rows are skipped).
pub fn load_vocabulary<P: AsRef<Path>>(paths: &[P], unconfirmed_ok: bool) -> Result<Vocabulary> {
    let mut voc = Vocabulary::new();
    for path in paths {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        let loaded = extend_from_str(&mut voc, &text, path, unconfirmed_ok)?;
        log::debug!("Loaded {loaded} tags from {}", path.display());
    }
    Ok(voc)
}

pub fn render_rows(rows: &[(String, TagRecord)]) -> Result<String> {
    let table: SnapshotRows = rows.iter().cloned().collect();
    Ok(toml::to_string(&table)?)
}

/// Snapshot text for the tags of `entities`
pub fn render_snapshot(
    voc: &Vocabulary,
    entities: &[TagEntity],
    options: ExportOptions,
) -> Result<String> {
    render_rows(&voc.export_records(entities, options))
}

pub fn write_rows(path: &Path, rows: &[(String, TagRecord)]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, render_rows(rows)?)?;
    Ok(())
}

/// Write the tags of `entities` to `path`. Returns the number of rows.
pub fn dump_vocabulary(
    voc: &Vocabulary,
    entities: &[TagEntity],
    path: &Path,
    options: ExportOptions,
) -> Result<usize> {
    let rows = voc.export_records(entities, options);
    write_rows(path, &rows)?;
    log::info!("Wrote {} tags to {}", rows.len(), path.display());
    Ok(rows.len())
}
