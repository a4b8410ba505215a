use std::path::PathBuf;

use tagclass_core::{ExportOptions, TagEntity, Vocabulary};

use crate::error::Result;
use crate::snapshot::{load_vocabulary, write_rows};

/// Snapshot files to rewrite with only confirmed rows
#[derive(Debug, Clone)]
pub struct CleanPlan {
    pub locator: PathBuf,
    pub misc: PathBuf,
    pub family: Option<PathBuf>,
    pub sort: bool,
}

/// Rows kept per snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
pub struct CleanReport {
    pub locators: usize,
    pub misc: usize,
    pub families: Option<usize>,
}

/// Drop unconfirmed rows from the snapshots and remove from the misc and
/// family snapshots every token already defined as a locator. Misc paths
/// are cleared.
pub fn clean_snapshots(plan: &CleanPlan) -> Result<CleanReport> {
    let options = ExportOptions {
        ignore_unknown: true,
        sort: plan.sort,
    };

    let locators = load_vocabulary(&[&plan.locator], true)?;
    let locator_rows = locators.export_records(&TagEntity::LOCATORS, options);
    write_rows(&plan.locator, &locator_rows)?;

    let mut misc = load_vocabulary(&[&plan.misc], true)?;
    drop_locators(&mut misc, &locators);
    let misc_rows: Vec<_> = misc
        .export_records(&[TagEntity::Misc], options)
        .into_iter()
        .map(|(name, mut record)| {
            record.path = None;
            (name, record)
        })
        .collect();
    write_rows(&plan.misc, &misc_rows)?;

    let families = match &plan.family {
        Some(path) => {
            let mut family = load_vocabulary(&[path], true)?;
            drop_locators(&mut family, &locators);
            let rows = family.export_records(&[TagEntity::Family], options);
            write_rows(path, &rows)?;
            Some(rows.len())
        }
        None => None,
    };

    let report = CleanReport {
        locators: locator_rows.len(),
        misc: misc_rows.len(),
        families,
    };
    log::info!("Cleaned snapshots: {report:?}");
    Ok(report)
}

fn drop_locators(voc: &mut Vocabulary, locators: &Vocabulary) {
    for tag in locators.iter() {
        if voc.remove(tag.name()).is_some() {
            log::debug!("Dropping `{}` already defined as a locator", tag.name());
        }
    }
}
