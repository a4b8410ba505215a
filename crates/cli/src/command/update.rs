use anyhow::{Context as AnyhowContext, Result};
use serde::Serialize;
use tagclass_core::{ExportOptions, IncrementalUpdater, RunMode, TagEntity, UpdateReport};

use super::RunContext;
use crate::progress::spinner;
use crate::{print_stdout, UpdateArgs};

#[derive(Serialize)]
struct UpdateOutput {
    labels: usize,
    threshold_cfs: usize,
    lfs_mode: RunMode,
    #[serde(flatten)]
    report: UpdateReport,
}

pub fn run_update(ctx: RunContext, args: UpdateArgs) -> Result<()> {
    let mut config = ctx.config;
    if let Some(threshold) = args.threshold_cfs {
        config.threshold_cfs = threshold;
    }
    if let Some(max_round) = args.max_round {
        config.max_round = max_round;
    }
    if let Some(mode) = args.lfs_mode {
        config.lfs_mode = mode.as_domain();
    }
    config.validate()?;

    let certs = args
        .certs
        .as_deref()
        .map(|path| tagclass_store::load_certs(path, args.cert_qos))
        .transpose()
        .context("Failed to load allow-list")?;
    let corpus = tagclass_store::load_corpus(&args.corpus)
        .with_context(|| format!("Failed to load corpus {}", args.corpus.display()))?;
    let mut voc = args.voc.load()?;

    let updater = IncrementalUpdater::new(&config).with_certs(certs.as_ref());
    let bar = spinner("LFS-CFS loop until no new locator", ctx.quiet);
    let report = updater.run_rounds(&corpus, &mut voc);
    bar.finish_and_clear();

    if report.converged() {
        log::info!("Update finished at round {}", report.rounds);
    } else {
        log::warn!("Update exceeded max round {}", config.max_round);
    }

    if let Some(path) = &args.dump {
        tagclass_store::dump_vocabulary(
            &voc,
            &TagEntity::LOCATORS,
            path,
            ExportOptions {
                ignore_unknown: true,
                sort: args.sort,
            },
        )
        .with_context(|| format!("Failed to dump vocabulary to {}", path.display()))?;
    }

    let output = UpdateOutput {
        labels: corpus.len(),
        threshold_cfs: config.threshold_cfs,
        lfs_mode: config.lfs_mode,
        report,
    };
    print_stdout(&serde_json::to_string_pretty(&output)?)
}
