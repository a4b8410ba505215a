use anyhow::{Context as AnyhowContext, Result};
use std::fs::File;
use std::io::{self, BufWriter};
use std::path::Path;
use tagclass_core::{Detection, LabelTag, Parser, Vocabulary};

use super::RunContext;
use crate::progress::labels_bar;
use crate::{print_stdout, ParseArgs};

pub fn run_parse(ctx: &RunContext, args: ParseArgs) -> Result<()> {
    ctx.config.validate()?;
    let mut voc = args.voc.load()?;
    let parser = Parser::from_config(&ctx.config, args.mode.as_domain());

    if let Some(label) = &args.label {
        let tags = parser.parse(label, &args.engine, &mut voc);
        return match args.out.as_deref() {
            Some(path) => emit(Some(path), &[(label.clone(), tags)]),
            None => print_stdout(&serde_json::to_string(&tags)?),
        };
    }

    if let Some(path) = &args.corpus {
        let corpus = tagclass_store::load_corpus(path)
            .with_context(|| format!("Failed to load corpus {}", path.display()))?;
        let rows = parse_corpus(&parser, &corpus, &mut voc, ctx.quiet);
        log::info!("Parsed {} labels; {voc}", rows.len());
        emit(args.out.as_deref(), &rows)?;
    }
    Ok(())
}

fn parse_corpus(
    parser: &Parser,
    corpus: &[Detection],
    voc: &mut Vocabulary,
    quiet: bool,
) -> Vec<(String, Vec<LabelTag>)> {
    let bar = labels_bar(corpus.len(), "Parsing", quiet);
    let mut rows = Vec::with_capacity(corpus.len());
    for detection in corpus {
        bar.inc(1);
        let Some(engine) = detection.first_engine() else {
            continue;
        };
        let tags = parser.parse(&detection.label, engine, voc);
        rows.push((detection.label.clone(), tags));
    }
    bar.finish_and_clear();
    rows
}

/// Write `[label, tags]` JSON lines to `out`, or stdout when absent
fn emit(out: Option<&Path>, rows: &[(String, Vec<LabelTag>)]) -> Result<()> {
    match out {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            tagclass_store::write_jsonl(BufWriter::new(file), rows)?;
            log::info!("Saved {} results to {}", rows.len(), path.display());
        }
        None => {
            let stdout = io::stdout().lock();
            if let Err(err) = tagclass_store::write_jsonl(BufWriter::new(stdout), rows) {
                if !matches!(&err, tagclass_store::StoreError::IoError(e) if e.kind() == io::ErrorKind::BrokenPipe)
                {
                    return Err(err.into());
                }
            }
        }
    }
    Ok(())
}
