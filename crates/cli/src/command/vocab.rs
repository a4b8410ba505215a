use anyhow::{Context as AnyhowContext, Result};
use std::collections::BTreeMap;
use tagclass_core::Tokenizer;
use tagclass_store::{clean_snapshots, CleanPlan};

use super::RunContext;
use crate::{print_stdout, CleanArgs, ListArgs, TokenizeArgs};

pub fn run_tokenize(ctx: &RunContext, args: TokenizeArgs) -> Result<()> {
    ctx.config.validate()?;
    let tokens = Tokenizer::new(ctx.config.max_seq_length).tokenize(&args.engine, &args.label);
    print_stdout(&serde_json::to_string(&tokens)?)
}

pub fn run_list(args: ListArgs) -> Result<()> {
    let voc = args.voc.load()?;
    let mut counts: BTreeMap<String, usize> = voc
        .count_by_entity()
        .into_iter()
        .map(|(entity, count)| (entity.to_string(), count))
        .collect();
    counts.insert("total".to_string(), voc.len());
    print_stdout(&serde_json::to_string_pretty(&counts)?)
}

pub fn run_clean(args: CleanArgs) -> Result<()> {
    let plan = CleanPlan {
        locator: args.locator,
        misc: args.misc,
        family: args.family,
        sort: args.sort,
    };
    let report = clean_snapshots(&plan).context("Failed to clean vocabulary snapshots")?;
    print_stdout(&serde_json::to_string_pretty(&report)?)
}
