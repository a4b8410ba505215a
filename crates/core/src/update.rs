//! Incremental locator update: alternate LFS and CFS until a fixed point.

use serde::Serialize;
use std::collections::{BTreeSet, HashSet};

use crate::config::{RunMode, TagClassConfig};
use crate::cooccurrence::CooccurrencePromoter;
use crate::detection::Detection;
use crate::parser::Parser;
use crate::tag::{TagEntity, TagScore};
use crate::vocabulary::Vocabulary;

/// Counters of one LFS + CFS step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StepStats {
    pub step: usize,
    pub new_families: isize,
    pub new_locators: isize,
}

/// Whether the round loop reached a fixed point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateStatus {
    Converged,
    ExceededMaxRound,
}

/// Outcome of [`IncrementalUpdater::run_rounds`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdateReport {
    pub status: UpdateStatus,
    /// Rounds that ran
    pub rounds: usize,
    /// Locator tags at `Updated`, sorted
    pub updated: Vec<String>,
    /// Per-round step counters
    pub steps: Vec<Vec<StepStats>>,
}

impl UpdateReport {
    pub fn converged(&self) -> bool {
        self.status == UpdateStatus::Converged
    }
}

/// Drives LFS and CFS over a corpus, growing the locator vocabulary
pub struct IncrementalUpdater<'a> {
    parser: Parser,
    threshold_cfs: usize,
    max_round: usize,
    certs: Option<&'a HashSet<String>>,
}

impl<'a> IncrementalUpdater<'a> {
    pub fn new(config: &TagClassConfig) -> Self {
        Self {
            parser: Parser::from_config(config, config.lfs_mode),
            threshold_cfs: config.threshold_cfs,
            max_round: config.max_round,
            certs: None,
        }
    }

    /// Restrict families and promoted locators to vetted tokens
    #[must_use]
    pub fn with_certs(mut self, certs: Option<&'a HashSet<String>>) -> Self {
        self.certs = certs;
        self
    }

    pub fn mode(&self) -> RunMode {
        self.parser.mode()
    }

    /// Parse every label in corpus order. Returns the change in family count.
    pub fn lfs_pass(&self, corpus: &[Detection], voc: &mut Vocabulary) -> isize {
        let start = voc.count_tags(&[TagEntity::Family]);
        for detection in corpus {
            if let Some(engine) = detection.first_engine() {
                self.parser.parse(&detection.label, engine, voc);
            }
        }
        if let Some(certs) = self.certs {
            let dropped = voc.reset_unconfirmed(TagEntity::Family, |tag| certs.contains(tag.name()));
            log::debug!("LFS: dropped {dropped} families outside the allow-list");
        }
        voc.count_tags(&[TagEntity::Family]) as isize - start as isize
    }

    /// One CFS pass. Returns the change in locator count.
    pub fn cfs_pass(&self, corpus: &[Detection], voc: &mut Vocabulary) -> isize {
        CooccurrencePromoter::new(&self.parser, self.threshold_cfs)
            .with_certs(self.certs)
            .promote(corpus, voc)
    }

    /// Alternate LFS and CFS until a step promotes no new locator.
    ///
    /// Non-confirmed families are reset after every step so each LFS pass
    /// starts from confirmed anchors and promoted locators only. Every
    /// continuing step adds at least one locator drawn from the finite
    /// corpus tokens, so the loop terminates.
    pub fn run(&self, corpus: &[Detection], voc: &mut Vocabulary) -> Vec<StepStats> {
        let mut steps = Vec::new();
        loop {
            let step = steps.len() + 1;
            let new_families = self.lfs_pass(corpus, voc);
            let new_locators = self.cfs_pass(corpus, voc);
            log::info!("Step {step}: LFS new family = {new_families}, CFS new locator = {new_locators}");
            steps.push(StepStats {
                step,
                new_families,
                new_locators,
            });

            voc.reset_unconfirmed(TagEntity::Family, |_| false);
            if new_locators <= 0 {
                return steps;
            }
        }
    }

    /// Repeat [`IncrementalUpdater::run`] until a round adds no `Updated`
    /// locator, or `max_round` rounds have run.
    pub fn run_rounds(&self, corpus: &[Detection], voc: &mut Vocabulary) -> UpdateReport {
        let mut last_updated: BTreeSet<String> = BTreeSet::new();
        let mut steps = Vec::new();

        for round in 1..=self.max_round {
            log::info!("Locator update round {round}: {voc}");
            steps.push(self.run(corpus, voc));

            let updated: BTreeSet<String> = voc
                .locator_names_with_score(TagScore::Updated)
                .into_iter()
                .collect();
            let round_updated = updated.difference(&last_updated).count();
            log::info!("Round {round}: updated locators = {round_updated}");
            last_updated = updated;

            if round_updated == 0 {
                return UpdateReport {
                    status: UpdateStatus::Converged,
                    rounds: round,
                    updated: last_updated.into_iter().collect(),
                    steps,
                };
            }
        }

        log::warn!("Locator update exceeded max round {}", self.max_round);
        UpdateReport {
            status: UpdateStatus::ExceededMaxRound,
            rounds: self.max_round,
            updated: last_updated.into_iter().collect(),
            steps,
        }
    }
}
