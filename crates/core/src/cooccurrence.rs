//! Co-occurrence-first search (CFS): corpus-level locator promotion.

use indexmap::IndexMap;
use std::collections::HashSet;

use crate::detection::Detection;
use crate::parser::Parser;
use crate::tag::{TagEntity, TagScore, TagUpdate};
use crate::vocabulary::Vocabulary;

#[derive(Debug, Default)]
struct Cooccurrence {
    count: usize,
    remark: String,
}

/// Promotes tokens that keep appearing next to known families to `behavior`
pub struct CooccurrencePromoter<'a> {
    parser: &'a Parser,
    threshold: usize,
    certs: Option<&'a HashSet<String>>,
}

impl<'a> CooccurrencePromoter<'a> {
    pub fn new(parser: &'a Parser, threshold: usize) -> Self {
        Self {
            parser,
            threshold,
            certs: None,
        }
    }

    /// Restrict promotion to vetted tokens
    #[must_use]
    pub fn with_certs(mut self, certs: Option<&'a HashSet<String>>) -> Self {
        self.certs = certs;
        self
    }

    /// Count co-occurrences over the corpus, then promote every token at or
    /// above the threshold. Returns the change in locator count.
    pub fn promote(&self, corpus: &[Detection], voc: &mut Vocabulary) -> isize {
        let start = voc.count_locators();

        let counter = self.count(corpus, voc);
        for (token, seen) in counter {
            if seen.count < self.threshold {
                continue;
            }
            let score = voc.lookup(&token).score();
            if matches!(score, TagScore::Updated | TagScore::Confirmed) {
                continue;
            }
            if self.certs.is_some_and(|certs| !certs.contains(&token)) {
                continue;
            }
            log::debug!("CFS: `{token}` -> behavior ({} co-occurrences)", seen.count);
            voc.propose_update(
                &token,
                TagUpdate::new()
                    .with_entity(TagEntity::Behavior)
                    .with_score(TagScore::Updated)
                    .with_remark(seen.remark),
            );
        }

        voc.count_locators() as isize - start as isize
    }

    /// First-seen ordered counter; the remark records the first family and
    /// label each token was seen with
    fn count(&self, corpus: &[Detection], voc: &Vocabulary) -> IndexMap<String, Cooccurrence> {
        let mut counter: IndexMap<String, Cooccurrence> = IndexMap::new();
        for detection in corpus {
            let Some(engine) = detection.first_engine() else {
                continue;
            };
            let Some((family, companions)) = self.parser.cooccurrence(engine, &detection.label, voc)
            else {
                continue;
            };
            for token in companions {
                let entry = counter.entry(token).or_insert_with(|| Cooccurrence {
                    count: 0,
                    remark: format!("{family} -> {}", detection.label),
                });
                entry.count += 1;
            }
        }
        counter
    }
}
