//! Location-first search (LFS): per-label family inference.
//!
//! Locator tokens (behavior/platform) already known to the vocabulary mark
//! the positions around the family name:
//!
//! ```text
//! Backdoor:Win32/Darkshell   -> [backdoor]*[win]*  darkshell   (continuous: next to the span)
//! ransom.wannacry.win32      -> [ransom]* wannacry [win]*     (discontinuous: inside the span)
//! ```

use serde::{Deserialize, Serialize};

use crate::config::{RunMode, TagClassConfig};
use crate::tag::{TagEntity, TagScore, TagUpdate};
use crate::tokenizer::{normalize_engine_name, Tokenizer};
use crate::vocabulary::Vocabulary;

/// Engine whose labels end in a 4-letter title-case variant suffix that is
/// easily mistaken for a family (`Win64.Trojan.Inject.Eawu`)
const TITLE_SUFFIX_ENGINE: &str = "tencent";
const TITLE_SUFFIX_LEN: usize = 4;

/// Classification of one token of a label
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelTag {
    pub tag: String,
    pub entity: TagEntity,
    pub score: TagScore,
}

impl LabelTag {
    pub fn new(tag: impl Into<String>, entity: TagEntity, score: TagScore) -> Self {
        Self {
            tag: tag.into(),
            entity,
            score,
        }
    }
}

/// A label looks like a file path: `\sav6\work_channel1_12\57745154`
pub fn filepath_like(label: &str) -> bool {
    label.matches('/').count() > 2 || label.contains('\\')
}

/// Labels that are worth tokenizing at all
pub fn is_valid_label(label: &str) -> bool {
    !filepath_like(label)
}

/// Share of ASCII digits in `token` (1.0 for the empty string)
pub fn digit_ratio(token: &str) -> f64 {
    if token.is_empty() {
        return 1.0;
    }
    let digits = token.chars().filter(char::is_ascii_digit).count();
    digits as f64 / token.chars().count() as f64
}

/// Title case in the word-wise sense: upper case only after an uncased
/// character, lower case only after a cased one
fn is_title(word: &str) -> bool {
    let mut prev_cased = false;
    let mut any_cased = false;
    for c in word.chars() {
        if c.is_uppercase() {
            if prev_cased {
                return false;
            }
            prev_cased = true;
            any_cased = true;
        } else if c.is_lowercase() {
            if !prev_cased {
                return false;
            }
            prev_cased = true;
            any_cased = true;
        } else {
            prev_cased = false;
        }
    }
    any_cased
}

/// Post-filter rejecting implausible family inferences
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FamilyFilter {
    min_len: usize,
    max_digit_ratio: f64,
}

impl Default for FamilyFilter {
    fn default() -> Self {
        let config = TagClassConfig::default();
        Self::new(config.family_min_len, config.family_max_digit_ratio)
    }
}

impl FamilyFilter {
    pub fn new(min_len: usize, max_digit_ratio: f64) -> Self {
        Self {
            min_len,
            max_digit_ratio,
        }
    }

    /// Confirmed families always pass. Everything else must be long enough,
    /// mostly non-numeric, and not the variant suffix of a title-case engine.
    pub fn is_valid(&self, result: &LabelTag, label: &str, engine: &str) -> bool {
        if result.score.is_confirmed() {
            return true;
        }
        let tag = result.tag.as_str();
        if tag.len() < self.min_len {
            return false;
        }
        if digit_ratio(tag) >= self.max_digit_ratio {
            return false;
        }
        if tag.len() == TITLE_SUFFIX_LEN && normalize_engine_name(engine) == TITLE_SUFFIX_ENGINE {
            let last = label.rsplit('.').next().unwrap_or(label);
            if is_title(last) && last.to_lowercase() == tag {
                return false;
            }
        }
        true
    }
}

/// Label parser running location-first search against a vocabulary
#[derive(Debug, Clone)]
pub struct Parser {
    tokenizer: Tokenizer,
    mode: RunMode,
    filter: FamilyFilter,
}

impl Default for Parser {
    fn default() -> Self {
        Self::new(Tokenizer::default(), RunMode::Parse)
    }
}

impl Parser {
    pub fn new(tokenizer: Tokenizer, mode: RunMode) -> Self {
        Self {
            tokenizer,
            mode,
            filter: FamilyFilter::default(),
        }
    }

    pub fn from_config(config: &TagClassConfig, mode: RunMode) -> Self {
        Self {
            tokenizer: Tokenizer::new(config.max_seq_length),
            mode,
            filter: FamilyFilter::new(config.family_min_len, config.family_max_digit_ratio),
        }
    }

    pub fn mode(&self) -> RunMode {
        self.mode
    }

    pub fn tokenizer(&self) -> &Tokenizer {
        &self.tokenizer
    }

    /// Tokenize, search and filter one label.
    ///
    /// Unclassified tokens are left out of the output. A rejected family is
    /// locked in the vocabulary as unclassified so later labels cannot
    /// promote it again.
    pub fn parse(&self, label: &str, engine: &str, voc: &mut Vocabulary) -> Vec<LabelTag> {
        if !is_valid_label(label) {
            return Vec::new();
        }
        let tokens = self.tokenizer.tokenize(engine, label);

        let mut results = Vec::new();
        for r in self.lfs(&tokens, voc) {
            if r.entity.is_unclassified() {
                continue;
            }
            if r.entity == TagEntity::Family && !self.filter.is_valid(&r, label, engine) {
                log::debug!("Rejecting family `{}` from `{label}`", r.tag);
                voc.propose_update(
                    &r.tag,
                    TagUpdate::new()
                        .with_entity(TagEntity::Unclassified)
                        .with_score(TagScore::Confirmed),
                );
                continue;
            }
            results.push(r);
        }
        results
    }

    /// Location-first search over an already tokenized label.
    ///
    /// Returns one result per token (unclassified ones included) and
    /// promotes the inferred family into `voc`.
    pub fn lfs(&self, tokens: &[String], voc: &mut Vocabulary) -> Vec<LabelTag> {
        let mut results: Vec<LabelTag> = Vec::with_capacity(tokens.len());
        // positions (into `results`) of locators and unknowns, misc excluded
        let mut inspect: Vec<usize> = Vec::new();
        let mut families: Vec<usize> = Vec::new();
        let mut locator_num = 0;

        for token in tokens {
            let tag = voc.lookup(token);
            let idx = results.len();
            match tag.entity() {
                TagEntity::Unclassified => inspect.push(idx),
                entity if entity.is_locator() => {
                    inspect.push(idx);
                    locator_num += 1;
                }
                TagEntity::Family => families.push(idx),
                _ => {}
            }
            results.push(LabelTag::new(tag.name(), tag.entity(), tag.score()));
        }

        let family_score = TagScore::from_locator_count(locator_num);

        // known family: reinforce it
        if !families.is_empty() {
            for idx in families {
                let r = &mut results[idx];
                r.score = r.score.max(family_score);
                voc.propose_update(&r.tag, TagUpdate::new().with_score(r.score));
            }
            return results;
        }

        // nothing left to classify
        if locator_num == inspect.len() {
            return results;
        }

        if locator_num == 0 {
            if self.mode == RunMode::Parse {
                if let Some(&idx) = inspect
                    .iter()
                    .find(|&&idx| results[idx].entity.is_unclassified())
                {
                    promote(&mut results[idx], TagScore::NoLocatorSearched, voc);
                }
            }
            return results;
        }

        let (locations, unknowns): (Vec<usize>, Vec<usize>) =
            (0..inspect.len()).partition(|&i| results[inspect[i]].entity.is_locator());
        let (Some(&first), Some(&last)) = (locations.first(), locations.last()) else {
            return results;
        };

        let candidate = if last - first + 1 == locator_num {
            // continuous locators: the family sits right before or after them
            if first > 0 {
                Some(first - 1)
            } else {
                Some(last + 1)
            }
        } else {
            // an unknown sits between two locators
            unknowns.iter().copied().find(|&i| first < i && i < last)
        };
        let Some(candidate) = candidate.filter(|&i| i < inspect.len()) else {
            return results;
        };

        if self.mode == RunMode::Update && family_score <= TagScore::SingleLocatorSearched {
            return results;
        }
        promote(&mut results[inspect[candidate]], family_score, voc);
        results
    }

    /// Co-occurrence view of one label: the first known family token and
    /// every other token of the label.
    pub fn cooccurrence(
        &self,
        engine: &str,
        label: &str,
        voc: &Vocabulary,
    ) -> Option<(String, Vec<String>)> {
        let tokens = self.tokenizer.tokenize(engine, label);
        let family = tokens
            .iter()
            .find(|token| voc.lookup(token).entity() == TagEntity::Family)?
            .clone();
        let others = tokens.into_iter().filter(|t| *t != family).collect();
        Some((family, others))
    }
}

fn promote(result: &mut LabelTag, score: TagScore, voc: &mut Vocabulary) {
    result.entity = TagEntity::Family;
    result.score = score;
    log::debug!("LFS: `{}` -> family ({score})", result.tag);
    voc.propose_update(
        &result.tag,
        TagUpdate::new()
            .with_entity(TagEntity::Family)
            .with_score(score),
    );
}
