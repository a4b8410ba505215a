use indexmap::IndexMap;
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;

use crate::error::{CoreError, Result};
use crate::tag::{Tag, TagEntity, TagRecord, TagScore, TagUpdate};

/// Options for exporting a vocabulary snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportOptions {
    /// Skip tags that were never scored
    pub ignore_unknown: bool,
    /// Order by `(entity, name)` instead of insertion order
    pub sort: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            ignore_unknown: true,
            sort: false,
        }
    }
}

/// Token -> tag store.
///
/// Iteration order is insertion order, which keeps corpus passes
/// reproducible. All classification changes go through
/// [`Vocabulary::propose_update`] (or the explicit [`Vocabulary::reset`]).
#[derive(Debug, Clone, Default)]
pub struct Vocabulary {
    tags: IndexMap<String, Tag>,
}

impl Vocabulary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a vocabulary from snapshot rows, see [`Vocabulary::load_records`]
    pub fn from_records<I>(records: I, unconfirmed_ok: bool) -> Result<Self>
    where
        I: IntoIterator<Item = (String, TagRecord)>,
    {
        let mut voc = Self::new();
        voc.load_records(records, unconfirmed_ok)?;
        Ok(voc)
    }

    /// Merge snapshot rows into the store.
    ///
    /// Rows below `Confirmed` are fatal unless `unconfirmed_ok`, in which
    /// case they are skipped. A name already present (from this or an
    /// earlier source) is fatal. Returns the number of inserted tags.
    pub fn load_records<I>(&mut self, records: I, unconfirmed_ok: bool) -> Result<usize>
    where
        I: IntoIterator<Item = (String, TagRecord)>,
    {
        let mut inserted = 0;
        for (name, record) in records {
            let tag = Tag::from_record(name, record);
            if !tag.is_confirmed() {
                if unconfirmed_ok {
                    log::debug!("Skipping unconfirmed {tag}");
                    continue;
                }
                return Err(CoreError::unconfirmed(tag.name(), tag.score()));
            }
            if let Some(existing) = self.tags.get(tag.name()) {
                return Err(CoreError::duplicate(tag.name(), existing.to_string()));
            }
            self.tags.insert(tag.name().to_string(), tag);
            inserted += 1;
        }
        Ok(inserted)
    }

    /// Snapshot rows for tags whose entity is in `entities`
    pub fn export_records(
        &self,
        entities: &[TagEntity],
        options: ExportOptions,
    ) -> Vec<(String, TagRecord)> {
        let mut rows: Vec<&Tag> = self
            .filter_by_entity(entities)
            .filter(|tag| !(options.ignore_unknown && tag.is_unknown()))
            .collect();
        if options.sort {
            rows.sort_by(|a, b| (a.entity(), a.name()).cmp(&(b.entity(), b.name())));
        }
        rows.into_iter()
            .map(|tag| (tag.name().to_string(), tag.to_record()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tags.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&Tag> {
        self.tags.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Tag> {
        self.tags.values()
    }

    /// Stored tag, or a transient unclassified one; never inserts
    pub fn lookup(&self, name: &str) -> Cow<'_, Tag> {
        match self.tags.get(name) {
            Some(tag) => Cow::Borrowed(tag),
            None => Cow::Owned(Tag::new(name)),
        }
    }

    /// Stored tag, inserting an unclassified one when absent
    pub fn lookup_or_create(&mut self, name: &str) -> &Tag {
        self.tags
            .entry(name.to_string())
            .or_insert_with(|| Tag::new(name))
    }

    pub fn remove(&mut self, name: &str) -> Option<Tag> {
        self.tags.shift_remove(name)
    }

    /// Controlled update entry point.
    ///
    /// - absent name: inserted with the given fields;
    /// - `Confirmed` tag: locked, nothing changes;
    /// - otherwise applied only if the incoming score is not lower than the
    ///   stored one.
    pub fn propose_update(&mut self, name: &str, update: TagUpdate) -> &Tag {
        use indexmap::map::Entry;

        match self.tags.entry(name.to_string()) {
            Entry::Vacant(slot) => slot.insert(Tag::from_update(name, update)),
            Entry::Occupied(slot) => {
                let tag = slot.into_mut();
                if !tag.is_confirmed() && update.effective_score() >= tag.score() {
                    tag.apply(update);
                }
                tag
            }
        }
    }

    /// Demote a tag back to unclassified/`Unknown`.
    ///
    /// This is the only operation that lowers a score. Confirmed tags are
    /// refused. Returns whether the tag changed.
    pub fn reset(&mut self, name: &str) -> bool {
        match self.tags.get_mut(name) {
            Some(tag) if !tag.is_confirmed() => {
                tag.reset();
                true
            }
            _ => false,
        }
    }

    /// Reset every non-confirmed tag of `entity` that fails `keep`
    pub fn reset_unconfirmed<F>(&mut self, entity: TagEntity, mut keep: F) -> usize
    where
        F: FnMut(&Tag) -> bool,
    {
        let mut count = 0;
        for tag in self.tags.values_mut() {
            if tag.entity() == entity && !tag.is_confirmed() && !keep(tag) {
                tag.reset();
                count += 1;
            }
        }
        count
    }

    pub fn filter_by_entity<'a>(
        &'a self,
        entities: &'a [TagEntity],
    ) -> impl Iterator<Item = &'a Tag> + 'a {
        self.tags
            .values()
            .filter(move |tag| entities.contains(&tag.entity()))
    }

    pub fn count_tags(&self, entities: &[TagEntity]) -> usize {
        self.filter_by_entity(entities).count()
    }

    pub fn count_locators(&self) -> usize {
        self.count_tags(&TagEntity::LOCATORS)
    }

    /// Names of locator tags sitting at `score`
    pub fn locator_names_with_score(&self, score: TagScore) -> Vec<String> {
        self.filter_by_entity(&TagEntity::LOCATORS)
            .filter(|tag| tag.score() == score)
            .map(|tag| tag.name().to_string())
            .collect()
    }

    /// Entity histogram
    pub fn count_by_entity(&self) -> BTreeMap<TagEntity, usize> {
        let mut counts = BTreeMap::new();
        for tag in self.tags.values() {
            *counts.entry(tag.entity()).or_insert(0) += 1;
        }
        counts
    }
}

impl fmt::Display for Vocabulary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Vocabulary :")?;
        for (entity, count) in self.count_by_entity() {
            write!(f, " {entity}={count}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn confirmed(entity: TagEntity) -> TagRecord {
        TagRecord {
            entity,
            score: TagScore::Confirmed,
            ..Default::default()
        }
    }

    #[test]
    fn confirmed_tag_survives_public_mutators() {
        let mut voc = Vocabulary::new();
        voc.load_records([("ransom".to_string(), confirmed(TagEntity::Behavior))], false)
            .unwrap();

        voc.lookup_or_create("ransom");
        voc.propose_update(
            "ransom",
            TagUpdate::new()
                .with_entity(TagEntity::Family)
                .with_score(TagScore::Confirmed),
        );
        voc.propose_update("ransom", TagUpdate::new());
        assert!(!voc.reset("ransom"));
        assert_eq!(voc.reset_unconfirmed(TagEntity::Behavior, |_| false), 0);
        assert!(voc
            .load_records([("ransom".to_string(), confirmed(TagEntity::Platform))], false)
            .is_err());

        let tag = voc.lookup("ransom");
        assert_eq!(tag.entity(), TagEntity::Behavior);
        assert_eq!(tag.score(), TagScore::Confirmed);
        assert_eq!(voc.len(), 1);

        assert!(voc.remove("ransom").is_some());
        assert!(!voc.contains("ransom"));
    }

    #[test]
    fn lookup_does_not_insert() {
        let voc = Vocabulary::new();
        let tag = voc.lookup("lotoor");
        assert_eq!(tag.entity(), TagEntity::Unclassified);
        assert_eq!(tag.score(), TagScore::Unknown);
        assert!(voc.is_empty());
    }

    #[test]
    fn lookup_or_create_inserts_once() {
        let mut voc = Vocabulary::new();
        voc.lookup_or_create("agent");
        voc.lookup_or_create("agent");
        assert_eq!(voc.len(), 1);
        assert!(voc.contains("agent"));
    }

    #[test]
    fn propose_update_inserts_absent_names() {
        let mut voc = Vocabulary::new();
        let tag = voc.propose_update(
            "agent",
            TagUpdate::new()
                .with_entity(TagEntity::Misc)
                .with_path("generic"),
        );
        assert_eq!(tag.abspath(), "/misc/generic/agent");
        assert_eq!(tag.score(), TagScore::Unknown);
    }

    #[test]
    fn score_never_decreases() {
        let mut voc = Vocabulary::new();
        let proposals = [
            TagScore::SingleLocatorSearched,
            TagScore::NoLocatorSearched,
            TagScore::LocatorsSearched,
            TagScore::Unknown,
            TagScore::SingleLocatorSearched,
            TagScore::Updated,
        ];
        let mut last = TagScore::Unknown;
        for score in proposals {
            let tag = voc.propose_update(
                "gandcrab",
                TagUpdate::new()
                    .with_entity(TagEntity::Family)
                    .with_score(score),
            );
            assert!(tag.score() >= last);
            last = tag.score();
        }
        assert_eq!(last, TagScore::Updated);
    }

    #[test]
    fn update_without_score_cannot_touch_scored_tag() {
        let mut voc = Vocabulary::new();
        voc.propose_update(
            "kungfu",
            TagUpdate::new()
                .with_entity(TagEntity::Family)
                .with_score(TagScore::NoLocatorSearched),
        );
        let tag = voc.propose_update("kungfu", TagUpdate::new().with_entity(TagEntity::Misc));
        assert_eq!(tag.entity(), TagEntity::Family);
    }

    #[test]
    fn confirmed_tags_are_locked() {
        let mut voc = Vocabulary::new();
        voc.propose_update(
            "ransom",
            TagUpdate::new()
                .with_entity(TagEntity::Behavior)
                .with_score(TagScore::Confirmed),
        );
        let tag = voc.propose_update(
            "ransom",
            TagUpdate::new()
                .with_entity(TagEntity::Family)
                .with_score(TagScore::Confirmed),
        );
        assert_eq!(tag.entity(), TagEntity::Behavior);
        assert!(!voc.reset("ransom"));
        assert_eq!(voc.get("ransom").map(Tag::entity), Some(TagEntity::Behavior));
    }

    #[test]
    fn reset_demotes_unconfirmed_tags() {
        let mut voc = Vocabulary::new();
        voc.propose_update(
            "gandcrab",
            TagUpdate::new()
                .with_entity(TagEntity::Family)
                .with_score(TagScore::LocatorsSearched),
        );
        voc.propose_update(
            "wannacry",
            TagUpdate::new()
                .with_entity(TagEntity::Family)
                .with_score(TagScore::Confirmed),
        );
        let reset = voc.reset_unconfirmed(TagEntity::Family, |_| false);
        assert_eq!(reset, 1);
        let tag = voc.lookup("gandcrab");
        assert_eq!(tag.entity(), TagEntity::Unclassified);
        assert_eq!(tag.score(), TagScore::Unknown);
        assert_eq!(voc.count_tags(&[TagEntity::Family]), 1);
    }

    #[test]
    fn load_rejects_duplicates_across_sources() {
        let mut voc = Vocabulary::new();
        voc.load_records([("win".to_string(), confirmed(TagEntity::Platform))], false)
            .unwrap();
        let err = voc
            .load_records([("win".to_string(), confirmed(TagEntity::Behavior))], false)
            .unwrap_err();
        assert!(matches!(err, CoreError::DuplicateTag { ref name, .. } if name == "win"));
    }

    #[test]
    fn load_rejects_or_skips_unconfirmed() {
        let rows = vec![
            ("win".to_string(), confirmed(TagEntity::Platform)),
            (
                "lotoor".to_string(),
                TagRecord {
                    entity: TagEntity::Family,
                    score: TagScore::NoLocatorSearched,
                    ..Default::default()
                },
            ),
        ];
        let err = Vocabulary::from_records(rows.clone(), false).unwrap_err();
        assert!(matches!(err, CoreError::Unconfirmed { .. }));

        let voc = Vocabulary::from_records(rows, true).unwrap();
        assert_eq!(voc.len(), 1);
        assert!(!voc.contains("lotoor"));
    }

    #[test]
    fn export_filters_and_sorts() {
        let mut voc = Vocabulary::from_records(
            [
                ("win".to_string(), confirmed(TagEntity::Platform)),
                ("trojan".to_string(), confirmed(TagEntity::Behavior)),
                ("generic".to_string(), confirmed(TagEntity::Misc)),
                ("android".to_string(), confirmed(TagEntity::Platform)),
            ],
            false,
        )
        .unwrap();
        voc.lookup_or_create("pending");

        let names: Vec<String> = voc
            .export_records(
                &TagEntity::LOCATORS,
                ExportOptions {
                    ignore_unknown: true,
                    sort: true,
                },
            )
            .into_iter()
            .map(|(name, _)| name)
            .collect();
        assert_eq!(names, vec!["trojan", "android", "win"]);

        let all = voc.export_records(
            &[TagEntity::Unclassified],
            ExportOptions {
                ignore_unknown: false,
                sort: false,
            },
        );
        assert_eq!(all.len(), 1);
    }

    #[test]
    fn entity_histogram() {
        let voc = Vocabulary::from_records(
            [
                ("win".to_string(), confirmed(TagEntity::Platform)),
                ("android".to_string(), confirmed(TagEntity::Platform)),
                ("trojan".to_string(), confirmed(TagEntity::Behavior)),
            ],
            false,
        )
        .unwrap();
        let counts = voc.count_by_entity();
        assert_eq!(counts.get(&TagEntity::Platform), Some(&2));
        assert_eq!(counts.get(&TagEntity::Behavior), Some(&1));
        assert_eq!(voc.count_locators(), 3);
        assert_eq!(voc.to_string(), "Vocabulary : behavior=1 platform=2");
    }
}
