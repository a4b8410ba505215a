use serde::{Deserialize, Serialize};
use std::fmt;

/// Path segment marking generic detections (e.g. `/misc/generic/agent`)
pub const GENERIC_PATH: &str = "generic";

/// Path segment marking packer-derived detections
pub const PACKERIC_PATH: &str = "packeric";

/// Semantic class of a tag
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TagEntity {
    /// What the sample does (trojan, ransom, dropper, ...)
    Behavior,
    /// Where the sample runs (win, android, msil, ...)
    Platform,
    /// Malware family name
    Family,
    /// Anything else worth remembering (generic, heur, packers, ...)
    Misc,
    /// Not classified (yet)
    #[default]
    Unclassified,
}

impl TagEntity {
    /// Entities used as context to locate the family token
    pub const LOCATORS: [TagEntity; 2] = [TagEntity::Behavior, TagEntity::Platform];

    /// Every classified entity
    pub const CLASSIFIED: [TagEntity; 4] = [
        TagEntity::Behavior,
        TagEntity::Platform,
        TagEntity::Family,
        TagEntity::Misc,
    ];

    #[must_use]
    pub const fn is_locator(self) -> bool {
        matches!(self, Self::Behavior | Self::Platform)
    }

    #[must_use]
    pub const fn is_unclassified(&self) -> bool {
        matches!(self, Self::Unclassified)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Behavior => "behavior",
            Self::Platform => "platform",
            Self::Family => "family",
            Self::Misc => "misc",
            Self::Unclassified => "unclassified",
        }
    }
}

impl fmt::Display for TagEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Confidence ladder of a tag classification.
///
/// Declaration order is the total order; the discriminants are the values
/// persisted in vocabulary snapshots.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
#[repr(u8)]
pub enum TagScore {
    #[default]
    Unknown = 0,
    NoLocatorSearched = 5,
    SingleLocatorSearched = 6,
    LocatorsSearched = 8,
    Updated = 9,
    Confirmed = 10,
}

impl TagScore {
    /// Family confidence derived from the number of locators seen in a label
    #[must_use]
    pub const fn from_locator_count(locators: usize) -> Self {
        match locators {
            0 => Self::NoLocatorSearched,
            1 => Self::SingleLocatorSearched,
            _ => Self::LocatorsSearched,
        }
    }

    #[must_use]
    pub const fn value(self) -> u8 {
        self as u8
    }

    #[must_use]
    pub const fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown)
    }

    #[must_use]
    pub const fn is_confirmed(self) -> bool {
        matches!(self, Self::Confirmed)
    }
}

impl From<TagScore> for u8 {
    fn from(score: TagScore) -> Self {
        score.value()
    }
}

impl TryFrom<u8> for TagScore {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Unknown),
            5 => Ok(Self::NoLocatorSearched),
            6 => Ok(Self::SingleLocatorSearched),
            8 => Ok(Self::LocatorsSearched),
            9 => Ok(Self::Updated),
            10 => Ok(Self::Confirmed),
            other => Err(format!(
                "invalid tag score {other} (expected one of 0, 5, 6, 8, 9, 10)"
            )),
        }
    }
}

impl fmt::Display for TagScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}({})", self, self.value())
    }
}

/// Partial update of a tag, applied field by field by [`crate::Vocabulary::propose_update`].
///
/// Unset fields are left untouched. An unset score takes part in the
/// monotonic check as `Unknown`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagUpdate {
    pub entity: Option<TagEntity>,
    pub path: Option<String>,
    pub uuid: Option<String>,
    pub score: Option<TagScore>,
    pub remark: Option<String>,
}

impl TagUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_entity(mut self, entity: TagEntity) -> Self {
        self.entity = Some(entity);
        self
    }

    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    #[must_use]
    pub fn with_uuid(mut self, uuid: impl Into<String>) -> Self {
        self.uuid = Some(uuid.into());
        self
    }

    #[must_use]
    pub fn with_score(mut self, score: TagScore) -> Self {
        self.score = Some(score);
        self
    }

    #[must_use]
    pub fn with_remark(mut self, remark: impl Into<String>) -> Self {
        self.remark = Some(remark.into());
        self
    }

    /// Score used when comparing against the stored one
    #[must_use]
    pub fn effective_score(&self) -> TagScore {
        self.score.unwrap_or_default()
    }
}

/// A classified token.
///
/// Fields are read-only outside the crate: every mutation goes through
/// [`crate::Vocabulary`], which enforces the confirmed lock and the
/// monotonic score rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    name: String,
    entity: TagEntity,
    path: Option<String>,
    uuid: String,
    score: TagScore,
    remark: Option<String>,
}

impl Tag {
    /// Unclassified tag with `Unknown` score
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            uuid: name.clone(),
            name,
            entity: TagEntity::Unclassified,
            path: None,
            score: TagScore::Unknown,
            remark: None,
        }
    }

    /// Tag built from an update request (used for insertion of absent names)
    pub fn from_update(name: impl Into<String>, update: TagUpdate) -> Self {
        let mut tag = Self::new(name);
        tag.apply(update);
        tag
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn entity(&self) -> TagEntity {
        self.entity
    }

    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    pub fn uuid(&self) -> &str {
        &self.uuid
    }

    pub fn score(&self) -> TagScore {
        self.score
    }

    pub fn remark(&self) -> Option<&str> {
        self.remark.as_deref()
    }

    pub fn is_unknown(&self) -> bool {
        self.score.is_unknown()
    }

    pub fn is_confirmed(&self) -> bool {
        self.score.is_confirmed()
    }

    pub fn is_locator(&self) -> bool {
        self.entity.is_locator()
    }

    /// Hierarchical classification path: `/<entity>/<path>/<uuid>`.
    ///
    /// Computed from the current fields on every call. An unclassified
    /// entity renders as `None`, an empty path is skipped.
    pub fn abspath(&self) -> String {
        let entity = match self.entity {
            TagEntity::Unclassified => "None",
            other => other.as_str(),
        };
        let mut out = format!("/{entity}");
        if let Some(path) = self.path.as_deref() {
            let path = path.trim_matches('/');
            if !path.is_empty() {
                out.push('/');
                out.push_str(path);
            }
        }
        out.push('/');
        out.push_str(&self.uuid);
        out
    }

    fn has_path_segment(&self, segment: &str) -> bool {
        self.abspath().split('/').any(|part| part == segment)
    }

    pub fn is_generic(&self) -> bool {
        self.has_path_segment(GENERIC_PATH)
    }

    pub fn is_packeric(&self) -> bool {
        self.has_path_segment(PACKERIC_PATH)
    }

    pub fn is_genpackeric(&self) -> bool {
        self.is_generic() || self.is_packeric()
    }

    pub(crate) fn apply(&mut self, update: TagUpdate) {
        let TagUpdate {
            entity,
            path,
            uuid,
            score,
            remark,
        } = update;
        if let Some(entity) = entity {
            self.entity = entity;
        }
        if let Some(path) = path {
            self.path = Some(path);
        }
        if let Some(uuid) = uuid {
            self.uuid = uuid;
        }
        if let Some(score) = score {
            self.score = score;
        }
        if let Some(remark) = remark {
            self.remark = Some(remark);
        }
    }

    /// Demote back to unclassified, bypassing the monotonic rule
    pub(crate) fn reset(&mut self) {
        self.entity = TagEntity::Unclassified;
        self.score = TagScore::Unknown;
    }

    /// Snapshot record, omitting fields equal to their defaults
    pub fn to_record(&self) -> TagRecord {
        TagRecord {
            entity: self.entity,
            path: self.path.clone().filter(|p| !p.is_empty()),
            uuid: (self.uuid != self.name).then(|| self.uuid.clone()),
            score: self.score,
            remark: self.remark.clone().filter(|r| !r.is_empty()),
        }
    }

    pub fn from_record(name: impl Into<String>, record: TagRecord) -> Self {
        Self::from_update(name, record.into_update())
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Tag(name={}, abspath={}, score={})",
            self.name,
            self.abspath(),
            self.score
        )
    }
}

/// Persisted form of a tag, keyed by its name in a snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagRecord {
    #[serde(default, skip_serializing_if = "TagEntity::is_unclassified")]
    pub entity: TagEntity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    #[serde(default, skip_serializing_if = "TagScore::is_unknown")]
    pub score: TagScore,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remark: Option<String>,
}

impl TagRecord {
    pub fn into_update(self) -> TagUpdate {
        TagUpdate {
            entity: Some(self.entity),
            path: self.path,
            uuid: self.uuid,
            score: Some(self.score),
            remark: self.remark,
        }
    }
}
