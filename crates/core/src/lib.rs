//! # TagClass Core
//!
//! Classifies antivirus detection labels (`Trojan:Win32/Wannacry.A`) into
//! behavior, platform, family and misc tags, and grows the tag vocabulary
//! from an unlabeled corpus of detections.
//!
//! ## Architecture
//!
//! ```text
//! (label, engines)
//!     │
//!     ├──> Tokenizer: engine suffix rules, split, normalize, dedupe
//!     │
//!     ├──> Parser (LFS): locate the family token between known locators
//!     │        └─> Vocabulary::propose_update (confirmed lock, monotonic score)
//!     │
//!     └──> IncrementalUpdater
//!          ├─> LFS over the corpus
//!          ├─> CooccurrencePromoter (CFS): tokens next to families -> behavior
//!          └─> reset unconfirmed families, repeat until no new locator
//! ```
//!
//! ## Example
//!
//! ```rust
//! use tagclass_core::{Parser, TagEntity, TagScore, TagUpdate, Vocabulary};
//!
//! let mut voc = Vocabulary::new();
//! voc.propose_update(
//!     "hacktool",
//!     TagUpdate::new()
//!         .with_entity(TagEntity::Behavior)
//!         .with_score(TagScore::Confirmed),
//! );
//!
//! let parser = Parser::default();
//! let tags = parser.parse("HackTool/Lotoor", "default", &mut voc);
//! assert_eq!(tags[1].tag, "lotoor");
//! assert_eq!(tags[1].entity, TagEntity::Family);
//! ```
//!
//! The core does no I/O. Snapshots and corpora are read by `tagclass-store`.

mod config;
mod cooccurrence;
mod detection;
mod error;
mod parser;
mod tag;
mod tokenizer;
mod update;
mod vocabulary;

pub use config::{RunMode, TagClassConfig};
pub use cooccurrence::CooccurrencePromoter;
pub use detection::Detection;
pub use error::{CoreError, Result};
pub use parser::{digit_ratio, filepath_like, is_valid_label, FamilyFilter, LabelTag, Parser};
pub use tag::{Tag, TagEntity, TagRecord, TagScore, TagUpdate, GENERIC_PATH, PACKERIC_PATH};
pub use tokenizer::{
    clean_label, normalize_engine_name, remove_suffixes, Tokenizer, DEFAULT_MAX_SEQ_LENGTH,
    MIN_TOKEN_LENGTH,
};
pub use update::{IncrementalUpdater, StepStats, UpdateReport, UpdateStatus};
pub use vocabulary::{ExportOptions, Vocabulary};
