//! # TagClass Store
//!
//! File formats around the TagClass core:
//!
//! - TOML vocabulary snapshots (load many, dump filtered and sorted)
//! - JSON-lines detection corpora
//! - JSON allow-lists of vetted tokens
//! - the built-in seed vocabulary
//! - snapshot cleaning

mod builtin;
mod certs;
mod clean;
mod corpus;
mod error;
mod snapshot;

pub use builtin::seed_vocabulary;
pub use certs::{load_certs, parse_certs, DEFAULT_CERT_QOS};
pub use clean::{clean_snapshots, CleanPlan, CleanReport};
pub use corpus::{load_corpus, parse_corpus, write_jsonl, MIN_LABEL_LENGTH};
pub use error::{Result, StoreError};
pub use snapshot::{
    dump_vocabulary, extend_from_str, load_vocabulary, parse_snapshot, render_rows,
    render_snapshot, write_rows, SnapshotRows,
};
