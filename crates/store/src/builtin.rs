use std::path::Path;

use tagclass_core::Vocabulary;

use crate::error::Result;
use crate::snapshot::extend_from_str;

const BUILTIN_LOCATOR: &str = include_str!("../data/init_locator.toml");
const BUILTIN_MISC: &str = include_str!("../data/init_misc.toml");

/// Confirmed seed vocabulary shipped with the crate: common behaviors,
/// platforms, generic and packer tokens
pub fn seed_vocabulary() -> Result<Vocabulary> {
    let mut voc = Vocabulary::new();
    extend_from_str(&mut voc, BUILTIN_LOCATOR, Path::new("init_locator.toml"), false)?;
    extend_from_str(&mut voc, BUILTIN_MISC, Path::new("init_misc.toml"), false)?;
    Ok(voc)
}
