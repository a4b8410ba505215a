mod parse;
mod update;
mod vocab;

use tagclass_core::TagClassConfig;

pub use parse::run_parse;
pub use update::run_update;
pub use vocab::{run_clean, run_list, run_tokenize};

/// Settings shared by every subcommand
pub struct RunContext {
    pub config: TagClassConfig,
    pub quiet: bool,
}
