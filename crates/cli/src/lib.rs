use anyhow::{Context as AnyhowContext, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tagclass_core::{RunMode, TagClassConfig, Vocabulary};

mod command;
mod progress;

fn print_stdout(text: &str) -> Result<()> {
    use std::io::Write;

    let mut stdout = io::stdout().lock();
    if let Err(err) = stdout
        .write_all(text.as_bytes())
        .and_then(|_| stdout.write_all(b"\n"))
        .and_then(|_| stdout.flush())
    {
        if err.kind() == io::ErrorKind::BrokenPipe {
            return Ok(());
        }
        return Err(err.into());
    }
    Ok(())
}

#[derive(Parser)]
#[command(name = "tagclass")]
#[command(about = "Classify antivirus detection labels into behavior, platform, family and misc tags", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors and hide progress bars
    #[arg(long, global = true)]
    quiet: bool,

    /// Run configuration (TOML); explicit flags take precedence
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the version
    Version,

    /// Tokenize a single label
    Tokenize(TokenizeArgs),

    /// Show the entity histogram of a vocabulary
    List(ListArgs),

    /// Location-first search over a label or a corpus
    Parse(ParseArgs),

    /// Grow the locator vocabulary from a corpus (LFS/CFS fixed point)
    Update(UpdateArgs),

    /// Rewrite vocabulary snapshots keeping confirmed rows only
    Clean(CleanArgs),
}

#[derive(Args, Clone, Debug)]
struct VocArgs {
    /// Vocabulary snapshot (repeatable); defaults to the built-in seed
    #[arg(long = "voc", value_name = "FILE")]
    voc: Vec<PathBuf>,

    /// Skip unconfirmed snapshot rows instead of failing
    #[arg(long)]
    unconfirmed_ok: bool,
}

impl VocArgs {
    fn load(&self) -> Result<Vocabulary> {
        if self.voc.is_empty() {
            return tagclass_store::seed_vocabulary().context("Failed to load seed vocabulary");
        }
        let voc = tagclass_store::load_vocabulary(&self.voc, self.unconfirmed_ok)
            .context("Failed to load vocabulary")?;
        log::info!("{voc}");
        Ok(voc)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum LfsModeArg {
    Parse,
    Update,
}

impl LfsModeArg {
    fn as_domain(self) -> RunMode {
        match self {
            Self::Parse => RunMode::Parse,
            Self::Update => RunMode::Update,
        }
    }
}

#[derive(Args)]
struct TokenizeArgs {
    /// Raw detection label
    label: String,

    /// Engine that produced the label
    #[arg(long, default_value = "default")]
    engine: String,
}

#[derive(Args)]
struct ListArgs {
    #[command(flatten)]
    voc: VocArgs,
}

#[derive(Args)]
struct ParseArgs {
    /// Single label to parse
    #[arg(long, conflicts_with = "corpus", required_unless_present = "corpus")]
    label: Option<String>,

    /// Engine of `--label`
    #[arg(long, default_value = "default")]
    engine: String,

    /// JSON-lines corpus of labels and engines
    #[arg(long, value_name = "FILE")]
    corpus: Option<PathBuf>,

    /// Write `[label, tags]` JSON lines here instead of stdout
    #[arg(long, value_name = "FILE")]
    out: Option<PathBuf>,

    /// Search mode
    #[arg(long, value_enum, default_value_t = LfsModeArg::Parse)]
    mode: LfsModeArg,

    #[command(flatten)]
    voc: VocArgs,
}

#[derive(Args)]
struct UpdateArgs {
    /// JSON-lines corpus of labels and engines
    #[arg(long, value_name = "FILE")]
    corpus: PathBuf,

    /// Co-occurrences needed to promote a locator
    #[arg(long)]
    threshold_cfs: Option<usize>,

    /// Maximum update rounds
    #[arg(long)]
    max_round: Option<usize>,

    /// Location-first search mode while updating
    #[arg(long, value_enum)]
    lfs_mode: Option<LfsModeArg>,

    /// Allow-list of vetted tokens (JSON `{token: {source: qos}}`)
    #[arg(long, value_name = "FILE")]
    certs: Option<PathBuf>,

    /// Minimum qos for an allow-listed token
    #[arg(long, default_value_t = tagclass_store::DEFAULT_CERT_QOS)]
    cert_qos: u32,

    /// Write the resulting locator tags to this snapshot
    #[arg(long, value_name = "FILE")]
    dump: Option<PathBuf>,

    /// Sort dumped tags by entity and name
    #[arg(long)]
    sort: bool,

    #[command(flatten)]
    voc: VocArgs,
}

#[derive(Args)]
struct CleanArgs {
    /// Locator snapshot
    #[arg(long, value_name = "FILE")]
    locator: PathBuf,

    /// Misc snapshot
    #[arg(long, value_name = "FILE")]
    misc: PathBuf,

    /// Family snapshot
    #[arg(long, value_name = "FILE")]
    family: Option<PathBuf>,

    /// Sort rows by entity and name
    #[arg(long)]
    sort: bool,
}

fn load_config(path: Option<&Path>) -> Result<TagClassConfig> {
    let config = match path {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config {}", path.display()))?;
            toml::from_str(&text)
                .with_context(|| format!("Invalid config {}", path.display()))?
        }
        None => TagClassConfig::default(),
    };
    Ok(config)
}

pub fn main_entry() -> Result<()> {
    let cli = Cli::parse();

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();

    let config = load_config(cli.config.as_deref())?;
    let ctx = command::RunContext {
        config,
        quiet: cli.quiet,
    };

    match cli.command {
        Commands::Version => print_stdout(env!("CARGO_PKG_VERSION"))?,
        Commands::Tokenize(args) => command::run_tokenize(&ctx, args)?,
        Commands::List(args) => command::run_list(args)?,
        Commands::Parse(args) => command::run_parse(&ctx, args)?,
        Commands::Update(args) => command::run_update(ctx, args)?,
        Commands::Clean(args) => command::run_clean(args)?,
    }

    Ok(())
}
