//! htmlsplit: manual check for the HTML message splitter
//!
//! - Reads one HTML file (UTF-8) and splits it with debug output enabled: every
//!   finalized fragment is printed as a header line plus its full markup.
//! - Prints nothing else on success.
//! - Exits non-zero when the file cannot be read or a fragment cannot be kept under
//!   the limit.
//!
//! CLI flags:
//! - `--max-len N`: fragment budget in characters (alias `--max_len`, default 4096)
//! - `--breakable TAGS`: comma-separated tags a cut may happen inside
//! - `-v`: more logging (repeatable); `RUST_LOG` overrides

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use htmlsplit::config::defaults;
use htmlsplit::{SplitConfig, Splitter};
use std::fs;
use std::path::PathBuf;

/// CLI flags
#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Cli {
    /// Maximum fragment length in characters
    #[arg(long = "max-len", visible_alias = "max_len", default_value_t = defaults::MAX_LEN)]
    max_len: usize,

    /// Tags that may be cut inside (default: p,b,strong,i,ul,ol,div,span)
    #[arg(long, value_delimiter = ',', value_name = "TAGS")]
    breakable: Option<Vec<String>>,

    /// Increase verbosity
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Input file
    input: PathBuf,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    log::debug!("Arguments: {:?}", cli);

    let src = fs::read_to_string(&cli.input)
        .with_context(|| format!("Failed to read {}", cli.input.display()))?;

    let mut builder = SplitConfig::builder().max_len(cli.max_len).debug(true);
    if let Some(tags) = &cli.breakable {
        builder = builder.breakable_tags(tags);
    }
    let config = builder.build()?;

    let mut splitter = Splitter::new(config);
    splitter
        .feed(&src)
        .with_context(|| format!("Failed to split {}", cli.input.display()))?;
    log::info!("{} fragment(s)", splitter.fragments().len());
    Ok(())
}

fn init_logging(verbose: u8) {
    let log_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();
}
