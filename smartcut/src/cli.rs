//! Command-line argument definitions for `smartcut`.

use clap::Parser;
use std::path::PathBuf;

/// Frame-accurate, minimal-re-encode cutting of compressed video containers.
#[derive(Parser, Debug, Clone)]
#[command(name = "smartcut")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Source media file.
    pub input: PathBuf,

    /// Destination media file.
    pub output: PathBuf,

    /// Time ranges to keep, as pairs of tokens (start end start end ...).
    /// Mutually exclusive with --cut.
    #[arg(short = 'k', long = "keep", num_args = 2.., value_delimiter = ' ')]
    pub keep: Option<Vec<String>>,

    /// Time ranges to cut, as pairs of tokens. Mutually exclusive with --keep.
    #[arg(short = 'c', long = "cut", num_args = 2.., value_delimiter = ' ')]
    pub cut: Option<Vec<String>>,

    /// Path to a `smartcut.toml` overriding engine defaults.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Logging level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Print the computed splice plan as JSON instead of writing output.
    #[arg(long)]
    pub dry_run: bool,

    /// Preserve the input's timestamp epoch instead of rebasing to 0.
    #[arg(long)]
    pub preserve_timestamps: bool,
}

impl Cli {
    /// Validate the flag combination that clap's own derive can't express:
    /// exactly one of `--keep`/`--cut` must be given.
    pub fn validate(&self) -> Result<(), String> {
        match (&self.keep, &self.cut) {
            (Some(_), Some(_)) => Err("--keep and --cut are mutually exclusive".to_string()),
            (None, None) => Err("one of --keep or --cut is required".to_string()),
            _ => Ok(()),
        }
    }
}
