//! CLI argument definitions and parsing.
//!
//! Responsibilities:
//! - Define the command-line surface with clap derive macros.
//! - Split positional arguments into an optional initial filter plus
//!   input files: the first positional is the filter when more
//!   positionals follow, or when stdin is piped, or when null-input is
//!   set; otherwise a lone positional is a file.
//!
//! Does NOT handle:
//! - Config file loading (see `jq_config::loader`) or document reading.

use std::path::PathBuf;

use anyhow::bail;
use clap::Parser;

use jq_filter::FilterOptions;

#[derive(Parser, Debug)]
#[command(name = "jq-tui")]
#[command(about = "Interactively edit and preview jq filters", long_about = None)]
#[command(version)]
#[command(after_help = "Examples:\n  jq-tui data.json\n  curl -s https://api.example.com/items | jq-tui '.items[]'\n  jq-tui -n '$ENV.HOME'\n")]
pub struct Cli {
    /// Compact instead of pretty-printed output
    #[arg(short = 'c')]
    pub compact: bool,

    /// Use `null` as the single input value
    #[arg(short = 'n')]
    pub null_input: bool,

    /// Read (slurp) all inputs into an array; apply the filter to it
    #[arg(short = 's')]
    pub slurp: bool,

    /// Output raw strings, not JSON texts
    #[arg(short = 'r')]
    pub raw_output: bool,

    /// Read raw strings, not JSON texts
    #[arg(short = 'R')]
    pub raw_input: bool,

    /// Don't colorize JSON
    #[arg(short = 'M')]
    pub monochrome: bool,

    /// Colorize JSON even when stdout is not a terminal
    #[arg(short = 'C')]
    pub force_color: bool,

    /// Sort keys of objects on output
    #[arg(short = 'S')]
    pub sort_keys: bool,

    /// Search modules from this directory (may be repeated)
    #[arg(short = 'L', value_name = "DIR")]
    pub library_paths: Vec<PathBuf>,

    /// Read the initial filter from this file
    #[arg(short = 'f', value_name = "FILE")]
    pub filter_file: Option<PathBuf>,

    /// History file path (overrides the config file)
    #[arg(long, value_name = "FILE", env = "JQ_TUI_HISTORY_FILE")]
    pub history_file: Option<PathBuf>,

    /// jq executable to run
    #[arg(long, value_name = "BIN", env = "JQ_TUI_JQ_BIN")]
    pub jq_bin: Option<PathBuf>,

    /// Path to a custom configuration file (overrides default location)
    #[arg(long, value_name = "FILE", env = "JQ_TUI_CONFIG")]
    pub config: Option<PathBuf>,

    /// Write debug logs into this directory
    #[arg(long, value_name = "DIR")]
    pub log_dir: Option<PathBuf>,

    /// `[filter] [files...]`
    #[arg(value_name = "ARG")]
    pub args: Vec<String>,
}

impl Cli {
    /// Filter options implied by the flags alone; library paths from
    /// the config file are appended by the caller.
    pub fn options(&self) -> FilterOptions {
        FilterOptions {
            compact: self.compact,
            null_input: self.null_input,
            slurp: self.slurp,
            raw_output: self.raw_output,
            raw_input: self.raw_input,
            monochrome: self.monochrome,
            sort_keys: self.sort_keys,
            force_color: self.force_color,
            library_paths: self.library_paths.clone(),
        }
    }

    /// Split positionals into the initial filter (if given on the
    /// command line) and the input files.
    ///
    /// With `-f` every positional is a file. Null-input with no
    /// positionals is valid: the document reads nothing.
    pub fn split_positionals(
        &self,
        stdin_piped: bool,
    ) -> anyhow::Result<(Option<String>, Vec<PathBuf>)> {
        let files = |args: &[String]| args.iter().map(PathBuf::from).collect::<Vec<_>>();

        if self.filter_file.is_some() {
            return Ok((None, files(&self.args)));
        }
        if self.args.len() > 1 || (!self.args.is_empty() && (stdin_piped || self.null_input)) {
            return Ok((Some(self.args[0].clone()), files(&self.args[1..])));
        }
        if self.args.is_empty() && !stdin_piped && !self.null_input {
            bail!("no input files and no data on stdin (see --help)");
        }
        Ok((None, files(&self.args)))
    }
}
