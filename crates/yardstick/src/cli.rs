use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use serde::Deserialize;
use typecheck::CheckLevel;

#[derive(Parser, Debug)]
#[command(
    name = "yardstick",
    version,
    about = "Checks YARD type tags in Ruby code",
    long_about = "Infers types from Ruby sources and reports methods whose documented types are missing, unresolvable or contradicted by the code."
)]
pub struct YardstickCli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON on stderr
    #[arg(long, global = true, conflicts_with = "log_file")]
    pub log_json: bool,

    /// Append JSON logs to a rotating file instead of stderr
    #[arg(long, global = true, value_name = "FILE")]
    pub log_file: Option<PathBuf>,
}

impl YardstickCli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Type-check Ruby files
    Typecheck {
        /// Files or directories to check
        #[arg(default_value = ".")]
        paths: Vec<PathBuf>,

        /// Check level (defaults to the config file, then normal)
        #[arg(short, long)]
        level: Option<CheckLevel>,

        /// Output format
        #[arg(short, long, value_enum)]
        format: Option<OutputFormat>,

        /// Configuration file (defaults to ./yardstick.toml when present)
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Number of worker threads (0 means auto-detect based on CPU cores)
        #[arg(short, long)]
        threads: Option<usize>,
    },
    /// Print the inferred type of a signature in a file
    Probe {
        /// Ruby file to load
        file: PathBuf,

        /// Signature such as `foo.bar` or `@items.first`
        signature: String,

        /// 1-based line whose scope and locals are used
        #[arg(short, long)]
        line: Option<usize>,
    },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}
