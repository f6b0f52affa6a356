use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Default location of the installed pattern catalog
pub const DEFAULT_PATTERNS_DIR: &str = "/usr/lib/scpilot/patterns";

#[derive(Parser, Debug)]
#[command(
    name = "scpilot",
    about = "Supportconfig diagnostics and pattern analysis tool",
    version,
    author
)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format for logs (text or json)
    #[arg(long, default_value = "text", global = true)]
    pub log_format: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Analyze an extracted supportconfig directory or archive
    Analyze {
        /// Path to the supportconfig directory or archive
        #[arg(value_name = "SNAPSHOT")]
        snapshot: PathBuf,

        /// Report format
        #[arg(short, long, value_enum, default_value = "terminal")]
        report: ReportFormat,

        /// Output file path (defaults next to the snapshot for html,
        /// stdout for json)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Pattern catalog directory
        #[arg(long, env = "SCPILOT_PATTERNS_DIR", default_value = DEFAULT_PATTERNS_DIR)]
        patterns_dir: PathBuf,

        /// Number of probes to run concurrently
        #[arg(short, long, default_value = "1")]
        jobs: usize,

        /// Per-probe execution timeout in seconds
        #[arg(long, default_value = "300")]
        probe_timeout: u64,

        /// Keep the extracted snapshot directory after analyzing an archive
        #[arg(short, long)]
        keep_extracted: bool,
    },

    /// Inspect the pattern catalog
    Patterns {
        #[command(subcommand)]
        action: PatternsCommand,
    },

    /// Show information about scpilot
    Info,
}

#[derive(Subcommand, Debug)]
pub enum PatternsCommand {
    /// List the patterns applicable to a snapshot without running them
    List {
        /// Path to the extracted supportconfig directory
        #[arg(value_name = "SNAPSHOT")]
        snapshot: PathBuf,

        /// Pattern catalog directory
        #[arg(long, env = "SCPILOT_PATTERNS_DIR", default_value = DEFAULT_PATTERNS_DIR)]
        patterns_dir: PathBuf,

        /// Show every catalog entry, not just the per-directory counts
        #[arg(long)]
        detailed: bool,
    },
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ReportFormat {
    Terminal,
    Json,
    Html,
}
