//! CLI argument structures

use crate::batch::OptimizationMode;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Bulk catalog optimization under plan limits and a token balance
#[derive(Parser)]
#[command(name = "catalyst")]
#[command(about = "catalyst - Bulk AI catalog optimization", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Enable verbose output (-v for debug, -vv for trace, -vvv for all)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Configuration file (skips the global and project lookup)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List subscription plans and their limits
    Plans {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check a selection against plan limits and balance without generating
    Preflight {
        #[command(flatten)]
        selection: SelectionArgs,

        #[command(flatten)]
        account: AccountArgs,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Generate content for a selection, then optionally apply it
    Run {
        #[command(flatten)]
        selection: SelectionArgs,

        #[command(flatten)]
        account: AccountArgs,

        /// Persist accepted results and update the catalog file
        #[arg(long)]
        apply: bool,

        /// Use in-memory collaborators instead of the backend
        #[arg(long)]
        dry_run: bool,

        /// Override the configured window size
        #[arg(short = 'w', long)]
        window_size: Option<usize>,

        /// Print the reports as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Which entities and languages a job covers
#[derive(Args, Debug, Clone)]
pub struct SelectionArgs {
    /// Catalog file (JSON or YAML)
    #[arg(short = 'c', long, value_name = "FILE")]
    pub catalog: PathBuf,

    /// Target languages, comma separated
    #[arg(short = 'l', long, value_delimiter = ',', required = true)]
    pub languages: Vec<String>,

    /// Entity ids to include (defaults to the whole catalog)
    #[arg(long, value_delimiter = ',')]
    pub ids: Vec<String>,

    #[arg(short = 'm', long, value_enum, default_value_t = ModeArg::Basic)]
    pub mode: ModeArg,
}

/// Subscription and balance overrides for offline use
#[derive(Args, Debug, Clone, Default)]
pub struct AccountArgs {
    /// Plan key to assume instead of asking the backend
    #[arg(long)]
    pub plan: Option<String>,

    /// Token balance to assume with --plan
    #[arg(long, default_value_t = 0)]
    pub balance: u64,

    /// Treat the subscription as being in trial (with --plan)
    #[arg(long)]
    pub trial: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeArg {
    Basic,
    AiEnhanced,
}

impl From<ModeArg> for OptimizationMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Basic => OptimizationMode::Basic,
            ModeArg::AiEnhanced => OptimizationMode::AiEnhanced,
        }
    }
}
