//! CLI argument definitions using clap.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use tighten::{OptionOverrides, OptionsLoader, ResolvedOptions, TighteningMode};

/// Tighten: evidence-gated schema constraint tightening
#[derive(Parser)]
#[command(name = "tighten")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Decide and build the opportunities report with DDL scripts
    Analyze {
        #[command(flatten)]
        inputs: InputArgs,

        #[command(flatten)]
        policy: PolicyArgs,

        /// Output path for the report (default: <model>.opportunities.json)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Also write every statement to a .sql script
        #[arg(long, value_name = "FILE")]
        script: Option<PathBuf>,

        /// Print the report as JSON instead of a summary
        #[arg(long)]
        json: bool,
    },

    /// Produce the decision set only
    Decide {
        #[command(flatten)]
        inputs: InputArgs,

        #[command(flatten)]
        policy: PolicyArgs,

        /// Output path for the decision set (default: <model>.decisions.json)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print the decision set as JSON instead of a summary
        #[arg(long)]
        json: bool,
    },

    /// Show the resolved options and where each value came from
    Config {
        #[command(flatten)]
        policy: PolicyArgs,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

/// The model and evidence files every run needs.
#[derive(Args)]
pub struct InputArgs {
    /// Path to the schema model (JSON)
    #[arg(short, long, value_name = "MODEL")]
    pub model: PathBuf,

    /// Path to the profiling snapshot (JSON)
    #[arg(short, long, value_name = "SNAPSHOT")]
    pub evidence: PathBuf,
}

/// Options shared by every command. Flags override `TIGHTEN_*` variables,
/// which override the options file.
#[derive(Args)]
pub struct PolicyArgs {
    /// Options file (JSON)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Tightening mode (cautious, evidence-gated, aggressive)
    #[arg(long)]
    pub mode: Option<TighteningMode>,

    /// Largest tolerated null fraction, 0.0 to 1.0
    #[arg(long)]
    pub null_budget: Option<f64>,

    /// Do not create foreign keys
    #[arg(long)]
    pub no_foreign_keys: bool,

    /// Allow foreign keys across schemas
    #[arg(long)]
    pub allow_cross_schema: bool,

    /// Allow foreign keys across catalogs
    #[arg(long)]
    pub allow_cross_catalog: bool,

    /// Do not generate remediation pre-scripts
    #[arg(long)]
    pub no_pre_scripts: bool,

    /// Worker threads for decision making
    #[arg(short = 'j', long)]
    pub parallelism: Option<usize>,
}

impl PolicyArgs {
    /// Flags the user actually passed.
    pub fn overrides(&self) -> OptionOverrides {
        OptionOverrides {
            mode: self.mode,
            null_budget: self.null_budget,
            enable_foreign_keys: self.no_foreign_keys.then_some(false),
            allow_cross_schema: self.allow_cross_schema.then_some(true),
            allow_cross_catalog: self.allow_cross_catalog.then_some(true),
            generate_pre_scripts: self.no_pre_scripts.then_some(false),
            max_degree_of_parallelism: self.parallelism,
        }
    }

    /// Resolve options from file, environment and flags.
    pub fn resolve(&self) -> tighten::Result<ResolvedOptions> {
        let mut loader = OptionsLoader::from_process_env().with_overrides(self.overrides());
        if let Some(path) = &self.config {
            loader = loader.with_file(path);
        }
        loader.load()
    }
}
