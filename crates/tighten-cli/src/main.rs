//! Tighten CLI - evidence-gated constraint tightening.

mod cli;
mod commands;

use std::sync::Once;

use clap::Parser;
use cli::{Cli, Commands};
use tracing_subscriber::EnvFilter;

static INIT_LOGGING: Once = Once::new();

fn init_logging(verbose: bool) {
    INIT_LOGGING.call_once(|| {
        let default = if verbose { "tighten=debug" } else { "tighten=warn" };
        let filter = EnvFilter::try_from_env("TIGHTEN_LOG").unwrap_or_else(|_| EnvFilter::new(default));
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .init();
    });
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Analyze {
            inputs,
            policy,
            output,
            script,
            json,
        } => commands::analyze::run(inputs, policy, output, script, json, cli.verbose),

        Commands::Decide {
            inputs,
            policy,
            output,
            json,
        } => commands::decide::run(inputs, policy, output, json, cli.verbose),

        Commands::Config { policy, json } => commands::config::run(policy, json),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
