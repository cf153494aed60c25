//! Config command - show resolved options and their sources.

use colored::Colorize;
use tighten::ConfigSource;

use crate::cli::PolicyArgs;

pub fn run(policy: PolicyArgs, json_output: bool) -> Result<(), Box<dyn std::error::Error>> {
    let resolved = policy.resolve()?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&resolved)?);
        return Ok(());
    }

    let options = &resolved.options;
    let parallelism = options
        .max_degree_of_parallelism
        .map(|w| w.to_string())
        .unwrap_or_else(|| "auto".to_string());
    let rows = [
        ("mode", options.mode.label().to_string()),
        ("null_budget", options.null_budget.to_string()),
        (
            "foreign_keys.enable_creation",
            options.foreign_keys.enable_creation.to_string(),
        ),
        (
            "foreign_keys.allow_cross_schema",
            options.foreign_keys.allow_cross_schema.to_string(),
        ),
        (
            "foreign_keys.allow_cross_catalog",
            options.foreign_keys.allow_cross_catalog.to_string(),
        ),
        (
            "uniqueness.enforce_single_column",
            options.uniqueness.enforce_single_column.to_string(),
        ),
        (
            "uniqueness.enforce_multi_column",
            options.uniqueness.enforce_multi_column.to_string(),
        ),
        (
            "remediation.generate_pre_scripts",
            options.remediation.generate_pre_scripts.to_string(),
        ),
        ("max_degree_of_parallelism", parallelism),
    ];

    println!("{}", "Resolved options".cyan().bold());
    println!();
    for (key, value) in rows {
        let source = resolved.source(key);
        let label = match source {
            ConfigSource::Default => source.label().dimmed(),
            ConfigSource::File => source.label().blue(),
            ConfigSource::Environment => source.label().yellow(),
            ConfigSource::Override => source.label().green(),
        };
        println!("  {:36} {:14} {}", key, value.white(), label);
    }

    Ok(())
}
