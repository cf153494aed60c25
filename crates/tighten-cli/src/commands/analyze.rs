//! Analyze command - decide and build the opportunities report.

use std::path::PathBuf;

use colored::Colorize;
use tighten::{ConstraintType, Tightener};

use super::{check_inputs, print_diagnostics, sibling_path};
use crate::cli::{InputArgs, PolicyArgs};

pub fn run(
    inputs: InputArgs,
    policy: PolicyArgs,
    output: Option<PathBuf>,
    script: Option<PathBuf>,
    json_output: bool,
    verbose: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    check_inputs(&inputs)?;
    let resolved = policy.resolve()?;
    let mode = resolved.options.mode;

    let result = Tightener::with_options(resolved.options).run_files(&inputs.model, &inputs.evidence)?;

    let output_path = output.unwrap_or_else(|| sibling_path(&inputs.model, "opportunities.json"));
    result.report.save(&output_path)?;
    if let Some(script_path) = &script {
        std::fs::write(script_path, result.report.script() + "\n")?;
        tracing::debug!(path = %script_path.display(), "script written");
    }

    if json_output {
        println!("{}", result.report.to_json()?);
        return Ok(());
    }

    println!(
        "{} {} ({})",
        "Analyzing".cyan().bold(),
        inputs.model.display().to_string().white(),
        mode.label()
    );
    println!();

    for constraint_type in ConstraintType::ALL {
        let count = result.report.count_by_type(constraint_type);
        println!(
            "  {:20} {}",
            constraint_type.label(),
            count.to_string().white().bold()
        );
        if verbose {
            for opportunity in result.report.of_type(constraint_type) {
                let risk = if opportunity.is_safe() {
                    opportunity.risk.label().green()
                } else {
                    opportunity.risk.label().yellow()
                };
                println!(
                    "    {} {}.{} {}",
                    risk,
                    opportunity.schema,
                    opportunity.table,
                    opportunity.name.white()
                );
                for line in &opportunity.evidence {
                    println!("        {}", line.dimmed());
                }
                let metrics = &opportunity.metrics;
                let facts: Vec<String> = [
                    ("clean", metrics.data_is_clean),
                    ("duplicates", metrics.has_duplicates),
                    ("orphans", metrics.has_orphans),
                ]
                .into_iter()
                .filter(|(_, value)| value.is_known())
                .map(|(name, value)| format!("{}={}", name, value.label()))
                .collect();
                if !facts.is_empty() {
                    println!("        {}", facts.join(" ").dimmed());
                }
            }
        }
    }

    println!();
    println!(
        "Found {} opportunities ({} safe, {} need remediation)",
        result.report.len().to_string().white().bold(),
        result.summary.safe_to_apply.to_string().green(),
        result.summary.needs_remediation.to_string().yellow()
    );

    print_diagnostics(&result.decisions);

    println!();
    println!(
        "{} {}",
        "Saved to".green().bold(),
        output_path.display().to_string().white()
    );
    if let Some(script_path) = script {
        println!(
            "{} {}",
            "Script written to".green().bold(),
            script_path.display().to_string().white()
        );
    }

    println!();
    if result.report.is_empty() {
        println!("{}", result.summary.recommendation.yellow());
    } else {
        println!("{}", result.summary.recommendation);
    }

    Ok(())
}
