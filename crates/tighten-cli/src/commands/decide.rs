//! Decide command - produce the decision set without DDL.

use std::path::PathBuf;

use colored::Colorize;
use tighten::{ProfileSnapshot, SchemaModel, Tightener};

use super::{check_inputs, print_diagnostics, sibling_path};
use crate::cli::{InputArgs, PolicyArgs};

pub fn run(
    inputs: InputArgs,
    policy: PolicyArgs,
    output: Option<PathBuf>,
    json_output: bool,
    verbose: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    check_inputs(&inputs)?;
    let resolved = policy.resolve()?;
    let tightener = Tightener::with_options(resolved.options);

    let model: SchemaModel = serde_json::from_str(&std::fs::read_to_string(&inputs.model)?)?;
    let snapshot: ProfileSnapshot = serde_json::from_str(&std::fs::read_to_string(&inputs.evidence)?)?;
    let decisions = tightener.decide(&model, &snapshot)?;

    let output_path = output.unwrap_or_else(|| sibling_path(&inputs.model, "decisions.json"));
    decisions.save(&output_path)?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&decisions)?);
        return Ok(());
    }

    let (tightened, enforced, created) = decisions.positive_counts();
    println!(
        "{} {} ({})",
        "Decided".cyan().bold(),
        inputs.model.display().to_string().white(),
        tightener.options().mode.label()
    );
    println!();
    println!(
        "  {:20} {}/{}",
        "NOT NULL",
        tightened.to_string().white().bold(),
        decisions.nullability().len()
    );
    println!(
        "  {:20} {}/{}",
        "UNIQUE",
        enforced.to_string().white().bold(),
        decisions.unique_indexes().len()
    );
    println!(
        "  {:20} {}/{}",
        "FOREIGN KEY",
        created.to_string().white().bold(),
        decisions.foreign_keys().len()
    );

    if verbose {
        println!();
        for decision in decisions.nullability().values() {
            let codes: Vec<&str> = decision.rationales.iter().map(|r| r.label()).collect();
            println!(
                "  {} {} {}",
                if decision.make_not_null { "+".green() } else { "-".red() },
                decision.column.to_string().white(),
                codes.join(", ").dimmed()
            );
        }
        for decision in decisions.unique_indexes().values() {
            let codes: Vec<&str> = decision.rationales.iter().map(|r| r.label()).collect();
            println!(
                "  {} {} {}",
                if decision.enforce_unique { "+".green() } else { "-".red() },
                decision.index.to_string().white(),
                codes.join(", ").dimmed()
            );
        }
        for decision in decisions.foreign_keys().values() {
            let codes: Vec<&str> = decision.rationales.iter().map(|r| r.label()).collect();
            println!(
                "  {} {} {}",
                if decision.create_constraint { "+".green() } else { "-".red() },
                decision.column.to_string().white(),
                codes.join(", ").dimmed()
            );
        }
    }

    print_diagnostics(&decisions);

    println!();
    println!(
        "{} {}",
        "Saved to".green().bold(),
        output_path.display().to_string().white()
    );

    Ok(())
}
