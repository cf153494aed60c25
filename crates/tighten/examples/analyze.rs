//! Example: Run a tightening pass over a model and a profiling snapshot.
//!
//! Usage:
//!   cargo run --example analyze -- <model.json> <snapshot.json> [mode]
//!
//! Example:
//!   cargo run --example analyze -- model.json snapshot.json aggressive

use std::env;
use std::path::Path;

use tighten::{ConstraintType, Tightener, TighteningMode, TighteningOptions};

fn main() -> tighten::Result<()> {
    let args: Vec<String> = env::args().collect();

    if args.len() < 3 {
        eprintln!("Usage: cargo run --example analyze -- <model.json> <snapshot.json> [mode]");
        eprintln!("\nModes: cautious, evidence-gated, aggressive");
        std::process::exit(1);
    }

    for file_path in &args[1..3] {
        if !Path::new(file_path).exists() {
            eprintln!("Error: File not found: {}", file_path);
            std::process::exit(1);
        }
    }

    let mode: TighteningMode = match args.get(3) {
        Some(raw) => raw.parse().unwrap_or_else(|e| {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }),
        None => TighteningMode::default(),
    };

    let separator = "=".repeat(80);
    println!("{}", separator);
    println!("Tightening Analysis ({})", mode);
    println!("  Model: {}", args[1]);
    println!("  Evidence: {}", args[2]);
    println!("{}", separator);
    println!();

    let tightener = Tightener::with_options(TighteningOptions::new().with_mode(mode));
    let result = tightener.run_files(&args[1], &args[2])?;

    // Decisions
    println!("## Nullability ({} columns)", result.decisions.nullability().len());
    println!();
    for decision in result.decisions.nullability().values() {
        let codes: Vec<&str> = decision.rationales.iter().map(|r| r.label()).collect();
        println!(
            "  {:40} not_null={:<5} remediation={:<5} {}",
            decision.column.to_string(),
            decision.make_not_null,
            decision.requires_remediation,
            codes.join(",")
        );
    }
    println!();

    println!("## Unique Indexes ({})", result.decisions.unique_indexes().len());
    println!();
    for decision in result.decisions.unique_indexes().values() {
        println!(
            "  {:40} enforce={:<5} remediation={}",
            decision.index.to_string(),
            decision.enforce_unique,
            decision.requires_remediation
        );
    }
    println!();

    println!("## Foreign Keys ({})", result.decisions.foreign_keys().len());
    println!();
    for decision in result.decisions.foreign_keys().values() {
        println!(
            "  {:40} create={:<5} nocheck={}",
            decision.column.to_string(),
            decision.create_constraint,
            decision.script_with_no_check
        );
    }
    println!();

    if !result.decisions.diagnostics().is_empty() {
        println!("## Diagnostics ({})", result.decisions.diagnostics().len());
        println!();
        for diagnostic in result.decisions.diagnostics() {
            println!("  {}", diagnostic);
        }
        println!();
    }

    // Opportunities
    for constraint_type in ConstraintType::ALL {
        let count = result.report.count_by_type(constraint_type);
        if count == 0 {
            continue;
        }
        println!("## {} Opportunities ({})", constraint_type.label(), count);
        println!();
        for opportunity in result.report.of_type(constraint_type) {
            println!(
                "  [{}] {}.{} {}",
                opportunity.risk.label(),
                opportunity.schema,
                opportunity.table,
                opportunity.name
            );
            for line in &opportunity.evidence {
                println!("       {}", line);
            }
            for statement in opportunity
                .remediation_statements
                .iter()
                .chain(&opportunity.statements)
            {
                println!("       > {}", statement);
            }
            println!();
        }
    }

    // Summary
    println!("## Summary");
    println!("  Safe to apply: {}", result.summary.safe_to_apply);
    println!("  Needs remediation: {}", result.summary.needs_remediation);
    println!("  Recommendation: {}", result.summary.recommendation);
    println!();

    println!("{}", separator);

    Ok(())
}
