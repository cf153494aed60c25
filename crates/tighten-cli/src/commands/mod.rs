//! CLI command implementations.

pub mod analyze;
pub mod config;
pub mod decide;

use std::path::{Path, PathBuf};

use colored::Colorize;
use tighten::PolicyDecisionSet;

use crate::cli::InputArgs;

/// `<dir>/<model stem>.<suffix>` next to the model file.
pub fn sibling_path(model: &Path, suffix: &str) -> PathBuf {
    let mut p = model.to_path_buf();
    let stem = p.file_stem().unwrap_or_default().to_string_lossy().into_owned();
    p.set_file_name(format!("{}.{}", stem, suffix));
    p
}

/// Fail early with a readable message when an input file is missing.
pub fn check_inputs(inputs: &InputArgs) -> Result<(), Box<dyn std::error::Error>> {
    for (label, path) in [("Model", &inputs.model), ("Evidence", &inputs.evidence)] {
        if !path.exists() {
            return Err(format!("{} file not found: {}", label, path.display()).into());
        }
    }
    Ok(())
}

/// Print diagnostics as warnings.
pub fn print_diagnostics(decisions: &PolicyDecisionSet) {
    if decisions.diagnostics().is_empty() {
        return;
    }
    println!();
    println!(
        "{} ({})",
        "Diagnostics".yellow().bold(),
        decisions.diagnostics().len()
    );
    for diagnostic in decisions.diagnostics() {
        println!(
            "  {} {} {}",
            diagnostic.code.label().yellow(),
            diagnostic.subject.white(),
            diagnostic.message.dimmed()
        );
    }
}
