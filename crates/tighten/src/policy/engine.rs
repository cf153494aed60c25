//! The decision engine: evaluates every candidate coordinate and freezes
//! the results into a [`PolicyDecisionSet`].

use once_cell::sync::Lazy;
use rayon::prelude::*;
use regex::Regex;

use crate::error::{InvalidInputKind, Result, TightenError};
use crate::evidence::{EvidenceIndex, ProfileSnapshot};
use crate::model::{ModuleModel, SchemaModel};

use super::decision::{Diagnostic, DiagnosticCode, PolicyDecisionSet};
use super::options::{EmissionOptions, TighteningOptions};
use super::{foreign_key, nullability, unique};

static MODULE_NAME_UNSAFE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^A-Za-z0-9_]+").expect("valid module name pattern"));

/// Outcome of evaluating one coordinate.
pub(crate) struct Evaluation<T> {
    pub decision: Option<T>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Module name as used for attribution and rollups.
pub fn module_label(module: &ModuleModel, emission: &EmissionOptions) -> String {
    if emission.sanitize_module_names {
        MODULE_NAME_UNSAFE
            .replace_all(module.name.trim(), "_")
            .into_owned()
    } else {
        module.name.clone()
    }
}

/// Applies a [`TighteningOptions`] policy to an [`EvidenceIndex`].
///
/// Evaluation is a pure function of the index and the options, so the
/// per-coordinate work runs in parallel and the result does not depend on
/// scheduling.
#[derive(Debug, Clone)]
pub struct DecisionEngine {
    options: TighteningOptions,
}

impl DecisionEngine {
    /// Create an engine, validating the options.
    pub fn new(options: TighteningOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self { options })
    }

    pub fn options(&self) -> &TighteningOptions {
        &self.options
    }

    /// Decide every candidate in the index.
    pub fn decide(&self, index: &EvidenceIndex<'_>) -> Result<PolicyDecisionSet> {
        match self.options.max_degree_of_parallelism {
            Some(workers) => {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(workers)
                    .build()
                    .map_err(|e| TightenError::Parallelism(e.to_string()))?;
                Ok(pool.install(|| self.decide_all(index)))
            }
            None => Ok(self.decide_all(index)),
        }
    }

    fn decide_all(&self, index: &EvidenceIndex<'_>) -> PolicyDecisionSet {
        let options = &self.options;
        let columns: Vec<_> = index.attributes().collect();
        let indexes: Vec<_> = index.unique_indexes().collect();

        let nullability: Vec<_> = columns
            .par_iter()
            .filter_map(|(coordinate, entry)| {
                nullability::is_candidate(coordinate, entry, index).then(|| {
                    (
                        module_label(entry.module, &options.emission),
                        nullability::evaluate(coordinate, entry, index, options),
                    )
                })
            })
            .collect();

        let foreign_keys: Vec<_> = columns
            .par_iter()
            .filter_map(|(coordinate, entry)| {
                foreign_key::is_candidate(entry).then(|| {
                    (
                        module_label(entry.module, &options.emission),
                        foreign_key::evaluate(coordinate, entry, index, options),
                    )
                })
            })
            .collect();

        let unique_indexes: Vec<_> = indexes
            .par_iter()
            .filter_map(|(coordinate, entry)| {
                unique::is_candidate(entry, options).then(|| {
                    (
                        module_label(entry.module, &options.emission),
                        unique::evaluate(coordinate, entry, index, options),
                    )
                })
            })
            .collect();

        let mut builder = PolicyDecisionSet::builder();
        for (module, evaluation) in nullability {
            if let Some(decision) = evaluation.decision {
                builder.nullability(decision, module);
            }
            evaluation.diagnostics.into_iter().for_each(|d| builder.diagnostic(d));
        }
        for (module, evaluation) in foreign_keys {
            if let Some(decision) = evaluation.decision {
                builder.foreign_key(decision, module);
            }
            evaluation.diagnostics.into_iter().for_each(|d| builder.diagnostic(d));
        }
        for (module, evaluation) in unique_indexes {
            if let Some(decision) = evaluation.decision {
                builder.unique_index(decision, module);
            }
            evaluation.diagnostics.into_iter().for_each(|d| builder.diagnostic(d));
        }

        for coordinate in index.duplicate_attributes() {
            builder.diagnostic(Diagnostic::new(
                DiagnosticCode::DuplicateModelCoordinate,
                coordinate.to_string(),
                "column is declared by more than one attribute; the first declaration is used",
            ));
        }
        for duplicate in index.duplicate_evidence() {
            builder.diagnostic(Diagnostic::new(
                DiagnosticCode::DuplicateEvidenceRow,
                duplicate.subject.clone(),
                format!(
                    "{} reported more than once; the first row is used",
                    duplicate.kind.label()
                ),
            ));
        }

        let set = builder.build();
        for diagnostic in set.diagnostics() {
            tracing::warn!(
                code = diagnostic.code.label(),
                subject = %diagnostic.subject,
                "{}",
                diagnostic.message
            );
        }
        let (tightened, enforced, created) = set.positive_counts();
        tracing::info!(
            mode = %options.mode,
            columns = set.nullability().len(),
            tightened,
            unique_indexes = set.unique_indexes().len(),
            enforced,
            foreign_keys = set.foreign_keys().len(),
            created,
            diagnostics = set.diagnostics().len(),
            "decisions computed"
        );
        set
    }
}

/// Build the evidence index and decide in one step.
///
/// Absent inputs fail with [`TightenError::InvalidInput`]; nothing else about
/// the data does.
pub fn decide(
    model: Option<&SchemaModel>,
    snapshot: Option<&ProfileSnapshot>,
    options: Option<&TighteningOptions>,
) -> Result<PolicyDecisionSet> {
    let index = EvidenceIndex::build(model, snapshot)?;
    let options = options.ok_or_else(|| {
        TightenError::invalid_input(
            InvalidInputKind::MissingOptions,
            "tightening options are required",
        )
    })?;
    DecisionEngine::new(options.clone())?.decide(&index)
}
