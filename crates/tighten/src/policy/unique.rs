//! Unique index enforcement decisions.

use crate::evidence::{EvidenceIndex, IndexEntry};
use crate::model::IndexCoordinate;

use super::decision::UniqueIndexDecision;
use super::engine::Evaluation;
use super::options::{TighteningMode, TighteningOptions};
use super::rationale::RationaleCode;

/// What the duplicate probes say about an index key.
#[derive(Clone, Copy)]
enum DuplicateEvidence {
    Unavailable,
    Observed {
        has_duplicate: bool,
        high_confidence: bool,
    },
}

/// A unique, non-primary index on an active entity. Platform-created
/// indexes only count when the options ask for them.
pub(crate) fn is_candidate(entry: &IndexEntry<'_>, options: &TighteningOptions) -> bool {
    entry.module.is_active
        && entry.entity.is_active
        && entry.index.is_unique
        && !entry.index.is_primary
        && (options.uniqueness.include_platform_auto_indexes || !entry.index.is_platform_auto)
}

pub(crate) fn evaluate(
    coordinate: &IndexCoordinate,
    entry: &IndexEntry<'_>,
    index: &EvidenceIndex<'_>,
    options: &TighteningOptions,
) -> Evaluation<UniqueIndexDecision> {
    let mut rationales = Vec::new();
    let key_columns: Vec<&str> = entry
        .index
        .key_columns()
        .into_iter()
        .map(|c| c.column.as_str())
        .collect();

    let evidence = match key_columns.as_slice() {
        [] => {
            rationales.push(RationaleCode::NoKeyColumns);
            DuplicateEvidence::Unavailable
        }
        [column] => {
            rationales.push(RationaleCode::SingleColumnProbe);
            match index.unique_candidate(&entry.entity.column_coordinate(column)) {
                Some(probe) => DuplicateEvidence::Observed {
                    has_duplicate: probe.has_duplicate,
                    high_confidence: probe.probe_status.is_high_confidence(),
                },
                None => DuplicateEvidence::Unavailable,
            }
        }
        columns => {
            rationales.push(RationaleCode::CompositeProbe);
            match index.composite_candidate(
                &entry.entity.schema,
                &entry.entity.physical_name,
                columns,
            ) {
                Some(probe) => DuplicateEvidence::Observed {
                    has_duplicate: probe.has_duplicate,
                    high_confidence: true,
                },
                None => DuplicateEvidence::Unavailable,
            }
        }
    };

    match evidence {
        DuplicateEvidence::Unavailable => rationales.push(RationaleCode::ProfileMissing),
        DuplicateEvidence::Observed {
            has_duplicate,
            high_confidence,
        } => {
            rationales.push(if high_confidence {
                RationaleCode::EvidenceHighConfidence
            } else {
                RationaleCode::EvidenceLowConfidence
            });
            rationales.push(if has_duplicate {
                RationaleCode::DuplicatesPresent
            } else {
                RationaleCode::DuplicatesAbsent
            });
        }
    }

    rationales.push(RationaleCode::for_mode(options.mode));

    let (mut enforce_unique, requires_remediation) = match (evidence, options.mode) {
        (
            DuplicateEvidence::Observed {
                has_duplicate,
                high_confidence,
            },
            TighteningMode::Cautious,
        ) => (high_confidence && !has_duplicate, has_duplicate),
        (DuplicateEvidence::Observed { has_duplicate, .. }, TighteningMode::EvidenceGated) => {
            (true, has_duplicate)
        }
        (
            DuplicateEvidence::Observed {
                has_duplicate,
                high_confidence: true,
            },
            TighteningMode::Aggressive,
        ) => (true, has_duplicate),
        (DuplicateEvidence::Unavailable, TighteningMode::Cautious)
        | (DuplicateEvidence::Unavailable, TighteningMode::EvidenceGated) => (false, false),
        (_, TighteningMode::Aggressive) => {
            rationales.push(RationaleCode::OptimisticWithoutEvidence);
            (true, true)
        }
    };

    let toggle = if key_columns.len() > 1 {
        options.uniqueness.enforce_multi_column
    } else {
        options.uniqueness.enforce_single_column
    };
    if key_columns.is_empty() || !toggle {
        if !toggle {
            rationales.push(RationaleCode::UniqueEnforcementDisabled);
        }
        enforce_unique = false;
    }

    if enforce_unique && requires_remediation {
        rationales.push(RationaleCode::RemediationRequired);
    }

    Evaluation {
        decision: Some(UniqueIndexDecision::new(
            coordinate.clone(),
            enforce_unique,
            requires_remediation,
            rationales,
        )),
        diagnostics: Vec::new(),
    }
}
