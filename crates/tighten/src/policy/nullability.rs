//! NOT NULL decisions.

use crate::evidence::{AttributeEntry, ColumnProfile, EvidenceIndex};
use crate::model::ColumnCoordinate;

use super::decision::{Diagnostic, DiagnosticCode, NullabilityDecision};
use super::engine::Evaluation;
use super::options::{TighteningMode, TighteningOptions};
use super::rationale::RationaleCode;

/// What the snapshot says about a column's NULL rows.
enum NullEvidence<'a> {
    Unavailable,
    Inconsistent(&'a ColumnProfile),
    Observed {
        profile: &'a ColumnProfile,
        high_confidence: bool,
        within_budget: bool,
    },
}

/// A column is a candidate when it is active, physically nullable, and
/// neither part of the primary key nor computed.
pub(crate) fn is_candidate(
    coordinate: &ColumnCoordinate,
    entry: &AttributeEntry<'_>,
    index: &EvidenceIndex<'_>,
) -> bool {
    if !entry.is_active() {
        return false;
    }
    let profile = index.column_profile(coordinate);
    let nullable = profile
        .map(|p| p.is_nullable_physical)
        .unwrap_or_else(|| entry.attribute.is_physically_nullable());
    let primary_key = entry.entity.is_primary_key_column(entry.attribute)
        || profile.is_some_and(|p| p.is_primary_key);
    let computed = entry.attribute.is_computed() || profile.is_some_and(|p| p.is_computed);

    nullable && !primary_key && !computed
}

pub(crate) fn evaluate(
    coordinate: &ColumnCoordinate,
    entry: &AttributeEntry<'_>,
    index: &EvidenceIndex<'_>,
    options: &TighteningOptions,
) -> Evaluation<NullabilityDecision> {
    let mut rationales = Vec::new();
    let mut diagnostics = Vec::new();

    let evidence = match index.column_profile(coordinate) {
        None => {
            rationales.push(RationaleCode::ProfileMissing);
            NullEvidence::Unavailable
        }
        Some(profile) if !profile.is_consistent() => {
            rationales.push(RationaleCode::EvidenceInconsistent);
            diagnostics.push(Diagnostic::new(
                DiagnosticCode::InconsistentEvidence,
                coordinate.to_string(),
                format!(
                    "null count {} exceeds row count {}",
                    profile.null_count, profile.row_count
                ),
            ));
            NullEvidence::Inconsistent(profile)
        }
        Some(profile) => {
            let high_confidence = profile.null_count_status.is_high_confidence();
            rationales.push(if high_confidence {
                RationaleCode::EvidenceHighConfidence
            } else {
                RationaleCode::EvidenceLowConfidence
            });
            rationales.push(if profile.null_count == 0 {
                RationaleCode::DataHasNoNulls
            } else {
                RationaleCode::DataHasNulls
            });

            let within_budget = profile.null_fraction() <= options.null_budget;
            rationales.push(if within_budget {
                RationaleCode::WithinNullBudget
            } else {
                RationaleCode::ExceedsNullBudget
            });
            NullEvidence::Observed {
                profile,
                high_confidence,
                within_budget,
            }
        }
    };

    rationales.push(RationaleCode::for_mode(options.mode));

    let (mut make_not_null, requires_remediation) = match (&evidence, options.mode) {
        (NullEvidence::Inconsistent(profile), _) => (false, profile.null_count > 0),
        (
            NullEvidence::Observed {
                profile,
                high_confidence,
                ..
            },
            TighteningMode::Cautious,
        ) => (
            *high_confidence && profile.null_count == 0,
            profile.null_count > 0,
        ),
        (NullEvidence::Unavailable, TighteningMode::Cautious) => (false, false),
        (
            NullEvidence::Observed {
                profile,
                within_budget,
                ..
            },
            TighteningMode::EvidenceGated,
        ) => (*within_budget, profile.null_count > 0),
        (NullEvidence::Unavailable, TighteningMode::EvidenceGated) => (false, false),
        (
            NullEvidence::Observed {
                profile,
                high_confidence: true,
                within_budget,
            },
            TighteningMode::Aggressive,
        ) => (*within_budget, profile.null_count > 0),
        (_, TighteningMode::Aggressive) => {
            rationales.push(RationaleCode::OptimisticWithoutEvidence);
            (true, true)
        }
    };

    if make_not_null && entry.attribute.is_reference() {
        if let Some(reality) = index.foreign_key(coordinate) {
            if reality.shows_orphans() {
                rationales.push(RationaleCode::ForeignKeyOrphansPresent);
                make_not_null = false;
            }
        }
    }

    if make_not_null && requires_remediation {
        if let NullEvidence::Observed { profile, .. } = &evidence {
            if profile.null_count > options.remediation.max_rows_default_backfill {
                rationales.push(RationaleCode::RemediationRowLimitExceeded);
                make_not_null = false;
            }
        }
    }

    if requires_remediation && has_default(coordinate, entry, index) {
        rationales.push(RationaleCode::DefaultValueAvailable);
    }

    if make_not_null && requires_remediation {
        rationales.push(RationaleCode::RemediationRequired);
    }

    Evaluation {
        decision: Some(NullabilityDecision::new(
            coordinate.clone(),
            make_not_null,
            requires_remediation,
            rationales,
        )),
        diagnostics,
    }
}

fn has_default(
    coordinate: &ColumnCoordinate,
    entry: &AttributeEntry<'_>,
    index: &EvidenceIndex<'_>,
) -> bool {
    entry.attribute.default_definition().is_some()
        || index
            .column_profile(coordinate)
            .is_some_and(|p| p.default_definition.is_some())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evidence::{ProbeOutcome, ProbeStatus, ProfileSnapshot};
    use crate::model::{AttributeModel, EntityModel, ModuleModel, SchemaModel};
    use chrono::Utc;

    fn model() -> SchemaModel {
        SchemaModel::new().with_module(
            ModuleModel::new("Sales").with_entity(
                EntityModel::new("Customer", "dbo", "Customer")
                    .with_attribute(AttributeModel::new("Id", "Identifier").identifier())
                    .with_attribute(AttributeModel::new("Email", "varchar(200)")),
            ),
        )
    }

    fn email() -> ColumnCoordinate {
        ColumnCoordinate::new("dbo", "Customer", "Email")
    }

    fn decide(
        snapshot: &ProfileSnapshot,
        options: &TighteningOptions,
    ) -> NullabilityDecision {
        let model = model();
        let index = EvidenceIndex::new(&model, snapshot);
        let entry = *index.attribute(&email()).unwrap();
        evaluate(&email(), &entry, &index, options).decision.unwrap()
    }

    fn profile(rows: u64, nulls: u64, outcome: ProbeOutcome) -> ProfileSnapshot {
        ProfileSnapshot::new().with_column(ColumnProfile::new(
            &email(),
            rows,
            nulls,
            ProbeStatus::new(Utc::now(), rows, outcome),
        ))
    }

    #[test]
    fn test_primary_key_is_not_a_candidate() {
        let model = model();
        let snapshot = ProfileSnapshot::new();
        let index = EvidenceIndex::new(&model, &snapshot);
        let id = ColumnCoordinate::new("dbo", "Customer", "Id");
        let entry = *index.attribute(&id).unwrap();

        assert!(!is_candidate(&id, &entry, &index));
        let entry = *index.attribute(&email()).unwrap();
        assert!(is_candidate(&email(), &entry, &index));
    }

    #[test]
    fn test_cautious_requires_clean_full_scan() {
        let options = TighteningOptions::new().with_mode(TighteningMode::Cautious);

        let clean = decide(&profile(1000, 0, ProbeOutcome::Succeeded), &options);
        assert!(clean.make_not_null);
        assert!(!clean.requires_remediation);

        let sampled = decide(&profile(1000, 0, ProbeOutcome::Sampled), &options);
        assert!(!sampled.make_not_null);
        assert!(sampled.has_rationale(RationaleCode::EvidenceLowConfidence));
    }

    #[test]
    fn test_evidence_gated_budget() {
        let options = TighteningOptions::new().with_null_budget(0.01);

        let within = decide(&profile(1000, 5, ProbeOutcome::Succeeded), &options);
        assert!(within.make_not_null);
        assert!(within.requires_remediation);
        assert!(within.has_rationale(RationaleCode::RemediationRequired));

        let over = decide(&profile(1000, 20, ProbeOutcome::Succeeded), &options);
        assert!(!over.make_not_null);
        assert!(over.has_rationale(RationaleCode::ExceedsNullBudget));
    }

    #[test]
    fn test_aggressive_without_evidence() {
        let options = TighteningOptions::new().with_mode(TighteningMode::Aggressive);
        let decision = decide(&ProfileSnapshot::new(), &options);

        assert!(decision.make_not_null);
        assert!(decision.requires_remediation);
        assert_eq!(
            decision.rationales,
            vec![
                RationaleCode::ProfileMissing,
                RationaleCode::ModeAggressive,
                RationaleCode::OptimisticWithoutEvidence,
                RationaleCode::RemediationRequired,
            ]
        );
    }

    #[test]
    fn test_inconsistent_evidence_never_tightens() {
        for mode in [
            TighteningMode::Cautious,
            TighteningMode::EvidenceGated,
            TighteningMode::Aggressive,
        ] {
            let options = TighteningOptions::new().with_mode(mode).with_null_budget(1.0);
            let model = model();
            let snapshot = profile(10, 11, ProbeOutcome::Succeeded);
            let index = EvidenceIndex::new(&model, &snapshot);
            let entry = *index.attribute(&email()).unwrap();
            let evaluation = evaluate(&email(), &entry, &index, &options);

            assert!(!evaluation.decision.unwrap().make_not_null);
            assert_eq!(evaluation.diagnostics.len(), 1);
            assert_eq!(
                evaluation.diagnostics[0].code,
                DiagnosticCode::InconsistentEvidence
            );
        }
    }

    #[test]
    fn test_backfill_row_limit() {
        let mut options = TighteningOptions::new().with_null_budget(0.5);
        options.remediation.max_rows_default_backfill = 10;

        let decision = decide(&profile(1000, 11, ProbeOutcome::Succeeded), &options);
        assert!(!decision.make_not_null);
        assert!(decision.has_rationale(RationaleCode::RemediationRowLimitExceeded));
    }

    #[test]
    fn test_rationale_order() {
        let options = TighteningOptions::new();
        let decision = decide(&profile(1000, 0, ProbeOutcome::Succeeded), &options);

        assert_eq!(
            decision.rationales,
            vec![
                RationaleCode::EvidenceHighConfidence,
                RationaleCode::DataHasNoNulls,
                RationaleCode::WithinNullBudget,
                RationaleCode::ModeEvidenceGated,
            ]
        );
    }
}
