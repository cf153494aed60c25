//! Foreign-key decisions and reference target resolution.

use std::cmp::Ordering;

use crate::evidence::{AttributeEntry, EntityEntry, EvidenceIndex};
use crate::model::{
    cmp_ignore_case, eq_ignore_case, AttributeModel, ColumnCoordinate, EntityModel,
};

use super::decision::{Diagnostic, DiagnosticCode, ForeignKeyDecision};
use super::engine::Evaluation;
use super::options::{TighteningMode, TighteningOptions};
use super::rationale::RationaleCode;

/// A reference target that resolved to a concrete entity and key columns.
#[derive(Debug, Clone)]
pub struct ResolvedTarget<'a> {
    pub target: EntityEntry<'a>,
    pub columns: Vec<&'a AttributeModel>,
    /// Other entities sharing the target's logical name.
    pub ambiguous_with: usize,
}

/// Why a reference target could not be resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetFailure {
    /// No entity has the referenced name.
    NoEntity,
    /// The entity exists but has no columns to reference.
    NoColumns,
}

/// Resolve the entity and key columns a reference attribute points at.
///
/// Only active entities in active modules are considered. When several
/// share the name, the one in the referencing module wins; otherwise the
/// lowest (module, schema, table) does.
pub fn resolve_target<'a>(
    source: &AttributeEntry<'a>,
    index: &EvidenceIndex<'a>,
) -> Result<ResolvedTarget<'a>, TargetFailure> {
    let Some(reference) = source.attribute.reference.as_ref() else {
        return Err(TargetFailure::NoEntity);
    };

    let mut candidates: Vec<EntityEntry<'a>> = index
        .entities_named(&reference.target_entity)
        .iter()
        .copied()
        .filter(|c| c.module.is_active && c.entity.is_active)
        .collect();
    if let Some(physical) = reference.target_physical_name.as_deref() {
        if candidates.len() > 1 {
            let narrowed: Vec<EntityEntry<'a>> = candidates
                .iter()
                .copied()
                .filter(|c| eq_ignore_case(&c.entity.physical_name, physical))
                .collect();
            if !narrowed.is_empty() {
                candidates = narrowed;
            }
        }
    }
    if candidates.is_empty() {
        return Err(TargetFailure::NoEntity);
    }

    let ambiguous_with = candidates.len() - 1;
    candidates.sort_by(|a, b| {
        let same_a = eq_ignore_case(&a.module.name, &source.module.name);
        let same_b = eq_ignore_case(&b.module.name, &source.module.name);
        same_b
            .cmp(&same_a)
            .then_with(|| cmp_ignore_case(&a.module.name, &b.module.name))
            .then_with(|| cmp_entity(a.entity, b.entity))
    });
    let target = candidates[0];

    let mut columns: Vec<&'a AttributeModel> = target.entity.identifier_attributes().collect();
    if columns.is_empty() {
        columns.extend(target.entity.attributes.first());
    }
    if columns.is_empty() {
        return Err(TargetFailure::NoColumns);
    }

    Ok(ResolvedTarget {
        target,
        columns,
        ambiguous_with,
    })
}

fn cmp_entity(a: &EntityModel, b: &EntityModel) -> Ordering {
    cmp_ignore_case(&a.schema, &b.schema)
        .then_with(|| cmp_ignore_case(&a.physical_name, &b.physical_name))
}

fn differs(a: Option<&str>, b: Option<&str>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => !eq_ignore_case(a, b),
        (None, None) => false,
        _ => true,
    }
}

/// Whether a physical constraint already exists for the reference.
pub(crate) fn has_database_constraint(entry: &AttributeEntry<'_>) -> bool {
    entry
        .attribute
        .reference
        .as_ref()
        .is_some_and(|r| r.has_database_constraint)
        || entry
            .entity
            .relationship_for(&entry.attribute.logical_name)
            .is_some_and(|r| r.has_database_constraint)
}

/// A reference column is a candidate when it and its owners are active.
pub(crate) fn is_candidate(entry: &AttributeEntry<'_>) -> bool {
    entry.is_active() && entry.attribute.is_reference()
}

pub(crate) fn evaluate(
    coordinate: &ColumnCoordinate,
    entry: &AttributeEntry<'_>,
    index: &EvidenceIndex<'_>,
    options: &TighteningOptions,
) -> Evaluation<ForeignKeyDecision> {
    let mut diagnostics = Vec::new();
    let target_name = entry
        .attribute
        .reference
        .as_ref()
        .map(|r| r.target_entity.as_str())
        .unwrap_or_default();

    let resolved = match resolve_target(entry, index) {
        Ok(resolved) => resolved,
        Err(failure) => {
            let (code, message) = match failure {
                TargetFailure::NoEntity => (
                    DiagnosticCode::UnresolvedReferenceTarget,
                    format!("reference target '{}' has no active entity", target_name),
                ),
                TargetFailure::NoColumns => (
                    DiagnosticCode::UnresolvedReferenceColumn,
                    format!("reference target '{}' has no key columns", target_name),
                ),
            };
            diagnostics.push(Diagnostic::new(code, coordinate.to_string(), message));
            return Evaluation {
                decision: None,
                diagnostics,
            };
        }
    };

    if resolved.ambiguous_with > 0 {
        diagnostics.push(Diagnostic::new(
            DiagnosticCode::AmbiguousReferenceTarget,
            coordinate.to_string(),
            format!(
                "reference target '{}' matches {} entities; using {}.{}",
                target_name,
                resolved.ambiguous_with + 1,
                resolved.target.entity.schema,
                resolved.target.entity.physical_name
            ),
        ));
    }

    let mut rationales = Vec::new();
    let reality = index.foreign_key(coordinate);
    let mut no_check = match reality {
        None => {
            rationales.push(RationaleCode::ProfileMissing);
            true
        }
        Some(reality) => {
            let high_confidence = reality.probe_status.is_high_confidence();
            rationales.push(if high_confidence {
                RationaleCode::EvidenceHighConfidence
            } else {
                RationaleCode::EvidenceLowConfidence
            });
            if !reality.is_consistent() {
                rationales.push(RationaleCode::EvidenceInconsistent);
                diagnostics.push(Diagnostic::new(
                    DiagnosticCode::InconsistentEvidence,
                    coordinate.to_string(),
                    format!(
                        "orphan count {} contradicts has_orphan = false",
                        reality.orphan_count
                    ),
                ));
            }
            let orphans = reality.shows_orphans();
            rationales.push(if orphans {
                RationaleCode::OrphansPresent
            } else {
                RationaleCode::OrphansAbsent
            });
            orphans || (options.mode == TighteningMode::Cautious && !high_confidence)
        }
    };

    rationales.push(RationaleCode::for_mode(options.mode));

    let mut create_constraint = true;
    if !options.foreign_keys.enable_creation {
        rationales.push(RationaleCode::ForeignKeyCreationDisabled);
        create_constraint = false;
    }
    let source = entry.entity;
    let target = resolved.target.entity;
    if !options.foreign_keys.allow_cross_schema && !eq_ignore_case(&source.schema, &target.schema) {
        rationales.push(RationaleCode::CrossSchemaBlocked);
        create_constraint = false;
    }
    if !options.foreign_keys.allow_cross_catalog
        && differs(source.catalog.as_deref(), target.catalog.as_deref())
    {
        rationales.push(RationaleCode::CrossCatalogBlocked);
        create_constraint = false;
    }
    if create_constraint {
        rationales.push(RationaleCode::TargetResolved);
    }

    if has_database_constraint(entry) || reality.is_some_and(|r| r.reference.has_database_constraint) {
        rationales.push(RationaleCode::DatabaseConstraintPresent);
    }
    if reality.is_some_and(|r| r.is_no_check) {
        rationales.push(RationaleCode::DatabaseConstraintUntrusted);
        no_check = true;
    }
    if no_check {
        rationales.push(RationaleCode::NoCheckScripted);
    }

    Evaluation {
        decision: Some(ForeignKeyDecision::new(
            coordinate.clone(),
            create_constraint,
            no_check,
            rationales,
        )),
        diagnostics,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evidence::{ForeignKeyReality, ForeignKeyReference, ProbeOutcome, ProbeStatus, ProfileSnapshot};
    use crate::model::{AttributeReference, ModuleModel, SchemaModel};
    use chrono::Utc;

    fn customer(schema: &str) -> EntityModel {
        EntityModel::new("Customer", schema, "Customer")
            .with_attribute(AttributeModel::new("Id", "Identifier").identifier())
    }

    fn order(target: &str) -> EntityModel {
        EntityModel::new("Order", "dbo", "Order")
            .with_attribute(AttributeModel::new("Id", "Identifier").identifier())
            .with_attribute(
                AttributeModel::new("CustomerId", "Identifier")
                    .with_reference(AttributeReference::new(target)),
            )
    }

    fn source() -> ColumnCoordinate {
        ColumnCoordinate::new("dbo", "Order", "CustomerId")
    }

    fn evaluate_with(
        model: &SchemaModel,
        snapshot: &ProfileSnapshot,
        options: &TighteningOptions,
    ) -> Evaluation<ForeignKeyDecision> {
        let index = EvidenceIndex::new(model, snapshot);
        let entry = *index.attribute(&source()).unwrap();
        evaluate(&source(), &entry, &index, options)
    }

    fn reality(orphans: u64, outcome: ProbeOutcome) -> ForeignKeyReality {
        ForeignKeyReality::new(
            ForeignKeyReference::new(&source(), &ColumnCoordinate::new("dbo", "Customer", "Id")),
            orphans,
            ProbeStatus::new(Utc::now(), 100, outcome),
        )
    }

    #[test]
    fn test_clean_reference_creates_checked_constraint() {
        let model = SchemaModel::new().with_module(
            ModuleModel::new("Sales")
                .with_entity(customer("dbo"))
                .with_entity(order("Customer")),
        );
        let snapshot = ProfileSnapshot::new().with_foreign_key(reality(0, ProbeOutcome::Succeeded));
        let decision = evaluate_with(&model, &snapshot, &TighteningOptions::new())
            .decision
            .unwrap();

        assert!(decision.create_constraint);
        assert!(!decision.script_with_no_check);
        assert!(decision.has_rationale(RationaleCode::TargetResolved));
    }

    #[test]
    fn test_orphans_script_with_no_check() {
        let model = SchemaModel::new().with_module(
            ModuleModel::new("Sales")
                .with_entity(customer("dbo"))
                .with_entity(order("Customer")),
        );
        let snapshot = ProfileSnapshot::new().with_foreign_key(reality(3, ProbeOutcome::Succeeded));
        let decision = evaluate_with(&model, &snapshot, &TighteningOptions::new())
            .decision
            .unwrap();

        assert!(decision.create_constraint);
        assert!(decision.script_with_no_check);
        assert!(decision.has_rationale(RationaleCode::OrphansPresent));
    }

    #[test]
    fn test_cautious_low_confidence_uses_no_check() {
        let model = SchemaModel::new().with_module(
            ModuleModel::new("Sales")
                .with_entity(customer("dbo"))
                .with_entity(order("Customer")),
        );
        let snapshot = ProfileSnapshot::new().with_foreign_key(reality(0, ProbeOutcome::Sampled));
        let options = TighteningOptions::new().with_mode(TighteningMode::Cautious);
        let decision = evaluate_with(&model, &snapshot, &options).decision.unwrap();

        assert!(decision.script_with_no_check);
    }

    #[test]
    fn test_cross_schema_blocked() {
        let model = SchemaModel::new().with_module(
            ModuleModel::new("Sales")
                .with_entity(customer("crm"))
                .with_entity(order("Customer")),
        );
        let decision = evaluate_with(&model, &ProfileSnapshot::new(), &TighteningOptions::new())
            .decision
            .unwrap();

        assert!(!decision.create_constraint);
        assert!(decision.has_rationale(RationaleCode::CrossSchemaBlocked));
    }

    #[test]
    fn test_missing_target_yields_diagnostic_only() {
        let model = SchemaModel::new().with_module(ModuleModel::new("Sales").with_entity(order("Ghost")));
        let evaluation = evaluate_with(&model, &ProfileSnapshot::new(), &TighteningOptions::new());

        assert!(evaluation.decision.is_none());
        assert_eq!(evaluation.diagnostics.len(), 1);
        assert_eq!(
            evaluation.diagnostics[0].code,
            DiagnosticCode::UnresolvedReferenceTarget
        );
    }

    #[test]
    fn test_ambiguous_target_prefers_same_module() {
        let model = SchemaModel::new()
            .with_module(ModuleModel::new("Billing").with_entity(
                EntityModel::new("Customer", "billing", "Customer")
                    .with_attribute(AttributeModel::new("Id", "Identifier").identifier()),
            ))
            .with_module(
                ModuleModel::new("Sales")
                    .with_entity(customer("dbo"))
                    .with_entity(order("Customer")),
            );
        let snapshot = ProfileSnapshot::new();
        let index = EvidenceIndex::new(&model, &snapshot);
        let entry = *index.attribute(&source()).unwrap();

        let resolved = resolve_target(&entry, &index).unwrap();
        assert_eq!(resolved.target.module.name, "Sales");
        assert_eq!(resolved.ambiguous_with, 1);

        let evaluation = evaluate(&source(), &entry, &index, &TighteningOptions::new());
        assert_eq!(
            evaluation.diagnostics[0].code,
            DiagnosticCode::AmbiguousReferenceTarget
        );
        assert!(evaluation.decision.unwrap().create_constraint);
    }

    #[test]
    fn test_inactive_target_is_never_chosen() {
        let legacy = EntityModel::new("Customer", "dbo", "Customer_Legacy")
            .with_attribute(AttributeModel::new("Id", "Identifier").identifier())
            .with_active(false);
        let model = SchemaModel::new()
            .with_module(ModuleModel::new("Crm").with_entity(customer("dbo")))
            .with_module(
                ModuleModel::new("Sales")
                    .with_entity(legacy)
                    .with_entity(order("Customer")),
            );
        let snapshot = ProfileSnapshot::new();
        let index = EvidenceIndex::new(&model, &snapshot);
        let entry = *index.attribute(&source()).unwrap();

        let resolved = resolve_target(&entry, &index).unwrap();
        assert_eq!(resolved.target.module.name, "Crm");
        assert_eq!(resolved.target.entity.physical_name, "Customer");
        assert_eq!(resolved.ambiguous_with, 0);

        let evaluation = evaluate(&source(), &entry, &index, &TighteningOptions::new());
        assert!(evaluation.diagnostics.is_empty());
        assert!(evaluation.decision.unwrap().create_constraint);
    }

    #[test]
    fn test_target_in_inactive_module_is_unresolved() {
        let model = SchemaModel::new()
            .with_module(
                ModuleModel::new("Archive")
                    .with_entity(customer("dbo"))
                    .with_active(false),
            )
            .with_module(ModuleModel::new("Sales").with_entity(order("Customer")));
        let evaluation = evaluate_with(&model, &ProfileSnapshot::new(), &TighteningOptions::new());

        assert!(evaluation.decision.is_none());
        assert_eq!(
            evaluation.diagnostics[0].code,
            DiagnosticCode::UnresolvedReferenceTarget
        );
    }

    #[test]
    fn test_orphan_count_without_flag_is_inconsistent() {
        let model = SchemaModel::new().with_module(
            ModuleModel::new("Sales")
                .with_entity(customer("dbo"))
                .with_entity(order("Customer")),
        );
        let mut contradictory = reality(0, ProbeOutcome::Succeeded);
        contradictory.orphan_count = 7;
        let snapshot = ProfileSnapshot::new().with_foreign_key(contradictory);
        let evaluation = evaluate_with(&model, &snapshot, &TighteningOptions::new());

        assert_eq!(evaluation.diagnostics.len(), 1);
        assert_eq!(evaluation.diagnostics[0].code, DiagnosticCode::InconsistentEvidence);
        let decision = evaluation.decision.unwrap();
        assert!(decision.script_with_no_check);
        assert!(decision.has_rationale(RationaleCode::EvidenceInconsistent));
        assert!(decision.has_rationale(RationaleCode::OrphansPresent));
    }

    #[test]
    fn test_physical_name_narrows_ambiguous_target() {
        let client = EntityModel::new("Customer", "dbo", "Client")
            .with_attribute(AttributeModel::new("Id", "Identifier").identifier());
        let order = EntityModel::new("Order", "dbo", "Order").with_attribute(
            AttributeModel::new("CustomerId", "Identifier")
                .with_reference(AttributeReference::new("Customer").with_target_physical_name("CLIENT")),
        );
        let model = SchemaModel::new()
            .with_module(ModuleModel::new("Crm").with_entity(client))
            .with_module(
                ModuleModel::new("Sales")
                    .with_entity(customer("dbo"))
                    .with_entity(order),
            );
        let snapshot = ProfileSnapshot::new();
        let index = EvidenceIndex::new(&model, &snapshot);
        let entry = *index.attribute(&source()).unwrap();

        let resolved = resolve_target(&entry, &index).unwrap();
        assert_eq!(resolved.target.entity.physical_name, "Client");
        assert_eq!(resolved.ambiguous_with, 0);
    }
}
