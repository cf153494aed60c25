//! Turn positive decisions into opportunities with literal DDL.

use crate::evidence::{EvidenceIndex, ProbeStatus, RowSample};
use crate::model::SortDirection;
use crate::policy::{
    module_label, resolve_target, ForeignKeyDecision, NullabilityDecision, PolicyDecisionSet,
    TighteningOptions, UniqueIndexDecision,
};
use crate::remediation::RemediationPlanner;

use super::sql;
use super::types::{ColumnAnalysis, ConstraintType, Opportunity, OpportunityMetrics, RiskLevel};

/// Everything a builder reads.
#[derive(Debug, Clone, Copy)]
pub struct BuildContext<'a> {
    pub index: &'a EvidenceIndex<'a>,
    pub decisions: &'a PolicyDecisionSet,
    pub options: &'a TighteningOptions,
}

impl<'a> BuildContext<'a> {
    fn planner(&self) -> RemediationPlanner<'a> {
        RemediationPlanner::new(&self.options.remediation)
    }
}

/// A pure builder for one constraint type.
pub type BuilderFn = fn(&BuildContext<'_>) -> Vec<Opportunity>;

/// Builder for each constraint type, in report order.
pub const BUILDERS: [(ConstraintType, BuilderFn); 3] = [
    (ConstraintType::Nullability, build_nullability),
    (ConstraintType::UniqueIndex, build_unique_indexes),
    (ConstraintType::ForeignKey, build_foreign_keys),
];

/// Look up the builder for a constraint type.
pub fn builder_for(constraint_type: ConstraintType) -> BuilderFn {
    match constraint_type {
        ConstraintType::Nullability => build_nullability,
        ConstraintType::UniqueIndex => build_unique_indexes,
        ConstraintType::ForeignKey => build_foreign_keys,
    }
}

fn status_evidence(label: &str, value: impl std::fmt::Display, status: &ProbeStatus) -> String {
    format!("{}={} ({})", label, value, status.describe())
}

fn sample_evidence(label: &str, sample: Option<&RowSample>) -> Option<String> {
    sample
        .filter(|s| !s.is_empty())
        .map(|s| format!("{} sample [{}]: {}", label, s.key_columns.join(", "), s.describe()))
}

/// `ALTER COLUMN ... NOT NULL` for every tightened column.
pub fn build_nullability(ctx: &BuildContext<'_>) -> Vec<Opportunity> {
    ctx.decisions
        .nullability()
        .values()
        .filter(|d| d.make_not_null)
        .filter_map(|decision| nullability_opportunity(ctx, decision))
        .collect()
}

fn nullability_opportunity(
    ctx: &BuildContext<'_>,
    decision: &NullabilityDecision,
) -> Option<Opportunity> {
    let coordinate = &decision.column;
    let entry = ctx.index.attribute(coordinate)?;
    let module = module_label(entry.module, &ctx.options.emission);
    let profile = ctx.index.column_profile(coordinate);
    let table = sql::table_reference(
        &entry.entity.schema,
        &entry.entity.physical_name,
        &ctx.options.emission,
    );
    let sql_type = entry.attribute.resolved_sql_type();

    let mut evidence = Vec::new();
    match profile {
        Some(profile) => {
            evidence.push(format!("Rows={}", profile.row_count));
            evidence.push(status_evidence(
                "Nulls",
                profile.null_count,
                &profile.null_count_status,
            ));
            evidence.extend(sample_evidence("Null row", profile.null_row_sample.as_ref()));
        }
        None => evidence.push("No profiling evidence for column.".to_string()),
    }

    let mut remediation_statements = Vec::new();
    if decision.requires_remediation {
        let default = entry
            .attribute
            .default_definition()
            .or_else(|| profile.and_then(|p| p.default_definition.as_deref()));
        let plan = ctx
            .planner()
            .plan_backfill(&table, &entry.attribute.column_name, sql_type, default);
        remediation_statements = plan.statements;
        evidence.extend(plan.notes);
    }

    let metrics = OpportunityMetrics::new(decision.requires_remediation, profile.is_some())
        .with_data_is_clean(profile.map(|p| p.null_count == 0))
        .with_orphans(ctx.index.foreign_key(coordinate).map(|r| r.shows_orphans()));

    Some(Opportunity {
        constraint_type: ConstraintType::Nullability,
        risk: RiskLevel::from_remediation(decision.requires_remediation),
        schema: entry.entity.schema.clone(),
        table: entry.entity.physical_name.clone(),
        name: entry.attribute.column_name.clone(),
        module: module.clone(),
        statements: vec![sql::alter_column_not_null(
            &table,
            &entry.attribute.column_name,
            sql_type,
        )],
        remediation_statements,
        rationales: decision.rationales.clone(),
        evidence,
        metrics,
        columns: vec![ColumnAnalysis::collect(coordinate, entry, ctx.index, module)],
    })
}

/// `CREATE UNIQUE NONCLUSTERED INDEX` for every enforced index.
pub fn build_unique_indexes(ctx: &BuildContext<'_>) -> Vec<Opportunity> {
    ctx.decisions
        .unique_indexes()
        .values()
        .filter(|d| d.enforce_unique)
        .filter_map(|decision| unique_opportunity(ctx, decision))
        .collect()
}

fn unique_opportunity(
    ctx: &BuildContext<'_>,
    decision: &UniqueIndexDecision,
) -> Option<Opportunity> {
    let entry = ctx.index.unique_index(&decision.index)?;
    let entity = entry.entity;
    let module = module_label(entry.module, &ctx.options.emission);
    let table = sql::table_reference(&entity.schema, &entity.physical_name, &ctx.options.emission);
    let key_columns = entry.index.key_columns();
    if key_columns.is_empty() {
        return None;
    }
    let names: Vec<&str> = key_columns.iter().map(|c| c.column.as_str()).collect();
    let keys: Vec<(&str, SortDirection)> = key_columns
        .iter()
        .map(|c| (c.column.as_str(), c.direction))
        .collect();

    let columns: Vec<ColumnAnalysis> = key_columns
        .iter()
        .filter_map(|c| {
            let coordinate = entity.column_coordinate(&c.column);
            ctx.index
                .attribute(&coordinate)
                .map(|attr| ColumnAnalysis::collect(&coordinate, attr, ctx.index, module.clone()))
        })
        .collect();

    let mut evidence = Vec::new();
    let mut has_duplicates = None;
    if columns.is_empty() {
        evidence.push("No key columns resolved for index.".to_string());
    } else if names.len() > 1 {
        match ctx
            .index
            .composite_candidate(&entity.schema, &entity.physical_name, &names)
        {
            Some(probe) => {
                evidence.push(format!(
                    "Composite duplicates={}",
                    sql::bool_literal(probe.has_duplicate)
                ));
                has_duplicates = Some(probe.has_duplicate);
            }
            None => evidence.push("No composite duplicate evidence for key.".to_string()),
        }
    } else {
        match ctx
            .index
            .unique_candidate(&entity.column_coordinate(names[0]))
        {
            Some(probe) => {
                evidence.push(status_evidence(
                    "Duplicates",
                    sql::bool_literal(probe.has_duplicate),
                    &probe.probe_status,
                ));
                has_duplicates = Some(probe.has_duplicate);
            }
            None => evidence.push("No duplicate evidence for column.".to_string()),
        }
    }

    let mut remediation_statements = Vec::new();
    if decision.requires_remediation {
        remediation_statements = ctx.planner().plan_deduplication(&table, &names).statements;
    }

    let metrics = OpportunityMetrics::new(decision.requires_remediation, has_duplicates.is_some())
        .with_duplicates(has_duplicates)
        .with_data_is_clean(has_duplicates.map(|d| !d));

    Some(Opportunity {
        constraint_type: ConstraintType::UniqueIndex,
        risk: RiskLevel::from_remediation(decision.requires_remediation),
        schema: entity.schema.clone(),
        table: entity.physical_name.clone(),
        name: entry.index.name.clone(),
        module,
        statements: vec![sql::create_unique_index(&entry.index.name, &table, &keys)],
        remediation_statements,
        rationales: decision.rationales.clone(),
        evidence,
        metrics,
        columns,
    })
}

/// `ADD CONSTRAINT ... FOREIGN KEY` plus `CHECK CONSTRAINT` for every
/// created constraint whose target resolves.
pub fn build_foreign_keys(ctx: &BuildContext<'_>) -> Vec<Opportunity> {
    ctx.decisions
        .foreign_keys()
        .values()
        .filter(|d| d.create_constraint)
        .filter_map(|decision| foreign_key_opportunity(ctx, decision))
        .collect()
}

fn foreign_key_opportunity(
    ctx: &BuildContext<'_>,
    decision: &ForeignKeyDecision,
) -> Option<Opportunity> {
    let coordinate = &decision.column;
    let entry = ctx.index.attribute(coordinate)?;
    let resolved = resolve_target(entry, ctx.index).ok()?;
    let source = entry.entity;
    let target = resolved.target.entity;
    let emission = &ctx.options.emission;
    let module = module_label(entry.module, emission);

    let table = sql::table_reference(&source.schema, &source.physical_name, emission);
    let target_table = sql::table_reference(&target.schema, &target.physical_name, emission);
    let column = entry.attribute.column_name.as_str();
    let target_columns: Vec<&str> = resolved
        .columns
        .iter()
        .map(|a| a.column_name.as_str())
        .collect();
    let name = sql::foreign_key_name(&source.physical_name, column, &target.physical_name);

    let reality = ctx.index.foreign_key(coordinate);
    let mut evidence = vec![format!(
        "References {} ({})",
        target_table,
        target_columns.join(", ")
    )];
    match reality {
        Some(reality) => {
            evidence.push(status_evidence("Orphans", reality.orphan_count, &reality.probe_status));
            evidence.extend(sample_evidence("Orphan row", reality.orphan_sample.as_ref()));
        }
        None => evidence.push("No orphan evidence for reference.".to_string()),
    }

    let has_orphans = reality.map(|r| r.shows_orphans());
    let metrics = OpportunityMetrics::new(has_orphans.unwrap_or(false), reality.is_some())
        .with_orphans(has_orphans)
        .with_data_is_clean(has_orphans.map(|o| !o));

    Some(Opportunity {
        constraint_type: ConstraintType::ForeignKey,
        risk: RiskLevel::SafeToApply,
        schema: source.schema.clone(),
        table: source.physical_name.clone(),
        name: name.clone(),
        module: module.clone(),
        statements: vec![
            sql::add_foreign_key(
                &table,
                &name,
                &[column],
                &target_table,
                &target_columns,
                decision.script_with_no_check,
            ),
            sql::check_constraint(&table, &name),
        ],
        remediation_statements: Vec::new(),
        rationales: decision.rationales.clone(),
        evidence,
        metrics,
        columns: vec![ColumnAnalysis::collect(coordinate, entry, ctx.index, module)],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evidence::{ColumnProfile, ProfileSnapshot};
    use crate::model::{AttributeModel, ColumnCoordinate, EntityModel, ModuleModel, SchemaModel};
    use crate::policy::{DecisionEngine, TighteningMode};
    use chrono::{TimeZone, Utc};

    fn model() -> SchemaModel {
        SchemaModel::new().with_module(
            ModuleModel::new("Sales").with_entity(
                EntityModel::new("Customer", "dbo", "Customer")
                    .with_attribute(AttributeModel::new("Id", "Identifier").identifier())
                    .with_attribute(AttributeModel::new("Email", "Text").with_external_type("varchar(200)"))
                    .with_attribute(AttributeModel::new("Blob", "BinaryData").with_external_type("varbinary(max)")),
            ),
        )
    }

    fn snapshot() -> ProfileSnapshot {
        let status = ProbeStatus::full_scan(Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap(), 1000);
        ProfileSnapshot::new()
            .with_column(ColumnProfile::new(
                &ColumnCoordinate::new("dbo", "Customer", "Email"),
                1000,
                5,
                status.clone(),
            ))
            .with_column(ColumnProfile::new(
                &ColumnCoordinate::new("dbo", "Customer", "Blob"),
                1000,
                1,
                status,
            ))
    }

    #[test]
    fn test_builder_table_covers_every_type_in_order() {
        let types: Vec<ConstraintType> = BUILDERS.iter().map(|(t, _)| *t).collect();
        assert_eq!(types, ConstraintType::ALL.to_vec());
    }

    #[test]
    fn test_builders_emit_only_their_type() {
        let model = model();
        let snapshot = snapshot();
        let index = EvidenceIndex::new(&model, &snapshot);
        let options = TighteningOptions::new().with_mode(TighteningMode::Aggressive);
        let decisions = DecisionEngine::new(options.clone())
            .unwrap()
            .decide(&index)
            .unwrap();
        let ctx = BuildContext {
            index: &index,
            decisions: &decisions,
            options: &options,
        };

        for constraint_type in ConstraintType::ALL {
            let built = builder_for(constraint_type)(&ctx);
            assert!(built.iter().all(|o| o.constraint_type == constraint_type));
        }
    }

    #[test]
    fn test_nullability_with_remediation_script() {
        let model = model();
        let snapshot = snapshot();
        let index = EvidenceIndex::new(&model, &snapshot);
        let options = TighteningOptions::new()
            .with_mode(TighteningMode::EvidenceGated)
            .with_null_budget(0.01);
        let decisions = DecisionEngine::new(options.clone())
            .unwrap()
            .decide(&index)
            .unwrap();
        let ctx = BuildContext {
            index: &index,
            decisions: &decisions,
            options: &options,
        };

        let opportunities = build_nullability(&ctx);
        assert_eq!(opportunities.len(), 2);

        let blob = &opportunities[0];
        assert_eq!(blob.name, "Blob");
        assert!(blob.remediation_statements.is_empty());
        assert!(blob
            .evidence
            .contains(&"No remediation literal for varbinary(max).".to_string()));

        let email = &opportunities[1];
        assert_eq!(email.risk, RiskLevel::NeedsRemediation);
        assert_eq!(
            email.statements,
            vec!["ALTER TABLE [dbo].[Customer] ALTER COLUMN [Email] varchar(200) NOT NULL;"]
        );
        assert_eq!(
            email.remediation_statements,
            vec!["UPDATE [dbo].[Customer] SET [Email] = '' WHERE [Email] IS NULL;"]
        );
        assert_eq!(email.evidence[0], "Rows=1000");
        assert_eq!(
            email.evidence[1],
            "Nulls=5 (Outcome=Succeeded, Sample=1000, Captured=2026-03-01T12:00:00Z)"
        );
        assert_eq!(email.columns.len(), 1);
        assert_eq!(email.columns[0].null_count, Some(5));
    }
}
