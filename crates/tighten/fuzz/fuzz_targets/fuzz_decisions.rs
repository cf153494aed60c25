//! Fuzz target for decision monotonicity.
//!
//! Builds a structured evidence pair from fuzzer input where the second
//! snapshot is never dirtier than the first, and checks that no decision
//! becomes more cautious.

#![no_main]

use arbitrary::Arbitrary;
use chrono::{TimeZone, Utc};
use libfuzzer_sys::fuzz_target;
use tighten::evidence::{
    ColumnProfile, ForeignKeyReality, ForeignKeyReference, ProbeOutcome, ProbeStatus,
    ProfileSnapshot,
};
use tighten::model::{
    AttributeModel, AttributeReference, ColumnCoordinate, EntityModel, ModuleModel, SchemaModel,
};
use tighten::{Tightener, TighteningMode, TighteningOptions};

#[derive(Debug, Arbitrary)]
struct Input {
    rows: u32,
    nulls: u32,
    cleaned_nulls: u32,
    orphans: u16,
    cleaned_orphans: u16,
    mode: u8,
    outcome: u8,
    budget_permille: u16,
}

fn model() -> SchemaModel {
    SchemaModel::new().with_module(
        ModuleModel::new("Sales")
            .with_entity(
                EntityModel::new("Customer", "dbo", "Customer")
                    .with_attribute(AttributeModel::new("Id", "Identifier").identifier()),
            )
            .with_entity(
                EntityModel::new("Order", "dbo", "Order")
                    .with_attribute(AttributeModel::new("Id", "Identifier").identifier())
                    .with_attribute(
                        AttributeModel::new("CustomerId", "Identifier")
                            .with_reference(AttributeReference::new("Customer")),
                    ),
            ),
    )
}

fn source() -> ColumnCoordinate {
    ColumnCoordinate::new("dbo", "Order", "CustomerId")
}

fn snapshot(rows: u64, nulls: u64, orphans: u64, outcome: ProbeOutcome) -> ProfileSnapshot {
    let status = ProbeStatus::new(Utc.timestamp_opt(0, 0).unwrap(), rows, outcome);
    ProfileSnapshot::new()
        .with_column(ColumnProfile::new(&source(), rows, nulls, status.clone()))
        .with_foreign_key(ForeignKeyReality::new(
            ForeignKeyReference::new(&source(), &ColumnCoordinate::new("dbo", "Customer", "Id")),
            orphans,
            status,
        ))
}

fuzz_target!(|input: Input| {
    let mode = match input.mode % 3 {
        0 => TighteningMode::Cautious,
        1 => TighteningMode::EvidenceGated,
        _ => TighteningMode::Aggressive,
    };
    let outcome = match input.outcome % 5 {
        0 => ProbeOutcome::Succeeded,
        1 => ProbeOutcome::Sampled,
        2 => ProbeOutcome::Partial,
        3 => ProbeOutcome::Skipped,
        _ => ProbeOutcome::Failed,
    };
    let options = TighteningOptions::new()
        .with_mode(mode)
        .with_null_budget((input.budget_permille % 1001) as f64 / 1000.0);

    let rows = input.rows as u64;
    let nulls = (input.nulls as u64).min(rows);
    let cleaned_nulls = (input.cleaned_nulls as u64).min(nulls);
    let orphans = input.orphans as u64;
    let cleaned_orphans = (input.cleaned_orphans as u64).min(orphans);

    let tightener = Tightener::with_options(options);
    let model = model();
    let before = tightener
        .decide(&model, &snapshot(rows, nulls, orphans, outcome))
        .expect("options are valid");
    let after = tightener
        .decide(&model, &snapshot(rows, cleaned_nulls, cleaned_orphans, outcome))
        .expect("options are valid");

    let (b, a) = (&before.nullability()[&source()], &after.nullability()[&source()]);
    assert!(!(b.make_not_null && !a.make_not_null));
    assert!(!(!b.requires_remediation && a.requires_remediation));

    let (b, a) = (&before.foreign_keys()[&source()], &after.foreign_keys()[&source()]);
    assert!(!(!b.script_with_no_check && a.script_with_no_check));
});
