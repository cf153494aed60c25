//! Tightening pipeline performance benchmarks.
//!
//! Measures evidence indexing, decision making and report building over
//! generated models of increasing size.

use chrono::{TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use tighten::evidence::{
    ColumnProfile, EvidenceIndex, ForeignKeyReality, ForeignKeyReference, ProbeOutcome,
    ProbeStatus, ProfileSnapshot, UniqueCandidateProfile,
};
use tighten::model::{
    AttributeModel, AttributeReference, ColumnCoordinate, EntityModel, IndexColumnModel,
    IndexModel, ModuleModel, SchemaModel,
};
use tighten::{DecisionEngine, OpportunityAggregator, Tightener, TighteningMode, TighteningOptions};

/// Generate a model of `entities` tables, each with a reference to the
/// previous table and a unique index on its code column.
fn generate_model(entities: usize) -> SchemaModel {
    let mut module = ModuleModel::new("Bench");
    for e in 0..entities {
        let name = format!("Entity{:04}", e);
        let mut entity = EntityModel::new(&name, "dbo", &name)
            .with_attribute(AttributeModel::new("Id", "Identifier").identifier())
            .with_attribute(AttributeModel::new("Code", "Text").with_external_type("nvarchar(50)"))
            .with_attribute(AttributeModel::new("Amount", "Decimal").with_external_type("decimal(18,2)"))
            .with_attribute(AttributeModel::new("CreatedOn", "DateTime").with_external_type("datetime2"))
            .with_index(IndexModel::unique(
                format!("UX_{}_Code", name),
                vec![IndexColumnModel::key("Code", 1)],
            ));
        if e > 0 {
            entity = entity.with_attribute(
                AttributeModel::new("ParentId", "Identifier")
                    .with_external_type("bigint")
                    .with_reference(AttributeReference::new(format!("Entity{:04}", e - 1))),
            );
        }
        module = module.with_entity(entity);
    }
    SchemaModel::new().with_module(module)
}

/// Generate evidence for every generated column, with a spread of null
/// counts, probe outcomes, duplicates and orphans.
fn generate_snapshot(entities: usize) -> ProfileSnapshot {
    let captured = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
    let outcomes = [
        ProbeOutcome::Succeeded,
        ProbeOutcome::Succeeded,
        ProbeOutcome::Sampled,
        ProbeOutcome::Partial,
    ];
    let mut snapshot = ProfileSnapshot::new();

    for e in 0..entities {
        let table = format!("Entity{:04}", e);
        let status = ProbeStatus::new(captured, 10_000, outcomes[e % outcomes.len()]);
        for (c, column) in ["Code", "Amount", "CreatedOn"].iter().enumerate() {
            let nulls = ((e + c) % 7) as u64 * 3;
            snapshot = snapshot.with_column(ColumnProfile::new(
                &ColumnCoordinate::new("dbo", &table, *column),
                10_000,
                nulls,
                status.clone(),
            ));
        }
        snapshot = snapshot.with_unique_candidate(UniqueCandidateProfile::new(
            &ColumnCoordinate::new("dbo", &table, "Code"),
            e % 5 == 0,
            status.clone(),
        ));
        if e > 0 {
            snapshot = snapshot.with_foreign_key(ForeignKeyReality::new(
                ForeignKeyReference::new(
                    &ColumnCoordinate::new("dbo", &table, "ParentId"),
                    &ColumnCoordinate::new("dbo", format!("Entity{:04}", e - 1), "Id"),
                ),
                (e % 4) as u64,
                status,
            ));
        }
    }
    snapshot
}

fn options() -> TighteningOptions {
    TighteningOptions::new()
        .with_mode(TighteningMode::EvidenceGated)
        .with_null_budget(0.001)
}

/// Benchmark the full run: index, decide, build.
fn bench_full_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("full_pipeline");
    let at = Utc.with_ymd_and_hms(2026, 4, 1, 0, 0, 0).unwrap();

    for entities in [10, 100, 500].iter() {
        let model = generate_model(*entities);
        let snapshot = generate_snapshot(*entities);
        let tightener = Tightener::with_options(options());

        group.throughput(Throughput::Elements(model.attribute_count() as u64));
        group.bench_with_input(
            BenchmarkId::new("entities", entities),
            &(model, snapshot),
            |b, (model, snapshot)| b.iter(|| black_box(tightener.run_at(model, snapshot, at).unwrap())),
        );
    }

    group.finish();
}

/// Benchmark building the evidence index alone.
fn bench_evidence_index(c: &mut Criterion) {
    let mut group = c.benchmark_group("evidence_index");

    for entities in [100, 1000].iter() {
        let model = generate_model(*entities);
        let snapshot = generate_snapshot(*entities);

        group.throughput(Throughput::Elements(snapshot.columns.len() as u64));
        group.bench_with_input(
            BenchmarkId::new("entities", entities),
            &(model, snapshot),
            |b, (model, snapshot)| b.iter(|| black_box(EvidenceIndex::new(model, snapshot))),
        );
    }

    group.finish();
}

/// Compare serial and parallel decision making.
fn bench_decide_parallelism(c: &mut Criterion) {
    let mut group = c.benchmark_group("decide_parallelism");
    let model = generate_model(1000);
    let snapshot = generate_snapshot(1000);
    let index = EvidenceIndex::new(&model, &snapshot);

    for workers in [1, 2, 4].iter() {
        let engine = DecisionEngine::new(options().with_max_parallelism(*workers)).unwrap();
        group.bench_with_input(BenchmarkId::new("workers", workers), &engine, |b, engine| {
            b.iter(|| black_box(engine.decide(&index).unwrap()))
        });
    }

    group.finish();
}

/// Benchmark report building from a fixed decision set.
fn bench_report_building(c: &mut Criterion) {
    let mut group = c.benchmark_group("report_building");
    let model = generate_model(500);
    let snapshot = generate_snapshot(500);
    let options = options();
    let index = EvidenceIndex::new(&model, &snapshot);
    let decisions = DecisionEngine::new(options.clone())
        .unwrap()
        .decide(&index)
        .unwrap();
    let at = Utc.with_ymd_and_hms(2026, 4, 1, 0, 0, 0).unwrap();

    group.bench_function("build_500_entities", |b| {
        b.iter(|| black_box(OpportunityAggregator::new(&index, &decisions, &options).build_at(at)))
    });
    group.bench_function("to_json_500_entities", |b| {
        let report = OpportunityAggregator::new(&index, &decisions, &options).build_at(at);
        b.iter(|| black_box(report.to_json().unwrap()))
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_full_pipeline,
    bench_evidence_index,
    bench_report_building,
);

// Parallelism comparisons run separately due to longer execution time
criterion_group!(
    name = parallel_benches;
    config = Criterion::default().sample_size(20);
    targets = bench_decide_parallelism
);

criterion_main!(benches, parallel_benches);
