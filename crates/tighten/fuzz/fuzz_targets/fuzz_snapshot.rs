//! Fuzz target for snapshot loading and the full tightening run.
//!
//! This fuzzer tests that:
//! 1. Arbitrary JSON never panics the snapshot deserializer
//! 2. Any snapshot that does deserialize runs to completion
//! 3. Contradictory evidence is reported, not trusted

#![no_main]

use libfuzzer_sys::fuzz_target;
use tighten::evidence::ProfileSnapshot;
use tighten::model::{AttributeModel, AttributeReference, EntityModel, ModuleModel, SchemaModel};
use tighten::Tightener;

fn model() -> SchemaModel {
    SchemaModel::new().with_module(
        ModuleModel::new("Sales")
            .with_entity(
                EntityModel::new("Customer", "dbo", "Customer")
                    .with_attribute(AttributeModel::new("Id", "Identifier").identifier())
                    .with_attribute(AttributeModel::new("Email", "Text")),
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

fuzz_target!(|data: &[u8]| {
    let Ok(snapshot) = serde_json::from_slice::<ProfileSnapshot>(data) else {
        return;
    };

    let result = Tightener::new()
        .run(&model(), &snapshot)
        .expect("default options are valid");

    for (coordinate, decision) in result.decisions.nullability() {
        let mut profiles = snapshot
            .columns
            .iter()
            .filter(|p| p.coordinate() == *coordinate)
            .peekable();
        if profiles.peek().is_some() && profiles.all(|p| p.null_count > p.row_count) {
            assert!(!decision.make_not_null);
        }
    }

    let _ = result.report.script();
});
