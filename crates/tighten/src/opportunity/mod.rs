//! Opportunities: reviewer-facing records carrying literal DDL, evidence
//! strings and per-column audit facts for every positive decision.

mod builders;
mod report;
pub mod sql;
mod types;

pub use builders::{
    build_foreign_keys, build_nullability, build_unique_indexes, builder_for, BuildContext,
    BuilderFn, BUILDERS,
};
pub use report::{analyze, OpportunitiesReport, OpportunityAggregator};
pub(crate) use report::load_json;
pub use types::{
    ColumnAnalysis, ConstraintType, Opportunity, OpportunityMetrics, RiskLevel, TriState,
};
