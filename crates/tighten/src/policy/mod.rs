//! Tightening policy: options, decision records and the engine that
//! turns evidence into decisions.
//!
//! Each candidate coordinate gets exactly one decision. Nullability
//! candidates are active, physically nullable, non-key, non-computed
//! columns. Unique index candidates are unique, non-primary indexes.
//! Foreign-key candidates are active reference attributes whose target
//! resolves.

mod decision;
mod engine;
mod foreign_key;
mod nullability;
mod options;
mod rationale;
mod unique;

pub use decision::{
    Diagnostic, DiagnosticCode, ForeignKeyDecision, NullabilityDecision, PolicyDecisionSet,
    PolicyDecisionSetBuilder, UniqueIndexDecision,
};
pub use engine::{decide, module_label, DecisionEngine};
pub use foreign_key::{resolve_target, ResolvedTarget, TargetFailure};
pub(crate) use foreign_key::has_database_constraint;
pub use options::{
    EmissionOptions, ForeignKeyOptions, RemediationOptions, SentinelOptions, TighteningMode,
    TighteningOptions, UniquenessOptions,
};
pub use rationale::RationaleCode;
