//! Tighten: evidence-gated schema constraint tightening.
//!
//! Tighten joins a structural model of a legacy schema with profiling
//! evidence and decides, per column, index and reference, whether a
//! stricter physical constraint (NOT NULL, UNIQUE, FOREIGN KEY) can be
//! applied. Positive decisions become reviewer-facing opportunities with
//! literal T-SQL and an audit trail.
//!
//! # Core Principles
//!
//! - **Evidence-gated**: every decision cites the evidence it was based on
//! - **Deterministic**: equal inputs produce byte-identical output
//! - **Non-destructive**: only emits scripts, never touches a database
//!
//! # Example
//!
//! ```no_run
//! use tighten::{ProfileSnapshot, SchemaModel, Tightener, TighteningMode, TighteningOptions};
//!
//! # fn example(model: SchemaModel, snapshot: ProfileSnapshot) -> tighten::Result<()> {
//! let options = TighteningOptions::new().with_mode(TighteningMode::EvidenceGated);
//! let result = Tightener::with_options(options).run(&model, &snapshot)?;
//!
//! for opportunity in &result.report.opportunities {
//!     println!("{}", opportunity.script());
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod evidence;
pub mod model;
pub mod opportunity;
pub mod policy;
pub mod remediation;

mod tightening;

pub use crate::tightening::{Tightener, TighteningResult, TighteningSummary};
pub use config::{ConfigSource, OptionOverrides, OptionsLoader, ResolvedOptions};
pub use error::{InvalidInputKind, Result, TightenError};
pub use evidence::{EvidenceIndex, ProbeOutcome, ProbeStatus, ProfileSnapshot};
pub use model::{ColumnCoordinate, IndexCoordinate, SchemaModel};
pub use opportunity::{
    analyze, ConstraintType, OpportunitiesReport, Opportunity, OpportunityAggregator, RiskLevel,
    TriState,
};
pub use policy::{
    decide, DecisionEngine, Diagnostic, DiagnosticCode, PolicyDecisionSet, RationaleCode,
    TighteningMode, TighteningOptions,
};
