//! Machine-readable reasons attached to every decision.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::options::TighteningMode;

/// Why a decision came out the way it did.
///
/// Codes are appended in a fixed order: evidence, then budget, then mode,
/// then cross-checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RationaleCode {
    // Evidence
    /// No profiling evidence exists for the coordinate.
    ProfileMissing,
    /// Evidence comes from a completed full scan.
    EvidenceHighConfidence,
    /// Evidence comes from a sampled, partial, skipped or failed probe.
    EvidenceLowConfidence,
    /// The profile reports more NULL rows than rows.
    EvidenceInconsistent,
    DataHasNoNulls,
    DataHasNulls,
    DuplicatesAbsent,
    DuplicatesPresent,
    /// Single-column duplicate probe consulted.
    SingleColumnProbe,
    /// Whole-key duplicate probe consulted.
    CompositeProbe,
    NoKeyColumns,
    OrphansAbsent,
    OrphansPresent,

    // Budget
    WithinNullBudget,
    ExceedsNullBudget,

    // Mode
    ModeCautious,
    ModeEvidenceGated,
    ModeAggressive,
    /// Aggressive mode proceeded without trustworthy evidence.
    OptimisticWithoutEvidence,

    // Cross-checks
    /// The column references another entity whose probe found orphans.
    ForeignKeyOrphansPresent,
    /// Backfill would touch more rows than allowed.
    RemediationRowLimitExceeded,
    DefaultValueAvailable,
    UniqueEnforcementDisabled,
    ForeignKeyCreationDisabled,
    CrossSchemaBlocked,
    CrossCatalogBlocked,
    TargetResolved,
    DatabaseConstraintPresent,
    /// The existing constraint is not trusted by the database.
    DatabaseConstraintUntrusted,
    /// The constraint will be scripted WITH NOCHECK.
    NoCheckScripted,
    RemediationRequired,
}

impl RationaleCode {
    /// Get a human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            RationaleCode::ProfileMissing => "No profiling evidence",
            RationaleCode::EvidenceHighConfidence => "Full-scan evidence",
            RationaleCode::EvidenceLowConfidence => "Low-confidence evidence",
            RationaleCode::EvidenceInconsistent => "Inconsistent evidence",
            RationaleCode::DataHasNoNulls => "No NULL rows observed",
            RationaleCode::DataHasNulls => "NULL rows observed",
            RationaleCode::DuplicatesAbsent => "No duplicates observed",
            RationaleCode::DuplicatesPresent => "Duplicates observed",
            RationaleCode::SingleColumnProbe => "Single-column duplicate probe",
            RationaleCode::CompositeProbe => "Composite duplicate probe",
            RationaleCode::NoKeyColumns => "Index has no key columns",
            RationaleCode::OrphansAbsent => "No orphan rows observed",
            RationaleCode::OrphansPresent => "Orphan rows observed",
            RationaleCode::WithinNullBudget => "Within null budget",
            RationaleCode::ExceedsNullBudget => "Exceeds null budget",
            RationaleCode::ModeCautious => "Cautious mode",
            RationaleCode::ModeEvidenceGated => "Evidence-gated mode",
            RationaleCode::ModeAggressive => "Aggressive mode",
            RationaleCode::OptimisticWithoutEvidence => "Proceeding without trustworthy evidence",
            RationaleCode::ForeignKeyOrphansPresent => "Referenced rows are missing",
            RationaleCode::RemediationRowLimitExceeded => "Backfill row limit exceeded",
            RationaleCode::DefaultValueAvailable => "Column default available",
            RationaleCode::UniqueEnforcementDisabled => "Unique enforcement disabled",
            RationaleCode::ForeignKeyCreationDisabled => "Foreign-key creation disabled",
            RationaleCode::CrossSchemaBlocked => "Cross-schema reference blocked",
            RationaleCode::CrossCatalogBlocked => "Cross-catalog reference blocked",
            RationaleCode::TargetResolved => "Reference target resolved",
            RationaleCode::DatabaseConstraintPresent => "Database constraint present",
            RationaleCode::DatabaseConstraintUntrusted => "Database constraint not trusted",
            RationaleCode::NoCheckScripted => "Scripted WITH NOCHECK",
            RationaleCode::RemediationRequired => "Remediation required",
        }
    }

    /// The code recording which mode produced a decision.
    pub fn for_mode(mode: TighteningMode) -> Self {
        match mode {
            TighteningMode::Cautious => RationaleCode::ModeCautious,
            TighteningMode::EvidenceGated => RationaleCode::ModeEvidenceGated,
            TighteningMode::Aggressive => RationaleCode::ModeAggressive,
        }
    }

    /// Whether the code blocks an otherwise acceptable change.
    pub fn is_blocking(&self) -> bool {
        matches!(
            self,
            RationaleCode::EvidenceInconsistent
                | RationaleCode::ExceedsNullBudget
                | RationaleCode::ForeignKeyOrphansPresent
                | RationaleCode::RemediationRowLimitExceeded
                | RationaleCode::UniqueEnforcementDisabled
                | RationaleCode::ForeignKeyCreationDisabled
                | RationaleCode::CrossSchemaBlocked
                | RationaleCode::CrossCatalogBlocked
        )
    }
}

impl fmt::Display for RationaleCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
