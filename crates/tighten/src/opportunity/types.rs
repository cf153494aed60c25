//! Opportunity records emitted for reviewers.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::evidence::{AttributeEntry, EvidenceIndex, ProbeStatus};
use crate::model::{eq_ignore_case, ColumnCoordinate};
use crate::policy::{has_database_constraint, RationaleCode};

/// Kind of constraint an opportunity proposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintType {
    Nullability,
    UniqueIndex,
    ForeignKey,
}

impl ConstraintType {
    /// Every variant, in report order.
    pub const ALL: [ConstraintType; 3] = [
        ConstraintType::Nullability,
        ConstraintType::UniqueIndex,
        ConstraintType::ForeignKey,
    ];

    /// Get a human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            ConstraintType::Nullability => "Nullability",
            ConstraintType::UniqueIndex => "Unique Index",
            ConstraintType::ForeignKey => "Foreign Key",
        }
    }
}

impl fmt::Display for ConstraintType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// How risky an opportunity is to apply as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    SafeToApply,
    /// Existing rows violate the constraint; fix data first.
    NeedsRemediation,
}

impl RiskLevel {
    pub const ALL: [RiskLevel; 2] = [RiskLevel::SafeToApply, RiskLevel::NeedsRemediation];

    /// Get a human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            RiskLevel::SafeToApply => "Safe to apply",
            RiskLevel::NeedsRemediation => "Needs remediation",
        }
    }

    pub fn from_remediation(requires_remediation: bool) -> Self {
        if requires_remediation {
            RiskLevel::NeedsRemediation
        } else {
            RiskLevel::SafeToApply
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A boolean fact that may not have been measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriState {
    True,
    False,
    #[default]
    Unknown,
}

impl TriState {
    pub fn is_true(&self) -> bool {
        matches!(self, TriState::True)
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, TriState::Unknown)
    }

    /// Logical negation; unknown stays unknown.
    pub fn negate(self) -> Self {
        match self {
            TriState::True => TriState::False,
            TriState::False => TriState::True,
            TriState::Unknown => TriState::Unknown,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TriState::True => "True",
            TriState::False => "False",
            TriState::Unknown => "Unknown",
        }
    }
}

impl From<Option<bool>> for TriState {
    fn from(value: Option<bool>) -> Self {
        match value {
            Some(true) => TriState::True,
            Some(false) => TriState::False,
            None => TriState::Unknown,
        }
    }
}

impl From<bool> for TriState {
    fn from(value: bool) -> Self {
        Some(value).into()
    }
}

/// Summary flags for an opportunity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpportunityMetrics {
    pub requires_remediation: bool,
    pub evidence_available: bool,
    pub data_is_clean: TriState,
    pub has_duplicates: TriState,
    pub has_orphans: TriState,
}

impl OpportunityMetrics {
    pub fn new(requires_remediation: bool, evidence_available: bool) -> Self {
        Self {
            requires_remediation,
            evidence_available,
            data_is_clean: TriState::Unknown,
            has_duplicates: TriState::Unknown,
            has_orphans: TriState::Unknown,
        }
    }

    pub fn with_data_is_clean(mut self, value: impl Into<TriState>) -> Self {
        self.data_is_clean = value.into();
        self
    }

    pub fn with_duplicates(mut self, value: impl Into<TriState>) -> Self {
        self.has_duplicates = value.into();
        self
    }

    pub fn with_orphans(mut self, value: impl Into<TriState>) -> Self {
        self.has_orphans = value.into();
        self
    }
}

/// Model facts and evidence facts for one column, joined for audit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnAnalysis {
    pub column: ColumnCoordinate,
    pub module: String,
    pub entity: String,
    pub attribute: String,
    /// Declared logical type.
    pub data_type: String,
    /// Physical type the DDL uses.
    pub sql_type: String,
    pub is_nullable: bool,
    pub is_unique: bool,
    pub is_identity: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub row_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub null_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub null_count_status: Option<ProbeStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_duplicate: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duplicate_status: Option<ProbeStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_orphan: Option<bool>,
    pub has_database_constraint: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delete_rule: Option<String>,
}

impl ColumnAnalysis {
    /// Join an attribute's model facts with whatever evidence exists for it.
    pub fn collect(
        coordinate: &ColumnCoordinate,
        entry: &AttributeEntry<'_>,
        index: &EvidenceIndex<'_>,
        module: impl Into<String>,
    ) -> Self {
        let attribute = entry.attribute;
        let profile = index.column_profile(coordinate);
        let unique = index.unique_candidate(coordinate);
        let reality = index.foreign_key(coordinate);

        let single_column_unique = entry.entity.indexes.iter().any(|ix| {
            ix.is_unique && {
                let keys = ix.key_columns();
                keys.len() == 1 && eq_ignore_case(&coordinate.column, &keys[0].column)
            }
        });
        let delete_rule = attribute
            .reference
            .as_ref()
            .and_then(|r| r.delete_rule.clone())
            .or_else(|| {
                entry
                    .entity
                    .relationship_for(&attribute.logical_name)
                    .and_then(|r| r.delete_rule.clone())
            });

        Self {
            column: coordinate.clone(),
            module: module.into(),
            entity: entry.entity.logical_name.clone(),
            attribute: attribute.logical_name.clone(),
            data_type: attribute.data_type.clone(),
            sql_type: attribute.resolved_sql_type().to_string(),
            is_nullable: profile
                .map(|p| p.is_nullable_physical)
                .unwrap_or_else(|| attribute.is_physically_nullable()),
            is_unique: single_column_unique || profile.is_some_and(|p| p.is_unique_key),
            is_identity: attribute.is_identity(),
            row_count: profile.map(|p| p.row_count),
            null_count: profile.map(|p| p.null_count),
            null_count_status: profile.map(|p| p.null_count_status.clone()),
            has_duplicate: unique.map(|u| u.has_duplicate),
            duplicate_status: unique.map(|u| u.probe_status.clone()),
            has_orphan: reality.map(|r| r.shows_orphans()),
            has_database_constraint: has_database_constraint(entry)
                || reality.is_some_and(|r| r.reference.has_database_constraint),
            delete_rule,
        }
    }
}

/// One proposed constraint change, ready for review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Opportunity {
    pub constraint_type: ConstraintType,
    pub risk: RiskLevel,
    pub schema: String,
    pub table: String,
    /// Column, index or constraint name.
    pub name: String,
    /// Module owning the table.
    pub module: String,
    /// DDL to run, in order.
    pub statements: Vec<String>,
    /// Data fixes to run before the DDL.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub remediation_statements: Vec<String>,
    pub rationales: Vec<RationaleCode>,
    pub evidence: Vec<String>,
    pub metrics: OpportunityMetrics,
    pub columns: Vec<ColumnAnalysis>,
}

impl Opportunity {
    /// Whether this opportunity can be applied without touching data first.
    pub fn is_safe(&self) -> bool {
        self.risk == RiskLevel::SafeToApply
    }

    /// Full DDL script: remediation first, then constraint statements.
    pub fn script(&self) -> String {
        self.remediation_statements
            .iter()
            .chain(self.statements.iter())
            .cloned()
            .collect::<Vec<_>>()
            .join("\n")
    }
}
