//! Decision records and the frozen decision set.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::model::{ColumnCoordinate, IndexCoordinate};

use super::rationale::RationaleCode;

/// Whether to add NOT NULL to a column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NullabilityDecision {
    pub column: ColumnCoordinate,
    pub make_not_null: bool,
    /// Rows currently violate NOT NULL (or are assumed to).
    pub requires_remediation: bool,
    pub rationales: Vec<RationaleCode>,
}

impl NullabilityDecision {
    pub fn new(
        column: ColumnCoordinate,
        make_not_null: bool,
        requires_remediation: bool,
        rationales: Vec<RationaleCode>,
    ) -> Self {
        Self {
            column,
            make_not_null,
            requires_remediation,
            rationales,
        }
    }

    pub fn has_rationale(&self, code: RationaleCode) -> bool {
        self.rationales.contains(&code)
    }
}

/// Whether to enforce a unique index physically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UniqueIndexDecision {
    pub index: IndexCoordinate,
    pub enforce_unique: bool,
    pub requires_remediation: bool,
    pub rationales: Vec<RationaleCode>,
}

impl UniqueIndexDecision {
    pub fn new(
        index: IndexCoordinate,
        enforce_unique: bool,
        requires_remediation: bool,
        rationales: Vec<RationaleCode>,
    ) -> Self {
        Self {
            index,
            enforce_unique,
            requires_remediation,
            rationales,
        }
    }

    pub fn has_rationale(&self, code: RationaleCode) -> bool {
        self.rationales.contains(&code)
    }
}

/// Whether to create a foreign-key constraint for a reference column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKeyDecision {
    pub column: ColumnCoordinate,
    pub create_constraint: bool,
    /// Script the constraint WITH NOCHECK.
    pub script_with_no_check: bool,
    pub rationales: Vec<RationaleCode>,
}

impl ForeignKeyDecision {
    pub fn new(
        column: ColumnCoordinate,
        create_constraint: bool,
        script_with_no_check: bool,
        rationales: Vec<RationaleCode>,
    ) -> Self {
        Self {
            column,
            create_constraint,
            script_with_no_check,
            rationales,
        }
    }

    pub fn has_rationale(&self, code: RationaleCode) -> bool {
        self.rationales.contains(&code)
    }
}

/// Kind of problem found while deciding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticCode {
    /// A reference names no active entity.
    UnresolvedReferenceTarget,
    /// A reference target has no column to point at.
    UnresolvedReferenceColumn,
    /// A reference target name matches several entities.
    AmbiguousReferenceTarget,
    /// A column profile reports more NULL rows than rows.
    InconsistentEvidence,
    /// Two model attributes map to the same physical column.
    DuplicateModelCoordinate,
    /// The snapshot reports the same column twice.
    DuplicateEvidenceRow,
}

impl DiagnosticCode {
    /// Get a human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            DiagnosticCode::UnresolvedReferenceTarget => "Unresolved reference target",
            DiagnosticCode::UnresolvedReferenceColumn => "Unresolved reference column",
            DiagnosticCode::AmbiguousReferenceTarget => "Ambiguous reference target",
            DiagnosticCode::InconsistentEvidence => "Inconsistent evidence",
            DiagnosticCode::DuplicateModelCoordinate => "Duplicate model coordinate",
            DiagnosticCode::DuplicateEvidenceRow => "Duplicate evidence row",
        }
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A non-fatal problem surfaced alongside the decisions.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Diagnostic {
    pub code: DiagnosticCode,
    /// What the diagnostic is about, usually a coordinate.
    pub subject: String,
    pub message: String,
}

impl Diagnostic {
    pub fn new(
        code: DiagnosticCode,
        subject: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            code,
            subject: subject.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.code.label(), self.subject, self.message)
    }
}

/// Decision records that can be keyed by their own coordinate.
pub(crate) trait Keyed {
    type Key: Ord + Clone;

    fn key(&self) -> &Self::Key;
}

impl Keyed for NullabilityDecision {
    type Key = ColumnCoordinate;

    fn key(&self) -> &ColumnCoordinate {
        &self.column
    }
}

impl Keyed for UniqueIndexDecision {
    type Key = IndexCoordinate;

    fn key(&self) -> &IndexCoordinate {
        &self.index
    }
}

impl Keyed for ForeignKeyDecision {
    type Key = ColumnCoordinate;

    fn key(&self) -> &ColumnCoordinate {
        &self.column
    }
}

/// Serialize a coordinate-keyed map as the list of its values. Values
/// carry their own coordinate.
mod keyed_values {
    use std::collections::BTreeMap;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use super::Keyed;

    pub fn serialize<S, V>(map: &BTreeMap<V::Key, V>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
        V: Keyed + Serialize,
    {
        serializer.collect_seq(map.values())
    }

    pub fn deserialize<'de, D, V>(deserializer: D) -> Result<BTreeMap<V::Key, V>, D::Error>
    where
        D: Deserializer<'de>,
        V: Keyed + Deserialize<'de>,
    {
        let values = Vec::<V>::deserialize(deserializer)?;
        Ok(values.into_iter().map(|v| (v.key().clone(), v)).collect())
    }
}

/// Serialize a map with structured keys as a list of `[key, value]` pairs.
mod entries {
    use std::collections::BTreeMap;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S, K, V>(map: &BTreeMap<K, V>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
        K: Serialize,
        V: Serialize,
    {
        serializer.collect_seq(map.iter())
    }

    pub fn deserialize<'de, D, K, V>(deserializer: D) -> Result<BTreeMap<K, V>, D::Error>
    where
        D: Deserializer<'de>,
        K: Deserialize<'de> + Ord,
        V: Deserialize<'de>,
    {
        let pairs = Vec::<(K, V)>::deserialize(deserializer)?;
        Ok(pairs.into_iter().collect())
    }
}

/// The complete, read-only result of one decision run.
///
/// Maps are keyed case-insensitively and iterate in coordinate order, so
/// two runs over equal inputs serialize identically.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PolicyDecisionSet {
    #[serde(with = "keyed_values")]
    nullability: BTreeMap<ColumnCoordinate, NullabilityDecision>,
    #[serde(with = "keyed_values")]
    foreign_keys: BTreeMap<ColumnCoordinate, ForeignKeyDecision>,
    #[serde(with = "keyed_values")]
    unique_indexes: BTreeMap<IndexCoordinate, UniqueIndexDecision>,
    diagnostics: Vec<Diagnostic>,
    #[serde(with = "entries")]
    column_modules: BTreeMap<ColumnCoordinate, String>,
    #[serde(with = "entries")]
    index_modules: BTreeMap<IndexCoordinate, String>,
}

impl PolicyDecisionSet {
    /// Start building a decision set.
    pub fn builder() -> PolicyDecisionSetBuilder {
        PolicyDecisionSetBuilder::default()
    }

    pub fn nullability(&self) -> &BTreeMap<ColumnCoordinate, NullabilityDecision> {
        &self.nullability
    }

    pub fn foreign_keys(&self) -> &BTreeMap<ColumnCoordinate, ForeignKeyDecision> {
        &self.foreign_keys
    }

    pub fn unique_indexes(&self) -> &BTreeMap<IndexCoordinate, UniqueIndexDecision> {
        &self.unique_indexes
    }

    /// Diagnostics ordered by code, then subject.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Module that owns a decided column.
    pub fn column_module(&self, coordinate: &ColumnCoordinate) -> Option<&str> {
        self.column_modules.get(coordinate).map(String::as_str)
    }

    /// Module that owns a decided index.
    pub fn index_module(&self, coordinate: &IndexCoordinate) -> Option<&str> {
        self.index_modules.get(coordinate).map(String::as_str)
    }

    /// Total number of decision records.
    pub fn len(&self) -> usize {
        self.nullability.len() + self.foreign_keys.len() + self.unique_indexes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Counts of positive decisions: (tightened columns, enforced indexes, created FKs).
    pub fn positive_counts(&self) -> (usize, usize, usize) {
        (
            self.nullability.values().filter(|d| d.make_not_null).count(),
            self.unique_indexes
                .values()
                .filter(|d| d.enforce_unique)
                .count(),
            self.foreign_keys
                .values()
                .filter(|d| d.create_constraint)
                .count(),
        )
    }
}

/// Accumulates decisions, then freezes them into a [`PolicyDecisionSet`].
#[derive(Debug, Default)]
pub struct PolicyDecisionSetBuilder {
    set: PolicyDecisionSet,
}

impl PolicyDecisionSetBuilder {
    pub fn nullability(&mut self, decision: NullabilityDecision, module: impl Into<String>) {
        self.set
            .column_modules
            .insert(decision.column.clone(), module.into());
        self.set
            .nullability
            .insert(decision.column.clone(), decision);
    }

    pub fn foreign_key(&mut self, decision: ForeignKeyDecision, module: impl Into<String>) {
        self.set
            .column_modules
            .insert(decision.column.clone(), module.into());
        self.set
            .foreign_keys
            .insert(decision.column.clone(), decision);
    }

    pub fn unique_index(&mut self, decision: UniqueIndexDecision, module: impl Into<String>) {
        self.set
            .index_modules
            .insert(decision.index.clone(), module.into());
        self.set
            .unique_indexes
            .insert(decision.index.clone(), decision);
    }

    pub fn diagnostic(&mut self, diagnostic: Diagnostic) {
        self.set.diagnostics.push(diagnostic);
    }

    /// Sort diagnostics and freeze.
    pub fn build(mut self) -> PolicyDecisionSet {
        self.set.diagnostics.sort();
        self.set.diagnostics.dedup();
        self.set
    }
}
