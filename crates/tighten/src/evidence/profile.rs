//! Profiling evidence produced by the external profiler.

use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::model::ColumnCoordinate;

/// How a profiling probe finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeOutcome {
    /// Full scan completed.
    Succeeded,
    /// Only a sample of rows was inspected.
    Sampled,
    /// The probe stopped before covering every row (timeout, cancellation).
    Partial,
    /// The probe was not run.
    Skipped,
    /// The probe raised an error.
    Failed,
}

impl ProbeOutcome {
    /// Get a human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            ProbeOutcome::Succeeded => "Succeeded",
            ProbeOutcome::Sampled => "Sampled",
            ProbeOutcome::Partial => "Partial",
            ProbeOutcome::Skipped => "Skipped",
            ProbeOutcome::Failed => "Failed",
        }
    }

    /// Only a completed full scan counts as high-confidence evidence.
    pub fn is_full_scan(&self) -> bool {
        matches!(self, ProbeOutcome::Succeeded)
    }
}

impl fmt::Display for ProbeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Status attached to every evidence fact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeStatus {
    /// When the probe ran.
    pub captured_at_utc: DateTime<Utc>,
    /// Number of rows the probe looked at.
    pub sample_size: u64,
    pub outcome: ProbeOutcome,
}

impl ProbeStatus {
    /// Create a probe status.
    pub fn new(captured_at_utc: DateTime<Utc>, sample_size: u64, outcome: ProbeOutcome) -> Self {
        Self {
            captured_at_utc,
            sample_size,
            outcome,
        }
    }

    /// A full-scan success over `sample_size` rows.
    pub fn full_scan(captured_at_utc: DateTime<Utc>, sample_size: u64) -> Self {
        Self::new(captured_at_utc, sample_size, ProbeOutcome::Succeeded)
    }

    /// Whether this probe is high-confidence evidence.
    pub fn is_high_confidence(&self) -> bool {
        self.outcome.is_full_scan()
    }

    /// Render as `Outcome=..., Sample=..., Captured=...`.
    pub fn describe(&self) -> String {
        format!(
            "Outcome={}, Sample={}, Captured={}",
            self.outcome,
            self.sample_size,
            self.captured_at_utc
                .to_rfc3339_opts(SecondsFormat::Secs, true)
        )
    }
}

/// A bounded sample of offending rows, identified by primary-key tuples.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowSample {
    /// Primary-key column names, in tuple order.
    pub key_columns: Vec<String>,
    /// One primary-key tuple per offending row.
    pub rows: Vec<Vec<String>>,
    /// More offending rows exist than were captured.
    #[serde(default)]
    pub is_truncated: bool,
}

impl RowSample {
    /// Render as `(1), (4, A)`; appends `...` when truncated.
    pub fn describe(&self) -> String {
        let mut rendered = self
            .rows
            .iter()
            .map(|row| format!("({})", row.join(", ")))
            .collect::<Vec<_>>()
            .join(", ");
        if self.is_truncated {
            rendered.push_str(", ...");
        }
        rendered
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Measured facts for one physical column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnProfile {
    pub schema: String,
    pub table: String,
    pub column: String,
    /// Nullability on disk at profiling time.
    pub is_nullable_physical: bool,
    #[serde(default)]
    pub is_computed: bool,
    #[serde(default)]
    pub is_primary_key: bool,
    #[serde(default)]
    pub is_unique_key: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_definition: Option<String>,
    pub row_count: u64,
    pub null_count: u64,
    pub null_count_status: ProbeStatus,
    /// Sample of rows holding NULL, for remediation preview.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub null_row_sample: Option<RowSample>,
}

impl ColumnProfile {
    /// Create a profile of a nullable, non-key column.
    pub fn new(
        coordinate: &ColumnCoordinate,
        row_count: u64,
        null_count: u64,
        status: ProbeStatus,
    ) -> Self {
        Self {
            schema: coordinate.schema.clone(),
            table: coordinate.table.clone(),
            column: coordinate.column.clone(),
            is_nullable_physical: true,
            is_computed: false,
            is_primary_key: false,
            is_unique_key: false,
            default_definition: None,
            row_count,
            null_count,
            null_count_status: status,
            null_row_sample: None,
        }
    }

    /// Set the null-row sample.
    pub fn with_null_sample(mut self, sample: RowSample) -> Self {
        self.null_row_sample = Some(sample);
        self
    }

    /// Set the default definition.
    pub fn with_default(mut self, definition: impl Into<String>) -> Self {
        self.default_definition = Some(definition.into());
        self
    }

    pub fn coordinate(&self) -> ColumnCoordinate {
        ColumnCoordinate::new(&self.schema, &self.table, &self.column)
    }

    /// Observed null fraction: `null_count / max(row_count, 1)`.
    pub fn null_fraction(&self) -> f64 {
        self.null_count as f64 / self.row_count.max(1) as f64
    }

    /// `null_count <= row_count`.
    pub fn is_consistent(&self) -> bool {
        self.null_count <= self.row_count
    }
}

/// Duplicate probe for a single column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UniqueCandidateProfile {
    pub schema: String,
    pub table: String,
    pub column: String,
    pub has_duplicate: bool,
    pub probe_status: ProbeStatus,
}

impl UniqueCandidateProfile {
    pub fn new(coordinate: &ColumnCoordinate, has_duplicate: bool, status: ProbeStatus) -> Self {
        Self {
            schema: coordinate.schema.clone(),
            table: coordinate.table.clone(),
            column: coordinate.column.clone(),
            has_duplicate,
            probe_status: status,
        }
    }

    pub fn coordinate(&self) -> ColumnCoordinate {
        ColumnCoordinate::new(&self.schema, &self.table, &self.column)
    }
}

/// Duplicate probe over an ordered column list on one table. The probe
/// covers the whole key, so there is no per-column status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompositeUniqueCandidateProfile {
    pub schema: String,
    pub table: String,
    pub columns: Vec<String>,
    pub has_duplicate: bool,
}

impl CompositeUniqueCandidateProfile {
    pub fn new(
        schema: impl Into<String>,
        table: impl Into<String>,
        columns: Vec<String>,
        has_duplicate: bool,
    ) -> Self {
        Self {
            schema: schema.into(),
            table: table.into(),
            columns,
            has_duplicate,
        }
    }
}

/// The reference a foreign-key probe was run for.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForeignKeyReference {
    pub from_schema: String,
    pub from_table: String,
    pub from_column: String,
    pub to_schema: String,
    pub to_table: String,
    pub to_column: String,
    /// A physical constraint already exists.
    #[serde(default)]
    pub has_database_constraint: bool,
}

impl ForeignKeyReference {
    pub fn new(from: &ColumnCoordinate, to: &ColumnCoordinate) -> Self {
        Self {
            from_schema: from.schema.clone(),
            from_table: from.table.clone(),
            from_column: from.column.clone(),
            to_schema: to.schema.clone(),
            to_table: to.table.clone(),
            to_column: to.column.clone(),
            has_database_constraint: false,
        }
    }

    pub fn source(&self) -> ColumnCoordinate {
        ColumnCoordinate::new(&self.from_schema, &self.from_table, &self.from_column)
    }

    pub fn target(&self) -> ColumnCoordinate {
        ColumnCoordinate::new(&self.to_schema, &self.to_table, &self.to_column)
    }
}

/// What the orphan probe found for a reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForeignKeyReality {
    pub reference: ForeignKeyReference,
    pub has_orphan: bool,
    #[serde(default)]
    pub orphan_count: u64,
    /// The constraint exists but is not trusted.
    #[serde(default)]
    pub is_no_check: bool,
    pub probe_status: ProbeStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub orphan_sample: Option<RowSample>,
}

impl ForeignKeyReality {
    pub fn new(reference: ForeignKeyReference, orphan_count: u64, status: ProbeStatus) -> Self {
        Self {
            reference,
            has_orphan: orphan_count > 0,
            orphan_count,
            is_no_check: false,
            probe_status: status,
            orphan_sample: None,
        }
    }

    /// Orphans reported by either the flag or the count.
    pub fn shows_orphans(&self) -> bool {
        self.has_orphan || self.orphan_count > 0
    }

    /// A positive count never comes with `has_orphan = false`.
    pub fn is_consistent(&self) -> bool {
        self.has_orphan || self.orphan_count == 0
    }

    /// Set the orphan sample.
    pub fn with_orphan_sample(mut self, sample: RowSample) -> Self {
        self.orphan_sample = Some(sample);
        self
    }
}

/// The profiler's complete output for one run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileSnapshot {
    #[serde(default)]
    pub columns: Vec<ColumnProfile>,
    #[serde(default)]
    pub unique_candidates: Vec<UniqueCandidateProfile>,
    #[serde(default)]
    pub composite_unique_candidates: Vec<CompositeUniqueCandidateProfile>,
    #[serde(default)]
    pub foreign_keys: Vec<ForeignKeyReality>,
}

impl ProfileSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_column(mut self, profile: ColumnProfile) -> Self {
        self.columns.push(profile);
        self
    }

    pub fn with_unique_candidate(mut self, profile: UniqueCandidateProfile) -> Self {
        self.unique_candidates.push(profile);
        self
    }

    pub fn with_composite_candidate(mut self, profile: CompositeUniqueCandidateProfile) -> Self {
        self.composite_unique_candidates.push(profile);
        self
    }

    pub fn with_foreign_key(mut self, reality: ForeignKeyReality) -> Self {
        self.foreign_keys.push(reality);
        self
    }
}
