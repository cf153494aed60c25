//! Tightening policy configuration.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{InvalidInputKind, Result, TightenError};

/// Policy philosophy used when weighing evidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TighteningMode {
    /// Tighten only on complete, clean evidence.
    Cautious,
    /// Tighten when observed violations stay within the null budget.
    #[default]
    EvidenceGated,
    /// Tighten unless trustworthy evidence says otherwise.
    Aggressive,
}

impl TighteningMode {
    /// Get a human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            TighteningMode::Cautious => "Cautious",
            TighteningMode::EvidenceGated => "EvidenceGated",
            TighteningMode::Aggressive => "Aggressive",
        }
    }
}

impl fmt::Display for TighteningMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for TighteningMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().replace(['-', '_'], "").as_str() {
            "cautious" => Ok(TighteningMode::Cautious),
            "evidencegated" | "gated" => Ok(TighteningMode::EvidenceGated),
            "aggressive" => Ok(TighteningMode::Aggressive),
            _ => Err(format!(
                "Unknown mode: {}. Use cautious, evidence-gated, or aggressive.",
                s
            )),
        }
    }
}

/// Foreign-key creation toggles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForeignKeyOptions {
    pub enable_creation: bool,
    pub allow_cross_schema: bool,
    pub allow_cross_catalog: bool,
}

impl Default for ForeignKeyOptions {
    fn default() -> Self {
        Self {
            enable_creation: true,
            allow_cross_schema: false,
            allow_cross_catalog: false,
        }
    }
}

/// Unique index enforcement toggles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UniquenessOptions {
    pub enforce_single_column: bool,
    pub enforce_multi_column: bool,
    /// Consider indexes the platform created automatically.
    pub include_platform_auto_indexes: bool,
}

impl Default for UniquenessOptions {
    fn default() -> Self {
        Self {
            enforce_single_column: true,
            enforce_multi_column: true,
            include_platform_auto_indexes: false,
        }
    }
}

/// Literals used to backfill NULLs, per data family.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SentinelOptions {
    pub numeric: Option<String>,
    pub text: Option<String>,
    pub date: Option<String>,
}

impl Default for SentinelOptions {
    fn default() -> Self {
        Self {
            numeric: Some("0".to_string()),
            text: Some("''".to_string()),
            date: Some("'1900-01-01'".to_string()),
        }
    }
}

/// Remediation settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemediationOptions {
    /// Render backfill/dedup pre-scripts alongside the DDL.
    pub generate_pre_scripts: bool,
    pub sentinels: SentinelOptions,
    /// Largest number of NULL rows a default backfill may touch.
    pub max_rows_default_backfill: u64,
}

impl Default for RemediationOptions {
    fn default() -> Self {
        Self {
            generate_pre_scripts: true,
            sentinels: SentinelOptions::default(),
            max_rows_default_backfill: 100_000,
        }
    }
}

/// Statement and rollup formatting toggles.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmissionOptions {
    /// Address tables as `[table]` instead of `[schema].[table]`.
    pub emit_bare_table_only: bool,
    /// Replace characters outside `[A-Za-z0-9_]` in module names used for rollups.
    pub sanitize_module_names: bool,
}

/// Policy configuration for one run. Constructed once, never mutated
/// after the engine receives it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TighteningOptions {
    pub mode: TighteningMode,
    /// Acceptable fraction of NULL rows, in `[0, 1]`.
    pub null_budget: f64,
    pub foreign_keys: ForeignKeyOptions,
    pub uniqueness: UniquenessOptions,
    pub remediation: RemediationOptions,
    pub emission: EmissionOptions,
    /// Worker threads for per-coordinate evaluation (None = rayon default).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_degree_of_parallelism: Option<usize>,
}

impl Default for TighteningOptions {
    fn default() -> Self {
        Self {
            mode: TighteningMode::default(),
            null_budget: 0.0,
            foreign_keys: ForeignKeyOptions::default(),
            uniqueness: UniquenessOptions::default(),
            remediation: RemediationOptions::default(),
            emission: EmissionOptions::default(),
            max_degree_of_parallelism: None,
        }
    }
}

impl TighteningOptions {
    /// Create options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the mode.
    pub fn with_mode(mut self, mode: TighteningMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the null budget.
    pub fn with_null_budget(mut self, budget: f64) -> Self {
        self.null_budget = budget;
        self
    }

    /// Set the foreign-key toggles.
    pub fn with_foreign_keys(mut self, foreign_keys: ForeignKeyOptions) -> Self {
        self.foreign_keys = foreign_keys;
        self
    }

    /// Set the uniqueness toggles.
    pub fn with_uniqueness(mut self, uniqueness: UniquenessOptions) -> Self {
        self.uniqueness = uniqueness;
        self
    }

    /// Set the remediation settings.
    pub fn with_remediation(mut self, remediation: RemediationOptions) -> Self {
        self.remediation = remediation;
        self
    }

    /// Set the emission toggles.
    pub fn with_emission(mut self, emission: EmissionOptions) -> Self {
        self.emission = emission;
        self
    }

    /// Bound the number of evaluation workers.
    pub fn with_max_parallelism(mut self, workers: usize) -> Self {
        self.max_degree_of_parallelism = Some(workers);
        self
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<()> {
        if !self.null_budget.is_finite() || !(0.0..=1.0).contains(&self.null_budget) {
            return Err(TightenError::invalid_input(
                InvalidInputKind::InvalidOptions,
                format!("null budget must be within [0, 1], got {}", self.null_budget),
            ));
        }
        if self.max_degree_of_parallelism == Some(0) {
            return Err(TightenError::invalid_input(
                InvalidInputKind::InvalidOptions,
                "max degree of parallelism must be at least 1",
            ));
        }
        Ok(())
    }
}
