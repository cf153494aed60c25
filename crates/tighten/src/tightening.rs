//! Main Tightener struct and public API.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::evidence::{EvidenceIndex, ProfileSnapshot};
use crate::model::SchemaModel;
use crate::opportunity::{load_json, OpportunitiesReport, OpportunityAggregator, RiskLevel};
use crate::policy::{DecisionEngine, PolicyDecisionSet, TighteningOptions};

/// Result of one tightening run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TighteningResult {
    pub decisions: PolicyDecisionSet,
    pub report: OpportunitiesReport,
    pub summary: TighteningSummary,
}

/// Headline numbers for a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TighteningSummary {
    pub columns_evaluated: usize,
    pub columns_tightened: usize,
    pub unique_indexes_evaluated: usize,
    pub unique_indexes_enforced: usize,
    pub foreign_keys_evaluated: usize,
    pub foreign_keys_created: usize,
    pub safe_to_apply: usize,
    pub needs_remediation: usize,
    pub diagnostics: usize,
    /// Human-readable recommendation.
    pub recommendation: String,
}

impl TighteningSummary {
    fn compute(decisions: &PolicyDecisionSet, report: &OpportunitiesReport) -> Self {
        let (columns_tightened, unique_indexes_enforced, foreign_keys_created) =
            decisions.positive_counts();
        let safe_to_apply = report.count_by_risk(RiskLevel::SafeToApply);
        let needs_remediation = report.count_by_risk(RiskLevel::NeedsRemediation);
        let diagnostics = decisions.diagnostics().len();

        let recommendation = if report.is_empty() {
            "No constraints can be tightened with the current evidence and policy.".to_string()
        } else if needs_remediation == 0 {
            format!(
                "All {} opportunities are safe to apply.",
                safe_to_apply
            )
        } else {
            format!(
                "{} opportunities are safe to apply; {} need data remediation first.",
                safe_to_apply, needs_remediation
            )
        };

        Self {
            columns_evaluated: decisions.nullability().len(),
            columns_tightened,
            unique_indexes_evaluated: decisions.unique_indexes().len(),
            unique_indexes_enforced,
            foreign_keys_evaluated: decisions.foreign_keys().len(),
            foreign_keys_created,
            safe_to_apply,
            needs_remediation,
            diagnostics,
            recommendation,
        }
    }
}

/// Runs the decision engine and the opportunity aggregator over one
/// model and snapshot.
#[derive(Debug, Clone, Default)]
pub struct Tightener {
    options: TighteningOptions,
}

impl Tightener {
    /// Create a tightener with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a tightener with custom options.
    pub fn with_options(options: TighteningOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &TighteningOptions {
        &self.options
    }

    /// Decide and build the report, stamped with the current time.
    pub fn run(&self, model: &SchemaModel, snapshot: &ProfileSnapshot) -> Result<TighteningResult> {
        self.run_at(model, snapshot, Utc::now())
    }

    /// Decide and build the report with a fixed timestamp.
    pub fn run_at(
        &self,
        model: &SchemaModel,
        snapshot: &ProfileSnapshot,
        generated_at: DateTime<Utc>,
    ) -> Result<TighteningResult> {
        let engine = DecisionEngine::new(self.options.clone())?;
        let index = EvidenceIndex::new(model, snapshot);
        let decisions = engine.decide(&index)?;
        let report = OpportunityAggregator::new(&index, &decisions, &self.options)
            .build_at(generated_at);
        let summary = TighteningSummary::compute(&decisions, &report);

        Ok(TighteningResult {
            decisions,
            report,
            summary,
        })
    }

    /// Decide only.
    pub fn decide(&self, model: &SchemaModel, snapshot: &ProfileSnapshot) -> Result<PolicyDecisionSet> {
        let index = EvidenceIndex::new(model, snapshot);
        DecisionEngine::new(self.options.clone())?.decide(&index)
    }

    /// Load a model and a snapshot from JSON files and run.
    pub fn run_files(
        &self,
        model_path: impl AsRef<Path>,
        snapshot_path: impl AsRef<Path>,
    ) -> Result<TighteningResult> {
        let model: SchemaModel = load_json(model_path.as_ref())?;
        let snapshot: ProfileSnapshot = load_json(snapshot_path.as_ref())?;
        tracing::debug!(
            modules = model.modules.len(),
            attributes = model.attribute_count(),
            profiles = snapshot.columns.len(),
            "inputs loaded"
        );
        self.run(&model, &snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evidence::{ColumnProfile, ProbeStatus};
    use crate::model::{AttributeModel, ColumnCoordinate, EntityModel, ModuleModel};
    use std::fs;
    use tempfile::tempdir;

    fn model() -> SchemaModel {
        SchemaModel::new().with_module(
            ModuleModel::new("Sales").with_entity(
                EntityModel::new("Customer", "dbo", "Customer")
                    .with_attribute(AttributeModel::new("Id", "Identifier").identifier())
                    .with_attribute(AttributeModel::new("Email", "Text")),
            ),
        )
    }

    fn snapshot(nulls: u64) -> ProfileSnapshot {
        ProfileSnapshot::new().with_column(ColumnProfile::new(
            &ColumnCoordinate::new("dbo", "Customer", "Email"),
            100,
            nulls,
            ProbeStatus::full_scan(Utc::now(), 100),
        ))
    }

    #[test]
    fn test_run_clean_column() {
        let result = Tightener::new().run(&model(), &snapshot(0)).unwrap();

        assert_eq!(result.summary.columns_evaluated, 1);
        assert_eq!(result.summary.columns_tightened, 1);
        assert_eq!(result.summary.safe_to_apply, 1);
        assert_eq!(result.report.len(), 1);
        assert!(result.summary.recommendation.starts_with("All 1"));
    }

    #[test]
    fn test_run_nothing_to_do() {
        let result = Tightener::new().run(&model(), &snapshot(40)).unwrap();

        assert!(result.report.is_empty());
        assert!(result.summary.recommendation.starts_with("No constraints"));
    }

    #[test]
    fn test_invalid_options_rejected() {
        let tightener = Tightener::with_options(TighteningOptions::new().with_null_budget(3.0));
        assert!(tightener.run(&model(), &snapshot(0)).is_err());
    }

    #[test]
    fn test_run_files() {
        let dir = tempdir().unwrap();
        let model_path = dir.path().join("model.json");
        let snapshot_path = dir.path().join("snapshot.json");
        fs::write(&model_path, serde_json::to_string(&model()).unwrap()).unwrap();
        fs::write(&snapshot_path, serde_json::to_string(&snapshot(0)).unwrap()).unwrap();

        let result = Tightener::new().run_files(&model_path, &snapshot_path).unwrap();
        assert_eq!(result.report.len(), 1);
    }
}
