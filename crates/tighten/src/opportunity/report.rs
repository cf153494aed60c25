//! The opportunities report and the aggregator that builds it.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{InvalidInputKind, Result, TightenError};
use crate::evidence::{EvidenceIndex, ProfileSnapshot};
use crate::model::{cmp_ignore_case, SchemaModel};
use crate::policy::{PolicyDecisionSet, TighteningOptions};

use super::builders::{BuildContext, BUILDERS};
use super::types::{ConstraintType, Opportunity, RiskLevel};

/// All opportunities from one run, with tallies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpportunitiesReport {
    /// Sorted by (constraint type, schema, table, name).
    pub opportunities: Vec<Opportunity>,
    /// Every risk level, zero when absent.
    pub by_risk: BTreeMap<RiskLevel, usize>,
    /// Every constraint type, zero when absent.
    pub by_constraint_type: BTreeMap<ConstraintType, usize>,
    /// Opportunities per owning module.
    #[serde(default)]
    pub by_module: BTreeMap<String, usize>,
    pub generated_at: DateTime<Utc>,
}

impl OpportunitiesReport {
    /// Assemble a report from unordered opportunities.
    pub fn from_opportunities(
        mut opportunities: Vec<Opportunity>,
        generated_at: DateTime<Utc>,
    ) -> Self {
        opportunities.sort_by(|a, b| {
            a.constraint_type
                .cmp(&b.constraint_type)
                .then_with(|| cmp_ignore_case(&a.schema, &b.schema))
                .then_with(|| cmp_ignore_case(&a.table, &b.table))
                .then_with(|| cmp_ignore_case(&a.name, &b.name))
                .then_with(|| a.name.cmp(&b.name))
        });

        let mut by_risk: BTreeMap<RiskLevel, usize> =
            RiskLevel::ALL.iter().map(|r| (*r, 0)).collect();
        let mut by_constraint_type: BTreeMap<ConstraintType, usize> =
            ConstraintType::ALL.iter().map(|t| (*t, 0)).collect();
        let mut by_module: BTreeMap<String, usize> = BTreeMap::new();
        for opportunity in &opportunities {
            *by_risk.entry(opportunity.risk).or_default() += 1;
            *by_constraint_type
                .entry(opportunity.constraint_type)
                .or_default() += 1;
            *by_module.entry(opportunity.module.clone()).or_default() += 1;
        }

        Self {
            opportunities,
            by_risk,
            by_constraint_type,
            by_module,
            generated_at,
        }
    }

    pub fn len(&self) -> usize {
        self.opportunities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.opportunities.is_empty()
    }

    pub fn count_by_risk(&self, risk: RiskLevel) -> usize {
        self.by_risk.get(&risk).copied().unwrap_or(0)
    }

    pub fn count_by_type(&self, constraint_type: ConstraintType) -> usize {
        self.by_constraint_type
            .get(&constraint_type)
            .copied()
            .unwrap_or(0)
    }

    /// Opportunities of one constraint type.
    pub fn of_type(&self, constraint_type: ConstraintType) -> impl Iterator<Item = &Opportunity> {
        self.opportunities
            .iter()
            .filter(move |o| o.constraint_type == constraint_type)
    }

    /// Every statement in report order, remediation first per opportunity.
    pub fn script(&self) -> String {
        self.opportunities
            .iter()
            .map(Opportunity::script)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Serialize to pretty JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Save the report to a JSON file, creating parent directories.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        save_json(self, path.as_ref())
    }

    /// Load a report from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        load_json(path.as_ref())
    }
}

impl PolicyDecisionSet {
    /// Save the decision set to a JSON file, creating parent directories.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        save_json(self, path.as_ref())
    }

    /// Load a decision set from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        load_json(path.as_ref())
    }
}

fn save_json<T: Serialize>(value: &T, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| TightenError::io(parent, e))?;
        }
    }
    let file = File::create(path).map_err(|e| TightenError::io(path, e))?;
    serde_json::to_writer_pretty(BufWriter::new(file), value)?;
    tracing::debug!(path = %path.display(), "artifact written");
    Ok(())
}

pub(crate) fn load_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T> {
    let file = File::open(path).map_err(|e| TightenError::io(path, e))?;
    Ok(serde_json::from_reader(BufReader::new(file))?)
}

/// Folds builder output into an [`OpportunitiesReport`].
#[derive(Debug, Clone, Copy)]
pub struct OpportunityAggregator<'a> {
    context: BuildContext<'a>,
}

impl<'a> OpportunityAggregator<'a> {
    pub fn new(
        index: &'a EvidenceIndex<'a>,
        decisions: &'a PolicyDecisionSet,
        options: &'a TighteningOptions,
    ) -> Self {
        Self {
            context: BuildContext {
                index,
                decisions,
                options,
            },
        }
    }

    /// Build the report stamped with the current time.
    pub fn build(&self) -> OpportunitiesReport {
        self.build_at(Utc::now())
    }

    /// Build the report with a fixed timestamp.
    pub fn build_at(&self, generated_at: DateTime<Utc>) -> OpportunitiesReport {
        let mut opportunities = Vec::new();
        for (constraint_type, builder) in BUILDERS {
            let built = builder(&self.context);
            tracing::debug!(
                constraint_type = constraint_type.label(),
                count = built.len(),
                "opportunities built"
            );
            opportunities.extend(built);
        }
        let report = OpportunitiesReport::from_opportunities(opportunities, generated_at);
        tracing::info!(
            opportunities = report.len(),
            safe = report.count_by_risk(RiskLevel::SafeToApply),
            needs_remediation = report.count_by_risk(RiskLevel::NeedsRemediation),
            "opportunities report built"
        );
        report
    }
}

/// Build the opportunities report from a decision set.
///
/// Fails only when an input is absent; zero opportunities is a valid report.
pub fn analyze(
    model: Option<&SchemaModel>,
    snapshot: Option<&ProfileSnapshot>,
    decisions: Option<&PolicyDecisionSet>,
    options: Option<&TighteningOptions>,
) -> Result<OpportunitiesReport> {
    let index = EvidenceIndex::build(model, snapshot)?;
    let decisions = decisions.ok_or_else(|| {
        TightenError::invalid_input(
            InvalidInputKind::MissingDecisions,
            "a decision set is required to build opportunities",
        )
    })?;
    let options = options.ok_or_else(|| {
        TightenError::invalid_input(
            InvalidInputKind::MissingOptions,
            "tightening options are required to render opportunities",
        )
    })?;
    Ok(OpportunityAggregator::new(&index, decisions, options).build())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opportunity::types::OpportunityMetrics;
    use tempfile::tempdir;

    fn opportunity(constraint_type: ConstraintType, table: &str, name: &str) -> Opportunity {
        Opportunity {
            constraint_type,
            risk: RiskLevel::SafeToApply,
            schema: "dbo".to_string(),
            table: table.to_string(),
            name: name.to_string(),
            module: "Sales".to_string(),
            statements: vec![],
            remediation_statements: vec![],
            rationales: vec![],
            evidence: vec![],
            metrics: OpportunityMetrics::new(false, true),
            columns: vec![],
        }
    }

    #[test]
    fn test_empty_report_has_all_counts() {
        let report = OpportunitiesReport::from_opportunities(vec![], Utc::now());

        assert!(report.is_empty());
        assert_eq!(report.by_risk.len(), 2);
        assert_eq!(report.by_constraint_type.len(), 3);
        assert!(report.by_risk.values().all(|c| *c == 0));
    }

    #[test]
    fn test_sort_order() {
        let report = OpportunitiesReport::from_opportunities(
            vec![
                opportunity(ConstraintType::ForeignKey, "Order", "FK_Order_CustomerId"),
                opportunity(ConstraintType::Nullability, "order", "Total"),
                opportunity(ConstraintType::Nullability, "Customer", "Email"),
            ],
            Utc::now(),
        );

        let order: Vec<&str> = report.opportunities.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(order, vec!["Email", "Total", "FK_Order_CustomerId"]);
        assert_eq!(report.count_by_type(ConstraintType::Nullability), 2);
        assert_eq!(report.by_module["Sales"], 3);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out").join("report.json");
        let report = OpportunitiesReport::from_opportunities(
            vec![opportunity(ConstraintType::UniqueIndex, "Customer", "UX_Email")],
            Utc::now(),
        );

        report.save(&path).unwrap();
        let loaded = OpportunitiesReport::load(&path).unwrap();
        assert_eq!(loaded, report);
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let dir = tempdir().unwrap();
        let err = OpportunitiesReport::load(dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(err, TightenError::Io { .. }));
    }

    #[test]
    fn test_analyze_requires_decisions() {
        let model = SchemaModel::new();
        let snapshot = ProfileSnapshot::new();
        let err = analyze(
            Some(&model),
            Some(&snapshot),
            None,
            Some(&TighteningOptions::new()),
        )
        .unwrap_err();

        assert_eq!(
            err.invalid_input_kind(),
            Some(InvalidInputKind::MissingDecisions)
        );
    }
}
