//! Pre-scripts that fix existing data before a constraint is applied.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::opportunity::sql;
use crate::policy::RemediationOptions;

static NUMERIC_TYPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^\s*(tinyint|smallint|bigint|int|integer|longinteger|decimal|numeric|money|smallmoney|currency|float|real|bit|boolean|identifier)\b",
    )
    .expect("valid numeric type pattern")
});

static TEXT_TYPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*(n?varchar|n?char|n?text|text|email|phonenumber)\b")
        .expect("valid text type pattern")
});

static DATE_TYPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*(date|datetime|datetime2|smalldatetime|datetimeoffset|time)\b")
        .expect("valid date type pattern")
});

/// Broad family of a SQL type, used to pick a backfill sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataFamily {
    Numeric,
    Text,
    Date,
    Other,
}

impl DataFamily {
    /// Classify a physical or logical type name.
    pub fn classify(sql_type: &str) -> Self {
        if NUMERIC_TYPE.is_match(sql_type) {
            DataFamily::Numeric
        } else if TEXT_TYPE.is_match(sql_type) {
            DataFamily::Text
        } else if DATE_TYPE.is_match(sql_type) {
            DataFamily::Date
        } else {
            DataFamily::Other
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DataFamily::Numeric => "numeric",
            DataFamily::Text => "text",
            DataFamily::Date => "date",
            DataFamily::Other => "other",
        }
    }
}

/// Statements to run before the DDL, plus notes for reviewers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemediationPlan {
    pub statements: Vec<String>,
    pub notes: Vec<String>,
}

impl RemediationPlan {
    pub fn is_empty(&self) -> bool {
        self.statements.is_empty() && self.notes.is_empty()
    }
}

/// Renders remediation pre-scripts according to [`RemediationOptions`].
#[derive(Debug, Clone, Copy)]
pub struct RemediationPlanner<'o> {
    options: &'o RemediationOptions,
}

impl<'o> RemediationPlanner<'o> {
    pub fn new(options: &'o RemediationOptions) -> Self {
        Self { options }
    }

    /// Whether pre-scripts are generated at all.
    pub fn is_enabled(&self) -> bool {
        self.options.generate_pre_scripts
    }

    /// Backfill value: the column default when present, else the sentinel
    /// configured for the type's family.
    pub fn literal_for(&self, sql_type: &str, default_definition: Option<&str>) -> Option<String> {
        if let Some(default) = default_definition.map(str::trim).filter(|d| !d.is_empty()) {
            return Some(default.to_string());
        }
        let sentinels = &self.options.sentinels;
        match DataFamily::classify(sql_type) {
            DataFamily::Numeric => sentinels.numeric.clone(),
            DataFamily::Text => sentinels.text.clone(),
            DataFamily::Date => sentinels.date.clone(),
            DataFamily::Other => None,
        }
    }

    /// `UPDATE ... SET c = <literal> WHERE c IS NULL;`
    pub fn plan_backfill(
        &self,
        table: &str,
        column: &str,
        sql_type: &str,
        default_definition: Option<&str>,
    ) -> RemediationPlan {
        if !self.is_enabled() {
            return RemediationPlan::default();
        }
        match self.literal_for(sql_type, default_definition) {
            Some(literal) => RemediationPlan {
                statements: vec![sql::backfill_nulls(table, column, &literal)],
                notes: Vec::new(),
            },
            None => {
                tracing::debug!(
                    table,
                    column,
                    family = DataFamily::classify(sql_type).label(),
                    "no backfill literal"
                );
                RemediationPlan {
                    statements: Vec::new(),
                    notes: vec![format!("No remediation literal for {}.", sql_type)],
                }
            }
        }
    }

    /// A commented query that lists duplicate key tuples.
    pub fn plan_deduplication<S: AsRef<str>>(&self, table: &str, columns: &[S]) -> RemediationPlan {
        if !self.is_enabled() || columns.is_empty() {
            return RemediationPlan::default();
        }
        RemediationPlan {
            statements: vec![sql::duplicate_probe(table, columns)],
            notes: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify() {
        assert_eq!(DataFamily::classify("int"), DataFamily::Numeric);
        assert_eq!(DataFamily::classify("DECIMAL(18, 2)"), DataFamily::Numeric);
        assert_eq!(DataFamily::classify("nvarchar(50)"), DataFamily::Text);
        assert_eq!(DataFamily::classify("Text"), DataFamily::Text);
        assert_eq!(DataFamily::classify("datetime2(7)"), DataFamily::Date);
        assert_eq!(DataFamily::classify("varbinary(max)"), DataFamily::Other);
        assert_eq!(DataFamily::classify("uniqueidentifier"), DataFamily::Other);
        assert_eq!(DataFamily::classify("datetime").label(), "date");
    }

    #[test]
    fn test_default_wins_over_sentinel() {
        let options = RemediationOptions::default();
        let planner = RemediationPlanner::new(&options);

        assert_eq!(planner.literal_for("int", Some("((1))")).as_deref(), Some("((1))"));
        assert_eq!(planner.literal_for("int", None).as_deref(), Some("0"));
        assert_eq!(planner.literal_for("varchar(10)", None).as_deref(), Some("''"));
        assert_eq!(
            planner.literal_for("date", None).as_deref(),
            Some("'1900-01-01'")
        );
    }

    #[test]
    fn test_backfill_statement() {
        let options = RemediationOptions::default();
        let plan = RemediationPlanner::new(&options).plan_backfill(
            "[dbo].[Customer]",
            "Email",
            "varchar(200)",
            None,
        );

        assert_eq!(
            plan.statements,
            vec!["UPDATE [dbo].[Customer] SET [Email] = '' WHERE [Email] IS NULL;"]
        );
        assert!(plan.notes.is_empty());
    }

    #[test]
    fn test_missing_literal_becomes_note() {
        let options = RemediationOptions::default();
        let plan = RemediationPlanner::new(&options).plan_backfill(
            "[dbo].[Doc]",
            "Blob",
            "varbinary(max)",
            None,
        );

        assert!(plan.statements.is_empty());
        assert_eq!(plan.notes, vec!["No remediation literal for varbinary(max)."]);
    }

    #[test]
    fn test_disabled_planner_is_empty() {
        let options = RemediationOptions {
            generate_pre_scripts: false,
            ..RemediationOptions::default()
        };
        let planner = RemediationPlanner::new(&options);

        assert!(planner
            .plan_backfill("[dbo].[Customer]", "Email", "int", None)
            .is_empty());
        assert!(planner
            .plan_deduplication("[dbo].[Customer]", &["Email"])
            .is_empty());
    }
}
