//! Attribute (column) definitions of the structural model.

use serde::{Deserialize, Serialize};

/// What the physical column looks like on disk, when the extractor saw it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AttributeOnDisk {
    /// Physical SQL type (e.g., `nvarchar(250)`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sql_type: Option<String>,
    /// Whether the column currently allows NULL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_nullable: Option<bool>,
    /// Whether the column is an identity column.
    #[serde(default)]
    pub is_identity: bool,
    /// Whether the column is computed.
    #[serde(default)]
    pub is_computed: bool,
    /// Default constraint expression.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_definition: Option<String>,
}

/// Reference (foreign key) metadata carried by an attribute.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttributeReference {
    /// Logical name of the referenced entity.
    pub target_entity: String,
    /// Physical table name of the referenced entity, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_physical_name: Option<String>,
    /// Delete rule code (e.g., `Protect`, `Delete`, `Ignore`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delete_rule: Option<String>,
    /// Whether a physical constraint already exists in the database.
    #[serde(default)]
    pub has_database_constraint: bool,
}

impl AttributeReference {
    /// Create a reference to a logical entity.
    pub fn new(target_entity: impl Into<String>) -> Self {
        Self {
            target_entity: target_entity.into(),
            target_physical_name: None,
            delete_rule: None,
            has_database_constraint: false,
        }
    }

    /// Set the physical name of the target table.
    pub fn with_target_physical_name(mut self, name: impl Into<String>) -> Self {
        self.target_physical_name = Some(name.into());
        self
    }

    /// Set the delete rule code.
    pub fn with_delete_rule(mut self, rule: impl Into<String>) -> Self {
        self.delete_rule = Some(rule.into());
        self
    }

    /// Mark that a database constraint already exists.
    pub fn with_database_constraint(mut self, exists: bool) -> Self {
        self.has_database_constraint = exists;
        self
    }
}

/// A single attribute of an entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttributeModel {
    /// Logical attribute name.
    pub logical_name: String,
    /// Physical column name.
    pub column_name: String,
    /// Declared logical data type (e.g., `Text`, `Integer`).
    pub data_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub length: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub precision: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scale: Option<u32>,
    /// Whether the logical model marks the attribute mandatory.
    #[serde(default)]
    pub is_mandatory: bool,
    /// Whether the attribute is (part of) the entity identifier.
    #[serde(default)]
    pub is_identifier: bool,
    #[serde(default)]
    pub is_auto_number: bool,
    /// Inactive attributes are ignored by the engine.
    #[serde(default = "default_true")]
    pub is_active: bool,
    /// Physical on-disk facts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub on_disk: Option<AttributeOnDisk>,
    /// Type reported by an external database integration.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_database_type: Option<String>,
    /// Reference metadata when this attribute is a foreign key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<AttributeReference>,
}

fn default_true() -> bool {
    true
}

impl AttributeModel {
    /// Create an active attribute whose logical and column names match.
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            logical_name: name.clone(),
            column_name: name,
            data_type: data_type.into(),
            length: None,
            precision: None,
            scale: None,
            is_mandatory: false,
            is_identifier: false,
            is_auto_number: false,
            is_active: true,
            on_disk: None,
            external_database_type: None,
            reference: None,
        }
    }

    /// Set the physical column name.
    pub fn with_column_name(mut self, column: impl Into<String>) -> Self {
        self.column_name = column.into();
        self
    }

    /// Mark as the entity identifier.
    pub fn identifier(mut self) -> Self {
        self.is_identifier = true;
        self.is_mandatory = true;
        self
    }

    /// Set the mandatory flag.
    pub fn with_mandatory(mut self, mandatory: bool) -> Self {
        self.is_mandatory = mandatory;
        self
    }

    /// Set the active flag.
    pub fn with_active(mut self, active: bool) -> Self {
        self.is_active = active;
        self
    }

    /// Set the on-disk facts.
    pub fn with_on_disk(mut self, on_disk: AttributeOnDisk) -> Self {
        self.on_disk = Some(on_disk);
        self
    }

    /// Set the external database type.
    pub fn with_external_type(mut self, sql_type: impl Into<String>) -> Self {
        self.external_database_type = Some(sql_type.into());
        self
    }

    /// Make this attribute a reference.
    pub fn with_reference(mut self, reference: AttributeReference) -> Self {
        self.reference = Some(reference);
        self
    }

    /// Whether this attribute references another entity.
    pub fn is_reference(&self) -> bool {
        self.reference.is_some()
    }

    /// Physical SQL type recorded on disk.
    pub fn on_disk_sql_type(&self) -> Option<&str> {
        self.on_disk.as_ref().and_then(|d| d.sql_type.as_deref())
    }

    /// Physical nullability: on-disk facts win, else the inverse of the
    /// logical mandatory flag.
    pub fn is_physically_nullable(&self) -> bool {
        self.on_disk
            .as_ref()
            .and_then(|d| d.is_nullable)
            .unwrap_or(!self.is_mandatory)
    }

    /// Whether the column is an identity column on disk or an auto number.
    pub fn is_identity(&self) -> bool {
        self.is_auto_number || self.on_disk.as_ref().is_some_and(|d| d.is_identity)
    }

    /// Whether the column is computed on disk.
    pub fn is_computed(&self) -> bool {
        self.on_disk.as_ref().is_some_and(|d| d.is_computed)
    }

    /// Default expression recorded on disk.
    pub fn default_definition(&self) -> Option<&str> {
        self.on_disk
            .as_ref()
            .and_then(|d| d.default_definition.as_deref())
    }

    /// Resolve the SQL type to emit: on-disk type, then the external
    /// database type, then the declared logical type.
    pub fn resolved_sql_type(&self) -> &str {
        self.on_disk_sql_type()
            .or(self.external_database_type.as_deref())
            .unwrap_or(&self.data_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolved_type_preference() {
        let declared = AttributeModel::new("Email", "Text");
        assert_eq!(declared.resolved_sql_type(), "Text");

        let external = declared.clone().with_external_type("varchar(200)");
        assert_eq!(external.resolved_sql_type(), "varchar(200)");

        let on_disk = external.with_on_disk(AttributeOnDisk {
            sql_type: Some("nvarchar(250)".to_string()),
            ..Default::default()
        });
        assert_eq!(on_disk.resolved_sql_type(), "nvarchar(250)");
    }

    #[test]
    fn test_physical_nullability() {
        let attr = AttributeModel::new("Name", "Text");
        assert!(attr.is_physically_nullable());

        let mandatory = attr.clone().with_mandatory(true);
        assert!(!mandatory.is_physically_nullable());

        // On-disk facts override the logical flag
        let on_disk = mandatory.with_on_disk(AttributeOnDisk {
            is_nullable: Some(true),
            ..Default::default()
        });
        assert!(on_disk.is_physically_nullable());
    }

    #[test]
    fn test_reference_builder() {
        let attr = AttributeModel::new("CustomerId", "Identifier").with_reference(
            AttributeReference::new("Customer")
                .with_delete_rule("Protect")
                .with_database_constraint(true),
        );

        assert!(attr.is_reference());
        let reference = attr.reference.as_ref().unwrap();
        assert_eq!(reference.delete_rule.as_deref(), Some("Protect"));
        assert!(reference.has_database_constraint);
    }
}
