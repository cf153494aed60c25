//! Entities, modules and indexes of the structural model.

use serde::{Deserialize, Serialize};

use super::attribute::AttributeModel;
use super::coordinate::{eq_ignore_case, ColumnCoordinate, IndexCoordinate};

/// Sort direction of an index key column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    /// SQL keyword for this direction.
    pub fn keyword(&self) -> &'static str {
        match self {
            SortDirection::Ascending => "ASC",
            SortDirection::Descending => "DESC",
        }
    }
}

/// One column participating in an index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexColumnModel {
    /// Logical attribute name.
    pub attribute: String,
    /// Physical column name.
    pub column: String,
    /// 1-based key position.
    pub ordinal: u32,
    /// Included (non-key) column.
    #[serde(default)]
    pub is_included: bool,
    #[serde(default)]
    pub direction: SortDirection,
}

impl IndexColumnModel {
    /// Create an ascending key column whose attribute and column names match.
    pub fn key(column: impl Into<String>, ordinal: u32) -> Self {
        let column = column.into();
        Self {
            attribute: column.clone(),
            column,
            ordinal,
            is_included: false,
            direction: SortDirection::Ascending,
        }
    }

    /// Set the sort direction.
    pub fn with_direction(mut self, direction: SortDirection) -> Self {
        self.direction = direction;
        self
    }

    /// Mark as an included column.
    pub fn included(mut self) -> Self {
        self.is_included = true;
        self
    }
}

/// An index declared on an entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexModel {
    pub name: String,
    #[serde(default)]
    pub is_unique: bool,
    #[serde(default)]
    pub is_primary: bool,
    /// Created automatically by the platform rather than by a developer.
    #[serde(default)]
    pub is_platform_auto: bool,
    pub columns: Vec<IndexColumnModel>,
}

impl IndexModel {
    /// Create a unique index over the given columns.
    pub fn unique(name: impl Into<String>, columns: Vec<IndexColumnModel>) -> Self {
        Self {
            name: name.into(),
            is_unique: true,
            is_primary: false,
            is_platform_auto: false,
            columns,
        }
    }

    /// Non-included key columns ordered by ordinal.
    pub fn key_columns(&self) -> Vec<&IndexColumnModel> {
        let mut keys: Vec<&IndexColumnModel> =
            self.columns.iter().filter(|c| !c.is_included).collect();
        keys.sort_by_key(|c| c.ordinal);
        keys
    }
}

/// A relationship declared on an entity, complementing attribute references.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelationshipModel {
    /// Logical name of the referencing attribute.
    pub via_attribute: String,
    /// Logical name of the target entity.
    pub target_entity: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_physical_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delete_rule: Option<String>,
    #[serde(default)]
    pub has_database_constraint: bool,
}

/// An entity (table) of the structural model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityModel {
    /// Logical entity name.
    pub logical_name: String,
    /// Physical schema.
    pub schema: String,
    /// Physical table name.
    pub physical_name: String,
    /// Database catalog, when the entity lives outside the main one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub catalog: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    pub attributes: Vec<AttributeModel>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub indexes: Vec<IndexModel>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub relationships: Vec<RelationshipModel>,
}

fn default_true() -> bool {
    true
}

impl EntityModel {
    /// Create an active entity.
    pub fn new(
        logical_name: impl Into<String>,
        schema: impl Into<String>,
        physical_name: impl Into<String>,
    ) -> Self {
        Self {
            logical_name: logical_name.into(),
            schema: schema.into(),
            physical_name: physical_name.into(),
            catalog: None,
            is_active: true,
            attributes: Vec::new(),
            indexes: Vec::new(),
            relationships: Vec::new(),
        }
    }

    /// Add an attribute.
    pub fn with_attribute(mut self, attribute: AttributeModel) -> Self {
        self.attributes.push(attribute);
        self
    }

    /// Add an index.
    pub fn with_index(mut self, index: IndexModel) -> Self {
        self.indexes.push(index);
        self
    }

    /// Add a relationship.
    pub fn with_relationship(mut self, relationship: RelationshipModel) -> Self {
        self.relationships.push(relationship);
        self
    }

    /// Mark the entity active or retired.
    pub fn with_active(mut self, active: bool) -> Self {
        self.is_active = active;
        self
    }

    /// Set the catalog.
    pub fn with_catalog(mut self, catalog: impl Into<String>) -> Self {
        self.catalog = Some(catalog.into());
        self
    }

    /// Coordinate of one of this entity's columns.
    pub fn column_coordinate(&self, column: &str) -> ColumnCoordinate {
        ColumnCoordinate::new(&self.schema, &self.physical_name, column)
    }

    /// Coordinate of one of this entity's indexes.
    pub fn index_coordinate(&self, index: &str) -> IndexCoordinate {
        IndexCoordinate::new(&self.schema, &self.physical_name, index)
    }

    /// Find an attribute by logical name.
    pub fn attribute(&self, logical_name: &str) -> Option<&AttributeModel> {
        self.attributes
            .iter()
            .find(|a| eq_ignore_case(&a.logical_name, logical_name))
    }

    /// Find an attribute by physical column name.
    pub fn attribute_by_column(&self, column: &str) -> Option<&AttributeModel> {
        self.attributes
            .iter()
            .find(|a| eq_ignore_case(&a.column_name, column))
    }

    /// Identifier attributes.
    pub fn identifier_attributes(&self) -> impl Iterator<Item = &AttributeModel> {
        self.attributes.iter().filter(|a| a.is_identifier)
    }

    /// Relationship declared for the given attribute.
    pub fn relationship_for(&self, attribute: &str) -> Option<&RelationshipModel> {
        self.relationships
            .iter()
            .find(|r| eq_ignore_case(&r.via_attribute, attribute))
    }

    /// Whether the attribute participates in this entity's primary key.
    pub fn is_primary_key_column(&self, attribute: &AttributeModel) -> bool {
        attribute.is_identifier
            || self.indexes.iter().filter(|ix| ix.is_primary).any(|ix| {
                ix.columns
                    .iter()
                    .any(|c| eq_ignore_case(&c.column, &attribute.column_name))
            })
    }
}

/// A logical module grouping entities.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleModel {
    pub name: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
    pub entities: Vec<EntityModel>,
}

impl ModuleModel {
    /// Create an active module.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_active: true,
            entities: Vec::new(),
        }
    }

    /// Add an entity.
    pub fn with_entity(mut self, entity: EntityModel) -> Self {
        self.entities.push(entity);
        self
    }

    pub fn with_active(mut self, active: bool) -> Self {
        self.is_active = active;
        self
    }
}

/// The whole structural model handed over by the extractor.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchemaModel {
    pub modules: Vec<ModuleModel>,
}

impl SchemaModel {
    /// Create an empty model.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a module.
    pub fn with_module(mut self, module: ModuleModel) -> Self {
        self.modules.push(module);
        self
    }

    /// Iterate over every (module, entity) pair.
    pub fn entities(&self) -> impl Iterator<Item = (&ModuleModel, &EntityModel)> {
        self.modules
            .iter()
            .flat_map(|m| m.entities.iter().map(move |e| (m, e)))
    }

    /// Total number of attributes in the model.
    pub fn attribute_count(&self) -> usize {
        self.entities().map(|(_, e)| e.attributes.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_columns_ordered_without_includes() {
        let index = IndexModel::unique(
            "UX_Customer_Tenant_Email",
            vec![
                IndexColumnModel::key("Email", 2),
                IndexColumnModel::key("Name", 3).included(),
                IndexColumnModel::key("TenantId", 1).with_direction(SortDirection::Descending),
            ],
        );

        let keys: Vec<&str> = index.key_columns().iter().map(|c| c.column.as_str()).collect();
        assert_eq!(keys, vec!["TenantId", "Email"]);
    }

    #[test]
    fn test_entity_lookups() {
        let entity = EntityModel::new("Customer", "dbo", "OSUSR_CUSTOMER")
            .with_attribute(AttributeModel::new("Id", "Identifier").identifier())
            .with_attribute(AttributeModel::new("Email", "Text").with_column_name("EMAIL"));

        assert!(entity.attribute("email").is_some());
        assert!(entity.attribute_by_column("Email").is_some());
        assert_eq!(entity.identifier_attributes().count(), 1);

        let coord = entity.column_coordinate("EMAIL");
        assert_eq!(coord, ColumnCoordinate::new("dbo", "osusr_customer", "email"));
    }

    #[test]
    fn test_primary_key_from_index() {
        let entity = EntityModel::new("Order", "dbo", "Order")
            .with_attribute(AttributeModel::new("OrderNo", "Integer"))
            .with_index(IndexModel {
                name: "PK_Order".to_string(),
                is_unique: true,
                is_primary: true,
                is_platform_auto: false,
                columns: vec![IndexColumnModel::key("OrderNo", 1)],
            });

        assert!(entity.is_primary_key_column(&entity.attributes[0]));
    }
}
