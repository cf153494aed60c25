//! Evidence index: O(1) lookups joining the structural model to the
//! profiling snapshot by coordinate.

use indexmap::IndexMap;
use sha2::{Digest, Sha256};

use crate::error::{InvalidInputKind, Result, TightenError};
use crate::model::{
    AttributeModel, ColumnCoordinate, EntityModel, IndexCoordinate, IndexModel, ModuleModel,
    SchemaModel,
};

use super::profile::{
    ColumnProfile, CompositeUniqueCandidateProfile, ForeignKeyReality, ProfileSnapshot,
    UniqueCandidateProfile,
};

/// Stable fingerprint of an ordered column list.
///
/// Column names are case-folded; order is significant.
pub fn column_set_fingerprint<S: AsRef<str>>(columns: &[S]) -> String {
    let mut hasher = Sha256::new();
    for column in columns {
        hasher.update(column.as_ref().to_lowercase().as_bytes());
        hasher.update([0x1f]);
    }
    format!("sha256:{:x}", hasher.finalize())
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ColumnSetKey {
    schema: String,
    table: String,
    fingerprint: String,
}

impl ColumnSetKey {
    fn new<S: AsRef<str>>(schema: &str, table: &str, columns: &[S]) -> Self {
        Self {
            schema: schema.to_lowercase(),
            table: table.to_lowercase(),
            fingerprint: column_set_fingerprint(columns),
        }
    }
}

/// Kind of snapshot row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EvidenceKind {
    ColumnProfile,
    UniqueCandidate,
    CompositeCandidate,
    ForeignKey,
}

impl EvidenceKind {
    /// Get a human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            EvidenceKind::ColumnProfile => "column profile",
            EvidenceKind::UniqueCandidate => "duplicate probe",
            EvidenceKind::CompositeCandidate => "composite duplicate probe",
            EvidenceKind::ForeignKey => "orphan probe",
        }
    }
}

/// A snapshot row shadowed by an earlier row for the same subject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateEvidence {
    pub kind: EvidenceKind,
    pub subject: String,
}

/// A model attribute together with its owning entity and module.
#[derive(Debug, Clone, Copy)]
pub struct AttributeEntry<'a> {
    pub module: &'a ModuleModel,
    pub entity: &'a EntityModel,
    pub attribute: &'a AttributeModel,
}

impl AttributeEntry<'_> {
    /// Whether the attribute and everything that owns it is active.
    pub fn is_active(&self) -> bool {
        self.module.is_active && self.entity.is_active && self.attribute.is_active
    }
}

/// An entity together with its owning module.
#[derive(Debug, Clone, Copy)]
pub struct EntityEntry<'a> {
    pub module: &'a ModuleModel,
    pub entity: &'a EntityModel,
}

/// A unique index together with its owning entity and module.
#[derive(Debug, Clone, Copy)]
pub struct IndexEntry<'a> {
    pub module: &'a ModuleModel,
    pub entity: &'a EntityModel,
    pub index: &'a IndexModel,
}

/// Read-only lookup tables built once per run.
///
/// A coordinate present in the model but absent from the snapshot is not an
/// error; lookups simply return `None` ("evidence unavailable").
#[derive(Debug)]
pub struct EvidenceIndex<'a> {
    model: &'a SchemaModel,
    snapshot: &'a ProfileSnapshot,
    attributes: IndexMap<ColumnCoordinate, AttributeEntry<'a>>,
    column_profiles: IndexMap<ColumnCoordinate, &'a ColumnProfile>,
    unique_candidates: IndexMap<ColumnCoordinate, &'a UniqueCandidateProfile>,
    composite_candidates: IndexMap<ColumnSetKey, &'a CompositeUniqueCandidateProfile>,
    foreign_keys: IndexMap<ColumnCoordinate, &'a ForeignKeyReality>,
    entities_by_name: IndexMap<String, Vec<EntityEntry<'a>>>,
    unique_indexes: IndexMap<IndexCoordinate, IndexEntry<'a>>,
    duplicate_attributes: Vec<ColumnCoordinate>,
    duplicate_evidence: Vec<DuplicateEvidence>,
}

impl<'a> EvidenceIndex<'a> {
    /// Build the index, failing when either input is absent.
    pub fn build(
        model: Option<&'a SchemaModel>,
        snapshot: Option<&'a ProfileSnapshot>,
    ) -> Result<Self> {
        let model = model.ok_or_else(|| {
            TightenError::invalid_input(
                InvalidInputKind::MissingModel,
                "a structural model is required to build the evidence index",
            )
        })?;
        let snapshot = snapshot.ok_or_else(|| {
            TightenError::invalid_input(
                InvalidInputKind::MissingEvidence,
                "a profiling snapshot is required to build the evidence index",
            )
        })?;
        Ok(Self::new(model, snapshot))
    }

    /// Build the index from present inputs.
    pub fn new(model: &'a SchemaModel, snapshot: &'a ProfileSnapshot) -> Self {
        let mut attributes = IndexMap::new();
        let mut entities_by_name: IndexMap<String, Vec<EntityEntry<'a>>> = IndexMap::new();
        let mut unique_indexes = IndexMap::new();
        let mut duplicate_attributes = Vec::new();

        for module in &model.modules {
            for entity in &module.entities {
                entities_by_name
                    .entry(entity.logical_name.to_lowercase())
                    .or_default()
                    .push(EntityEntry { module, entity });

                for attribute in &entity.attributes {
                    let coordinate = entity.column_coordinate(&attribute.column_name);
                    if attributes.contains_key(&coordinate) {
                        duplicate_attributes.push(coordinate);
                        continue;
                    }
                    attributes.insert(
                        coordinate,
                        AttributeEntry {
                            module,
                            entity,
                            attribute,
                        },
                    );
                }

                for index in entity.indexes.iter().filter(|ix| ix.is_unique) {
                    unique_indexes
                        .entry(entity.index_coordinate(&index.name))
                        .or_insert(IndexEntry {
                            module,
                            entity,
                            index,
                        });
                }
            }
        }

        let mut duplicate_evidence = Vec::new();
        let mut shadowed = |kind: EvidenceKind, subject: String| {
            duplicate_evidence.push(DuplicateEvidence { kind, subject });
        };

        let mut column_profiles = IndexMap::new();
        for profile in &snapshot.columns {
            let coordinate = profile.coordinate();
            if column_profiles.contains_key(&coordinate) {
                shadowed(EvidenceKind::ColumnProfile, coordinate.to_string());
                continue;
            }
            column_profiles.insert(coordinate, profile);
        }

        let mut unique_candidates = IndexMap::new();
        for candidate in &snapshot.unique_candidates {
            let coordinate = candidate.coordinate();
            if unique_candidates.contains_key(&coordinate) {
                shadowed(EvidenceKind::UniqueCandidate, coordinate.to_string());
                continue;
            }
            unique_candidates.insert(coordinate, candidate);
        }

        let mut composite_candidates = IndexMap::new();
        for candidate in &snapshot.composite_unique_candidates {
            let key = ColumnSetKey::new(&candidate.schema, &candidate.table, &candidate.columns);
            if composite_candidates.contains_key(&key) {
                shadowed(
                    EvidenceKind::CompositeCandidate,
                    format!(
                        "{}.{}({})",
                        candidate.schema,
                        candidate.table,
                        candidate.columns.join(", ")
                    ),
                );
                continue;
            }
            composite_candidates.insert(key, candidate);
        }

        let mut foreign_keys = IndexMap::new();
        for reality in &snapshot.foreign_keys {
            let source = reality.reference.source();
            if foreign_keys.contains_key(&source) {
                shadowed(EvidenceKind::ForeignKey, source.to_string());
                continue;
            }
            foreign_keys.insert(source, reality);
        }

        tracing::debug!(
            attributes = attributes.len(),
            column_profiles = column_profiles.len(),
            unique_candidates = unique_candidates.len(),
            composite_candidates = composite_candidates.len(),
            foreign_keys = foreign_keys.len(),
            "evidence index built"
        );

        Self {
            model,
            snapshot,
            attributes,
            column_profiles,
            unique_candidates,
            composite_candidates,
            foreign_keys,
            entities_by_name,
            unique_indexes,
            duplicate_attributes,
            duplicate_evidence,
        }
    }

    /// The structural model this index was built from.
    pub fn model(&self) -> &'a SchemaModel {
        self.model
    }

    /// The snapshot this index was built from.
    pub fn snapshot(&self) -> &'a ProfileSnapshot {
        self.snapshot
    }

    pub fn attribute(&self, coordinate: &ColumnCoordinate) -> Option<&AttributeEntry<'a>> {
        self.attributes.get(coordinate)
    }

    /// All indexed attributes in model order.
    pub fn attributes(&self) -> impl Iterator<Item = (&ColumnCoordinate, &AttributeEntry<'a>)> {
        self.attributes.iter()
    }

    pub fn column_profile(&self, coordinate: &ColumnCoordinate) -> Option<&'a ColumnProfile> {
        self.column_profiles.get(coordinate).copied()
    }

    pub fn unique_candidate(
        &self,
        coordinate: &ColumnCoordinate,
    ) -> Option<&'a UniqueCandidateProfile> {
        self.unique_candidates.get(coordinate).copied()
    }

    /// Composite duplicate probe for an ordered column list on a table.
    pub fn composite_candidate<S: AsRef<str>>(
        &self,
        schema: &str,
        table: &str,
        columns: &[S],
    ) -> Option<&'a CompositeUniqueCandidateProfile> {
        self.composite_candidates
            .get(&ColumnSetKey::new(schema, table, columns))
            .copied()
    }

    /// Orphan probe keyed by the reference's source column.
    pub fn foreign_key(&self, source: &ColumnCoordinate) -> Option<&'a ForeignKeyReality> {
        self.foreign_keys.get(source).copied()
    }

    /// Entities with the given logical name (case-insensitive). More than
    /// one entry means the name is ambiguous across modules.
    pub fn entities_named(&self, logical_name: &str) -> &[EntityEntry<'a>] {
        self.entities_by_name
            .get(&logical_name.to_lowercase())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn unique_index(&self, coordinate: &IndexCoordinate) -> Option<&IndexEntry<'a>> {
        self.unique_indexes.get(coordinate)
    }

    /// All unique indexes in model order.
    pub fn unique_indexes(&self) -> impl Iterator<Item = (&IndexCoordinate, &IndexEntry<'a>)> {
        self.unique_indexes.iter()
    }

    /// Model coordinates declared more than once (first declaration wins).
    pub fn duplicate_attributes(&self) -> &[ColumnCoordinate] {
        &self.duplicate_attributes
    }

    /// Snapshot rows reported more than once (first row wins).
    pub fn duplicate_evidence(&self) -> &[DuplicateEvidence] {
        &self.duplicate_evidence
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evidence::{ForeignKeyReference, ProbeStatus};
    use crate::model::{AttributeModel, EntityModel, IndexColumnModel, IndexModel, ModuleModel};
    use chrono::Utc;

    fn model() -> SchemaModel {
        SchemaModel::new().with_module(
            ModuleModel::new("Sales").with_entity(
                EntityModel::new("Customer", "dbo", "Customer")
                    .with_attribute(AttributeModel::new("Id", "Identifier").identifier())
                    .with_attribute(AttributeModel::new("Email", "Text"))
                    .with_attribute(AttributeModel::new("TenantId", "Integer"))
                    .with_index(IndexModel::unique(
                        "UX_Customer_Tenant_Email",
                        vec![
                            IndexColumnModel::key("TenantId", 1),
                            IndexColumnModel::key("Email", 2),
                        ],
                    )),
            ),
        )
    }

    #[test]
    fn test_build_requires_inputs() {
        let model = model();
        let snapshot = ProfileSnapshot::new();

        let err = EvidenceIndex::build(None, Some(&snapshot)).unwrap_err();
        assert_eq!(err.invalid_input_kind(), Some(InvalidInputKind::MissingModel));

        let err = EvidenceIndex::build(Some(&model), None).unwrap_err();
        assert_eq!(
            err.invalid_input_kind(),
            Some(InvalidInputKind::MissingEvidence)
        );

        assert!(EvidenceIndex::build(Some(&model), Some(&snapshot)).is_ok());
    }

    #[test]
    fn test_lookups_ignore_case() {
        let model = model();
        let coord = ColumnCoordinate::new("dbo", "Customer", "Email");
        let snapshot = ProfileSnapshot::new().with_column(ColumnProfile::new(
            &ColumnCoordinate::new("DBO", "CUSTOMER", "EMAIL"),
            10,
            0,
            ProbeStatus::full_scan(Utc::now(), 10),
        ));
        let index = EvidenceIndex::new(&model, &snapshot);

        assert!(index.attribute(&coord).is_some());
        assert!(index.column_profile(&coord).is_some());
        assert_eq!(index.entities_named("CUSTOMER").len(), 1);
        assert!(index
            .unique_index(&IndexCoordinate::new("dbo", "customer", "ux_customer_tenant_email"))
            .is_some());
    }

    #[test]
    fn test_missing_evidence_is_not_an_error() {
        let model = model();
        let snapshot = ProfileSnapshot::new();
        let index = EvidenceIndex::new(&model, &snapshot);

        let coord = ColumnCoordinate::new("dbo", "Customer", "Email");
        assert!(index.attribute(&coord).is_some());
        assert!(index.column_profile(&coord).is_none());
        assert!(index.unique_candidate(&coord).is_none());
    }

    #[test]
    fn test_composite_lookup_uses_ordered_fingerprint() {
        let model = model();
        let snapshot = ProfileSnapshot::new().with_composite_candidate(
            CompositeUniqueCandidateProfile::new(
                "dbo",
                "Customer",
                vec!["TenantId".to_string(), "Email".to_string()],
                true,
            ),
        );
        let index = EvidenceIndex::new(&model, &snapshot);

        assert!(index
            .composite_candidate("DBO", "customer", &["tenantid", "EMAIL"])
            .is_some());
        assert!(index
            .composite_candidate("dbo", "Customer", &["Email", "TenantId"])
            .is_none());
    }

    #[test]
    fn test_fingerprint_is_stable_and_order_sensitive() {
        let a = column_set_fingerprint(&["TenantId", "Email"]);
        let b = column_set_fingerprint(&["tenantid", "email"]);
        let c = column_set_fingerprint(&["Email", "TenantId"]);

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.starts_with("sha256:"));
    }

    #[test]
    fn test_duplicate_model_coordinates_recorded() {
        let model = SchemaModel::new().with_module(
            ModuleModel::new("Sales").with_entity(
                EntityModel::new("Customer", "dbo", "Customer")
                    .with_attribute(AttributeModel::new("Email", "Text"))
                    .with_attribute(AttributeModel::new("EmailAlias", "Text").with_column_name("EMAIL")),
            ),
        );
        let snapshot = ProfileSnapshot::new();
        let index = EvidenceIndex::new(&model, &snapshot);

        assert_eq!(index.duplicate_attributes().len(), 1);
        let entry = index
            .attribute(&ColumnCoordinate::new("dbo", "Customer", "Email"))
            .unwrap();
        assert_eq!(entry.attribute.logical_name, "Email");
    }

    #[test]
    fn test_duplicate_evidence_rows_recorded() {
        let model = model();
        let email = ColumnCoordinate::new("dbo", "Customer", "Email");
        let status = ProbeStatus::full_scan(Utc::now(), 10);
        let composite = || {
            CompositeUniqueCandidateProfile::new(
                "dbo",
                "Customer",
                vec!["TenantId".to_string(), "Email".to_string()],
                false,
            )
        };
        let reality = || {
            ForeignKeyReality::new(
                ForeignKeyReference::new(&email, &ColumnCoordinate::new("dbo", "Contact", "Email")),
                0,
                status.clone(),
            )
        };
        let snapshot = ProfileSnapshot::new()
            .with_column(ColumnProfile::new(&email, 10, 0, status.clone()))
            .with_column(ColumnProfile::new(&email, 10, 4, status.clone()))
            .with_unique_candidate(UniqueCandidateProfile::new(&email, false, status.clone()))
            .with_unique_candidate(UniqueCandidateProfile::new(&email, true, status.clone()))
            .with_composite_candidate(composite())
            .with_composite_candidate(composite())
            .with_foreign_key(reality())
            .with_foreign_key(reality());
        let index = EvidenceIndex::new(&model, &snapshot);

        let kinds: Vec<EvidenceKind> = index.duplicate_evidence().iter().map(|d| d.kind).collect();
        assert_eq!(
            kinds,
            vec![
                EvidenceKind::ColumnProfile,
                EvidenceKind::UniqueCandidate,
                EvidenceKind::CompositeCandidate,
                EvidenceKind::ForeignKey,
            ]
        );
        assert_eq!(index.column_profile(&email).unwrap().null_count, 0);
        assert!(!index.unique_candidate(&email).unwrap().has_duplicate);
        assert_eq!(
            index.duplicate_evidence()[2].subject,
            "dbo.Customer(TenantId, Email)"
        );
    }
}
