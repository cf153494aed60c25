//! Profiling evidence and the index that joins it to the structural model.

mod index;
mod profile;

pub use index::{
    column_set_fingerprint, AttributeEntry, DuplicateEvidence, EntityEntry, EvidenceIndex,
    EvidenceKind, IndexEntry,
};
pub use profile::{
    ColumnProfile, CompositeUniqueCandidateProfile, ForeignKeyReality, ForeignKeyReference,
    ProbeOutcome, ProbeStatus, ProfileSnapshot, RowSample, UniqueCandidateProfile,
};
