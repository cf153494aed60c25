//! Structural model of the source schema: modules, entities, attributes,
//! indexes and the coordinates that join them to profiling evidence.

mod attribute;
mod coordinate;
mod entity;

pub use attribute::{AttributeModel, AttributeOnDisk, AttributeReference};
pub use coordinate::{ColumnCoordinate, IndexCoordinate};
pub(crate) use coordinate::{cmp_ignore_case, eq_ignore_case};
pub use entity::{
    EntityModel, IndexColumnModel, IndexModel, ModuleModel, RelationshipModel, SchemaModel,
    SortDirection,
};
