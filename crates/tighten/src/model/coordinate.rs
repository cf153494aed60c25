//! Case-insensitive coordinates that join model elements to evidence rows.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

/// Compare two identifiers ignoring case.
pub(crate) fn cmp_ignore_case(a: &str, b: &str) -> Ordering {
    a.chars()
        .flat_map(char::to_lowercase)
        .cmp(b.chars().flat_map(char::to_lowercase))
}

/// Check two identifiers for equality ignoring case.
pub(crate) fn eq_ignore_case(a: &str, b: &str) -> bool {
    cmp_ignore_case(a, b) == Ordering::Equal
}

fn hash_ignore_case<H: Hasher>(value: &str, state: &mut H) {
    for ch in value.chars().flat_map(char::to_lowercase) {
        ch.hash(state);
    }
    // Part separator so ("ab", "c") and ("a", "bc") hash differently.
    0xffu8.hash(state);
}

/// Identifies a physical column: (schema, table, column).
///
/// Equality, hashing and ordering ignore case on all three parts, so a
/// coordinate taken from the model matches the profiler's spelling of the
/// same column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnCoordinate {
    pub schema: String,
    pub table: String,
    pub column: String,
}

impl ColumnCoordinate {
    /// Create a new column coordinate.
    pub fn new(
        schema: impl Into<String>,
        table: impl Into<String>,
        column: impl Into<String>,
    ) -> Self {
        Self {
            schema: schema.into(),
            table: table.into(),
            column: column.into(),
        }
    }
}

impl PartialEq for ColumnCoordinate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ColumnCoordinate {}

impl Hash for ColumnCoordinate {
    fn hash<H: Hasher>(&self, state: &mut H) {
        hash_ignore_case(&self.schema, state);
        hash_ignore_case(&self.table, state);
        hash_ignore_case(&self.column, state);
    }
}

impl Ord for ColumnCoordinate {
    fn cmp(&self, other: &Self) -> Ordering {
        cmp_ignore_case(&self.schema, &other.schema)
            .then_with(|| cmp_ignore_case(&self.table, &other.table))
            .then_with(|| cmp_ignore_case(&self.column, &other.column))
    }
}

impl PartialOrd for ColumnCoordinate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for ColumnCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.schema, self.table, self.column)
    }
}

/// Identifies an index: (schema, table, index name). Same semantics as
/// [`ColumnCoordinate`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexCoordinate {
    pub schema: String,
    pub table: String,
    pub index: String,
}

impl IndexCoordinate {
    /// Create a new index coordinate.
    pub fn new(
        schema: impl Into<String>,
        table: impl Into<String>,
        index: impl Into<String>,
    ) -> Self {
        Self {
            schema: schema.into(),
            table: table.into(),
            index: index.into(),
        }
    }
}

impl PartialEq for IndexCoordinate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for IndexCoordinate {}

impl Hash for IndexCoordinate {
    fn hash<H: Hasher>(&self, state: &mut H) {
        hash_ignore_case(&self.schema, state);
        hash_ignore_case(&self.table, state);
        hash_ignore_case(&self.index, state);
    }
}

impl Ord for IndexCoordinate {
    fn cmp(&self, other: &Self) -> Ordering {
        cmp_ignore_case(&self.schema, &other.schema)
            .then_with(|| cmp_ignore_case(&self.table, &other.table))
            .then_with(|| cmp_ignore_case(&self.index, &other.index))
    }
}

impl PartialOrd for IndexCoordinate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for IndexCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.schema, self.table, self.index)
    }
}
