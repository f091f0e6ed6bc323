//! Multi-column sort specification and comparator

use crate::core::field::FieldValue;
use crate::core::record::Record;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

/// Sort direction for one column
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }

    fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Ok(SortDirection::Asc),
            "desc" => Ok(SortDirection::Desc),
            other => Err(format!("unknown sort direction '{}'", other)),
        }
    }
}

/// Ordered mapping of column id to direction
///
/// The first entry has the highest priority, later entries break ties.
/// Unlike a plain `IndexMap`, equality and hashing are order-sensitive:
/// `[status, createdAt]` and `[createdAt, status]` are different sorts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SortSpec(IndexMap<String, SortDirection>);

impl SortSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a column, or update its direction if it is already present
    pub fn push(&mut self, column_id: impl Into<String>, direction: SortDirection) {
        self.0.insert(column_id.into(), direction);
    }

    /// Builder form of [`SortSpec::push`]
    pub fn then(mut self, column_id: impl Into<String>, direction: SortDirection) -> Self {
        self.push(column_id, direction);
        self
    }

    pub fn remove(&mut self, column_id: &str) -> Option<SortDirection> {
        self.0.shift_remove(column_id)
    }

    pub fn direction(&self, column_id: &str) -> Option<SortDirection> {
        self.0.get(column_id).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, SortDirection)> {
        self.0.iter().map(|(column, direction)| (column.as_str(), *direction))
    }
}

impl PartialEq for SortSpec {
    fn eq(&self, other: &Self) -> bool {
        self.0.len() == other.0.len() && self.0.iter().eq(other.0.iter())
    }
}

impl Eq for SortSpec {}

impl Hash for SortSpec {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for (column, direction) in &self.0 {
            column.hash(state);
            direction.hash(state);
        }
    }
}

impl<S: Into<String>> FromIterator<(S, SortDirection)> for SortSpec {
    fn from_iter<I: IntoIterator<Item = (S, SortDirection)>>(iter: I) -> Self {
        let mut spec = SortSpec::new();
        for (column, direction) in iter {
            spec.push(column, direction);
        }
        spec
    }
}

/// Compare two records under `spec`
///
/// Columns listed in `temporal_columns` compare as timestamps. The first
/// column that does not tie decides the result.
pub fn compare<R: Record>(
    a: &R,
    b: &R,
    spec: &SortSpec,
    temporal_columns: &[String],
) -> Ordering {
    for (column_id, direction) in spec.iter() {
        let temporal = temporal_columns.iter().any(|c| c == column_id);
        let ordering = compare_values(&a.field(column_id), &b.field(column_id), temporal);
        if ordering != Ordering::Equal {
            return direction.apply(ordering);
        }
    }
    Ordering::Equal
}

/// Stable sort of `records` under `spec`; an empty spec leaves them untouched
pub fn sort_records<R: Record>(records: &mut [R], spec: &SortSpec, temporal_columns: &[String]) {
    if spec.is_empty() {
        return;
    }
    records.sort_by(|a, b| compare(a, b, spec, temporal_columns));
}

/// Column-level comparison of two field values
///
/// Timestamps that fail to parse tie rather than reorder.
pub fn compare_values(a: &FieldValue, b: &FieldValue, temporal: bool) -> Ordering {
    if temporal {
        return match (a.as_timestamp_millis(), b.as_timestamp_millis()) {
            (Some(a), Some(b)) => a.cmp(&b),
            _ => Ordering::Equal,
        };
    }

    match (a, b) {
        (FieldValue::String(a), FieldValue::String(b)) => locale_compare(a, b),
        _ => locale_compare(&a.coerce_to_string(), &b.coerce_to_string()),
    }
}

/// Collation-style string comparison
///
/// Compares case-folded text first; strings that differ only by case order
/// lowercase before uppercase (`"apple" < "Apple" < "banana"`).
pub fn locale_compare(a: &str, b: &str) -> Ordering {
    let folded_a = a.chars().flat_map(char::to_lowercase);
    let folded_b = b.chars().flat_map(char::to_lowercase);
    folded_a.cmp(folded_b).then_with(|| b.cmp(a))
}
