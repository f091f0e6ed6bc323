//! Column filter values and the predicate evaluator

use crate::core::record::Record;
use serde::de::Deserializer;
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Filter entries keyed by column id
///
/// A sorted map, so two filter sets with the same entries compare and
/// serialize identically whatever order they were built in.
pub type ColumnFilters = BTreeMap<String, FilterValue>;

/// The filter applied to one column
///
/// Serialized externally tagged, e.g. `{"multiSelect": ["draft"]}` or
/// `{"dateRange": [1704067200000, null]}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FilterValue {
    /// Case-insensitive substring match on a string field
    Text(String),
    /// Inclusive epoch-millisecond bounds, either end optional
    DateRange(DateRange),
    /// Field value must be one of the selected literals
    MultiSelect(BTreeSet<String>),
    /// Case-insensitive substring match on a user's name or handle
    User(String),
}

impl FilterValue {
    pub fn text(text: impl Into<String>) -> Self {
        FilterValue::Text(text.into())
    }

    pub fn user(query: impl Into<String>) -> Self {
        FilterValue::User(query.into())
    }

    pub fn date_range(from: Option<i64>, to: Option<i64>) -> Self {
        FilterValue::DateRange(DateRange { from, to })
    }

    pub fn multi_select<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        FilterValue::MultiSelect(values.into_iter().map(Into::into).collect())
    }

    /// Whether this entry restricts anything
    ///
    /// Empty text, an unbounded range and an empty selection are all inactive.
    pub fn is_active(&self) -> bool {
        match self {
            FilterValue::Text(text) | FilterValue::User(text) => !text.is_empty(),
            FilterValue::DateRange(range) => range.is_bounded(),
            FilterValue::MultiSelect(values) => !values.is_empty(),
        }
    }
}

/// Inclusive date bounds in epoch milliseconds
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct DateRange {
    pub from: Option<i64>,
    pub to: Option<i64>,
}

impl DateRange {
    pub fn is_bounded(&self) -> bool {
        self.from.is_some() || self.to.is_some()
    }

    pub fn contains(&self, timestamp: i64) -> bool {
        self.from.is_none_or(|from| timestamp >= from) && self.to.is_none_or(|to| timestamp <= to)
    }
}

impl Serialize for DateRange {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        (self.from, self.to).serialize(serializer)
    }
}

/// A bound as it may appear on the wire: a number, a numeric string or null
#[derive(Deserialize)]
#[serde(untagged)]
enum RawBound {
    Millis(i64),
    Float(f64),
    Text(String),
}

impl RawBound {
    fn into_millis(self) -> Option<i64> {
        match self {
            RawBound::Millis(ms) => Some(ms),
            RawBound::Float(f) if f.is_finite() => Some(f as i64),
            RawBound::Float(_) => None,
            RawBound::Text(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()).map(|f| f as i64),
        }
    }
}

impl<'de> Deserialize<'de> for DateRange {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let bounds: Vec<Option<RawBound>> = Vec::deserialize(deserializer)?;
        let mut bounds = bounds.into_iter().map(|b| b.and_then(RawBound::into_millis));
        Ok(DateRange {
            from: bounds.next().flatten(),
            to: bounds.next().flatten(),
        })
    }
}

/// Does `record` satisfy `filter` on `column_id`
///
/// Inactive filters match everything. Operands that cannot be interpreted
/// (a number under a text filter, an unparseable date under a bounded range)
/// never match.
pub fn matches<R: Record>(record: &R, column_id: &str, filter: &FilterValue) -> bool {
    if !filter.is_active() {
        return true;
    }

    match filter {
        FilterValue::Text(text) => record
            .field(column_id)
            .as_string()
            .is_some_and(|value| contains_ignore_case(value, text)),
        FilterValue::DateRange(range) => record
            .field(column_id)
            .as_timestamp_millis()
            .is_some_and(|timestamp| range.contains(timestamp)),
        FilterValue::MultiSelect(values) => {
            values.contains(record.field(column_id).coerce_to_string().as_ref())
        }
        FilterValue::User(query) => record.user(column_id).is_some_and(|user| {
            contains_ignore_case(user.name, query) || contains_ignore_case(user.username, query)
        }),
    }
}

/// Does `record` satisfy every active entry of `filters`
pub fn matches_all<R: Record>(record: &R, filters: &ColumnFilters) -> bool {
    filters
        .iter()
        .all(|(column_id, filter)| matches(record, column_id, filter))
}

/// Drop inactive entries
pub fn retain_active(filters: &mut ColumnFilters) {
    filters.retain(|_, filter| filter.is_active());
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}
