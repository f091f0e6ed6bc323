//! Faceted values for building filter option lists

use crate::core::record::Record;
use std::collections::BTreeMap;

/// Distinct string-coerced values of `column_id` with their occurrence count
///
/// Null values are skipped. Used to offer the options of a multi-select filter.
pub fn unique_values<R: Record>(records: &[R], column_id: &str) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for record in records {
        let value = record.field(column_id);
        if value.is_null() {
            continue;
        }
        *counts.entry(value.coerce_to_string().into_owned()).or_insert(0) += 1;
    }
    counts
}

/// Smallest and largest timestamp found in `column_id`
///
/// Values that do not parse as timestamps are ignored. Used to bound a date
/// range picker.
pub fn min_max_timestamps<R: Record>(records: &[R], column_id: &str) -> Option<(i64, i64)> {
    records
        .iter()
        .filter_map(|record| record.field(column_id).as_timestamp_millis())
        .fold(None, |acc, ts| match acc {
            None => Some((ts, ts)),
            Some((min, max)) => Some((min.min(ts), max.max(ts))),
        })
}
