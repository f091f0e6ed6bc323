//! View requests, results and the pure query pipeline

use crate::core::filter::{self, ColumnFilters, FilterValue};
use crate::core::record::Record;
use crate::core::sort::{self, SortDirection, SortSpec};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default page size when neither the URL nor storage provide one
pub const DEFAULT_PER_PAGE: usize = 20;

/// The complete, value-comparable description of one query
///
/// Two requests are equal when page, page size, sort (in order) and the set of
/// filter entries are equal. Filter insertion order does not matter.
///
/// # Example
/// ```rust,ignore
/// let request = ViewRequest::new(1, 20)
///     .with_sort("status", SortDirection::Asc)
///     .with_filter("status", FilterValue::multi_select(["draft"]));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewRequest {
    /// Page number (starts at 1)
    pub page: usize,

    /// Number of records per page
    pub per_page: usize,

    /// Sort columns in priority order
    #[serde(default)]
    pub sort: SortSpec,

    /// Filters keyed by column id
    #[serde(default)]
    pub filter: ColumnFilters,
}

impl Default for ViewRequest {
    fn default() -> Self {
        Self::new(1, DEFAULT_PER_PAGE)
    }
}

impl ViewRequest {
    /// Create a request for one page, with no sort and no filter
    ///
    /// `page` and `per_page` are raised to at least 1.
    pub fn new(page: usize, per_page: usize) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.max(1),
            sort: SortSpec::new(),
            filter: ColumnFilters::new(),
        }
    }

    pub fn with_sort(mut self, column_id: impl Into<String>, direction: SortDirection) -> Self {
        self.sort.push(column_id, direction);
        self
    }

    pub fn with_filter(mut self, column_id: impl Into<String>, value: FilterValue) -> Self {
        self.filter.insert(column_id.into(), value);
        self
    }

    /// Copy of this request with out-of-range sizes raised to 1 and inactive
    /// filter entries dropped
    ///
    /// Normalized requests that describe the same view share a cache key.
    pub fn normalized(&self) -> Self {
        let mut request = self.clone();
        request.page = request.page.max(1);
        request.per_page = request.per_page.max(1);
        filter::retain_active(&mut request.filter);
        request
    }

    /// Index of the first record on this page
    pub fn offset(&self) -> usize {
        (self.page.max(1) - 1).saturating_mul(self.per_page.max(1))
    }

    /// Canonical cache key of this request
    pub fn cache_key(&self) -> CacheKey {
        let normalized = self.normalized();
        let key = serde_json::to_string(&normalized).unwrap_or_else(|_| format!("{:?}", normalized));
        CacheKey(key)
    }
}

/// Canonical serialization of a [`ViewRequest`]
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One page of records plus the page count of the filtered set
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResult<R> {
    /// The records on the requested page
    pub records: Vec<R>,

    /// `ceil(total / per_page)`
    pub total_pages: usize,

    /// Number of records that passed the filters
    pub total: usize,
}

impl<R> QueryResult<R> {
    pub fn empty() -> Self {
        Self {
            records: Vec::new(),
            total_pages: 0,
            total: 0,
        }
    }

    /// Pagination metadata for the request that produced this result
    pub fn pagination(&self, request: &ViewRequest) -> PaginationMeta {
        PaginationMeta::new(request.page, request.per_page, self.total)
    }
}

/// Pagination metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationMeta {
    /// Current page number (starts at 1)
    pub page: usize,

    /// Number of records per page
    pub per_page: usize,

    /// Total number of records (after filters)
    pub total: usize,

    /// Total number of pages
    pub total_pages: usize,

    /// Whether there is a next page
    pub has_next: bool,

    /// Whether there is a previous page
    pub has_prev: bool,
}

impl PaginationMeta {
    /// Create pagination metadata from calculation
    pub fn new(page: usize, per_page: usize, total: usize) -> Self {
        // Ensure per_page is at least 1 to avoid division by zero
        let per_page = per_page.max(1);
        let page = page.max(1);
        let total_pages = total.div_ceil(per_page);
        let start = (page - 1).saturating_mul(per_page);

        Self {
            page,
            per_page,
            total,
            total_pages,
            has_next: start.saturating_add(per_page) < total,
            has_prev: page > 1,
        }
    }
}

/// Filter, sort and paginate `records` for `request`
///
/// Runs in order: conjunction of active filters, stable multi-column sort,
/// page count, then the `[offset, offset + per_page)` window. A page past the
/// end yields no records; it is not an error.
pub fn query<R: Record>(
    records: &[R],
    request: &ViewRequest,
    temporal_columns: &[String],
) -> QueryResult<R> {
    let request = request.normalized();

    let mut filtered: Vec<R> = records
        .iter()
        .filter(|record| filter::matches_all(*record, &request.filter))
        .cloned()
        .collect();

    sort::sort_records(&mut filtered, &request.sort, temporal_columns);

    let total = filtered.len();
    let total_pages = total.div_ceil(request.per_page);
    let page: Vec<R> = filtered
        .into_iter()
        .skip(request.offset())
        .take(request.per_page)
        .collect();

    QueryResult {
        records: page,
        total_pages,
        total,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::record::JsonRecord;
    use serde_json::json;

    fn records(n: usize) -> Vec<JsonRecord> {
        (1..=n)
            .map(|i| JsonRecord::new(json!({"id": i, "status": if i % 2 == 0 { "draft" } else { "published" }})))
            .collect()
    }

    fn temporal() -> Vec<String> {
        vec!["createdAt".to_string()]
    }

    #[test]
    fn test_request_defaults() {
        let request = ViewRequest::default();
        assert_eq!(request.page, 1);
        assert_eq!(request.per_page, 20);
        assert!(request.sort.is_empty());
        assert!(request.filter.is_empty());
    }

    #[test]
    fn test_request_clamps_zero() {
        let request = ViewRequest::new(0, 0);
        assert_eq!(request.page, 1);
        assert_eq!(request.per_page, 1);
    }

    #[test]
    fn test_cache_key_ignores_filter_insertion_order() {
        let a = ViewRequest::new(1, 20)
            .with_filter("status", FilterValue::multi_select(["draft"]))
            .with_filter("title", FilterValue::text("rust"));
        let b = ViewRequest::new(1, 20)
            .with_filter("title", FilterValue::text("rust"))
            .with_filter("status", FilterValue::multi_select(["draft"]));

        assert_eq!(a, b);
        assert_eq!(a.cache_key(), b.cache_key());
    }

    #[test]
    fn test_cache_key_respects_sort_order() {
        let a = ViewRequest::new(1, 20)
            .with_sort("status", SortDirection::Asc)
            .with_sort("createdAt", SortDirection::Desc);
        let b = ViewRequest::new(1, 20)
            .with_sort("createdAt", SortDirection::Desc)
            .with_sort("status", SortDirection::Asc);

        assert_ne!(a, b);
        assert_ne!(a.cache_key(), b.cache_key());
    }

    #[test]
    fn test_cache_key_drops_inactive_filters() {
        let a = ViewRequest::new(1, 20).with_filter("title", FilterValue::text(""));
        let b = ViewRequest::new(1, 20);
        assert_eq!(a.cache_key(), b.cache_key());
    }

    #[test]
    fn test_query_last_partial_page() {
        let result = query(&records(45), &ViewRequest::new(3, 20), &temporal());
        assert_eq!(result.records.len(), 5);
        assert_eq!(result.total_pages, 3);
        assert_eq!(result.records[0].id(), "41");
        assert_eq!(result.records[4].id(), "45");
    }

    #[test]
    fn test_query_page_past_end_is_empty() {
        let result = query(&records(45), &ViewRequest::new(9, 20), &temporal());
        assert!(result.records.is_empty());
        assert_eq!(result.total_pages, 3);
        assert_eq!(result.total, 45);
    }

    #[test]
    fn test_query_filters_before_paginating() {
        let request = ViewRequest::new(1, 20)
            .with_filter("status", FilterValue::multi_select(["draft"]));
        let result = query(&records(45), &request, &temporal());
        assert_eq!(result.total, 22);
        assert_eq!(result.total_pages, 2);
        assert_eq!(result.records.len(), 20);
    }

    #[test]
    fn test_query_empty_set() {
        let result = query(&Vec::<JsonRecord>::new(), &ViewRequest::default(), &temporal());
        assert!(result.records.is_empty());
        assert_eq!(result.total_pages, 0);
    }

    #[test]
    fn test_pagination_meta() {
        let meta = PaginationMeta::new(1, 20, 145);
        assert_eq!(meta.total, 145);
        assert_eq!(meta.total_pages, 8);
        assert!(!meta.has_prev);
        assert!(meta.has_next);

        let last = PaginationMeta::new(8, 20, 145);
        assert!(last.has_prev);
        assert!(!last.has_next);
    }

    #[test]
    fn test_request_wire_format() {
        let request = ViewRequest::new(2, 50).with_sort("title", SortDirection::Desc);
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["perPage"], 50);
        assert_eq!(json["sort"]["title"], "desc");
    }
}
