//! URL query string encoding of the shareable view state
//!
//! # Format
//!
//! ```text
//! ?page=2&perPage=50&sort=status.asc,createdAt.desc&filter={"status":{"multiSelect":["draft"]}}
//! ```
//!
//! - `page`: positive integer, default 1
//! - `perPage`: positive integer, default from storage or configuration
//! - `sort`: comma-separated `column.direction` pairs in priority order
//! - `filter`: JSON object of column id to filter value
//!
//! Parameters this module does not own are kept as-is when the query string
//! is rewritten. A malformed parameter falls back to its default and is
//! logged; it never fails the parse.

use crate::core::error::{UrlError, ViewResult};
use crate::core::filter::{self, ColumnFilters, FilterValue};
use crate::core::sort::{SortDirection, SortSpec};
use crate::state::PaginationState;
use serde_json::{Map, Value};
use std::sync::{Arc, RwLock};
use url::form_urlencoded;

pub const PAGE_PARAM: &str = "page";
pub const PER_PAGE_PARAM: &str = "perPage";
pub const SORT_PARAM: &str = "sort";
pub const FILTER_PARAM: &str = "filter";

/// The URL-authoritative part of the view state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShareableState {
    pub pagination: PaginationState,
    pub sort: SortSpec,
    pub filter: ColumnFilters,
}

impl ShareableState {
    /// Encode as a query string (without the leading `?`)
    ///
    /// `page` and `perPage` are always written; `sort` and `filter` are
    /// omitted when empty, and inactive filter entries are dropped.
    pub fn to_query(&self) -> String {
        self.to_query_with(&[])
    }

    /// Encode, appending unrelated parameters after the owned ones
    pub fn to_query_with(&self, extra: &[(String, String)]) -> String {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        serializer.append_pair(PAGE_PARAM, &self.pagination.page.to_string());
        serializer.append_pair(PER_PAGE_PARAM, &self.pagination.per_page.to_string());

        if !self.sort.is_empty() {
            serializer.append_pair(SORT_PARAM, &encode_sort(&self.sort));
        }

        let mut filters = self.filter.clone();
        filter::retain_active(&mut filters);
        if !filters.is_empty() {
            match serde_json::to_string(&filters) {
                Ok(json) => {
                    serializer.append_pair(FILTER_PARAM, &json);
                }
                Err(e) => tracing::warn!("Dropping unserializable filter state: {}", e),
            }
        }

        for (name, value) in extra {
            serializer.append_pair(name, value);
        }
        serializer.finish()
    }

    /// Decode a query string, applying defaults for absent or malformed params
    pub fn from_query(query: &str, default_per_page: usize) -> Self {
        ParsedQuery::parse(query).resolve(default_per_page)
    }
}

/// A query string split into the owned parameters and everything else
///
/// `None` means the parameter was absent or could not be parsed; hydration
/// uses this to decide whether durable storage may fill the gap.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedQuery {
    pub page: Option<usize>,
    pub per_page: Option<usize>,
    pub sort: Option<SortSpec>,
    pub filter: Option<ColumnFilters>,
    pub extra: Vec<(String, String)>,
}

impl ParsedQuery {
    pub fn parse(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        let mut parsed = ParsedQuery::default();

        for (name, value) in form_urlencoded::parse(query.as_bytes()) {
            match name.as_ref() {
                PAGE_PARAM => parsed.page = recover(parse_positive(PAGE_PARAM, &value)),
                PER_PAGE_PARAM => parsed.per_page = recover(parse_positive(PER_PAGE_PARAM, &value)),
                SORT_PARAM => parsed.sort = recover(decode_sort(&value)),
                FILTER_PARAM => parsed.filter = recover(decode_filter(&value)),
                _ => parsed.extra.push((name.into_owned(), value.into_owned())),
            }
        }

        parsed
    }

    /// Fill absent parameters with defaults
    pub fn resolve(self, default_per_page: usize) -> ShareableState {
        ShareableState {
            pagination: PaginationState::new(
                self.page.unwrap_or(1),
                self.per_page.unwrap_or(default_per_page),
            ),
            sort: self.sort.unwrap_or_default(),
            filter: self.filter.unwrap_or_default(),
        }
    }
}

fn recover<T>(result: Result<T, UrlError>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(code = e.error_code(), "Ignoring query parameter: {}", e);
            None
        }
    }
}

fn invalid(name: &str, value: &str, message: impl Into<String>) -> UrlError {
    UrlError::InvalidParam {
        name: name.to_string(),
        value: value.to_string(),
        message: message.into(),
    }
}

fn parse_positive(name: &str, value: &str) -> Result<usize, UrlError> {
    match value.trim().parse::<usize>() {
        Ok(0) => Err(invalid(name, value, "must be at least 1")),
        Ok(n) => Ok(n),
        Err(e) => Err(invalid(name, value, e.to_string())),
    }
}

/// `status.asc,createdAt.desc`
///
/// Column ids are form-encoded so an id containing `,` stays one entry.
pub fn encode_sort(sort: &SortSpec) -> String {
    sort.iter()
        .map(|(column, direction)| {
            let column: String = form_urlencoded::byte_serialize(column.as_bytes()).collect();
            format!("{}.{}", column, direction)
        })
        .collect::<Vec<_>>()
        .join(",")
}

/// Inverse of [`encode_sort`]
///
/// Unknown directions invalidate the whole parameter; an empty value is an
/// empty sort.
pub fn decode_sort(value: &str) -> Result<SortSpec, UrlError> {
    let mut sort = SortSpec::new();
    for entry in value.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let (column, direction) = entry
            .rsplit_once('.')
            .ok_or_else(|| invalid(SORT_PARAM, value, format!("missing direction in '{}'", entry)))?;
        let column = decode_column(column);
        if column.is_empty() {
            return Err(invalid(SORT_PARAM, value, "empty column id"));
        }
        let direction: SortDirection = direction
            .parse()
            .map_err(|e: String| invalid(SORT_PARAM, value, e))?;
        sort.push(column, direction);
    }
    Ok(sort)
}

fn decode_column(raw: &str) -> String {
    form_urlencoded::parse(raw.as_bytes())
        .next()
        .map(|(column, _)| column.into_owned())
        .unwrap_or_default()
}

/// Decode the filter JSON object, dropping entries that do not parse
pub fn decode_filter(value: &str) -> Result<ColumnFilters, UrlError> {
    let object: Map<String, Value> =
        serde_json::from_str(value).map_err(|e| invalid(FILTER_PARAM, value, e.to_string()))?;

    let mut filters = ColumnFilters::new();
    for (column, raw) in object {
        if raw.is_null() {
            continue;
        }
        match serde_json::from_value::<FilterValue>(raw) {
            Ok(filter) if filter.is_active() => {
                filters.insert(column, filter);
            }
            Ok(_) => {}
            Err(e) => tracing::warn!(column = %column, "Ignoring malformed filter entry: {}", e),
        }
    }
    Ok(filters)
}

// =============================================================================
// Locations
// =============================================================================

/// The address bar: holds the current query string
pub trait UrlLocation: Send + Sync {
    /// Current query string, without the leading `?`
    fn query(&self) -> String;

    /// Replace the query string without reloading
    fn replace_query(&self, query: &str) -> ViewResult<()>;
}

/// In-memory location recording every replacement
#[derive(Debug, Clone, Default)]
pub struct MemoryLocation {
    history: Arc<RwLock<Vec<String>>>,
    read_only: bool,
}

impl MemoryLocation {
    pub fn new(query: impl Into<String>) -> Self {
        let query = query.into();
        let query = query.strip_prefix('?').map(str::to_string).unwrap_or(query);
        Self {
            history: Arc::new(RwLock::new(vec![query])),
            read_only: false,
        }
    }

    /// Location that rejects every replacement, like a sandboxed frame
    pub fn read_only(query: impl Into<String>) -> Self {
        Self {
            read_only: true,
            ..Self::new(query)
        }
    }

    /// Every query string this location held, oldest first
    pub fn history(&self) -> Vec<String> {
        self.history.read().map(|h| h.clone()).unwrap_or_default()
    }
}

impl UrlLocation for MemoryLocation {
    fn query(&self) -> String {
        self.history
            .read()
            .ok()
            .and_then(|h| h.last().cloned())
            .unwrap_or_default()
    }

    fn replace_query(&self, query: &str) -> ViewResult<()> {
        if self.read_only {
            return Err(UrlError::WriteFailed {
                message: "location is read-only".to_string(),
            }
            .into());
        }

        let mut history = self.history.write().map_err(|e| UrlError::WriteFailed {
            message: format!("Failed to acquire write lock: {}", e),
        })?;

        history.push(query.to_string());
        Ok(())
    }
}
