//! View state and its three backing stores
//!
//! | Field          | Authority       | Mirrors         |
//! |----------------|-----------------|-----------------|
//! | page           | URL             |                 |
//! | per_page       | URL             | durable storage |
//! | sort           | URL             |                 |
//! | filter         | URL             |                 |
//! | visibility     | durable storage |                 |
//! | column order   | durable storage |                 |
//! | row selection  | memory          |                 |
//!
//! URL fields are shareable: copying the link reproduces the view. Storage
//! fields are machine-local. Row selection never survives a reload.

pub mod facade;
pub mod local;
pub mod transition;
pub mod url;

pub use facade::{ViewSnapshot, ViewStateFacade};
pub use local::{LocalField, LocalStateStore};
pub use transition::{TransitionId, TransitionQueue, UrlPatch};
pub use self::url::{MemoryLocation, ParsedQuery, ShareableState, UrlLocation};

use crate::core::filter::ColumnFilters;
use crate::core::query::DEFAULT_PER_PAGE;
use crate::core::sort::SortSpec;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Current page and page size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationState {
    /// Page number (starts at 1)
    pub page: usize,
    /// Records per page
    pub per_page: usize,
}

impl Default for PaginationState {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: DEFAULT_PER_PAGE,
        }
    }
}

impl PaginationState {
    pub fn new(page: usize, per_page: usize) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.max(1),
        }
    }

    /// Build from a zero-based page index, as table widgets count pages
    pub fn from_index(page_index: usize, per_page: usize) -> Self {
        Self::new(page_index.saturating_add(1), per_page)
    }

    /// Zero-based page index
    pub fn page_index(&self) -> usize {
        self.page.saturating_sub(1)
    }

    pub fn next_page(self) -> Self {
        Self::new(self.page.saturating_add(1), self.per_page)
    }

    pub fn previous_page(self) -> Self {
        Self::new(self.page.saturating_sub(1), self.per_page)
    }
}

/// Sort state, authoritative in the URL
pub type SortState = SortSpec;

/// Column filter state, authoritative in the URL
pub type ColumnFilterState = ColumnFilters;

/// Per-column visibility; columns without an entry are visible
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColumnVisibilityState(pub BTreeMap<String, bool>);

impl ColumnVisibilityState {
    pub fn is_visible(&self, column_id: &str) -> bool {
        self.0.get(column_id).copied().unwrap_or(true)
    }

    pub fn set(&mut self, column_id: impl Into<String>, visible: bool) {
        self.0.insert(column_id.into(), visible);
    }

    pub fn toggle(&mut self, column_id: &str) {
        let visible = self.is_visible(column_id);
        self.0.insert(column_id.to_string(), !visible);
    }

    pub fn hidden(&self) -> impl Iterator<Item = &str> {
        self.0
            .iter()
            .filter(|(_, visible)| !**visible)
            .map(|(column, _)| column.as_str())
    }
}

/// Display order of columns; empty means declaration order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColumnOrderState(pub Vec<String>);

impl ColumnOrderState {
    pub fn position(&self, column_id: &str) -> Option<usize> {
        self.0.iter().position(|c| c == column_id)
    }

    /// Move `column_id` to `index`, appending it first if it is not listed
    pub fn move_column(&mut self, column_id: &str, index: usize) {
        if let Some(current) = self.position(column_id) {
            self.0.remove(current);
        }
        let index = index.min(self.0.len());
        self.0.insert(index, column_id.to_string());
    }

    pub fn columns(&self) -> &[String] {
        &self.0
    }
}

/// Selected row ids, memory only
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowSelectionState(BTreeSet<String>);

impl RowSelectionState {
    pub fn is_selected(&self, row_id: &str) -> bool {
        self.0.contains(row_id)
    }

    pub fn toggle(&mut self, row_id: &str) {
        if !self.0.remove(row_id) {
            self.0.insert(row_id.to_string());
        }
    }

    pub fn select(&mut self, row_id: impl Into<String>) {
        self.0.insert(row_id.into());
    }

    /// Select every id, or clear them all if every id is already selected
    pub fn toggle_all<I, S>(&mut self, row_ids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let ids: Vec<String> = row_ids.into_iter().map(Into::into).collect();
        if !ids.is_empty() && ids.iter().all(|id| self.0.contains(id)) {
            for id in &ids {
                self.0.remove(id);
            }
        } else {
            self.0.extend(ids);
        }
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

/// The complete state of one list view
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewState {
    pub pagination: PaginationState,
    pub sort: SortState,
    pub filter: ColumnFilterState,
    pub column_visibility: ColumnVisibilityState,
    pub column_order: ColumnOrderState,
    pub row_selection: RowSelectionState,
}

impl ViewState {
    /// The URL-authoritative slice of this state
    pub fn shareable(&self) -> ShareableState {
        ShareableState {
            pagination: self.pagination,
            sort: self.sort.clone(),
            filter: self.filter.clone(),
        }
    }
}

/// A setter argument: a new value, or a function of the previous one
///
/// Functional updates are applied to the latest live value, so a burst of
/// `Update::with(|p| p + 1)` calls never loses an increment.
pub enum Update<T> {
    Value(T),
    With(Box<dyn FnOnce(&T) -> T + Send>),
}

impl<T> Update<T> {
    pub fn with<F>(f: F) -> Self
    where
        F: FnOnce(&T) -> T + Send + 'static,
    {
        Update::With(Box::new(f))
    }

    pub fn apply(self, previous: &T) -> T {
        match self {
            Update::Value(value) => value,
            Update::With(f) => f(previous),
        }
    }
}

impl<T> From<T> for Update<T> {
    fn from(value: T) -> Self {
        Update::Value(value)
    }
}

/// The fields of [`ViewState`], for phase tracking
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StateField {
    Pagination,
    Sort,
    Filter,
    ColumnVisibility,
    ColumnOrder,
    RowSelection,
}

impl StateField {
    pub const ALL: [StateField; 6] = [
        StateField::Pagination,
        StateField::Sort,
        StateField::Filter,
        StateField::ColumnVisibility,
        StateField::ColumnOrder,
        StateField::RowSelection,
    ];
}

/// Lifecycle of a state field
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FieldPhase {
    /// Nothing read yet
    #[default]
    Uninitialized,
    /// Reading persisted values
    Hydrating,
    /// Reflects the latest setter call
    Live,
}
