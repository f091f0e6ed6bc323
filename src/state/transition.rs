//! Staged URL commits
//!
//! Setters stage their URL-bound fields as a transition and return at once.
//! Transitions settle in the order they began. A settling transition only
//! writes the fields no newer transition has touched since, so a slow commit
//! can never roll back a field the user already changed again.

use crate::core::filter::ColumnFilters;
use crate::core::sort::SortSpec;
use std::collections::{HashMap, VecDeque};

/// Monotonically increasing transition id
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TransitionId(u64);

impl TransitionId {
    pub fn value(&self) -> u64 {
        self.0
    }
}

/// URL-bound field values staged by one setter call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UrlPatch {
    pub page: Option<usize>,
    pub per_page: Option<usize>,
    pub sort: Option<SortSpec>,
    pub filter: Option<ColumnFilters>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum PatchField {
    Page,
    PerPage,
    Sort,
    Filter,
}

impl UrlPatch {
    pub fn is_empty(&self) -> bool {
        self.page.is_none() && self.per_page.is_none() && self.sort.is_none() && self.filter.is_none()
    }

    fn fields(&self) -> Vec<PatchField> {
        let mut fields = Vec::with_capacity(4);
        if self.page.is_some() {
            fields.push(PatchField::Page);
        }
        if self.per_page.is_some() {
            fields.push(PatchField::PerPage);
        }
        if self.sort.is_some() {
            fields.push(PatchField::Sort);
        }
        if self.filter.is_some() {
            fields.push(PatchField::Filter);
        }
        fields
    }

    fn drop_field(&mut self, field: PatchField) {
        match field {
            PatchField::Page => self.page = None,
            PatchField::PerPage => self.per_page = None,
            PatchField::Sort => self.sort = None,
            PatchField::Filter => self.filter = None,
        }
    }
}

/// FIFO of unsettled transitions with per-field ownership
#[derive(Debug, Default)]
pub struct TransitionQueue {
    next_id: u64,
    pending: VecDeque<(TransitionId, UrlPatch)>,
    owners: HashMap<PatchField, TransitionId>,
}

impl TransitionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage a patch; its fields now belong to the returned transition
    pub fn begin(&mut self, patch: UrlPatch) -> TransitionId {
        self.next_id += 1;
        let id = TransitionId(self.next_id);
        for field in patch.fields() {
            self.owners.insert(field, id);
        }
        self.pending.push_back((id, patch));
        id
    }

    /// Settle the oldest transition
    ///
    /// The returned patch keeps only the fields this transition still owns.
    pub fn settle_next(&mut self) -> Option<(TransitionId, UrlPatch)> {
        let (id, mut patch) = self.pending.pop_front()?;
        for field in patch.fields() {
            if self.owners.get(&field) == Some(&id) {
                self.owners.remove(&field);
            } else {
                patch.drop_field(field);
            }
        }
        Some((id, patch))
    }

    /// Settle every pending transition, oldest first
    pub fn settle_all(&mut self) -> Vec<(TransitionId, UrlPatch)> {
        std::iter::from_fn(|| self.settle_next()).collect()
    }

    pub fn is_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
