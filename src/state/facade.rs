//! The view-state facade a list view talks to
//!
//! One facade owns the state of one table. It hydrates every field from the
//! store that is authoritative for it, hands out a [`ViewSnapshot`] for
//! rendering and a [`ViewRequest`] for fetching, and routes each setter to the
//! right backing store:
//!
//! - page, per page, sort and filter are staged to the URL as a transition
//!   and written when the transition settles
//! - column visibility and order are written to durable storage immediately
//! - row selection only lives in memory
//!
//! Setters take `&mut self`, so all mutation happens on one logical thread.

use crate::config::ViewConfig;
use crate::core::events::{EventEnvelope, StateEvent, StateEventBus};
use crate::core::filter::{self, ColumnFilters, FilterValue};
use crate::core::query::ViewRequest;
use crate::core::sort::SortSpec;
use crate::engine::tracker::{RequestTicket, RequestTracker};
use crate::state::local::{LocalField, LocalStateStore};
use crate::state::transition::{TransitionId, TransitionQueue, UrlPatch};
use crate::state::url::{ParsedQuery, ShareableState, UrlLocation};
use crate::state::{
    ColumnOrderState, ColumnVisibilityState, FieldPhase, PaginationState, RowSelectionState,
    StateField, Update, ViewState,
};
use crate::storage::DurableStorage;
use serde::Serialize;
use std::collections::BTreeMap;
use uuid::Uuid;

/// Everything a table needs to render one frame
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewSnapshot {
    pub current_page: usize,
    pub per_page: usize,
    pub sort: SortSpec,
    pub filter: ColumnFilters,
    pub column_visibility: ColumnVisibilityState,
    pub column_order: ColumnOrderState,
    #[serde(skip)]
    pub row_selection: RowSelectionState,
    pub is_pending: bool,
}

pub struct ViewStateFacade<S: DurableStorage, L: UrlLocation> {
    config: ViewConfig,
    location: L,
    local: LocalStateStore<S>,
    state: ViewState,
    /// Shareable state as last written to the location
    committed: ShareableState,
    /// Query parameters owned by someone else
    extra: Vec<(String, String)>,
    transitions: TransitionQueue,
    phases: BTreeMap<StateField, FieldPhase>,
    tracker: RequestTracker,
    events: StateEventBus,
    origin: Uuid,
}

impl<S: DurableStorage, L: UrlLocation> ViewStateFacade<S, L> {
    /// Create an unhydrated facade with its own event bus
    pub fn new(config: ViewConfig, storage: S, location: L) -> Self {
        let events = StateEventBus::new(config.event_capacity);
        Self::with_event_bus(config, storage, location, events)
    }

    /// Create an unhydrated facade publishing on a shared bus
    pub fn with_event_bus(config: ViewConfig, storage: S, location: L, events: StateEventBus) -> Self {
        let origin = Uuid::new_v4();
        let local = LocalStateStore::new(storage, config.storage_key.clone(), events.clone(), origin);
        let phases = StateField::ALL
            .into_iter()
            .map(|field| (field, FieldPhase::Uninitialized))
            .collect();

        Self {
            config,
            location,
            local,
            state: ViewState::default(),
            committed: ShareableState::default(),
            extra: Vec::new(),
            transitions: TransitionQueue::new(),
            phases,
            tracker: RequestTracker::new(),
            events,
            origin,
        }
    }

    /// Create and hydrate a facade
    pub fn mount(config: ViewConfig, storage: S, location: L) -> Self {
        let mut facade = Self::new(config, storage, location);
        facade.hydrate();
        facade
    }

    /// Read every field from its authoritative store
    ///
    /// The URL wins for shareable fields. `per_page` falls back to durable
    /// storage and then to the configured default; a URL value is mirrored
    /// into storage. Pending transitions are discarded.
    pub fn hydrate(&mut self) {
        self.set_phase_all(FieldPhase::Hydrating);

        let parsed = ParsedQuery::parse(&self.location.query());

        let per_page = match parsed.per_page {
            Some(per_page) => {
                let per_page = self.config.clamp_per_page(per_page);
                if self.local.read::<usize>(LocalField::PerPage) != Some(per_page) {
                    self.local.write(LocalField::PerPage, &per_page);
                }
                per_page
            }
            None => self
                .local
                .read::<usize>(LocalField::PerPage)
                .filter(|stored| *stored > 0)
                .map(|stored| self.config.clamp_per_page(stored))
                .unwrap_or(self.config.default_per_page),
        };

        self.state = ViewState {
            pagination: PaginationState::new(parsed.page.unwrap_or(1), per_page),
            sort: parsed.sort.unwrap_or_default(),
            filter: parsed.filter.unwrap_or_default(),
            column_visibility: self.local.read(LocalField::Visibility).unwrap_or_default(),
            column_order: self.local.read(LocalField::Order).unwrap_or_default(),
            row_selection: RowSelectionState::default(),
        };
        self.committed = self.state.shareable();
        self.extra = parsed.extra;
        self.transitions = TransitionQueue::new();

        self.set_phase_all(FieldPhase::Live);
        tracing::debug!(
            namespace = %self.config.storage_key,
            page = self.state.pagination.page,
            per_page = self.state.pagination.per_page,
            "Hydrated view state"
        );
    }

    fn set_phase_all(&mut self, phase: FieldPhase) {
        for value in self.phases.values_mut() {
            *value = phase;
        }
    }

    fn ensure_live(&mut self) {
        if self.phases.values().any(|phase| *phase != FieldPhase::Live) {
            self.hydrate();
        }
    }

    pub fn phase(&self, field: StateField) -> FieldPhase {
        self.phases.get(&field).copied().unwrap_or_default()
    }

    // -------------------------------------------------------------------------
    // Setters
    // -------------------------------------------------------------------------

    pub fn set_pagination(&mut self, update: impl Into<Update<PaginationState>>) -> TransitionId {
        self.ensure_live();
        let previous = self.state.pagination;
        let next = update.into().apply(&previous);
        let next = PaginationState::new(next.page, self.config.clamp_per_page(next.per_page));

        self.state.pagination = next;
        if next.per_page != previous.per_page {
            self.local.write(LocalField::PerPage, &next.per_page);
        }

        self.stage(UrlPatch {
            page: Some(next.page),
            per_page: Some(next.per_page),
            ..UrlPatch::default()
        })
    }

    pub fn set_page(&mut self, update: impl Into<Update<usize>>) -> TransitionId {
        let update = update.into();
        self.set_pagination(Update::with(move |previous: &PaginationState| {
            PaginationState::new(update.apply(&previous.page), previous.per_page)
        }))
    }

    pub fn set_per_page(&mut self, update: impl Into<Update<usize>>) -> TransitionId {
        let update = update.into();
        self.set_pagination(Update::with(move |previous: &PaginationState| {
            PaginationState::new(previous.page, update.apply(&previous.per_page))
        }))
    }

    pub fn set_sort(&mut self, update: impl Into<Update<SortSpec>>) -> TransitionId {
        self.ensure_live();
        let next = update.into().apply(&self.state.sort);
        self.state.sort = next.clone();

        self.stage(UrlPatch {
            sort: Some(next),
            ..UrlPatch::default()
        })
    }

    /// Replace the filters; inactive entries are dropped
    pub fn set_filters(&mut self, update: impl Into<Update<ColumnFilters>>) -> TransitionId {
        self.ensure_live();
        let mut next = update.into().apply(&self.state.filter);
        filter::retain_active(&mut next);
        self.state.filter = next.clone();

        self.stage(UrlPatch {
            filter: Some(next),
            ..UrlPatch::default()
        })
    }

    /// Set or clear the filter of one column
    pub fn set_column_filter(&mut self, column_id: impl Into<String>, value: Option<FilterValue>) -> TransitionId {
        let column_id = column_id.into();
        self.set_filters(Update::with(move |previous: &ColumnFilters| {
            let mut next = previous.clone();
            match value {
                Some(value) => {
                    next.insert(column_id, value);
                }
                None => {
                    next.remove(&column_id);
                }
            }
            next
        }))
    }

    pub fn set_column_visibility(&mut self, update: impl Into<Update<ColumnVisibilityState>>) {
        self.ensure_live();
        let next = update.into().apply(&self.state.column_visibility);
        self.local.write(LocalField::Visibility, &next);
        self.state.column_visibility = next;
    }

    pub fn set_column_order(&mut self, update: impl Into<Update<ColumnOrderState>>) {
        self.ensure_live();
        let next = update.into().apply(&self.state.column_order);
        self.local.write(LocalField::Order, &next);
        self.state.column_order = next;
    }

    pub fn set_row_selection(&mut self, update: impl Into<Update<RowSelectionState>>) {
        self.ensure_live();
        self.state.row_selection = update.into().apply(&self.state.row_selection);
    }

    fn stage(&mut self, patch: UrlPatch) -> TransitionId {
        let id = self.transitions.begin(patch);
        tracing::debug!(transition = id.value(), "Staged URL transition");
        id
    }

    // -------------------------------------------------------------------------
    // Transitions
    // -------------------------------------------------------------------------

    pub fn is_pending(&self) -> bool {
        self.transitions.is_pending()
    }

    /// Settle the oldest pending transition and write the URL
    pub fn settle_one(&mut self) -> Option<TransitionId> {
        let (id, patch) = self.transitions.settle_next()?;
        self.commit(patch);
        Some(id)
    }

    /// Settle every pending transition; returns how many settled
    pub fn settle(&mut self) -> usize {
        let settled = self.transitions.settle_all();
        let count = settled.len();
        for (_, patch) in settled {
            self.commit(patch);
        }
        count
    }

    fn commit(&mut self, patch: UrlPatch) {
        if patch.is_empty() {
            return;
        }

        let pagination = &mut self.committed.pagination;
        if let Some(page) = patch.page {
            pagination.page = page;
        }
        if let Some(per_page) = patch.per_page {
            pagination.per_page = per_page;
        }
        if let Some(sort) = patch.sort {
            self.committed.sort = sort;
        }
        if let Some(filter) = patch.filter {
            self.committed.filter = filter;
        }

        let query = self.committed.to_query_with(&self.extra);
        match self.location.replace_query(&query) {
            Ok(()) => {
                tracing::debug!(query = %query, "Committed view state to URL");
                self.events.publish(StateEvent::UrlCommitted {
                    origin: self.origin,
                    query,
                });
            }
            Err(e) => tracing::warn!(code = e.error_code(), "Failed to write URL: {}", e),
        }
    }

    // -------------------------------------------------------------------------
    // Reads
    // -------------------------------------------------------------------------

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    pub fn snapshot(&self) -> ViewSnapshot {
        ViewSnapshot {
            current_page: self.state.pagination.page,
            per_page: self.state.pagination.per_page,
            sort: self.state.sort.clone(),
            filter: self.state.filter.clone(),
            column_visibility: self.state.column_visibility.clone(),
            column_order: self.state.column_order.clone(),
            row_selection: self.state.row_selection.clone(),
            is_pending: self.is_pending(),
        }
    }

    /// The query matching the live state
    pub fn request(&self) -> ViewRequest {
        let shareable = self.state.shareable();
        ViewRequest {
            page: shareable.pagination.page,
            per_page: shareable.pagination.per_page,
            sort: shareable.sort,
            filter: shareable.filter,
        }
    }

    /// The current request plus a ticket that superseded every earlier one
    pub fn begin_fetch(&self) -> (ViewRequest, RequestTicket) {
        (self.request(), self.tracker.issue())
    }

    pub fn tracker(&self) -> &RequestTracker {
        &self.tracker
    }

    pub fn events(&self) -> &StateEventBus {
        &self.events
    }

    pub fn origin(&self) -> Uuid {
        self.origin
    }

    pub fn location(&self) -> &L {
        &self.location
    }

    pub fn local(&self) -> &LocalStateStore<S> {
        &self.local
    }

    pub fn config(&self) -> &ViewConfig {
        &self.config
    }

    /// React to a storage write made by another facade on the same namespace
    ///
    /// Visibility and order are re-read; per page stays URL-driven. Returns
    /// whether the live state changed.
    pub fn apply_event(&mut self, envelope: &EventEnvelope) -> bool {
        let StateEvent::StorageWritten { origin, key } = &envelope.event else {
            return false;
        };
        if *origin == self.origin {
            return false;
        }

        match self.local.field_for_key(key) {
            Some(LocalField::Visibility) => {
                let next: ColumnVisibilityState = self.local.read(LocalField::Visibility).unwrap_or_default();
                let changed = next != self.state.column_visibility;
                self.state.column_visibility = next;
                changed
            }
            Some(LocalField::Order) => {
                let next: ColumnOrderState = self.local.read(LocalField::Order).unwrap_or_default();
                let changed = next != self.state.column_order;
                self.state.column_order = next;
                changed
            }
            Some(LocalField::PerPage) | None => false,
        }
    }
}
