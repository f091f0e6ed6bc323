//! # listview
//!
//! Client-side list views over a record set: filtering, sorting and pagination
//! with a cached query engine, plus view state kept in sync across the URL,
//! durable storage and memory.
//!
//! ## Features
//!
//! - **Tagged Filters**: text, date range, multi-select and user filters per column
//! - **Multi-Column Sort**: priority-ordered, timestamp-aware, locale-style collation
//! - **Single-Flight Cache**: identical requests computed once and shared
//! - **Stale-Response Rejection**: only the latest request's result is applied
//! - **Shareable URLs**: page, page size, sort and filter round-trip through the query string
//! - **Durable Preferences**: page size, column visibility and order survive reloads
//! - **Configuration-Based**: view settings loaded from YAML
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use listview::prelude::*;
//!
//! let config = ViewConfig::with_storage_key("posts");
//! let source = InMemoryRecordSource::new(posts, config.temporal_columns.clone());
//! let engine = QueryEngine::from_config(source, &config);
//!
//! let mut view = ViewStateFacade::mount(config, InMemoryStorage::new(), MemoryLocation::new("?page=2"));
//! view.set_column_filter("status", Some(FilterValue::multi_select(["draft"])));
//!
//! let (request, ticket) = view.begin_fetch();
//! if let Some(result) = engine.query_latest(&request, ticket, view.tracker()).await? {
//!     render(&result.records, result.pagination(&request));
//! }
//! view.settle(); // writes ?page=2&perPage=20&filter=...
//! ```

pub mod config;
pub mod core;
pub mod engine;
pub mod state;
pub mod storage;

/// Re-exports of commonly used types and traits
pub mod prelude {
    // === Core ===
    pub use crate::core::{
        error::{StorageError, UrlError, ViewError, ViewResult},
        events::{EventEnvelope, StateEvent, StateEventBus},
        facets::{min_max_timestamps, unique_values},
        field::FieldValue,
        filter::{ColumnFilters, DateRange, FilterValue},
        query::{PaginationMeta, QueryResult, ViewRequest, query},
        record::{Author, JsonRecord, Post, Record, UserRef},
        sort::{SortDirection, SortSpec},
        store::RecordSource,
    };

    // === Engine ===
    pub use crate::engine::{EngineStats, QueryEngine, RequestTicket, RequestTracker};

    // === View State ===
    pub use crate::state::{
        ColumnOrderState, ColumnVisibilityState, MemoryLocation, PaginationState,
        RowSelectionState, ShareableState, Update, UrlLocation, ViewSnapshot, ViewState,
        ViewStateFacade,
    };

    // === Storage ===
    pub use crate::storage::{DurableStorage, FileStorage, InMemoryRecordSource, InMemoryStorage};

    // === Config ===
    pub use crate::config::ViewConfig;

    // === External dependencies ===
    pub use anyhow::Result;
    pub use async_trait::async_trait;
    pub use chrono::{DateTime, Utc};
    pub use serde::{Deserialize, Serialize};
    pub use uuid::Uuid;
}
