//! Core module containing the record model, filter and sort primitives and the
//! pure query pipeline

pub mod error;
pub mod events;
pub mod facets;
pub mod field;
pub mod filter;
pub mod query;
pub mod record;
pub mod sort;
pub mod store;

pub use error::{StorageError, UrlError, ViewError, ViewResult};
pub use events::{EventEnvelope, StateEvent, StateEventBus};
pub use field::FieldValue;
pub use filter::{ColumnFilters, DateRange, FilterValue};
pub use query::{CacheKey, PaginationMeta, QueryResult, ViewRequest};
pub use record::{Author, JsonRecord, Post, Record, UserRef};
pub use sort::{SortDirection, SortSpec};
pub use store::RecordSource;
