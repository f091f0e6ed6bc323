//! Record source trait

use crate::core::error::ViewResult;
use crate::core::query::{QueryResult, ViewRequest};
use crate::core::record::Record;
use async_trait::async_trait;

/// Supplies one page of records for a view request
///
/// The query engine does not care whether this is local data or a remote
/// call, as long as identical requests produce identical results until the
/// engine's cache is cleared.
#[async_trait]
pub trait RecordSource<R: Record>: Send + Sync + 'static {
    /// Produce the page described by `request`
    async fn fetch(&self, request: &ViewRequest) -> ViewResult<QueryResult<R>>;
}
