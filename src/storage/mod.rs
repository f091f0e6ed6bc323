//! Durable storage backends and record sources

pub mod file;
pub mod in_memory;

pub use file::FileStorage;
pub use in_memory::{InMemoryRecordSource, InMemoryStorage};

use crate::core::error::ViewResult;

/// Durable key/value string storage, the local-storage surface of a view
///
/// Implementations must be cheap to call synchronously; reads and writes
/// happen on the interaction path.
pub trait DurableStorage: Send + Sync {
    /// Read the value stored under `key`
    fn get_item(&self, key: &str) -> ViewResult<Option<String>>;

    /// Store `value` under `key`
    fn set_item(&self, key: &str, value: &str) -> ViewResult<()>;

    /// Remove `key`; removing a missing key is not an error
    fn remove_item(&self, key: &str) -> ViewResult<()>;
}

impl<S: DurableStorage + ?Sized> DurableStorage for std::sync::Arc<S> {
    fn get_item(&self, key: &str) -> ViewResult<Option<String>> {
        (**self).get_item(key)
    }

    fn set_item(&self, key: &str, value: &str) -> ViewResult<()> {
        (**self).set_item(key, value)
    }

    fn remove_item(&self, key: &str) -> ViewResult<()> {
        (**self).remove_item(key)
    }
}
