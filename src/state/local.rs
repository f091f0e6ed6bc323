//! Namespaced JSON entries in durable storage
//!
//! Reads never fail: a missing, unreadable or corrupt entry yields `None` and
//! the caller falls back to its default. Writes never fail either; an
//! exhausted quota or disabled storage is logged and reported on the event
//! bus, and the in-memory value stays authoritative.

use crate::core::error::StorageError;
use crate::core::events::{StateEvent, StateEventBus};
use crate::storage::DurableStorage;
use serde::Serialize;
use serde::de::DeserializeOwned;
use uuid::Uuid;

/// The view-state fields kept in durable storage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LocalField {
    PerPage,
    Visibility,
    Order,
}

impl LocalField {
    pub const ALL: [LocalField; 3] = [LocalField::PerPage, LocalField::Visibility, LocalField::Order];

    pub fn suffix(&self) -> &'static str {
        match self {
            LocalField::PerPage => "per-page",
            LocalField::Visibility => "visibility",
            LocalField::Order => "order",
        }
    }
}

pub struct LocalStateStore<S: DurableStorage> {
    storage: S,
    namespace: String,
    events: StateEventBus,
    origin: Uuid,
}

impl<S: DurableStorage> LocalStateStore<S> {
    pub fn new(storage: S, namespace: impl Into<String>, events: StateEventBus, origin: Uuid) -> Self {
        Self {
            storage,
            namespace: namespace.into(),
            events,
            origin,
        }
    }

    /// `<namespace>:<suffix>`
    pub fn key(&self, field: LocalField) -> String {
        format!("{}:{}", self.namespace, field.suffix())
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// The field whose key is `key`, if it belongs to this namespace
    pub fn field_for_key(&self, key: &str) -> Option<LocalField> {
        LocalField::ALL.into_iter().find(|field| self.key(*field) == key)
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn read<T: DeserializeOwned>(&self, field: LocalField) -> Option<T> {
        let key = self.key(field);
        let raw = match self.storage.get_item(&key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(key = %key, code = e.error_code(), "Storage read failed, using default: {}", e);
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                let err = StorageError::Corrupt {
                    key: key.clone(),
                    message: e.to_string(),
                };
                tracing::warn!(code = err.error_code(), "Using default: {}", err);
                self.events.publish(StateEvent::StateRecovered {
                    origin: self.origin,
                    key,
                    message: err.to_string(),
                });
                None
            }
        }
    }

    /// Serialize and store `value`; returns whether the write landed
    pub fn write<T: Serialize>(&self, field: LocalField, value: &T) -> bool {
        let key = self.key(field);
        let result = serde_json::to_string(value)
            .map_err(|e| e.to_string())
            .and_then(|raw| self.storage.set_item(&key, &raw).map_err(|e| e.to_string()));

        match result {
            Ok(()) => {
                tracing::debug!(key = %key, "Persisted view state");
                self.events.publish(StateEvent::StorageWritten {
                    origin: self.origin,
                    key,
                });
                true
            }
            Err(message) => {
                tracing::warn!(key = %key, "Failed to persist view state: {}", message);
                self.events.publish(StateEvent::StorageWriteFailed {
                    origin: self.origin,
                    key,
                    message,
                });
                false
            }
        }
    }
}
