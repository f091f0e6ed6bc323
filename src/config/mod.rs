//! Configuration loading and management

use crate::core::query::DEFAULT_PER_PAGE;
use crate::core::error::ViewError;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;

/// Configuration of one list view
///
/// # Example
/// ```yaml
/// storage_key: posts-table
/// default_per_page: 20
/// max_per_page: 100
/// temporal_columns: [createdAt, updatedAt]
/// cache_capacity: 500
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewConfig {
    /// Namespace prefixed to every durable storage key
    pub storage_key: String,

    /// Page size used when neither the URL nor storage provide one
    pub default_per_page: usize,

    /// Upper bound accepted for a page size
    pub max_per_page: usize,

    /// Columns compared as timestamps when sorting
    pub temporal_columns: Vec<String>,

    /// Maximum number of cached results; unbounded when absent
    pub cache_capacity: Option<usize>,

    /// Buffer size of the state event bus
    pub event_capacity: usize,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            storage_key: "data-table".to_string(),
            default_per_page: DEFAULT_PER_PAGE,
            max_per_page: 100,
            temporal_columns: vec!["createdAt".to_string(), "updatedAt".to_string()],
            cache_capacity: None,
            event_capacity: 256,
        }
    }
}

impl ViewConfig {
    /// Default configuration under a storage namespace
    pub fn with_storage_key(storage_key: impl Into<String>) -> Self {
        Self {
            storage_key: storage_key.into(),
            ..Self::default()
        }
    }

    /// Load configuration from a YAML file
    pub fn from_yaml_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Load configuration from a YAML string
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that the sizes are usable
    pub fn validate(&self) -> Result<()> {
        if self.storage_key.is_empty() {
            return invalid("storage_key must not be empty");
        }
        if self.max_per_page == 0 {
            return invalid("max_per_page must be greater than zero");
        }
        if self.default_per_page == 0 || self.default_per_page > self.max_per_page {
            return invalid(format!(
                "default_per_page must be between 1 and max_per_page ({}), got {}",
                self.max_per_page, self.default_per_page
            ));
        }
        if self.cache_capacity == Some(0) {
            return invalid("cache_capacity must be greater than zero when set");
        }
        Ok(())
    }

    /// Clamp a page size into `1..=max_per_page`
    pub fn clamp_per_page(&self, per_page: usize) -> usize {
        per_page.clamp(1, self.max_per_page.max(1))
    }

    pub fn cache_capacity(&self) -> Option<NonZeroUsize> {
        self.cache_capacity.and_then(NonZeroUsize::new)
    }
}

fn invalid(message: impl Into<String>) -> Result<()> {
    Err(ViewError::Config(message.into()).into())
}
