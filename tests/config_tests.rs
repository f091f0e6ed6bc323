//! Integration tests for view configuration loading

use listview::prelude::*;
use std::io::Write;

#[test]
fn test_default_config() {
    let config = ViewConfig::default();

    assert_eq!(config.default_per_page, 20);
    assert_eq!(config.max_per_page, 100);
    assert_eq!(config.temporal_columns, vec!["createdAt", "updatedAt"]);
    assert!(config.cache_capacity().is_none());
    assert!(config.validate().is_ok());
}

#[test]
fn test_partial_yaml_keeps_defaults() {
    let yaml = r#"
storage_key: posts-table
cache_capacity: 64
"#;

    let config = ViewConfig::from_yaml_str(yaml).unwrap();

    assert_eq!(config.storage_key, "posts-table");
    assert_eq!(config.cache_capacity().map(|c| c.get()), Some(64));
    assert_eq!(config.default_per_page, 20);
}

#[test]
fn test_invalid_yaml_rejected() {
    let too_large = r#"
default_per_page: 500
max_per_page: 100
"#;
    assert!(ViewConfig::from_yaml_str(too_large).is_err());

    let empty_namespace = "storage_key: \"\"";
    assert!(ViewConfig::from_yaml_str(empty_namespace).is_err());

    let zero_cache = "cache_capacity: 0";
    assert!(ViewConfig::from_yaml_str(zero_cache).is_err());
}

#[test]
fn test_load_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "storage_key: users").unwrap();
    writeln!(file, "default_per_page: 50").unwrap();

    let path = file.path().to_string_lossy().to_string();
    let config = ViewConfig::from_yaml_file(&path).unwrap();

    assert_eq!(config.storage_key, "users");
    assert_eq!(config.default_per_page, 50);
}

#[test]
fn test_config_drives_view_defaults() {
    let config = ViewConfig::from_yaml_str("storage_key: users\ndefault_per_page: 50\nmax_per_page: 60").unwrap();
    let storage = InMemoryStorage::new();

    let view = ViewStateFacade::mount(config.clone(), storage.clone(), MemoryLocation::new("perPage=90"));
    assert_eq!(view.snapshot().per_page, 60);
    assert_eq!(storage.keys(), vec!["users:per-page"]);

    let view = ViewStateFacade::mount(config, InMemoryStorage::new(), MemoryLocation::default());
    assert_eq!(view.snapshot().per_page, 50);
}
