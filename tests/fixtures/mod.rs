//! Shared fixtures for integration tests
//!
//! Provides a posts table of 45 records (12 drafts, spread over three
//! authors) and helpers for wiring an engine and a facade together.
//!
//! # Usage
//!
//! From any integration test file in `tests/`:
//! ```rust,ignore
//! mod fixtures;
//! use fixtures::*;
//! ```

#![allow(dead_code)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use listview::prelude::*;

pub const TOTAL_POSTS: usize = 45;
pub const DRAFT_POSTS: usize = 12;

pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).single().unwrap_or_default()
}

pub fn authors() -> Vec<Author> {
    [("Ada Lovelace", "ada"), ("Grace Hopper", "grace"), ("Alan Turing", "alan")]
        .into_iter()
        .map(|(name, username)| Author {
            name: name.to_string(),
            username: username.to_string(),
        })
        .collect()
}

/// Status of post `n` (1-based): every fourth post starting at 1 is a draft
pub fn status_of(n: usize) -> &'static str {
    if n % 4 == 1 {
        "draft"
    } else if n % 2 == 0 {
        "published"
    } else {
        "archived"
    }
}

/// Posts titled `Post 1` to `Post 45`, created one hour apart
pub fn posts() -> Vec<Post> {
    let authors = authors();
    (1..=TOTAL_POSTS)
        .map(|n| {
            let category = if n % 3 == 0 { "release" } else { "engineering" };
            Post::new(
                format!("Post {}", n),
                status_of(n),
                category,
                Some(authors[n % authors.len()].clone()),
                base_time() + Duration::hours(n as i64),
            )
        })
        .collect()
}

pub fn titles(records: &[Post]) -> Vec<String> {
    records.iter().map(|post| post.title.clone()).collect()
}

pub fn config() -> ViewConfig {
    ViewConfig::with_storage_key("posts")
}

pub fn source() -> InMemoryRecordSource<Post> {
    InMemoryRecordSource::new(posts(), config().temporal_columns)
}

pub fn engine() -> QueryEngine<Post, InMemoryRecordSource<Post>> {
    QueryEngine::from_config(source(), &config())
}

pub fn mount(query: &str, storage: &InMemoryStorage) -> ViewStateFacade<InMemoryStorage, MemoryLocation> {
    ViewStateFacade::mount(config(), storage.clone(), MemoryLocation::new(query))
}
