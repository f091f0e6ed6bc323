//! Posts table walkthrough: filter, sort and paginate with synced view state
//!
//! Run with `RUST_LOG=listview=debug cargo run --example posts_table` to see
//! cache hits, staged transitions and storage writes.

use chrono::{Duration, Utc};
use listview::prelude::*;
use tracing_subscriber::EnvFilter;

fn seed_posts() -> Vec<Post> {
    let authors = [("Ada Lovelace", "ada"), ("Grace Hopper", "grace"), ("Alan Turing", "alan")];
    let statuses = ["draft", "published", "archived"];
    let start = Utc::now() - Duration::days(45);

    (1..=45)
        .map(|n: usize| {
            let (name, username) = authors[n % authors.len()];
            Post::new(
                format!("Post {}", n),
                statuses[n % statuses.len()],
                if n % 2 == 0 { "engineering" } else { "release" },
                Some(Author {
                    name: name.to_string(),
                    username: username.to_string(),
                }),
                start + Duration::days(n as i64),
            )
        })
        .collect()
}

fn print_page(label: &str, request: &ViewRequest, result: &QueryResult<Post>) {
    let meta = result.pagination(request);
    println!(
        "\n{} (page {}/{}, {} matching)",
        label, meta.page, meta.total_pages, meta.total
    );
    for post in &result.records {
        let author = post.author.as_ref().map(|a| a.name.as_str()).unwrap_or("-");
        println!(
            "  {:<8} {:<10} {:<14} {}",
            post.title,
            post.status,
            author,
            post.created_at.format("%Y-%m-%d")
        );
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = ViewConfig::from_yaml_str(
        r#"
storage_key: posts
default_per_page: 10
cache_capacity: 100
"#,
    )?;

    let posts = seed_posts();
    println!("Status facets: {:?}", unique_values(&posts, "status"));

    let source = InMemoryRecordSource::new(posts, config.temporal_columns.clone());
    let engine = QueryEngine::from_config(source, &config);

    let storage_path = std::env::temp_dir().join("listview-posts-table.json");
    let storage = FileStorage::open(&storage_path)?;
    let location = MemoryLocation::new("?page=1&tab=mine");
    let mut view = ViewStateFacade::mount(config, storage, location.clone());

    // Initial render
    let (request, ticket) = view.begin_fetch();
    if let Some(result) = engine.query_latest(&request, ticket, view.tracker()).await? {
        print_page("All posts", &request, &result);
    }

    // Drafts, newest first
    view.set_column_filter("status", Some(FilterValue::multi_select(["draft"])));
    view.set_sort(SortSpec::new().then("createdAt", SortDirection::Desc));
    view.set_column_visibility(Update::with(|previous: &ColumnVisibilityState| {
        let mut next = previous.clone();
        next.set("category", false);
        next
    }));

    let (request, ticket) = view.begin_fetch();
    if let Some(result) = engine.query_latest(&request, ticket, view.tracker()).await? {
        print_page("Drafts, newest first", &request, &result);
    }
    view.settle();
    println!("\nURL: ?{}", location.query());

    // Next page twice in a row
    view.set_page(Update::with(|page: &usize| page + 1));
    view.set_page(Update::with(|page: &usize| page + 1));
    let (request, ticket) = view.begin_fetch();
    if let Some(result) = engine.query_latest(&request, ticket, view.tracker()).await? {
        print_page("Drafts, page 3", &request, &result);
    }
    view.settle();
    println!("\nURL: ?{}", location.query());

    // Revisit the first drafts page: served from cache
    view.set_page(1usize);
    let request = view.request();
    engine.query(&request).await?;
    view.settle();

    let stats = engine.stats();
    println!(
        "\nEngine: {} hits, {} misses, {} coalesced; storage at {}",
        stats.hits,
        stats.misses,
        stats.coalesced,
        storage_path.display()
    );

    Ok(())
}
