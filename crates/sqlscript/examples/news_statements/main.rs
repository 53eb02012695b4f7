//! Builds a few statements for a `news` table and prints them.
//!
//! Run with `RUST_LOG=sqlscript=trace` to see cache and render events.

use serde::Serialize;
use sqlscript::{
    BuildResult, Input, JoinDescriptor, JoinKind, OperationMetadata, Record, SortOrder,
    StatementBuilder, StatementProvider,
};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Default, Serialize, Record)]
#[record(table = "news")]
struct News {
    #[record(key)]
    id: Option<i64>,
    title: Option<String>,
    content: Option<String>,
    author_id: Option<i64>,
}

fn main() -> BuildResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let builder = StatementBuilder::default();

    let filter = News {
        content: Some("election".into()),
        ..Default::default()
    };
    let meta = OperationMetadata::new()
        .name("latestWithAuthor")
        .like(["content"])
        .join(JoinDescriptor::new(
            JoinKind::Left,
            "news",
            "author_id",
            JoinDescriptor::target("authors", "id"),
        ))
        .order_by("id")
        .order(SortOrder::Desc);

    let sql = builder.select(Input::One(&filter), &meta)?;
    let positional = builder
        .assemble(&sql)?
        .render(&sqlscript::params_of(&filter)?)?
        .to_positional()?;
    println!("{}\n  -> {}\n  -> {:?}\n", sql, positional.sql, positional.values);

    let news = News {
        id: Some(7),
        title: Some("Updated title".into()),
        ..Default::default()
    };
    println!("{}\n", builder.update(Input::One(&news), &OperationMetadata::new())?);

    let batch = [
        News {
            title: Some("first".into()),
            author_id: Some(1),
            ..Default::default()
        },
        News {
            title: Some("second".into()),
            author_id: Some(2),
            ..Default::default()
        },
    ];
    let input = Input::Many(&batch);
    let sql = builder.insert(input, &OperationMetadata::new())?;
    let positional = builder
        .assemble(&sql)?
        .render(&input.params()?)?
        .to_positional()?;
    println!("{}\n  -> {}", sql, positional.sql);

    let stats = builder.cache().stats();
    println!("\ncache: {} entries, {} hits, {} misses", stats.entries, stats.hits, stats.misses);
    Ok(())
}
