#![allow(dead_code)]

use serde::Serialize;
use serde_json::json;
use sqlscript::record::result_columns;
use sqlscript::{
    Input, JoinDescriptor, JoinKind, OperationKind, OperationMetadata, Record, StatementBuilder,
    StatementProvider, params_of,
};

#[derive(Debug, Default, Serialize, Record)]
#[record(table = "news")]
struct News {
    #[record(key)]
    id: Option<i64>,
    title: Option<String>,
    content: Option<String>,
    #[record(column = "author_id", table = "news")]
    author: Option<i64>,
    #[record(in)]
    status: Option<Vec<i32>>,
    created_at: Option<chrono::NaiveDateTime>,
    #[record(skip)]
    rendered_html: Option<String>,
}

#[derive(Debug, Default, Serialize, Record)]
struct AuthorProfile {
    #[record(key)]
    id: Option<i64>,
    name: Option<String>,
}

#[derive(Debug, Default, Serialize, Record)]
#[record(table = "news")]
struct TaggedNews {
    #[record(key)]
    id: Option<i64>,
    r#type: Option<String>,
    #[serde(rename = "headline")]
    title: Option<String>,
}

#[test]
fn derive_generates_descriptors_in_field_order() {
    assert_eq!(News::TABLE, "news");
    assert_eq!(AuthorProfile::TABLE, "author_profile");

    let columns: Vec<_> = News::columns().iter().map(|c| c.column).collect();
    assert_eq!(
        columns,
        vec!["id", "title", "content", "author_id", "status", "created_at"]
    );
    assert!(News::columns()[0].key);
    assert_eq!(News::columns()[3].field, "author");
    assert_eq!(
        result_columns::<News>(),
        "id, title, content, news.author_id, status, created_at"
    );
}

#[test]
fn field_values_follow_descriptors() {
    let news = News {
        title: Some("t".into()),
        rendered_html: Some("<p>ignored</p>".into()),
        ..Default::default()
    };
    let values = news.field_values().unwrap();
    assert_eq!(values.len(), News::columns().len());
    assert_eq!(values[1], json!("t"));
}

#[test]
fn like_select_end_to_end() {
    let builder = StatementBuilder::default();
    let filter = News {
        content: Some("hot".into()),
        ..Default::default()
    };
    let meta = OperationMetadata::new().like(["content"]);

    let sql = builder.select(Input::One(&filter), &meta).unwrap();
    assert_eq!(
        sql.as_str(),
        "<script>SELECT id, title, content, news.author_id, status, created_at FROM news WHERE content LIKE CONCAT('%', :content, '%')</script>"
    );

    let positional = builder
        .assemble(&sql)
        .unwrap()
        .render(&params_of(&filter).unwrap())
        .unwrap()
        .to_positional()
        .unwrap();
    assert_eq!(positional.values, vec![json!("hot")]);
}

#[test]
fn in_membership_expands_the_list() {
    let builder = StatementBuilder::default();
    let filter = News {
        status: Some(vec![1, 2, 3]),
        ..Default::default()
    };
    let sql = builder
        .build(
            OperationKind::Select,
            Input::One(&filter),
            &OperationMetadata::new().name("findByStatus"),
        )
        .unwrap();
    let positional = builder
        .assemble(&sql)
        .unwrap()
        .render(&params_of(&filter).unwrap())
        .unwrap()
        .to_positional()
        .unwrap();
    assert_eq!(
        positional.sql,
        "SELECT id, title, content, news.author_id, status, created_at FROM news WHERE status IN ($1,$2,$3)"
    );
    assert_eq!(positional.values, vec![json!(1), json!(2), json!(3)]);
}

#[test]
fn update_splits_key_and_set() {
    let builder = StatementBuilder::default();
    let news = News {
        id: Some(1),
        title: Some("t".into()),
        ..Default::default()
    };
    let sql = builder
        .update(Input::One(&news), &OperationMetadata::new())
        .unwrap();
    assert_eq!(sql.as_str(), "UPDATE news SET title = :title WHERE id = :id");
}

#[test]
fn join_into_authors() {
    let builder = StatementBuilder::default();
    let meta = OperationMetadata::new().name("newsWithAuthor").join(JoinDescriptor::new(
        JoinKind::Left,
        "news",
        "author_id",
        JoinDescriptor::target("authors", "id"),
    ));
    let sql = builder
        .select(Input::One(&News::default()), &meta)
        .unwrap();
    assert_eq!(
        sql.as_str(),
        "<script>SELECT id, title, content, news.author_id, status, created_at FROM news LEFT OUTER JOIN authors ON authors.id = news.author_id</script>"
    );
}

#[test]
fn batch_delete_binds_every_key() {
    let builder = StatementBuilder::default();
    let list = [
        News {
            id: Some(3),
            ..Default::default()
        },
        News {
            id: Some(5),
            ..Default::default()
        },
    ];
    let input = Input::Many(&list);
    let sql = builder.delete(input, &OperationMetadata::new()).unwrap();
    let positional = builder
        .assemble(&sql)
        .unwrap()
        .render(&input.params().unwrap())
        .unwrap()
        .to_positional()
        .unwrap();
    assert_eq!(positional.sql, "DELETE FROM news WHERE id IN ($1,$2)");
    assert_eq!(positional.values, vec![json!(3), json!(5)]);
}

#[test]
fn same_operation_returns_cached_text() {
    let builder = StatementBuilder::default();
    let meta = OperationMetadata::new();
    let a = News {
        title: Some("a".into()),
        ..Default::default()
    };
    let b = News {
        content: Some("b".into()),
        ..Default::default()
    };
    let first = builder.select(Input::One(&a), &meta).unwrap();
    let second = builder.select(Input::One(&b), &meta).unwrap();
    assert_eq!(first, second);
    assert_eq!(builder.cache().len(), 1);
}

#[test]
fn raw_and_renamed_fields_bind_by_serialized_key() {
    let fields: Vec<_> = TaggedNews::columns()
        .iter()
        .map(|c| (c.field, c.column))
        .collect();
    assert_eq!(
        fields,
        vec![("id", "id"), ("type", "type"), ("headline", "title")]
    );

    let builder = StatementBuilder::default();
    let news = TaggedNews {
        id: Some(7),
        r#type: Some("brief".into()),
        title: Some("t".into()),
    };
    let sql = builder
        .update(Input::One(&news), &OperationMetadata::new())
        .unwrap();
    assert_eq!(
        sql.as_str(),
        "UPDATE news SET type = :type, title = :headline WHERE id = :id"
    );

    let positional = builder
        .assemble(&sql)
        .unwrap()
        .render(&params_of(&news).unwrap())
        .unwrap()
        .to_positional()
        .unwrap();
    assert_eq!(
        positional.sql,
        "UPDATE news SET type = $1, title = $2 WHERE id = $3"
    );
    assert_eq!(positional.values, vec![json!("brief"), json!("t"), json!(7)]);
}
