use super::*;
use crate::param::Value;
use crate::record::ColumnDescriptor;
use serde_json::json;

#[derive(Default)]
struct News {
    id: Option<i64>,
    title: Option<String>,
    content: Option<String>,
    status: Option<Vec<i32>>,
}

impl Record for News {
    const TABLE: &'static str = "news";

    fn columns() -> &'static [ColumnDescriptor] {
        const COLUMNS: &[ColumnDescriptor] = &[
            ColumnDescriptor::new("id", "id").key(),
            ColumnDescriptor::new("title", "title"),
            ColumnDescriptor::new("content", "content"),
            ColumnDescriptor::new("status", "status").in_list(),
        ];
        COLUMNS
    }

    fn field_values(&self) -> BuildResult<Vec<Value>> {
        Ok(vec![
            json!(self.id),
            json!(self.title),
            json!(self.content),
            json!(self.status),
        ])
    }
}

/// Same shape without a declared key.
#[derive(Default)]
struct Note {
    id: Option<i64>,
    title: Option<String>,
}

impl Record for Note {
    const TABLE: &'static str = "note";

    fn columns() -> &'static [ColumnDescriptor] {
        const COLUMNS: &[ColumnDescriptor] = &[
            ColumnDescriptor::new("id", "id"),
            ColumnDescriptor::new("title", "title").table("note"),
        ];
        COLUMNS
    }

    fn field_values(&self) -> BuildResult<Vec<Value>> {
        Ok(vec![json!(self.id), json!(self.title)])
    }
}

#[test]
fn test_like_field() {
    let like = vec!["content".to_string()];
    let news = News {
        content: Some("hot".into()),
        ..Default::default()
    };
    assert_eq!(
        ConditionBuilder::new(&like).filter(&news).unwrap(),
        "content LIKE CONCAT('%', :content, '%')"
    );
}

#[test]
fn test_equality_count_matches_populated_fields() {
    let news = News {
        id: Some(1),
        title: Some("t".into()),
        content: Some("c".into()),
        ..Default::default()
    };
    let cond = ConditionBuilder::new(&[]).filter(&news).unwrap();
    assert_eq!(cond, "id = :id AND title = :title AND content = :content");
    assert_eq!(cond.matches(" = ").count(), 3);
    assert_eq!(cond.matches(" AND ").count(), 2);

    assert_eq!(ConditionBuilder::new(&[]).filter(&News::default()).unwrap(), "");
}

#[test]
fn test_in_membership() {
    let news = News {
        status: Some(vec![1, 2]),
        ..Default::default()
    };
    assert_eq!(
        ConditionBuilder::new(&[]).filter(&news).unwrap(),
        r#"status IN <foreach collection="status" item="item" index="index" open="(" separator="," close=")">:item</foreach>"#
    );
}

#[test]
fn test_update_with_declared_key() {
    let news = News {
        id: Some(1),
        title: Some("t".into()),
        ..Default::default()
    };
    let clauses = ConditionBuilder::new(&[]).update(&news).unwrap();
    assert_eq!(clauses.key, "id = :id");
    assert_eq!(clauses.set, "title = :title");
}

#[test]
fn test_update_without_declared_key_uses_first_populated_field() {
    let note = Note {
        id: Some(1),
        title: Some("t".into()),
    };
    let clauses = ConditionBuilder::new(&[])
        .qualified(true)
        .update(&note)
        .unwrap();
    assert_eq!(clauses.key, "id = :id");
    assert_eq!(clauses.set, "note.title = :title");
}

#[test]
fn test_update_errors() {
    let missing_key = News {
        title: Some("t".into()),
        ..Default::default()
    };
    assert!(
        ConditionBuilder::new(&[])
            .update(&missing_key)
            .unwrap_err()
            .is_configuration()
    );

    let nothing_to_set = News {
        id: Some(1),
        ..Default::default()
    };
    assert!(
        ConditionBuilder::new(&[])
            .update(&nothing_to_set)
            .unwrap_err()
            .is_configuration()
    );
}

#[test]
fn test_unknown_like_field_is_configuration_error() {
    let like = vec!["body".to_string()];
    let err = ConditionBuilder::new(&like)
        .filter(&News::default())
        .unwrap_err();
    assert!(err.is_configuration());
}

#[test]
fn test_build_dispatches_on_update_flag() {
    let news = News {
        id: Some(1),
        title: Some("t".into()),
        ..Default::default()
    };
    let builder = ConditionBuilder::new(&[]);
    assert_eq!(
        builder.build(&news, false).unwrap(),
        Condition::Filter("id = :id AND title = :title".into())
    );
    assert!(matches!(
        builder.build(&news, true).unwrap(),
        Condition::Update(_)
    ));
}

#[test]
fn test_batch_key_filter() {
    assert_eq!(
        ConditionBuilder::new(&[]).batch_key_filter::<News>().unwrap(),
        r#"id IN <foreach collection="list" item="item" index="index" open="(" separator="," close=")">:item.id</foreach>"#
    );
}

#[test]
fn test_populated_fields() {
    let news = News {
        title: Some("t".into()),
        status: Some(vec![]),
        ..Default::default()
    };
    assert_eq!(populated_fields(&news).unwrap(), vec!["title", "status"]);
}
