use super::*;
use crate::config::ScriptConfig;
use crate::param::{Params, params_of};
use serde_json::json;
use std::collections::HashMap;

fn params(value: serde_json::Value) -> Params {
    params_of(&value).unwrap()
}

fn render(script: &str, value: serde_json::Value) -> String {
    assemble(script)
        .unwrap()
        .render(&params(value))
        .unwrap()
        .sql()
        .to_string()
}

#[test]
fn test_static_script_ignores_parameters() {
    let source = assemble("<script>SELECT id FROM news WHERE id = :id</script>").unwrap();
    assert!(!source.is_dynamic());
    assert_eq!(
        source.static_sql(),
        Some("SELECT id FROM news WHERE id = :id")
    );

    let a = source.render(&params(json!({"id": 1}))).unwrap();
    let b = source.render(&params(json!({"id": 2, "other": "x"}))).unwrap();
    assert_eq!(a.sql(), b.sql());
    assert_eq!(a.parameters(), ["id"]);
}

#[test]
fn test_where_drops_leading_and_or() {
    let script = r#"<script>SELECT * FROM news <where><if test="a != null">AND a = :a</if> <if test="b != null">OR b = :b</if></where></script>"#;
    assert_eq!(
        render(script, json!({"a": 1, "b": 2})),
        "SELECT * FROM news WHERE a = :a OR b = :b"
    );
    assert_eq!(
        render(script, json!({"b": 2})),
        "SELECT * FROM news WHERE b = :b"
    );
    assert_eq!(render(script, json!({})), "SELECT * FROM news");
}

#[test]
fn test_trim_prefix_override() {
    let script = r#"<script><trim prefix="WHERE" prefixOverrides="AND">AND x = 1 AND y = 2</trim></script>"#;
    assert_eq!(render(script, json!({})), "WHERE x = 1 AND y = 2");

    let trim = TrimNode::new(SqlNode::Mixed(vec![]), Some("WHERE"), None, Some("AND"), None);
    assert_eq!(trim.trim("  and x = 1 AND y = 2 "), "WHERE x = 1 AND y = 2");
    assert_eq!(trim.trim("AND"), "");
    assert_eq!(trim.trim("ANDROID = 1"), "WHERE ANDROID = 1");
}

#[test]
fn test_set_drops_trailing_comma() {
    let script = r#"<script>UPDATE news <set><if test="title != null">title = :title,</if><if test="content != null">content = :content,</if></set> WHERE id = :id</script>"#;
    assert_eq!(
        render(script, json!({"id": 1, "title": "t"})),
        "UPDATE news SET title = :title WHERE id = :id"
    );
    assert_eq!(
        render(script, json!({"id": 1, "title": "t", "content": "c"})),
        "UPDATE news SET title = :title,content = :content WHERE id = :id"
    );
}

#[test]
fn test_foreach_open_separator_close() {
    let script = r#"<script><foreach collection="list" item="x" open="(" separator="," close=")">:x</foreach></script>"#;
    let source = assemble(script).unwrap();

    let bound = source.render(&params(json!({"list": [1, 2, 3]}))).unwrap();
    assert_eq!(bound.sql(), "(:__frch_x_0,:__frch_x_1,:__frch_x_2)");
    assert_eq!(bound.value("__frch_x_1"), Some(&json!(2)));

    let bound = source.render(&params(json!({"list": []}))).unwrap();
    assert_eq!(bound.sql(), "");
}

#[test]
fn test_foreach_items_convert_to_positional() {
    let script = r#"<script>SELECT * FROM news WHERE id IN <foreach collection="ids" item="id" open="(" separator="," close=")">:id</foreach> AND status = :status</script>"#;
    let bound = assemble(script)
        .unwrap()
        .render(&params(json!({"ids": [7, 8], "status": 1})))
        .unwrap();
    let positional = bound.to_positional().unwrap();
    assert_eq!(
        positional.sql,
        "SELECT * FROM news WHERE id IN ($1,$2) AND status = $3"
    );
    assert_eq!(positional.values, vec![json!(7), json!(8), json!(1)]);
}

#[test]
fn test_foreach_over_object_fields_and_index() {
    let script = r#"<script><foreach collection="list" item="item" index="i" separator=";">UPDATE t SET v = :item.v WHERE pos = :i</foreach></script>"#;
    let bound = assemble(script)
        .unwrap()
        .render(&params(json!({"list": [{"v": "a"}, {"v": "b"}]})))
        .unwrap();
    assert_eq!(
        bound.sql(),
        "UPDATE t SET v = :__frch_item_0.v WHERE pos = :__frch_i_0;UPDATE t SET v = :__frch_item_1.v WHERE pos = :__frch_i_1"
    );
    assert_eq!(bound.value("__frch_item_1.v"), Some(&json!("b")));
    assert_eq!(bound.value("__frch_i_1"), Some(&json!(1)));
}

#[test]
fn test_foreach_null_collection_is_binding_error() {
    let source =
        assemble(r#"<script><foreach collection="ids" item="id">:id</foreach></script>"#).unwrap();
    let err = source.render(&params(json!({}))).unwrap_err();
    assert!(err.is_binding());
}

#[test]
fn test_choose_picks_first_match_or_otherwise() {
    let script = r#"<script><choose><when test="kind == 'a'">A</when><when test="kind == 'b'">B</when><otherwise>C</otherwise></choose></script>"#;
    assert_eq!(render(script, json!({"kind": "b"})), "B");
    assert_eq!(render(script, json!({"kind": "z"})), "C");
}

#[test]
fn test_bind_creates_a_value() {
    let script = r#"<script><bind name="pattern" value="'%' + title + '%'"/>SELECT * FROM news WHERE title LIKE :pattern</script>"#;
    let bound = assemble(script)
        .unwrap()
        .render(&params(json!({"title": "hot"})))
        .unwrap();
    assert_eq!(bound.sql(), "SELECT * FROM news WHERE title LIKE :pattern");
    assert_eq!(bound.to_positional().unwrap().values, vec![json!("%hot%")]);
}

#[test]
fn test_dynamic_text_reports_binding() {
    let p = params(json!({"table": "news"}));

    let mut ctx = RenderContext::new(&p);
    assert!(SqlNode::Text("SELECT * FROM ${table}".into()).apply(&mut ctx).unwrap());
    assert_eq!(ctx.sql(), "SELECT * FROM news");

    let mut ctx = RenderContext::new(&p);
    assert!(!SqlNode::Text("SELECT * FROM ${missing}".into()).apply(&mut ctx).unwrap());
    assert_eq!(ctx.sql(), "SELECT * FROM ${missing}");
}

#[test]
fn test_assembly_time_variables_make_text_static() {
    let mut vars = HashMap::new();
    vars.insert("schema".to_string(), "public".to_string());

    let source = assemble_with("SELECT * FROM ${schema}.news WHERE id = :id", &vars).unwrap();
    assert_eq!(
        source.static_sql(),
        Some("SELECT * FROM public.news WHERE id = :id")
    );

    let source = assemble_with("SELECT * FROM ${schema}.${table}", &vars).unwrap();
    assert!(source.is_dynamic());
    let bound = source.render(&params(json!({"table": "news"}))).unwrap();
    assert_eq!(bound.sql(), "SELECT * FROM public.news");
}

#[test]
fn test_default_values_when_enabled() {
    let config = ScriptConfig::new().enable_default_value(true);
    let source = ScriptAssembler::new(&config)
        .assemble_text("SELECT * FROM ${table:news}")
        .unwrap();
    assert_eq!(
        source.render(&params(json!({}))).unwrap().sql(),
        "SELECT * FROM news"
    );
    assert_eq!(
        source.render(&params(json!({"table": "authors"}))).unwrap().sql(),
        "SELECT * FROM authors"
    );
}

#[test]
fn test_whitespace_is_kept_when_shrinking_is_off() {
    let config = ScriptConfig::new().shrink_whitespace(false);
    let source = ScriptAssembler::new(&config)
        .assemble_text("SELECT *\n  FROM news")
        .unwrap();
    assert_eq!(source.static_sql(), Some("SELECT *\n  FROM news"));
}

#[test]
fn test_unknown_element_is_configuration_error() {
    let root = ScriptElement::new(SCRIPT_TAG).child(ScriptElement::new("loop").text("x"));
    let config = ScriptConfig::default();
    let err = ScriptAssembler::new(&config).assemble(&root).unwrap_err();
    assert!(err.is_configuration());
}

#[test]
fn test_assembly_errors() {
    for bad in [
        "<script><choose><otherwise>a</otherwise><otherwise>b</otherwise></choose></script>",
        r#"<script><if test="a ==">x</if></script>"#,
        "<script><if>x</if></script>",
        r#"<script><foreach item="x">:x</foreach></script>"#,
        r#"<script><bind value="1"/></script>"#,
    ] {
        assert!(assemble(bad).unwrap_err().is_configuration(), "{bad}");
    }
}

#[test]
fn test_description_built_in_code() {
    let root = ScriptElement::new(SCRIPT_TAG)
        .text("SELECT * FROM news ")
        .child(
            ScriptElement::new("where").child(
                ScriptElement::new("if")
                    .attr("test", "id != null")
                    .text("AND id = :id"),
            ),
        );
    let config = ScriptConfig::default();
    let source = ScriptAssembler::new(&config).assemble(&root).unwrap();
    assert_eq!(
        source.render(&params(json!({"id": 3}))).unwrap().sql(),
        "SELECT * FROM news WHERE id = :id"
    );
}

#[test]
fn test_include_substitutes_properties() {
    let config = ScriptConfig::new().fragment("columns", "n.id, ${alias}.title");
    let source = ScriptAssembler::new(&config)
        .assemble_text(
            r#"<script>SELECT <include refid="columns"><property name="alias" value="n"/></include> FROM news n</script>"#,
        )
        .unwrap();
    assert_eq!(
        source.static_sql(),
        Some("SELECT n.id, n.title FROM news n")
    );
}

#[test]
fn test_nested_includes_with_variables_and_tags() {
    let config = ScriptConfig::new()
        .variable("schema", "public")
        .variable("filter", "by_field")
        .fragment("table", "${schema}.news")
        .fragment(
            "by_field",
            r#"<where><if test="${field} != null">AND ${field} = :${field}</if></where>"#,
        );
    let source = ScriptAssembler::new(&config)
        .assemble_text(
            r#"<script>SELECT * FROM <include refid="table"/> <include refid="${filter}"><property name="field" value="title"/></include></script>"#,
        )
        .unwrap();
    assert_eq!(
        source.render(&params(json!({"title": "t"}))).unwrap().sql(),
        "SELECT * FROM public.news WHERE title = :title"
    );
    assert_eq!(
        source.render(&params(json!({}))).unwrap().sql(),
        "SELECT * FROM public.news"
    );
}

#[test]
fn test_include_errors() {
    let config = ScriptConfig::new()
        .fragment("loop", r#"x <include refid="loop"/>"#)
        .fragment("cols", "id");
    let assembler = ScriptAssembler::new(&config);
    for bad in [
        r#"<script><include refid="missing"/></script>"#,
        r#"<script><include refid="loop"/></script>"#,
        r#"<script><include refid="cols"><property name="a" value="1"/><property name="a" value="2"/></include></script>"#,
        r#"<script><include refid="cols"><if test="a">x</if></include></script>"#,
        r#"<script><property name="a" value="1"/></script>"#,
        "<script><include/></script>",
    ] {
        assert!(assembler.assemble_text(bad).unwrap_err().is_configuration(), "{bad}");
    }
}
