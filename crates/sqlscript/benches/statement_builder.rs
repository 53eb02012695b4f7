use criterion::{Criterion, black_box, criterion_group, criterion_main};
use serde::Serialize;
use sqlscript::script::assemble;
use sqlscript::{
    Input, OperationKind, OperationMetadata, Record, StatementBuilder, params_of,
};

#[derive(Default, Serialize, Record)]
#[record(table = "news")]
struct News {
    #[record(key)]
    id: Option<i64>,
    title: Option<String>,
    content: Option<String>,
    author_id: Option<i64>,
}

fn filter() -> News {
    News {
        title: Some("rust".into()),
        content: Some("sql".into()),
        ..Default::default()
    }
}

fn bench_build(c: &mut Criterion) {
    let meta = OperationMetadata::new().like(["content"]);
    let news = filter();

    c.bench_function("build_select_cold", |b| {
        b.iter(|| {
            let builder = StatementBuilder::default();
            builder
                .build(OperationKind::Select, Input::One(black_box(&news)), &meta)
                .unwrap()
        })
    });

    let builder = StatementBuilder::default();
    c.bench_function("build_select_cached", |b| {
        b.iter(|| {
            builder
                .build(OperationKind::Select, Input::One(black_box(&news)), &meta)
                .unwrap()
        })
    });
}

fn bench_render(c: &mut Criterion) {
    let source = assemble(
        r#"<script>SELECT * FROM news <where><if test="title != null">AND title = :title</if><if test="ids != null and ids.size() > 0">AND id IN <foreach collection="ids" item="id" open="(" separator="," close=")">:id</foreach></if></where></script>"#,
    )
    .unwrap();
    let params = params_of(&serde_json::json!({
        "title": "rust",
        "ids": (0..32).collect::<Vec<i32>>(),
    }))
    .unwrap();

    c.bench_function("render_dynamic_script", |b| {
        b.iter(|| source.render(black_box(&params)).unwrap())
    });

    c.bench_function("render_to_positional", |b| {
        b.iter(|| {
            source
                .render(black_box(&params))
                .unwrap()
                .to_positional()
                .unwrap()
        })
    });
}

criterion_group!(benches, bench_build, bench_render);
criterion_main!(benches);
