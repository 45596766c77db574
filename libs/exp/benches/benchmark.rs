//! Criterion benchmarks for parsing, evaluation and translation

use std::sync::Arc;
use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use cinnabar_exp::{
    evaluate, parse, translate_to_related_entity, DataObject, EvalContext, ExpressionCache,
    ObjectId, Value,
};
use cinnabar_map::{DataMap, EntityResolver};

const QUALIFIER: &str =
    "artistName like 'Pablo%' and (paintingArray.estimatedPrice > 100 or paintingArray.paintingTitle in ('a', 'b', 'c'))";

fn custom_criterion() -> Criterion {
    Criterion::default()
        .sample_size(20)
        .warm_up_time(Duration::from_millis(100))
        .measurement_time(Duration::from_secs(1))
        .nresamples(1000)
        .noise_threshold(0.05)
}

fn artist() -> Value {
    let paintings = (0..50).map(|i| {
        Arc::new(
            DataObject::new("Painting")
                .with_id(ObjectId::new("Painting", "PAINTING_ID", i))
                .with("paintingTitle", format!("painting {}", i))
                .with("estimatedPrice", f64::from(i) * 3.5),
        )
    });
    DataObject::new("Artist")
        .with("artistName", "Pablo Picasso")
        .with_many("paintingArray", paintings)
        .into_value()
}

fn bench_parse(c: &mut Criterion) {
    c.bench_function("parse_qualifier", |b| {
        b.iter(|| parse(black_box(QUALIFIER)).unwrap())
    });

    let cache = ExpressionCache::default();
    c.bench_function("parse_qualifier_cached", |b| {
        b.iter(|| cache.get_or_parse(black_box(QUALIFIER)).unwrap())
    });
}

fn bench_evaluate(c: &mut Criterion) {
    let expr = parse(QUALIFIER).unwrap();
    let root = artist();
    let ctx = EvalContext::default();

    c.bench_function("evaluate_to_many", |b| {
        b.iter(|| evaluate(black_box(&expr), black_box(&root), &ctx).unwrap())
    });

    let arithmetic = parse("(1 + 2) * 3 - 4 / 2 + 0.5").unwrap();
    c.bench_function("evaluate_arithmetic", |b| {
        b.iter(|| evaluate(black_box(&arithmetic), &Value::Null, &ctx).unwrap())
    });
}

fn bench_translate(c: &mut Criterion) {
    let json = include_str!("../../map/tests/fixtures/testmap.json");
    let resolver = EntityResolver::new([DataMap::from_json(json).unwrap()]);
    let expr = parse("paintingArray.toPaintingInfo.textReview = 'x' and artistName = 'y'").unwrap();

    c.bench_function("translate_to_related_entity", |b| {
        b.iter(|| {
            translate_to_related_entity(&resolver, "Artist", black_box(&expr), "paintingArray.toGallery")
                .unwrap()
        })
    });
}

criterion_group! {
    name = benches;
    config = custom_criterion();
    targets =
        bench_parse,
        bench_evaluate,
        bench_translate
}
criterion_main!(benches);
