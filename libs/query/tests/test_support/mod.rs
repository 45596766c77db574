#![allow(dead_code)]

use std::sync::{Arc, OnceLock};

use cinnabar_exp::{DataRow, EvalContext};
use cinnabar_map::{DataMap, EntityResolver};
use cinnabar_query::InMemoryExecutor;

pub const TEST_MAP_JSON: &str = include_str!("../../../map/tests/fixtures/testmap.json");

static RESOLVER: OnceLock<Arc<EntityResolver>> = OnceLock::new();

pub fn resolver() -> &'static Arc<EntityResolver> {
    RESOLVER.get_or_init(|| {
        let map = DataMap::from_json(TEST_MAP_JSON).expect("test map should parse");
        Arc::new(EntityResolver::new([map]))
    })
}

pub fn painting_row(id: i32, title: &str, price: Option<i32>, artist_id: i64) -> DataRow {
    DataRow::new("PAINTING")
        .with("PAINTING_ID", id)
        .with("PAINTING_TITLE", title)
        .with("ESTIMATED_PRICE", price)
        .with("ARTIST_ID", artist_id)
}

pub fn artist_row(id: i64, name: &str) -> DataRow {
    DataRow::new("ARTIST")
        .with("ARTIST_ID", id)
        .with("ARTIST_NAME", name)
}

/// Four paintings by two artists; one unpriced. Only the first artist has
/// an `ARTIST` row.
pub fn executor() -> InMemoryExecutor {
    InMemoryExecutor::new(EvalContext::new())
        .with_catalog(Arc::clone(resolver()))
        .with_rows(
            "PAINTING",
            [
                painting_row(1, "Guernica", None, 1),
                painting_row(2, "Les Demoiselles", Some(1000), 1),
                painting_row(3, "Starry Night", Some(3000), 2),
                painting_row(4, "Sunflowers", Some(2000), 2),
            ],
        )
        .and_then(|executor| executor.with_rows("ARTIST", [artist_row(1, "Picasso")]))
        .expect("rows should insert")
}
