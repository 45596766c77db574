#![allow(dead_code)]

use std::sync::{Arc, OnceLock};

use chrono::NaiveDate;
use cinnabar_exp::{DataObject, ObjectId, Value};
use cinnabar_map::{DataMap, EntityResolver};

pub const TEST_MAP_JSON: &str = include_str!("../../../map/tests/fixtures/testmap.json");

static RESOLVER: OnceLock<Arc<EntityResolver>> = OnceLock::new();

pub fn resolver() -> &'static Arc<EntityResolver> {
    RESOLVER.get_or_init(|| {
        let map = DataMap::from_json(TEST_MAP_JSON).expect("test map should parse");
        Arc::new(EntityResolver::new([map]))
    })
}

pub fn painting(id: i32, title: &str, price: f64) -> Arc<DataObject> {
    Arc::new(
        DataObject::new("Painting")
            .with_id(ObjectId::new("Painting", "PAINTING_ID", id))
            .with("paintingTitle", title)
            .with("estimatedPrice", price)
            .with_db("PAINTING_TITLE", title),
    )
}

/// Artist with two paintings, one of them unpriced.
pub fn picasso() -> Value {
    let unpriced = Arc::new(
        DataObject::new("Painting")
            .with_id(ObjectId::new("Painting", "PAINTING_ID", 3))
            .with("paintingTitle", "Guernica"),
    );
    DataObject::new("Artist")
        .with_id(ObjectId::new("Artist", "ARTIST_ID", 1))
        .with("artistName", "Pablo Picasso")
        .with("dateOfBirth", NaiveDate::from_ymd_opt(1881, 10, 25).unwrap())
        .with_db("ARTIST_NAME", "Pablo Picasso")
        .with_many("paintingArray", vec![painting(2, "Les Demoiselles", 1000.0), unpriced])
        .into_value()
}

pub fn artist(id: i32, name: &str) -> Value {
    DataObject::new("Artist")
        .with_id(ObjectId::new("Artist", "ARTIST_ID", id))
        .with("artistName", name)
        .with_many("paintingArray", Vec::new())
        .into_value()
}
