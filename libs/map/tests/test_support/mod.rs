#![allow(dead_code)]

use std::sync::{Arc, OnceLock};

use cinnabar_map::{DataMap, EntityResolver};

pub const TEST_MAP_JSON: &str = include_str!("../fixtures/testmap.json");

static RESOLVER: OnceLock<Arc<EntityResolver>> = OnceLock::new();

pub fn data_map() -> DataMap {
    DataMap::from_json(TEST_MAP_JSON).expect("test map should parse")
}

pub fn resolver() -> &'static Arc<EntityResolver> {
    RESOLVER.get_or_init(|| Arc::new(EntityResolver::new([data_map()])))
}
