mod test_support;

use std::collections::HashMap;
use std::sync::Arc;

use cinnabar_exp::{parse, Value};
use cinnabar_query::{Ordering, PrefetchSemantics, QueryCacheStrategy, QueryRoot, SelectQuery};
use test_support::resolver;

fn cached(qualifier: &str) -> SelectQuery {
    SelectQuery::new("Artist")
        .where_(parse(qualifier).unwrap())
        .cache(QueryCacheStrategy::LocalCache)
}

fn key(query: &SelectQuery) -> String {
    query
        .metadata(resolver())
        .unwrap()
        .cache_key()
        .unwrap()
        .expect("cached query should have a key")
}

#[test]
fn test_resolution_is_idempotent() {
    let query = cached("artistName = 'a'");
    let first = query.metadata(resolver()).unwrap().resolved().unwrap().unwrap();
    let second = query.metadata(resolver()).unwrap().resolved().unwrap().unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(first.name(), "Artist");
    assert_eq!(first.db_entity.as_ref().unwrap().name, "ARTIST");
}

#[test]
fn test_type_root_resolves_like_name_root() {
    let by_type = SelectQuery::new(QueryRoot::type_token("org.example.testmap.Painting"));
    let by_name = SelectQuery::new("Painting");
    let a = by_type.metadata(resolver()).unwrap().resolved().unwrap().unwrap();
    let b = by_name.metadata(resolver()).unwrap().resolved().unwrap().unwrap();
    assert_eq!(*a, *b);
}

#[test]
fn test_unknown_root_fails() {
    let err = SelectQuery::new("Sculpture").metadata(resolver()).unwrap_err();
    assert!(matches!(err, cinnabar_query::Error::UnresolvableRoot(_)));
}

#[test]
fn test_identical_queries_share_a_key() {
    assert_eq!(key(&cached("artistName = 'a'")), key(&cached("artistName = 'a'")));
    assert_ne!(key(&cached("artistName = 'a'")), key(&cached("artistName = 'b'")));
}

#[test]
fn test_parameter_values_change_the_key() {
    let template = cached("artistName = $name");
    let bind = |name: &str| {
        let mut values = HashMap::new();
        values.insert("name".to_string(), Value::from(name));
        template.with_parameters(&values).unwrap()
    };
    let a = key(&bind("a"));
    assert_eq!(a, key(&bind("a")));
    assert_ne!(a, key(&bind("b")));
    assert!(a.contains("/p:"));
}

#[test]
fn test_offset_and_limit_change_the_key() {
    let base = cached("artistName = 'a'");
    let plain = key(&base);
    let paged = key(&base.clone().offset(10).limit(5));
    let other_page = key(&base.clone().offset(15).limit(5));
    assert_ne!(plain, paged);
    assert_ne!(paged, other_page);
    assert!(paged.ends_with("/o:10/l:5"));
}

#[test]
fn test_prefetches_and_data_rows_change_the_key() {
    let base = cached("artistName = 'a'");
    let plain = key(&base);
    let prefetched = key(&base.clone().prefetch("paintingArray", PrefetchSemantics::Disjoint));
    let rows = key(&base.clone().fetch_data_rows(true));
    assert_ne!(plain, prefetched);
    assert!(prefetched.contains("/pf:"));
    assert!(rows.ends_with("/dr"));
}

#[test]
fn test_named_query_keys_by_name() {
    let query = cached("artistName = 'a'").name("artists-a");
    assert_eq!(key(&query), "artists-a");
}

#[test]
fn test_no_cache_strategy_has_no_key() {
    let query = SelectQuery::new("Artist").where_(parse("artistName = 'a'").unwrap());
    assert_eq!(query.metadata(resolver()).unwrap().cache_key().unwrap(), None);
}

#[test]
fn test_refresh_keeps_the_key() {
    let local = cached("artistName = 'a'");
    let refresh = local
        .clone()
        .cache(QueryCacheStrategy::LocalCache.refresh());
    assert_eq!(key(&local), key(&refresh));
    let metadata = refresh.metadata(resolver()).unwrap();
    assert_eq!(metadata.cache_strategy, QueryCacheStrategy::LocalCacheRefresh);
    assert!(metadata.cache_strategy.is_refresh());
}

#[test]
fn test_metadata_prefetch_tree_is_a_copy() {
    let query = SelectQuery::new("Artist").prefetch("paintingArray", PrefetchSemantics::Joint);
    let mut metadata = query.metadata(resolver()).unwrap();
    if let Some(tree) = metadata.prefetch_tree.as_mut() {
        tree.add_path("artistExhibitArray").phantom = false;
    }
    let fresh = query.metadata(resolver()).unwrap();
    let paths: Vec<String> = fresh
        .prefetch_tree
        .as_ref()
        .unwrap()
        .non_phantom_nodes()
        .into_iter()
        .map(|node| node.path().to_string())
        .collect();
    assert_eq!(paths, vec!["paintingArray"]);
}

#[test]
fn test_cache_groups_are_carried() {
    let query = cached("artistName = 'a'").cache_groups(["artists", "slow"]);
    let metadata = query.metadata(resolver()).unwrap();
    assert_eq!(metadata.cache_groups, vec!["artists", "slow"]);
}

fn paged_paintings() -> SelectQuery {
    SelectQuery::new("Painting")
        .where_(parse("estimatedPrice > 1").unwrap())
        .limit(5)
        .cache(QueryCacheStrategy::LocalCache)
}

#[test]
fn test_sort_order_changes_the_key() {
    let unsorted = key(&paged_paintings());
    let asc = key(&paged_paintings().order_by(Ordering::asc("paintingTitle").unwrap()));
    let desc = key(&paged_paintings().order_by(Ordering::desc("paintingTitle").unwrap()));
    assert_ne!(asc, desc);
    assert_ne!(asc, unsorted);
    assert_eq!(
        asc,
        key(&paged_paintings().order_by(Ordering::asc("paintingTitle").unwrap()))
    );
}

#[test]
fn test_adding_an_ordering_after_resolution_updates_the_key() {
    let query = paged_paintings().order_by(Ordering::asc("paintingTitle").unwrap());
    let before = key(&query);
    let resorted = query.order_by(Ordering::desc("estimatedPrice").unwrap());
    assert_ne!(before, key(&resorted));
}

#[test]
fn test_each_key_component_is_distinct() {
    let base = paged_paintings();
    let bind = |query: &SelectQuery, value: i32| {
        let mut values = HashMap::new();
        values.insert("p".to_string(), Value::Int(value));
        query.with_parameters(&values).unwrap()
    };
    let keys = [
        key(&base),
        key(&base.clone().offset(5)),
        key(&base.clone().offset(10)),
        key(&base.clone().limit(10)),
        key(&base.clone().order_by(Ordering::asc("paintingTitle").unwrap())),
        key(&base.clone().order_by(Ordering::desc("paintingTitle").unwrap())),
        key(&bind(&base, 1)),
        key(&bind(&base, 2)),
        key(&base.clone().prefetch("toArtist", PrefetchSemantics::Joint)),
        key(&base.clone().prefetch("toArtist", PrefetchSemantics::Disjoint)),
        key(&base.clone().prefetch("toGallery", PrefetchSemantics::Joint)),
        key(&base.clone().fetch_data_rows(true)),
    ];
    for (i, a) in keys.iter().enumerate() {
        for b in &keys[i + 1..] {
            assert_ne!(a, b);
        }
    }
}
