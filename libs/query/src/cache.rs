//! Result cache strategies and cache key construction

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use cinnabar_exp::{Expression, Value};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::Error;

/// Where query results may be cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryCacheStrategy {
    #[default]
    NoCache,
    LocalCache,
    /// Like `LocalCache`, but the cached entry is replaced on this run.
    LocalCacheRefresh,
    SharedCache,
    SharedCacheRefresh,
}

impl QueryCacheStrategy {
    const ALL: [QueryCacheStrategy; 5] = [
        QueryCacheStrategy::NoCache,
        QueryCacheStrategy::LocalCache,
        QueryCacheStrategy::LocalCacheRefresh,
        QueryCacheStrategy::SharedCache,
        QueryCacheStrategy::SharedCacheRefresh,
    ];

    // Indexed by discriminant.
    const REFRESH: [QueryCacheStrategy; 5] = [
        QueryCacheStrategy::NoCache,
        QueryCacheStrategy::LocalCacheRefresh,
        QueryCacheStrategy::LocalCacheRefresh,
        QueryCacheStrategy::SharedCacheRefresh,
        QueryCacheStrategy::SharedCacheRefresh,
    ];

    /// The strategy that forces the cached entry to be replaced.
    pub fn refresh(self) -> Self {
        Self::REFRESH[self as usize]
    }

    pub fn is_cached(self) -> bool {
        self != QueryCacheStrategy::NoCache
    }

    pub fn is_refresh(self) -> bool {
        matches!(
            self,
            QueryCacheStrategy::LocalCacheRefresh | QueryCacheStrategy::SharedCacheRefresh
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            QueryCacheStrategy::NoCache => "no_cache",
            QueryCacheStrategy::LocalCache => "local_cache",
            QueryCacheStrategy::LocalCacheRefresh => "local_cache_refresh",
            QueryCacheStrategy::SharedCache => "shared_cache",
            QueryCacheStrategy::SharedCacheRefresh => "shared_cache_refresh",
        }
    }
}

impl fmt::Display for QueryCacheStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QueryCacheStrategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().replace('-', "_").to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|strategy| strategy.as_str() == normalized)
            .ok_or_else(|| Error::Config(format!("unknown cache strategy '{}'", s)))
    }
}

fn sha256_hex(text: &str) -> String {
    hex::encode(Sha256::digest(text.as_bytes()))
}

/// Key text of a parameter value. Objects key by entity and id, or by
/// instance when they have none.
fn key_text(value: &Value) -> String {
    match value {
        Value::Object(node) => match node.object_id() {
            Some(id) => format!("{}#{}", node.entity_name(), id),
            None => format!("{}@{:p}", node.entity_name(), Arc::as_ptr(node)),
        },
        Value::List(items) => {
            let items = items.iter().map(key_text).collect::<Vec<_>>();
            format!("({})", items.join(", "))
        }
        other => other.to_string(),
    }
}

/// Inputs that make two queries share cached results.
#[derive(Debug, Default)]
pub struct CacheKeyParts<'a> {
    pub name: Option<&'a str>,
    pub entity: &'a str,
    pub qualifier: Option<&'a Expression>,
    pub parameters: Option<&'a BTreeMap<String, Value>>,
    pub offset: Option<usize>,
    pub limit: Option<usize>,
    /// Sort keys, first key first.
    pub orderings: Vec<String>,
    /// Non-phantom prefetch paths with their semantics.
    pub prefetches: Vec<String>,
    pub fetch_data_rows: bool,
}

impl CacheKeyParts<'_> {
    pub fn build(&self) -> String {
        let mut key = match self.name {
            Some(name) => name.to_string(),
            None => {
                let qualifier = self
                    .qualifier
                    .map(|q| q.to_string())
                    .unwrap_or_default();
                format!("{}/{}", self.entity, sha256_hex(&qualifier))
            }
        };

        if let Some(parameters) = self.parameters.filter(|p| !p.is_empty()) {
            let flat = parameters
                .iter()
                .map(|(name, value)| format!("{}={}", name, key_text(value)))
                .collect::<Vec<_>>()
                .join("&");
            key.push_str("/p:");
            key.push_str(&sha256_hex(&flat));
        }
        if !self.orderings.is_empty() {
            key.push_str("/s:");
            key.push_str(&sha256_hex(&self.orderings.join(",")));
        }
        if let Some(offset) = self.offset {
            key.push_str(&format!("/o:{}", offset));
        }
        if let Some(limit) = self.limit {
            key.push_str(&format!("/l:{}", limit));
        }
        if !self.prefetches.is_empty() {
            let mut paths = self.prefetches.clone();
            paths.sort();
            key.push_str("/pf:");
            key.push_str(&sha256_hex(&paths.join(",")));
        }
        if self.fetch_data_rows {
            key.push_str("/dr");
        }
        key
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cinnabar_exp::parse;

    #[test]
    fn test_refresh_table() {
        use QueryCacheStrategy::*;
        assert_eq!(NoCache.refresh(), NoCache);
        assert_eq!(LocalCache.refresh(), LocalCacheRefresh);
        assert_eq!(LocalCacheRefresh.refresh(), LocalCacheRefresh);
        assert_eq!(SharedCache.refresh(), SharedCacheRefresh);
        assert_eq!(SharedCacheRefresh.refresh(), SharedCacheRefresh);
    }

    #[test]
    fn test_parse_strategy() {
        assert_eq!(
            "shared-cache".parse::<QueryCacheStrategy>().unwrap(),
            QueryCacheStrategy::SharedCache
        );
        assert_eq!(
            "LOCAL_CACHE_REFRESH".parse::<QueryCacheStrategy>().unwrap(),
            QueryCacheStrategy::LocalCacheRefresh
        );
        assert!("sometimes".parse::<QueryCacheStrategy>().is_err());
    }

    #[test]
    fn test_key_suffixes() {
        let qualifier = parse("artistName = 'x'").unwrap();
        let base = CacheKeyParts {
            entity: "Artist",
            qualifier: Some(&qualifier),
            ..Default::default()
        };
        let key = base.build();
        assert!(key.starts_with("Artist/"));
        assert_eq!(key.len(), "Artist/".len() + 64);

        let paged = CacheKeyParts {
            offset: Some(20),
            limit: Some(10),
            fetch_data_rows: true,
            ..base
        };
        assert!(paged.build().ends_with("/o:20/l:10/dr"));
    }

    #[test]
    fn test_named_key() {
        let parts = CacheKeyParts {
            name: Some("recent"),
            entity: "Artist",
            ..Default::default()
        };
        assert_eq!(parts.build(), "recent");
    }

    #[test]
    fn test_prefetch_order_does_not_matter() {
        let a = CacheKeyParts {
            entity: "Artist",
            prefetches: vec!["a:joint".into(), "b:disjoint".into()],
            ..Default::default()
        };
        let b = CacheKeyParts {
            entity: "Artist",
            prefetches: vec!["b:disjoint".into(), "a:joint".into()],
            ..Default::default()
        };
        assert_eq!(a.build(), b.build());
    }

    #[test]
    fn test_ordering_sequence_matters() {
        let by_name_then_price = CacheKeyParts {
            entity: "Painting",
            orderings: vec!["paintingTitle asc".into(), "estimatedPrice desc".into()],
            ..Default::default()
        };
        let by_price_then_name = CacheKeyParts {
            entity: "Painting",
            orderings: vec!["estimatedPrice desc".into(), "paintingTitle asc".into()],
            ..Default::default()
        };
        let key = by_name_then_price.build();
        assert!(key.contains("/s:"));
        assert_ne!(key, by_price_then_name.build());
    }

    #[test]
    fn test_object_parameters_key_by_entity_and_id() {
        use cinnabar_exp::{DataObject, ObjectId};

        let artist = |id: i32| {
            DataObject::new("Artist")
                .with_id(ObjectId::new("Artist", "ARTIST_ID", id))
                .into_value()
        };
        let gallery = DataObject::new("Gallery")
            .with_id(ObjectId::new("Gallery", "ARTIST_ID", 1))
            .into_value();
        let key_for = |value: Value| {
            let mut parameters = BTreeMap::new();
            parameters.insert("x".to_string(), value);
            CacheKeyParts {
                entity: "Painting",
                parameters: Some(&parameters),
                ..Default::default()
            }
            .build()
        };

        assert_eq!(key_for(artist(1)), key_for(artist(1)));
        assert_ne!(key_for(artist(1)), key_for(artist(2)));
        assert_ne!(key_for(artist(1)), key_for(gallery));

        let unsaved_a = DataObject::new("Artist").into_value();
        let unsaved_b = DataObject::new("Artist").into_value();
        assert_ne!(key_for(unsaved_a.clone()), key_for(unsaved_b));
        assert_eq!(key_for(unsaved_a.clone()), key_for(unsaved_a));
    }
}
