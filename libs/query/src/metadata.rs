//! Query metadata
//!
//! Everything an execution layer needs to know about a query besides its
//! qualifier: paging, caching and prefetching settings, plus the entity the
//! root resolves to and the result cache key. Resolution is memoized per
//! root identity and catalog instance.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use cinnabar_exp::{Expression, Value};
use cinnabar_map::EntityResolver;
use tracing::debug;

use crate::cache::{CacheKeyParts, QueryCacheStrategy};
use crate::error::{Error, Result};
use crate::ordering::Ordering;
use crate::prefetch::PrefetchTreeNode;
use crate::root::{QueryRoot, ResolvedEntity, RootKey};

/// The parts of a query that identify its results.
#[derive(Debug, Clone, Copy)]
pub struct QueryDescriptor<'a> {
    pub name: Option<&'a str>,
    pub qualifier: Option<&'a Expression>,
    pub parameters: &'a BTreeMap<String, Value>,
    pub orderings: &'a [Ordering],
}

#[derive(Debug, Default, Clone)]
struct ResolutionState {
    memo: Option<(RootKey, Weak<EntityResolver>)>,
    resolved: Option<Arc<ResolvedEntity>>,
    cache_key: Option<String>,
}

impl ResolutionState {
    fn is_current(&self, key: &RootKey, resolver: &Arc<EntityResolver>) -> bool {
        match &self.memo {
            Some((memo_key, memo_resolver)) => {
                memo_key == key
                    && memo_resolver.as_ptr() == Arc::as_ptr(resolver)
                    && memo_resolver.strong_count() > 0
                    && self.resolved.is_some()
            }
            None => false,
        }
    }
}

#[derive(Debug, Default)]
pub struct QueryMetadata {
    pub fetch_limit: Option<usize>,
    pub fetch_offset: Option<usize>,
    pub page_size: Option<usize>,
    pub fetch_data_rows: bool,
    pub cache_strategy: QueryCacheStrategy,
    pub cache_groups: Vec<String>,
    pub prefetch_tree: Option<PrefetchTreeNode>,
    state: Mutex<ResolutionState>,
}

/// Copies settings and the current resolution. The prefetch tree is a deep
/// copy.
impl Clone for QueryMetadata {
    fn clone(&self) -> Self {
        let state = match self.state.lock() {
            Ok(state) => state.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        };
        Self {
            fetch_limit: self.fetch_limit,
            fetch_offset: self.fetch_offset,
            page_size: self.page_size,
            fetch_data_rows: self.fetch_data_rows,
            cache_strategy: self.cache_strategy,
            cache_groups: self.cache_groups.clone(),
            prefetch_tree: self.prefetch_tree.clone(),
            state: Mutex::new(state),
        }
    }
}

impl QueryMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, ResolutionState>> {
        self.state
            .lock()
            .map_err(|e| Error::Lock(format!("query metadata: {}", e)))
    }

    /// Resolve `root` against `resolver` and compute the cache key.
    ///
    /// Repeated calls with the same root and the same catalog instance
    /// return the memoized entity without resolving again.
    pub fn resolve(
        &self,
        root: &QueryRoot,
        resolver: &Arc<EntityResolver>,
        query: QueryDescriptor<'_>,
    ) -> Result<Arc<ResolvedEntity>> {
        let key = root.key();
        let mut state = self.lock()?;
        if state.is_current(&key, resolver) {
            if let Some(resolved) = &state.resolved {
                return Ok(Arc::clone(resolved));
            }
        }

        let resolved = Arc::new(root.resolve(resolver)?);
        debug!(root = %root, entity = resolved.name(), "resolved query root");

        let cache_key = self.build_cache_key(&resolved, query);
        if let Some(cache_key) = &cache_key {
            debug!(key = %cache_key, strategy = %self.cache_strategy, "created cache key");
        }

        state.memo = Some((key, Arc::downgrade(resolver)));
        state.resolved = Some(Arc::clone(&resolved));
        state.cache_key = cache_key;
        Ok(resolved)
    }

    fn build_cache_key(&self, resolved: &ResolvedEntity, query: QueryDescriptor<'_>) -> Option<String> {
        if !self.cache_strategy.is_cached() {
            return None;
        }
        let prefetches = self
            .prefetch_tree
            .as_ref()
            .map(|tree| {
                tree.non_phantom_nodes()
                    .into_iter()
                    .map(|node| format!("{}:{}", node.path(), node.semantics))
                    .collect()
            })
            .unwrap_or_default();
        let parts = CacheKeyParts {
            name: query.name,
            entity: resolved.name(),
            qualifier: query.qualifier,
            parameters: Some(query.parameters),
            offset: self.fetch_offset,
            limit: self.fetch_limit,
            orderings: query.orderings.iter().map(ToString::to_string).collect(),
            prefetches,
            fetch_data_rows: self.fetch_data_rows,
        };
        Some(parts.build())
    }

    /// Drop any memoized resolution.
    pub fn invalidate(&mut self) {
        let state = match self.state.get_mut() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        };
        *state = ResolutionState::default();
    }

    pub fn resolved(&self) -> Result<Option<Arc<ResolvedEntity>>> {
        Ok(self.lock()?.resolved.clone())
    }

    /// Result cache key, or `None` when caching is off or nothing is
    /// resolved yet.
    pub fn cache_key(&self) -> Result<Option<String>> {
        Ok(self.lock()?.cache_key.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prefetch::PrefetchSemantics;
    use cinnabar_map::DataMap;

    fn resolver() -> Arc<EntityResolver> {
        let json = include_str!(concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/../map/tests/fixtures/testmap.json"
        ));
        Arc::new(EntityResolver::new([DataMap::from_json(json).unwrap()]))
    }

    fn descriptor(parameters: &BTreeMap<String, Value>) -> QueryDescriptor<'_> {
        QueryDescriptor {
            name: None,
            qualifier: None,
            parameters,
            orderings: &[],
        }
    }

    #[test]
    fn test_resolution_is_memoized() {
        let resolver = resolver();
        let params = BTreeMap::new();
        let metadata = QueryMetadata::new();
        let root = QueryRoot::entity("Artist");

        let first = metadata.resolve(&root, &resolver, descriptor(&params)).unwrap();
        let second = metadata.resolve(&root, &resolver, descriptor(&params)).unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        let other = metadata
            .resolve(&QueryRoot::entity("Painting"), &resolver, descriptor(&params))
            .unwrap();
        assert_eq!(other.name(), "Painting");

        let fresh_catalog = self::resolver();
        let again = metadata
            .resolve(&QueryRoot::entity("Painting"), &fresh_catalog, descriptor(&params))
            .unwrap();
        assert!(!Arc::ptr_eq(&other, &again));
        assert_eq!(*other, *again);
    }

    #[test]
    fn test_no_cache_has_no_key() {
        let resolver = resolver();
        let params = BTreeMap::new();
        let metadata = QueryMetadata::new();
        metadata
            .resolve(&QueryRoot::entity("Artist"), &resolver, descriptor(&params))
            .unwrap();
        assert_eq!(metadata.cache_key().unwrap(), None);
    }

    #[test]
    fn test_clone_copies_prefetch_tree() {
        let mut metadata = QueryMetadata::new();
        metadata.prefetch_tree = Some(PrefetchTreeNode::with_path("toArtist", PrefetchSemantics::Joint));
        let mut copy = metadata.clone();
        if let Some(tree) = copy.prefetch_tree.as_mut() {
            tree.add_path("toGallery").phantom = false;
        }
        assert_eq!(metadata.prefetch_tree.as_ref().unwrap().non_phantom_nodes().len(), 1);
    }

    #[test]
    fn test_invalidate_forgets_resolution() {
        let resolver = resolver();
        let params = BTreeMap::new();
        let mut metadata = QueryMetadata::new();
        metadata
            .resolve(&QueryRoot::entity("Artist"), &resolver, descriptor(&params))
            .unwrap();
        assert!(metadata.resolved().unwrap().is_some());
        metadata.invalidate();
        assert!(metadata.resolved().unwrap().is_none());
    }
}
