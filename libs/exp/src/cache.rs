//! Parsed expression cache

use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};

use lru::LruCache;
use tracing::trace;

use crate::ast::Expression;
use crate::error::{Error, Result};
use crate::parser::parse;

pub const DEFAULT_CAPACITY: usize = 1000;

/// Bounded cache of parsed expressions keyed by source text. Shared trees
/// are handed out as `Arc`s.
pub struct ExpressionCache {
    entries: Mutex<LruCache<String, Arc<Expression>>>,
}

impl ExpressionCache {
    /// A capacity of zero falls back to [`DEFAULT_CAPACITY`].
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity)
            .or_else(|| NonZeroUsize::new(DEFAULT_CAPACITY))
            .unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Parse `text`, or return the tree parsed earlier. Parse failures are
    /// not cached.
    pub fn get_or_parse(&self, text: &str) -> Result<Arc<Expression>> {
        {
            let mut entries = self
                .entries
                .lock()
                .map_err(|e| Error::LockError(e.to_string()))?;
            if let Some(expr) = entries.get(text) {
                trace!(expression = text, "expression cache hit");
                return Ok(Arc::clone(expr));
            }
        }

        let expr = Arc::new(parse(text)?);
        let mut entries = self
            .entries
            .lock()
            .map_err(|e| Error::LockError(e.to_string()))?;
        entries.put(text.to_string(), Arc::clone(&expr));
        Ok(expr)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.clear();
        }
    }
}

impl Default for ExpressionCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_returns_shared_tree() {
        let cache = ExpressionCache::new(4);
        let first = cache.get_or_parse("a = 1").unwrap();
        let second = cache.get_or_parse("a = 1").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_evicts_least_recent() {
        let cache = ExpressionCache::new(2);
        let a = cache.get_or_parse("a = 1").unwrap();
        cache.get_or_parse("b = 1").unwrap();
        cache.get_or_parse("a = 1").unwrap();
        cache.get_or_parse("c = 1").unwrap();
        assert_eq!(cache.len(), 2);
        assert!(Arc::ptr_eq(&a, &cache.get_or_parse("a = 1").unwrap()));
    }

    #[test]
    fn test_errors_are_not_cached() {
        let cache = ExpressionCache::default();
        assert!(cache.get_or_parse("a = ").is_err());
        assert!(cache.is_empty());
    }
}
