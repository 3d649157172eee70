//! Bounded LRU cache of compiled templates.

use super::template::{PromptTemplate, TemplateError};
use lru::LruCache;
use once_cell::sync::Lazy;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

pub const DEFAULT_TEMPLATE_CACHE_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TemplateCacheStats {
    pub hits: u64,
    pub misses: u64,
    pub len: usize,
    pub capacity: usize,
}

impl TemplateCacheStats {
    pub fn hit_ratio(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Compiled templates keyed by their source text.
///
/// Compile failures are not cached.
pub struct TemplateCache {
    entries: Mutex<LruCache<String, Arc<PromptTemplate>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl TemplateCache {
    /// A zero capacity is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    // Entries are immutable once inserted, so a poisoned guard is still consistent.
    fn entries(&self) -> MutexGuard<'_, LruCache<String, Arc<PromptTemplate>>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn get_or_compile(&self, source: &str) -> Result<Arc<PromptTemplate>, TemplateError> {
        if let Some(hit) = self.entries().get(source) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(Arc::clone(hit));
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        let compiled = Arc::new(PromptTemplate::compile(source)?);
        self.entries().put(source.to_string(), Arc::clone(&compiled));
        Ok(compiled)
    }

    pub fn stats(&self) -> TemplateCacheStats {
        let entries = self.entries();
        TemplateCacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            len: entries.len(),
            capacity: entries.cap().get(),
        }
    }

    pub fn clear(&self) {
        self.entries().clear();
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
    }
}

impl Default for TemplateCache {
    fn default() -> Self {
        Self::new(DEFAULT_TEMPLATE_CACHE_CAPACITY)
    }
}

static GLOBAL_CACHE: Lazy<TemplateCache> = Lazy::new(TemplateCache::default);

/// The process-wide cache used by [`render`](super::render).
pub fn global() -> &'static TemplateCache {
    &GLOBAL_CACHE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hits_and_misses_are_counted() {
        let cache = TemplateCache::new(4);
        let a = cache.get_or_compile("hello {name}").unwrap();
        let b = cache.get_or_compile("hello {name}").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        let stats = cache.stats();
        assert_eq!((stats.hits, stats.misses, stats.len), (1, 1, 1));
        assert!((stats.hit_ratio() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn least_recently_used_is_evicted() {
        let cache = TemplateCache::new(2);
        cache.get_or_compile("{a}").unwrap();
        cache.get_or_compile("{b}").unwrap();
        cache.get_or_compile("{a}").unwrap();
        cache.get_or_compile("{c}").unwrap();
        assert_eq!(cache.stats().len, 2);
        cache.get_or_compile("{a}").unwrap();
        assert_eq!(cache.stats().hits, 2);
        cache.get_or_compile("{b}").unwrap();
        assert_eq!(cache.stats().misses, 4);
    }

    #[test]
    fn failures_are_not_cached() {
        let cache = TemplateCache::new(2);
        assert!(cache.get_or_compile("{oops").is_err());
        assert_eq!(cache.stats().len, 0);
        cache.clear();
        assert_eq!(cache.stats(), TemplateCacheStats { capacity: 2, ..Default::default() });
    }
}
