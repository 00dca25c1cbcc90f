//! Parse cache: memoizes `(query, schemaId) -> Expr` with LRU eviction and a
//! TTL on top. Grounded on the teacher crate's `KvStore` (`storage/kv.rs`):
//! a `parking_lot::Mutex`-guarded map plus a single background sweep thread,
//! spawned at most once per cache instance and stoppable via a flag rather
//! than a channel.

use super::Expr;
use lru::LruCache;
use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Fixed-width digest over `query` + separator + `schemaId` (spec.md §4.4):
/// decouples the key size from the input length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey([u8; 32]);

impl CacheKey {
    pub fn new(query: &str, schema_id: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(query.as_bytes());
        hasher.update([0u8]); // separator byte; neither field can contain it
        hasher.update(schema_id.as_bytes());
        Self(hasher.finalize().into())
    }
}

struct CacheEntry {
    ast: Arc<Expr>,
    inserted_at: Instant,
}

/// Snapshot counters for cache introspection, the way `KvStore` exposes
/// `len()`/`keys()` for its own callers.
#[derive(Debug, Default, Clone, Copy)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub expired: u64,
}

struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    expired: AtomicU64,
}

impl Default for Counters {
    fn default() -> Self {
        Self {
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
            expired: AtomicU64::new(0),
        }
    }
}

/// A bounded, concurrency-safe memoization layer over [`super::parser::parse`].
///
/// Cloning a `ParseCache` shares the underlying map and sweep thread (it is
/// a thin handle over `Arc`s), matching how `SchemaRegistry` and `KvStore`
/// hand out cheap, shared clones to request handlers.
#[derive(Clone)]
pub struct ParseCache {
    inner: Arc<Mutex<LruCache<CacheKey, CacheEntry>>>,
    ttl: Duration,
    counters: Arc<Counters>,
    sweep_started: Arc<AtomicBool>,
    stop: Arc<AtomicBool>,
}

impl ParseCache {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap();
        Self {
            inner: Arc::new(Mutex::new(LruCache::new(capacity))),
            ttl,
            counters: Arc::new(Counters::default()),
            sweep_started: Arc::new(AtomicBool::new(false)),
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    /// `get`, spec.md §4.4: returns the cached AST and moves the entry to
    /// MRU, or reports a miss if absent or past its TTL (an expired entry is
    /// removed on access rather than left for the sweeper).
    pub fn get(&self, query: &str, schema_id: &str) -> Option<Arc<Expr>> {
        let key = CacheKey::new(query, schema_id);
        let mut guard = self.inner.lock();
        let hit = match guard.get(&key) {
            Some(entry) if entry.inserted_at.elapsed() <= self.ttl => Some(entry.ast.clone()),
            Some(_) => None,
            None => None,
        };
        match hit {
            Some(ast) => {
                self.counters.hits.fetch_add(1, Ordering::Relaxed);
                Some(ast)
            }
            None => {
                if guard.peek(&key).is_some() {
                    guard.pop(&key);
                    self.counters.expired.fetch_add(1, Ordering::Relaxed);
                }
                self.counters.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// `set`, spec.md §4.4: insert (or replace) at MRU; eviction of the LRU
    /// entry when this push crosses capacity is handled by `lru::LruCache`
    /// itself (P6/P7).
    pub fn set(&self, query: &str, schema_id: &str, ast: Expr) -> Arc<Expr> {
        let key = CacheKey::new(query, schema_id);
        let ast = Arc::new(ast);
        let mut guard = self.inner.lock();
        let was_full = guard.len() == guard.cap().get() && guard.peek(&key).is_none();
        guard.put(key, CacheEntry { ast: ast.clone(), inserted_at: Instant::now() });
        if was_full {
            self.counters.evictions.fetch_add(1, Ordering::Relaxed);
        }
        ast
    }

    pub fn delete(&self, query: &str, schema_id: &str) -> bool {
        let key = CacheKey::new(query, schema_id);
        self.inner.lock().pop(&key).is_some()
    }

    pub fn clear(&self) {
        self.inner.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            evictions: self.counters.evictions.load(Ordering::Relaxed),
            expired: self.counters.expired.load(Ordering::Relaxed),
        }
    }

    /// Sweep TTL-expired entries under the write lock, the way
    /// `KvStore::save_snapshot` is invoked from its single background
    /// thread. Idempotent: the sweep loop itself is started at most once
    /// per cache (guarded by `sweep_started`), mirroring
    /// `ensure_persistence_loop`'s own once-guard.
    fn sweep_once(&self) {
        let mut guard = self.inner.lock();
        let ttl = self.ttl;
        let expired: Vec<CacheKey> = guard
            .iter()
            .filter(|(_, entry)| entry.inserted_at.elapsed() > ttl)
            .map(|(k, _)| *k)
            .collect();
        for key in expired {
            guard.pop(&key);
            self.counters.expired.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Start the background TTL sweeper on the given interval. Safe to call
    /// more than once; only the first call spawns a thread. The thread
    /// checks `stop` every tick and joins promptly once `stop_sweeper` is
    /// called (spec.md §9: "must respond promptly ... within one tick").
    pub fn start_sweeper(&self, interval: Duration) {
        if self.sweep_started.swap(true, Ordering::SeqCst) {
            return;
        }
        let this = self.clone();
        std::thread::spawn(move || loop {
            std::thread::sleep(interval);
            if this.stop.load(Ordering::SeqCst) {
                break;
            }
            this.sweep_once();
        });
    }

    /// Signal the sweeper thread to stop at its next tick.
    pub fn stop_sweeper(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::parser::parse;

    fn ast(q: &str) -> Expr {
        parse(q, 50, 10_000).unwrap()
    }

    #[test]
    fn miss_then_hit() {
        let cache = ParseCache::new(4, Duration::from_secs(60));
        assert!(cache.get("a:1", "s").is_none());
        cache.set("a:1", "s", ast("a:1"));
        assert!(cache.get("a:1", "s").is_some());
        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[test]
    fn distinct_schema_ids_are_distinct_keys() {
        let cache = ParseCache::new(4, Duration::from_secs(60));
        cache.set("a:1", "schema-one", ast("a:1"));
        assert!(cache.get("a:1", "schema-two").is_none());
        assert!(cache.get("a:1", "schema-one").is_some());
    }

    #[test]
    fn ttl_expiry_reports_miss_after_elapsed() {
        let cache = ParseCache::new(4, Duration::from_millis(10));
        cache.set("a:1", "s", ast("a:1"));
        std::thread::sleep(Duration::from_millis(30));
        assert!(cache.get("a:1", "s").is_none());
        assert_eq!(cache.stats().expired, 1);
    }

    #[test]
    fn lru_eviction_keeps_most_recently_used() {
        // P7: filling to capacity then touching k1..kN in order, inserting
        // kN+1 evicts exactly k1 and preserves k2..kN.
        let cache = ParseCache::new(2, Duration::from_secs(60));
        cache.set("k1", "s", ast("k1"));
        cache.set("k2", "s", ast("k2"));
        assert!(cache.get("k1", "s").is_some()); // k1 now MRU
        cache.set("k3", "s", ast("k3")); // evicts k2, the LRU entry
        assert!(cache.get("k1", "s").is_some());
        assert!(cache.get("k2", "s").is_none());
        assert!(cache.get("k3", "s").is_some());
    }

    #[test]
    fn len_never_exceeds_capacity() {
        // P6
        let cache = ParseCache::new(3, Duration::from_secs(60));
        for i in 0..10 {
            cache.set(&format!("q{}", i), "s", ast("a"));
            assert!(cache.len() <= 3);
        }
    }

    #[test]
    fn clear_empties_cache() {
        let cache = ParseCache::new(4, Duration::from_secs(60));
        cache.set("a:1", "s", ast("a:1"));
        cache.clear();
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn delete_removes_single_entry() {
        let cache = ParseCache::new(4, Duration::from_secs(60));
        cache.set("a:1", "s", ast("a:1"));
        assert!(cache.delete("a:1", "s"));
        assert!(cache.get("a:1", "s").is_none());
        assert!(!cache.delete("a:1", "s"));
    }

    #[test]
    fn concurrent_get_set_is_consistent() {
        // P8: no panic, no dangling, no size underflow under interleaved access.
        use std::thread;
        let cache = ParseCache::new(8, Duration::from_secs(60));
        let mut handles = Vec::new();
        for t in 0..4 {
            let cache = cache.clone();
            handles.push(thread::spawn(move || {
                for i in 0..200 {
                    let key = format!("q{}", (i + t) % 16);
                    cache.set(&key, "s", ast("a"));
                    let _ = cache.get(&key, "s");
                    if i % 17 == 0 {
                        cache.delete(&key, "s");
                    }
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }
        assert!(cache.len() <= 8);
    }

    #[test]
    fn sweeper_removes_expired_entries_in_background() {
        let cache = ParseCache::new(4, Duration::from_millis(20));
        cache.set("a:1", "s", ast("a:1"));
        cache.start_sweeper(Duration::from_millis(10));
        std::thread::sleep(Duration::from_millis(100));
        assert_eq!(cache.len(), 0);
        cache.stop_sweeper();
    }

    #[test]
    fn cache_key_distinguishes_query_from_schema_boundary() {
        // Separator byte keeps ("ab", "c") and ("a", "bc") from colliding.
        let k1 = CacheKey::new("ab", "c");
        let k2 = CacheKey::new("a", "bc");
        assert_ne!(k1.0, k2.0);
    }
}
