//! Shared cache store.
//!
//! A synchronized map from a `TypeId` to a cached value, shared by every
//! handle of one config. Parsed schemas are cached here keyed by the model's
//! `TypeId`.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

/// A cached value.
pub type CacheValue = Arc<dyn Any + Send + Sync>;

/// Concurrency-safe key/value cache.
///
/// Keys are restricted to `TypeId`, one entry per Rust type. Callers that
/// need other keys wrap them in a marker type.
#[derive(Default)]
pub struct CacheStore {
    entries: RwLock<HashMap<TypeId, CacheValue>>,
}

impl CacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(&self, key: TypeId) -> Option<CacheValue> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
            .cloned()
    }

    pub fn store(&self, key: TypeId, value: CacheValue) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, value);
    }

    /// Return the value already cached under `key`, or store `value`.
    ///
    /// The boolean is `true` when an existing value was returned.
    pub fn load_or_store(&self, key: TypeId, value: CacheValue) -> (CacheValue, bool) {
        let mut entries = self
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = entries.get(&key) {
            return (Arc::clone(existing), true);
        }
        entries.insert(key, Arc::clone(&value));
        (value, false)
    }

    /// Typed lookup: the value for `key` if present and of type `T`.
    pub fn get<T: Any + Send + Sync>(&self, key: TypeId) -> Option<Arc<T>> {
        self.load(key).and_then(|v| v.downcast::<T>().ok())
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for CacheStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheStore")
            .field("entries", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct KeyA;
    struct KeyB;

    #[test]
    fn load_or_store_keeps_first_value() {
        let cache = CacheStore::new();
        let (v, loaded) = cache.load_or_store(TypeId::of::<KeyA>(), Arc::new(1_u32));
        assert!(!loaded);
        assert_eq!(v.downcast_ref::<u32>(), Some(&1));

        let (v, loaded) = cache.load_or_store(TypeId::of::<KeyA>(), Arc::new(2_u32));
        assert!(loaded);
        assert_eq!(v.downcast_ref::<u32>(), Some(&1));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn typed_get_checks_type() {
        let cache = CacheStore::new();
        cache.store(TypeId::of::<KeyB>(), Arc::new(String::from("schema")));
        assert_eq!(cache.get::<String>(TypeId::of::<KeyB>()).as_deref().map(String::as_str), Some("schema"));
        assert!(cache.get::<u32>(TypeId::of::<KeyB>()).is_none());
        assert!(cache.get::<String>(TypeId::of::<KeyA>()).is_none());
    }

    #[test]
    fn concurrent_stores_are_all_kept() {
        let cache = Arc::new(CacheStore::new());
        let keys = [
            TypeId::of::<u8>(),
            TypeId::of::<u16>(),
            TypeId::of::<u32>(),
            TypeId::of::<u64>(),
        ];
        let handles: Vec<_> = keys
            .iter()
            .copied()
            .map(|key| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || cache.store(key, Arc::new(())))
            })
            .collect();
        for h in handles {
            h.join().expect("thread");
        }
        assert_eq!(cache.len(), 4);
    }
}
