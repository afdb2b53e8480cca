use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use tokio::sync::Mutex;

/// Lazily-allocated per-key async locks, used to serialize event processing
/// for a single guild or (guild, user) pair. The registry itself is guarded
/// by a sync mutex that is never held across an await point.
#[derive(Debug)]
pub struct KeyedLocks<K> {
    inner: parking_lot::Mutex<HashMap<K, Arc<Mutex<()>>>>,
}

impl<K> Default for KeyedLocks<K> {
    fn default() -> Self {
        Self {
            inner: parking_lot::Mutex::new(HashMap::new()),
        }
    }
}

impl<K: Eq + Hash + Clone> KeyedLocks<K> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: K) -> Arc<Mutex<()>> {
        self.inner.lock().entry(key).or_default().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn same_key_returns_the_same_lock() {
        let locks: KeyedLocks<u64> = KeyedLocks::new();
        let a = locks.get(1);
        let b = locks.get(1);
        assert!(Arc::ptr_eq(&a, &b));

        let other = locks.get(2);
        assert!(!Arc::ptr_eq(&a, &other));
    }

    #[tokio::test]
    async fn lock_serializes_tasks() {
        let locks: Arc<KeyedLocks<u64>> = Arc::new(KeyedLocks::new());
        let counter = Arc::new(parking_lot::Mutex::new(0u32));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let locks = Arc::clone(&locks);
            let counter = Arc::clone(&counter);
            handles.push(tokio::spawn(async move {
                let lock = locks.get(42);
                let _guard = lock.lock().await;
                let mut n = counter.lock();
                *n += 1;
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(*counter.lock(), 8);
    }
}
