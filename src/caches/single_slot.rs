//! A cache remembering only the most recent (key, value) pair.

use std::sync::Arc;

use parking_lot::Mutex;

/// Holds the value computed for the last key; any other key is a miss.
///
/// Values are computed outside the lock, so two concurrent misses may both
/// compute. The later store wins.
#[derive(Debug)]
pub struct SingleSlot<K, V> {
    slot: Mutex<Option<(K, Arc<V>)>>,
}

impl<K, V> Default for SingleSlot<K, V> {
    fn default() -> Self {
        Self {
            slot: Mutex::new(None),
        }
    }
}

impl<K: PartialEq, V> SingleSlot<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached value, if it was stored under `key`.
    pub fn get(&self, key: &K) -> Option<Arc<V>> {
        match &*self.slot.lock() {
            Some((cached, value)) if cached == key => Some(Arc::clone(value)),
            _ => None,
        }
    }

    /// Replace the slot's contents.
    pub fn store(&self, key: K, value: V) -> Arc<V> {
        let value = Arc::new(value);
        *self.slot.lock() = Some((key, Arc::clone(&value)));
        value
    }

    /// The cached value for `key`, or the result of `compute` stored under it.
    ///
    /// An error from `compute` leaves the slot untouched.
    pub fn get_or_try_insert_with<E, F>(&self, key: K, compute: F) -> Result<Arc<V>, E>
    where
        F: FnOnce(&K) -> Result<V, E>,
    {
        if let Some(value) = self.get(&key) {
            return Ok(value);
        }
        let value = compute(&key)?;
        Ok(self.store(key, value))
    }

    pub fn invalidate(&self) {
        *self.slot.lock() = None;
    }
}
