//! Ordered registry that never creates entries implicitly.
//!
//! Group and attachment records are looked up far more often than they are
//! created. `Registry` keeps lookups side-effect free: `get()` and
//! `get_mut()` return `Option`, and the only way to add a record is an
//! explicit `insert_new()` that refuses to overwrite.

use std::collections::BTreeMap;
use thiserror::Error;

/// Error type for Registry operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("Key already registered")]
    AlreadyPresent,

    #[error("Key not found")]
    KeyNotFound,
}

/// An ordered map that prevents accidental entry creation.
///
/// Iteration follows key order, so anything derived from a registry walk is
/// deterministic.
///
/// # Example
///
/// ```
/// use transit_orch_common::Registry;
///
/// let mut groups: Registry<String, u32> = Registry::new();
/// assert!(groups.get(&"app".to_string()).is_none());
///
/// groups.insert_new("app".to_string(), 1).unwrap();
/// assert!(groups.insert_new("app".to_string(), 2).is_err());
/// assert_eq!(groups.get(&"app".to_string()), Some(&1));
/// ```
#[derive(Debug, Clone)]
pub struct Registry<K, V> {
    inner: BTreeMap<K, V>,
}

impl<K, V> Registry<K, V>
where
    K: Ord,
{
    pub fn new() -> Self {
        Self {
            inner: BTreeMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.inner.contains_key(key)
    }

    /// Returns the record for `key`. **This never creates entries.**
    pub fn get(&self, key: &K) -> Option<&V> {
        self.inner.get(key)
    }

    /// Returns the record for `key` mutably. **This never creates entries.**
    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        self.inner.get_mut(key)
    }

    /// Registers a new record.
    ///
    /// Fails without touching the existing record if `key` is already present.
    pub fn insert_new(&mut self, key: K, value: V) -> Result<&mut V, RegistryError> {
        use std::collections::btree_map::Entry;

        match self.inner.entry(key) {
            Entry::Occupied(_) => Err(RegistryError::AlreadyPresent),
            Entry::Vacant(slot) => Ok(slot.insert(value)),
        }
    }

    pub fn remove(&mut self, key: &K) -> Result<V, RegistryError> {
        self.inner.remove(key).ok_or(RegistryError::KeyNotFound)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.inner.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.inner.keys()
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.inner.values()
    }
}

impl<K, V> Default for Registry<K, V>
where
    K: Ord,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_does_not_create() {
        let registry: Registry<String, u32> = Registry::new();
        assert!(registry.get(&"missing".to_string()).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_insert_new_refuses_overwrite() {
        let mut registry: Registry<&str, u32> = Registry::new();
        registry.insert_new("app", 1).unwrap();

        assert_eq!(
            registry.insert_new("app", 2),
            Err(RegistryError::AlreadyPresent)
        );
        assert_eq!(registry.get(&"app"), Some(&1));
    }

    #[test]
    fn test_remove_missing() {
        let mut registry: Registry<&str, u32> = Registry::new();
        assert_eq!(registry.remove(&"db"), Err(RegistryError::KeyNotFound));
    }

    #[test]
    fn test_iteration_is_ordered() {
        let mut registry: Registry<&str, u32> = Registry::new();
        registry.insert_new("web", 3).unwrap();
        registry.insert_new("app", 1).unwrap();
        registry.insert_new("db", 2).unwrap();

        let keys: Vec<_> = registry.keys().copied().collect();
        assert_eq!(keys, vec!["app", "db", "web"]);
    }
}
