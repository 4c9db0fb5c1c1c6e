//! Dependency queue for directive ordering.
//!
//! Directives whose dependencies are not yet satisfied wait here. When a
//! dependency key is satisfied the waiters are released; the reverse index
//! keeps that release proportional to the number of waiters on the key.

use std::collections::{BTreeMap, BTreeSet};

use crate::directive::DependencyKey;

/// Entry in the dependency queue.
#[derive(Debug, Clone)]
pub struct PendingEntry<T> {
    pub data: T,
    /// Keys that must be satisfied before the entry is ready.
    pub waiting_on: BTreeSet<DependencyKey>,
}

impl<T> PendingEntry<T> {
    pub fn new(data: T, waiting_on: impl IntoIterator<Item = DependencyKey>) -> Self {
        Self {
            data,
            waiting_on: waiting_on.into_iter().collect(),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.waiting_on.is_empty()
    }
}

/// Queue of work items waiting on dependency keys.
///
/// Iteration order is the key order of `K`, so draining is deterministic.
#[derive(Debug)]
pub struct DependencyQueue<K, T> {
    entries: BTreeMap<K, PendingEntry<T>>,
    /// Reverse index: dependency -> keys waiting on it
    waiters: BTreeMap<DependencyKey, BTreeSet<K>>,
}

impl<K, T> DependencyQueue<K, T>
where
    K: Ord + Clone,
{
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            waiters: BTreeMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Adds an item with the keys it still waits on.
    ///
    /// Re-adding an existing key replaces the previous entry.
    pub fn add(&mut self, key: K, data: T, waiting_on: impl IntoIterator<Item = DependencyKey>) {
        self.remove(&key);
        let entry = PendingEntry::new(data, waiting_on);

        for dep in &entry.waiting_on {
            self.waiters
                .entry(dep.clone())
                .or_default()
                .insert(key.clone());
        }

        self.entries.insert(key, entry);
    }

    pub fn remove(&mut self, key: &K) -> Option<T> {
        let entry = self.entries.remove(key)?;
        for dep in &entry.waiting_on {
            if let Some(waiters) = self.waiters.get_mut(dep) {
                waiters.remove(key);
                if waiters.is_empty() {
                    self.waiters.remove(dep);
                }
            }
        }
        Some(entry.data)
    }

    /// Marks a dependency as satisfied.
    ///
    /// Returns the keys of items that became ready because of it.
    pub fn satisfy(&mut self, dep: &DependencyKey) -> Vec<K> {
        let mut ready = Vec::new();

        if let Some(waiting_keys) = self.waiters.remove(dep) {
            for key in waiting_keys {
                if let Some(entry) = self.entries.get_mut(&key) {
                    entry.waiting_on.remove(dep);
                    if entry.is_ready() {
                        ready.push(key);
                    }
                }
            }
        }

        ready
    }

    /// Removes and returns every item with no outstanding dependency.
    pub fn drain_ready(&mut self) -> Vec<(K, T)> {
        let ready_keys: Vec<K> = self
            .entries
            .iter()
            .filter(|(_, e)| e.is_ready())
            .map(|(k, _)| k.clone())
            .collect();

        ready_keys
            .into_iter()
            .filter_map(|k| self.remove(&k).map(|data| (k, data)))
            .collect()
    }

    /// Removes every remaining item together with what it still waits on.
    pub fn drain_blocked(&mut self) -> Vec<(K, T, BTreeSet<DependencyKey>)> {
        self.waiters.clear();
        std::mem::take(&mut self.entries)
            .into_iter()
            .map(|(k, e)| (k, e.data, e.waiting_on))
            .collect()
    }

    pub fn contains(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    pub fn waiting_on(&self, key: &K) -> Option<&BTreeSet<DependencyKey>> {
        self.entries.get(key).map(|e| &e.waiting_on)
    }
}

impl<K, T> Default for DependencyQueue<K, T>
where
    K: Ord + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use transit_types::{AttachmentId, GroupRef};

    fn table(name: &str) -> DependencyKey {
        DependencyKey::Table(GroupRef::parse(name).unwrap())
    }

    fn attachment(id: &str) -> DependencyKey {
        DependencyKey::Attachment(AttachmentId::new(id).unwrap())
    }

    #[test]
    fn test_ready_without_dependencies() {
        let mut queue: DependencyQueue<String, u32> = DependencyQueue::new();
        queue.add("hub-table".to_string(), 1, vec![]);
        queue.add("app-0-association".to_string(), 2, vec![table("app")]);

        let ready = queue.drain_ready();
        assert_eq!(ready, vec![("hub-table".to_string(), 1)]);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_satisfy_releases_waiters() {
        let mut queue: DependencyQueue<String, u32> = DependencyQueue::new();
        queue.add(
            "edge".to_string(),
            7,
            vec![table("hub"), attachment("vpc-1")],
        );

        assert!(queue.satisfy(&table("hub")).is_empty());
        assert!(queue.drain_ready().is_empty());

        let ready = queue.satisfy(&attachment("vpc-1"));
        assert_eq!(ready, vec!["edge".to_string()]);
        assert_eq!(queue.drain_ready().len(), 1);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_satisfy_unknown_key_is_noop() {
        let mut queue: DependencyQueue<String, u32> = DependencyQueue::new();
        queue.add("edge".to_string(), 1, vec![table("app")]);
        assert!(queue.satisfy(&table("db")).is_empty());
        assert!(queue.contains(&"edge".to_string()));
    }

    #[test]
    fn test_drain_blocked_reports_missing_keys() {
        let mut queue: DependencyQueue<String, u32> = DependencyQueue::new();
        queue.add("edge".to_string(), 1, vec![table("app")]);

        let blocked = queue.drain_blocked();
        assert_eq!(blocked.len(), 1);
        assert!(blocked[0].2.contains(&table("app")));
        assert!(queue.is_empty());
        assert!(queue.satisfy(&table("app")).is_empty());
    }

    #[test]
    fn test_re_add_replaces_entry() {
        let mut queue: DependencyQueue<String, u32> = DependencyQueue::new();
        queue.add("edge".to_string(), 1, vec![table("app")]);
        queue.add("edge".to_string(), 2, vec![]);

        assert_eq!(queue.waiting_on(&"edge".to_string()).map(|w| w.len()), Some(0));
        assert_eq!(queue.drain_ready(), vec![("edge".to_string(), 2)]);
        assert!(queue.satisfy(&table("app")).is_empty());
    }
}
