use std::collections::HashMap;
use std::hash::Hash;

/// Injective, insertion-ordered mapping of keys to matrix slots `0..n`.
///
/// Slots are assigned on first insertion and never change afterwards.
#[derive(Debug, Clone)]
pub struct OrderedIndex<K: Hash + Eq> {
    keys: Vec<K>,
    slots: HashMap<K, usize>,
}

impl<K: Hash + Eq + Clone> OrderedIndex<K> {
    pub fn new() -> Self {
        Self { keys: Vec::new(), slots: HashMap::new() }
    }

    /// Returns the slot of the key, adding it at the end if it is new.
    pub fn put(&mut self, key: K) -> usize {
        if let Some(&slot) = self.slots.get(&key) {
            return slot;
        }
        let slot = self.keys.len();
        self.slots.insert(key.clone(), slot);
        self.keys.push(key);
        slot
    }

    pub fn get(&self, key: &K) -> Option<usize> {
        self.slots.get(key).copied()
    }

    pub fn at(&self, slot: usize) -> Option<&K> {
        self.keys.get(slot)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.slots.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &K)> {
        self.keys.iter().enumerate()
    }

    pub fn keys(&self) -> &[K] {
        &self.keys
    }
}

impl<K: Hash + Eq + Clone> Default for OrderedIndex<K> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_is_idempotent() {
        let mut index = OrderedIndex::new();
        assert_eq!(index.put("a"), 0);
        assert_eq!(index.put("b"), 1);
        assert_eq!(index.put("a"), 0);
        assert_eq!(index.len(), 2);
        assert_eq!(index.at(1), Some(&"b"));
        assert_eq!(index.get(&"c"), None);
    }
}
