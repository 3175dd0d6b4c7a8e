//! The shuffle: values grouped under the key they were emitted with.

use std::hash::Hash;

use fnv::FnvHashMap;

/// Append-only multi-map from intermediate keys to the values emitted
/// against them.
///
/// Values keep the order they were emitted in. Keys are remembered in the
/// order they were first seen, which callers must not rely on.
#[derive(Clone, Debug)]
pub struct IntermediateStore<K, V> {
    index: FnvHashMap<K, usize>,
    groups: Vec<(K, Vec<V>)>,
}

impl<K, V> Default for IntermediateStore<K, V> {
    fn default() -> Self {
        Self {
            index: FnvHashMap::default(),
            groups: Vec::new(),
        }
    }
}

impl<K: Hash + Eq + Clone, V> IntermediateStore<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `value` to the sequence of `key`, creating it on first use.
    pub fn emit_intermediate(&mut self, key: K, value: V) {
        match self.index.get(&key) {
            Some(&slot) => self.groups[slot].1.push(value),
            None => {
                self.index.insert(key.clone(), self.groups.len());
                self.groups.push((key, vec![value]));
            }
        }
    }

    /// Every value emitted against `key`, in emission order.
    pub fn values_for(&self, key: &K) -> Option<&[V]> {
        self.index
            .get(key)
            .map(|&slot| self.groups[slot].1.as_slice())
    }

    /// Moves the groups of `other` into this store.
    ///
    /// For keys present in both, the values of `other` go after ours, so
    /// absorbing shards in input order keeps every sequence in input order.
    pub fn absorb(&mut self, other: Self) {
        for (key, values) in other.groups {
            match self.index.get(&key) {
                Some(&slot) => self.groups[slot].1.extend(values),
                None => {
                    self.index.insert(key.clone(), self.groups.len());
                    self.groups.push((key, values));
                }
            }
        }
    }
}

impl<K, V> IntermediateStore<K, V> {
    /// The distinct keys seen so far.
    pub fn keys(&self) -> impl Iterator<Item = &K> + '_ {
        self.groups.iter().map(|(key, _)| key)
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Number of values across all keys.
    pub fn value_count(&self) -> usize {
        self.groups.iter().map(|(_, values)| values.len()).sum()
    }

    pub fn into_groups(self) -> impl Iterator<Item = (K, Vec<V>)> {
        self.groups.into_iter()
    }
}

/// Equal key sets, and per key the same values in the same order.
impl<K: Hash + Eq + Clone, V: PartialEq> PartialEq for IntermediateStore<K, V> {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .groups
                .iter()
                .all(|(key, values)| other.values_for(key) == Some(values.as_slice()))
    }
}
