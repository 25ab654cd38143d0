use std::collections::hash_map;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::iter::FromIterator;

/// A map whose keys may have synonyms.
///
/// A synonym resolves to its canonical key on every lookup, so `-f` and
/// `--file` can share one slot while both remain addressable.
#[derive(Clone)]
pub struct SynonymMap<K, V> {
    vals: HashMap<K, V>,
    syns: HashMap<K, K>,
}

impl<K: Eq + Hash, V: PartialEq> PartialEq for SynonymMap<K, V> {
    fn eq(&self, other: &Self) -> bool {
        self.vals == other.vals && self.syns == other.syns
    }
}

impl<K: Eq + Hash + Clone, V> SynonymMap<K, V> {
    pub fn new() -> SynonymMap<K, V> {
        SynonymMap {
            vals: HashMap::new(),
            syns: HashMap::new(),
        }
    }

    /// Register `from` as a synonym of the existing key `to`.
    pub fn insert_synonym(&mut self, from: K, to: K) {
        assert!(self.vals.contains_key(&to));
        self.syns.insert(from, to);
    }

    pub fn keys(&self) -> hash_map::Keys<'_, K, V> {
        self.vals.keys()
    }

    pub fn iter(&self) -> hash_map::Iter<'_, K, V> {
        self.vals.iter()
    }

    pub fn synonyms(&self) -> hash_map::Iter<'_, K, K> {
        self.syns.iter()
    }

    /// The canonical key for `k` (which may be `k` itself).
    pub fn resolve(&self, k: &K) -> K {
        self.syns.get(k).unwrap_or(k).clone()
    }

    pub fn find(&self, k: &K) -> Option<&V> {
        self.vals.get(self.syns.get(k).unwrap_or(k))
    }

    pub fn find_mut(&mut self, k: &K) -> Option<&mut V> {
        match self.syns.get(k) {
            Some(canon) => self.vals.get_mut(canon),
            None => self.vals.get_mut(k),
        }
    }

    pub fn contains_key(&self, k: &K) -> bool {
        self.find(k).is_some()
    }

    pub fn get(&self, k: &K) -> &V {
        self.find(k).unwrap()
    }

    pub fn insert(&mut self, k: K, v: V) -> Option<V> {
        match self.syns.get(&k) {
            Some(canon) => self.vals.insert(canon.clone(), v),
            None => self.vals.insert(k, v),
        }
    }

    /// The number of values, not including synonyms.
    pub fn len(&self) -> usize {
        self.vals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vals.is_empty()
    }
}

impl<K: Eq + Hash + Clone, V> Default for SynonymMap<K, V> {
    fn default() -> SynonymMap<K, V> {
        SynonymMap::new()
    }
}

impl<K: Eq + Hash + Clone, V> FromIterator<(K, V)> for SynonymMap<K, V> {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> SynonymMap<K, V> {
        let mut map = SynonymMap::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

impl<K: Eq + Hash + Clone + fmt::Debug, V: fmt::Debug> fmt::Debug for SynonymMap<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.vals.fmt(f)?;
        write!(f, " (synonyms: {:?})", self.syns)
    }
}

#[cfg(test)]
mod tests {
    use super::SynonymMap;

    #[test]
    fn synonyms_resolve_on_lookup() {
        let mut map: SynonymMap<String, i32> = SynonymMap::new();
        map.insert("--file".into(), 1);
        map.insert_synonym("-f".into(), "--file".into());
        assert_eq!(map.find(&"-f".into()), Some(&1));
        assert_eq!(map.find(&"--file".into()), Some(&1));
        assert_eq!(map.len(), 1);

        map.insert("-f".into(), 2);
        assert_eq!(map.find(&"--file".into()), Some(&2));
    }
}
