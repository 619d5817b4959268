//! Key-indexed state for the stateful operators.
//!
//! Two flavors live here:
//! - [`Index<K, V>`]: a keyed multimap from `K` to a bag of
//!   `(value, multiplicity)` entries, with point lookup, union, per-key
//!   compaction restricted to keys changed since the last compaction, and a
//!   relational join.
//! - [`VersionedIndex<K, V>`]: the same multimap with every entry stamped by
//!   the [`Version`] at which it was added. It can reconstruct the bag
//!   visible at any version, enumerate the versions present for a key, join
//!   per version pair, and fold together entries whose versions a frontier
//!   no longer covers.
//!
//! Every stateful operator exclusively owns its indexes; streams are
//! replicated at edge granularity, indexes never are.

use crate::multiset::{Data, Multiset};
use crate::order::{Antichain, Version};
use std::collections::{HashMap, HashSet};

fn consolidate_bag<V: Ord>(bag: &mut Vec<(V, i64)>) {
    bag.sort_by(|a, b| a.0.cmp(&b.0));
    let mut write = 0;
    for read in 0..bag.len() {
        if write > 0 && bag[write - 1].0 == bag[read].0 {
            bag[write - 1].1 += bag[read].1;
        } else {
            if write > 0 && bag[write - 1].1 == 0 {
                write -= 1;
            }
            bag.swap(write, read);
            write += 1;
        }
    }
    if write > 0 && bag[write - 1].1 == 0 {
        write -= 1;
    }
    bag.truncate(write);
}

/// A keyed multimap from `K` to a bag of weighted values.
///
/// The accumulated multiplicity of a value under a key is the current count
/// of that value; negative accumulations are legal intermediate states when
/// retractions outrun insertions.
pub struct Index<K, V> {
    entries: HashMap<K, Vec<(V, i64)>>,
    dirty: HashSet<K>,
}

impl<K: Data, V: Data> Index<K, V> {
    /// An empty index.
    pub fn new() -> Self {
        Self { entries: HashMap::new(), dirty: HashSet::new() }
    }

    /// Append one weighted entry under `key`.
    pub fn add(&mut self, key: K, entry: (V, i64)) {
        self.dirty.insert(key.clone());
        self.entries.entry(key).or_default().push(entry);
    }

    /// Union another index into this one.
    pub fn append(&mut self, other: Index<K, V>) {
        for (key, mut bag) in other.entries {
            self.dirty.insert(key.clone());
            self.entries.entry(key).or_default().append(&mut bag);
        }
    }

    /// The bag stored under `key`; empty when the key is absent.
    pub fn get(&self, key: &K) -> &[(V, i64)] {
        self.entries.get(key).map_or(&[], Vec::as_slice)
    }

    /// Number of keys with stored entries.
    pub fn key_count(&self) -> usize {
        self.entries.len()
    }

    /// Iterate the stored keys.
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.entries.keys()
    }

    /// Consolidate the bag at each dirty key, or at exactly `keys` when a set
    /// is supplied. Accumulates multiplicities of value-equal entries and
    /// drops zeros; keys whose bags empty out are removed.
    pub fn compact(&mut self, keys: Option<&[K]>) {
        let targets: Vec<K> = match keys {
            Some(keys) => keys.to_vec(),
            None => self.dirty.drain().collect(),
        };
        for key in targets {
            self.dirty.remove(&key);
            if let Some(bag) = self.entries.get_mut(&key) {
                consolidate_bag(bag);
                if bag.is_empty() {
                    self.entries.remove(&key);
                }
            }
        }
    }

    /// Relational join: for each key present on both sides, the Cartesian
    /// product of the two bags with multiplied multiplicities. The smaller
    /// index drives the outer loop; the output shape is unaffected.
    pub fn join<V2: Data>(&self, other: &Index<K, V2>) -> Multiset<(K, (V, V2))> {
        let mut out = Multiset::new();
        if self.entries.len() <= other.entries.len() {
            for (key, left) in &self.entries {
                let Some(right) = other.entries.get(key) else { continue };
                cross(key, left, right, &mut out);
            }
        } else {
            for (key, right) in &other.entries {
                let Some(left) = self.entries.get(key) else { continue };
                cross(key, left, right, &mut out);
            }
        }
        out
    }
}

fn cross<K: Data, V: Data, V2: Data>(
    key: &K,
    left: &[(V, i64)],
    right: &[(V2, i64)],
    out: &mut Multiset<(K, (V, V2))>,
) {
    for (v1, m1) in left {
        for (v2, m2) in right {
            out.push((key.clone(), (v1.clone(), v2.clone())), m1 * m2);
        }
    }
}

impl<K: Data, V: Data> Default for Index<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

/// A keyed multimap whose entries remember the version at which they were
/// added.
pub struct VersionedIndex<K, V> {
    entries: HashMap<K, HashMap<Version, Vec<(V, i64)>>>,
    dirty: HashSet<K>,
}

impl<K: Data, V: Data> VersionedIndex<K, V> {
    /// An empty index.
    pub fn new() -> Self {
        Self { entries: HashMap::new(), dirty: HashSet::new() }
    }

    /// Append one weighted entry under `key` at `version`.
    pub fn add(&mut self, key: K, version: &Version, entry: (V, i64)) {
        self.dirty.insert(key.clone());
        self.entries
            .entry(key)
            .or_default()
            .entry(version.clone())
            .or_default()
            .push(entry);
    }

    /// Union another versioned index into this one.
    pub fn append(&mut self, other: VersionedIndex<K, V>) {
        for (key, by_version) in other.entries {
            self.dirty.insert(key.clone());
            let slot = self.entries.entry(key).or_default();
            for (version, mut bag) in by_version {
                slot.entry(version).or_default().append(&mut bag);
            }
        }
    }

    /// True when no key has entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of keys with stored entries.
    pub fn key_count(&self) -> usize {
        self.entries.len()
    }

    /// The versions with entries for `key`, in no particular order.
    pub fn versions(&self, key: &K) -> Vec<Version> {
        self.entries
            .get(key)
            .map(|by_version| by_version.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// The consolidated bag visible at `version`: all entries whose version
    /// is `<= version`, value-equal multiplicities accumulated, zeros
    /// dropped.
    pub fn reconstruct_at(&self, key: &K, version: &Version) -> Vec<(V, i64)> {
        let mut bag = Vec::new();
        if let Some(by_version) = self.entries.get(key) {
            for (stored, entries) in by_version {
                if stored.less_equal(version) {
                    bag.extend(entries.iter().cloned());
                }
            }
        }
        consolidate_bag(&mut bag);
        bag
    }

    /// Join with another versioned index: for each key present on both
    /// sides, every pair of per-version bags contributes its Cartesian
    /// product at the join (least upper bound) of the two versions. The
    /// smaller index drives the outer loop. Results are grouped per output
    /// version, in a deterministic order.
    pub fn join<V2: Data>(
        &self,
        other: &VersionedIndex<K, V2>,
    ) -> Vec<(Version, Multiset<(K, (V, V2))>)> {
        let mut by_version: HashMap<Version, Multiset<(K, (V, V2))>> = HashMap::new();
        if self.entries.len() <= other.entries.len() {
            for (key, left) in &self.entries {
                let Some(right) = other.entries.get(key) else { continue };
                cross_versions(key, left, right, &mut by_version);
            }
        } else {
            for (key, right) in &other.entries {
                let Some(left) = self.entries.get(key) else { continue };
                cross_versions(key, left, right, &mut by_version);
            }
        }
        let mut results: Vec<_> = by_version.into_iter().collect();
        results.sort_by(|a, b| a.0.lex_cmp(&b.0));
        results
    }

    /// Fold together entries whose versions `frontier` no longer covers:
    /// each such version is advanced to its earliest indistinguishable
    /// successor, bags merged there are consolidated, and emptied keys are
    /// removed. Restricted to keys changed since the last compaction unless
    /// an explicit key set is supplied.
    pub fn compact(&mut self, frontier: &Antichain, keys: Option<Vec<K>>) {
        let targets: Vec<K> = match keys {
            Some(keys) => keys,
            None => self.dirty.drain().collect(),
        };
        for key in targets {
            self.dirty.remove(&key);
            let Some(by_version) = self.entries.get_mut(&key) else { continue };
            let closed: Vec<Version> = by_version
                .keys()
                .filter(|version| !frontier.covers(version))
                .cloned()
                .collect();
            for version in closed {
                let bag = by_version.remove(&version).expect("version listed above");
                let advanced = version.advance_by(frontier);
                by_version.entry(advanced).or_default().extend(bag);
            }
            for bag in by_version.values_mut() {
                consolidate_bag(bag);
            }
            by_version.retain(|_, bag| !bag.is_empty());
            if by_version.is_empty() {
                self.entries.remove(&key);
            }
        }
    }
}

fn cross_versions<K: Data, V: Data, V2: Data>(
    key: &K,
    left: &HashMap<Version, Vec<(V, i64)>>,
    right: &HashMap<Version, Vec<(V2, i64)>>,
    out: &mut HashMap<Version, Multiset<(K, (V, V2))>>,
) {
    for (left_version, left_bag) in left {
        for (right_version, right_bag) in right {
            let version = left_version.join(right_version);
            cross(key, left_bag, right_bag, out.entry(version).or_default());
        }
    }
}

impl<K: Data, V: Data> Default for VersionedIndex<K, V> {
    fn default() -> Self {
        Self::new()
    }
}
