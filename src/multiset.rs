//! Differential collections and the multiset algebra.
//!
//! This module defines:
//! - [`Data`]: the blanket trait bound for values carried through the engine.
//! - [`Multiset<T>`]: a bag of `(value, multiplicity)` pairs — the wire format
//!   of every stream. A multiplicity of `+1` is one insertion, `-1` one
//!   retraction, `+n` is `n` copies.
//! - [`LazyMultiset<T>`]: a single-consumption variant that defers the
//!   algebra until a consumer materializes it.
//!
//! A multiset is **canonical** when no two entries share a value and no
//! multiplicity is zero; [`Multiset::consolidate`] is the canonicalization
//! function. Operators accept non-canonical input freely, but stateful
//! operators always emit canonical deltas.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::Hash;

/// The standard trait bound for values carried by a stream.
///
/// The engine clones values into per-reader queues and into operator state,
/// orders them to canonicalize multisets deterministically, and hashes them
/// to key operator state. Structural equality of the concrete Rust value is
/// the value's identity; any type meeting these bounds works:
///
/// - `'static` (no borrowed data inside values),
/// - `Send + Sync` (graphs are transferable across threads),
/// - `Clone` (fan-out and state retention duplicate values),
/// - `Ord + Hash` (canonicalization and keyed state).
///
/// Floating-point values do not satisfy `Ord`/`Hash` and must be wrapped
/// (e.g. `OrderedFloat<f64>`) before entering a collection.
pub trait Data: 'static + Send + Sync + Clone + Ord + Hash {}
impl<T> Data for T where T: 'static + Send + Sync + Clone + Ord + Hash {}

/// A collection of `(value, multiplicity)` pairs.
///
/// `Multiset` is an ordered sequence, not a map: the same value may appear in
/// several entries until [`consolidate`](Multiset::consolidate) combines
/// them. Entry order is preserved by the element-wise operations.
///
/// # Example
/// ```
/// use deltaflow::Multiset;
///
/// let deltas = Multiset::from(vec![(1, 1), (2, 2), (1, -1)]);
/// let doubled = deltas.map(|x| x * 2);
/// assert_eq!(doubled.consolidate(), Multiset::from(vec![(4, 2)]));
/// ```
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Multiset<T> {
    entries: Vec<(T, i64)>,
}

impl<T> Multiset<T> {
    /// The empty collection.
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    /// Append a single weighted entry.
    pub fn push(&mut self, value: T, multiplicity: i64) {
        self.entries.push((value, multiplicity));
    }

    /// Append every entry of an iterator.
    pub fn extend(&mut self, entries: impl IntoIterator<Item = (T, i64)>) {
        self.entries.extend(entries);
    }

    /// Number of entries (not the accumulated multiplicity).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when there are no entries at all. A non-empty multiset may still
    /// consolidate to nothing.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Borrow the raw entries.
    pub fn entries(&self) -> &[(T, i64)] {
        &self.entries
    }

    /// Take the raw entries.
    pub fn into_entries(self) -> Vec<(T, i64)> {
        self.entries
    }

    /// Iterate the raw entries.
    pub fn iter(&self) -> impl Iterator<Item = &(T, i64)> {
        self.entries.iter()
    }

    /// Apply `f` to every value, preserving multiplicities.
    pub fn map<U>(self, mut f: impl FnMut(T) -> U) -> Multiset<U> {
        Multiset {
            entries: self.entries.into_iter().map(|(value, m)| (f(value), m)).collect(),
        }
    }

    /// Keep the entries whose value satisfies `predicate`.
    pub fn filter(self, mut predicate: impl FnMut(&T) -> bool) -> Self {
        Self {
            entries: self.entries.into_iter().filter(|(value, _)| predicate(value)).collect(),
        }
    }

    /// Flip the sign of every multiplicity. An involution: negating twice is
    /// the identity.
    pub fn negate(self) -> Self {
        Self {
            entries: self.entries.into_iter().map(|(value, m)| (value, -m)).collect(),
        }
    }

    /// Sequence union with another collection. The result is generally not
    /// canonical; `concat` is commutative and associative up to
    /// consolidation.
    pub fn concat(mut self, other: Self) -> Self {
        self.entries.extend(other.entries);
        self
    }

    /// Canonical form: sort by value, sum the multiplicities of equal values,
    /// and drop entries that accumulate to zero. Idempotent.
    pub fn consolidate(mut self) -> Self
    where
        T: Ord,
    {
        self.entries.sort_by(|a, b| a.0.cmp(&b.0));
        let mut out: Vec<(T, i64)> = Vec::with_capacity(self.entries.len());
        for (value, multiplicity) in self.entries {
            match out.last_mut() {
                Some((last, sum)) if *last == value => *sum += multiplicity,
                _ => {
                    if let Some((_, 0)) = out.last() {
                        out.pop();
                    }
                    out.push((value, multiplicity));
                }
            }
        }
        if let Some((_, 0)) = out.last() {
            out.pop();
        }
        Self { entries: out }
    }

    /// True when already in canonical form.
    pub fn is_canonical(&self) -> bool
    where
        T: Ord,
    {
        self.entries.iter().all(|(_, m)| *m != 0)
            && self.entries.windows(2).all(|pair| pair[0].0 < pair[1].0)
    }
}

impl<T> Default for Multiset<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> From<Vec<(T, i64)>> for Multiset<T> {
    fn from(entries: Vec<(T, i64)>) -> Self {
        Self { entries }
    }
}

impl<T> FromIterator<(T, i64)> for Multiset<T> {
    fn from_iter<I: IntoIterator<Item = (T, i64)>>(iter: I) -> Self {
        Self { entries: iter.into_iter().collect() }
    }
}

impl<T> IntoIterator for Multiset<T> {
    type Item = (T, i64);
    type IntoIter = std::vec::IntoIter<(T, i64)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<'a, T> IntoIterator for &'a Multiset<T> {
    type Item = &'a (T, i64);
    type IntoIter = std::slice::Iter<'a, (T, i64)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl<T: fmt::Debug> fmt::Debug for Multiset<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set()
            .entries(self.entries.iter().map(|(value, m)| format!("{value:?}: {m:+}")))
            .finish()
    }
}

/// A lazily evaluated collection.
///
/// `LazyMultiset` exposes the same algebra as [`Multiset`] but defers all
/// work until [`materialize`](LazyMultiset::materialize) (or
/// [`consolidate`](LazyMultiset::consolidate)) drives the underlying
/// iterator. Every operation consumes the value, so a lazy collection can be
/// iterated at most once — the restriction is enforced by the type rather
/// than checked at runtime.
///
/// # Example
/// ```
/// use deltaflow::{LazyMultiset, Multiset};
///
/// let lazy = LazyMultiset::from(Multiset::from(vec![(1, 1), (2, 1)]))
///     .map(|x| x * 10)
///     .filter(|x| *x > 10);
/// assert_eq!(lazy.materialize(), Multiset::from(vec![(20, 1)]));
/// ```
pub struct LazyMultiset<T> {
    entries: Box<dyn Iterator<Item = (T, i64)> + Send>,
}

impl<T: 'static> LazyMultiset<T> {
    /// Wrap an iterator of weighted entries.
    pub fn from_entries(entries: impl Iterator<Item = (T, i64)> + Send + 'static) -> Self {
        Self { entries: Box::new(entries) }
    }

    /// Deferred [`Multiset::map`].
    pub fn map<U: 'static>(self, f: impl FnMut(T) -> U + Send + 'static) -> LazyMultiset<U> {
        let mut f = f;
        LazyMultiset {
            entries: Box::new(self.entries.map(move |(value, m)| (f(value), m))),
        }
    }

    /// Deferred [`Multiset::filter`].
    pub fn filter(self, predicate: impl FnMut(&T) -> bool + Send + 'static) -> Self {
        let mut predicate = predicate;
        Self {
            entries: Box::new(self.entries.filter(move |(value, _)| predicate(value))),
        }
    }

    /// Deferred [`Multiset::negate`].
    pub fn negate(self) -> Self
    where
        T: Send,
    {
        Self {
            entries: Box::new(self.entries.map(|(value, m)| (value, -m))),
        }
    }

    /// Deferred [`Multiset::concat`].
    pub fn concat(self, other: Self) -> Self
    where
        T: Send,
    {
        Self { entries: Box::new(self.entries.chain(other.entries)) }
    }

    /// Drive the iterator and collect the entries. This is the single
    /// permitted consumption.
    pub fn materialize(self) -> Multiset<T> {
        Multiset { entries: self.entries.collect() }
    }

    /// Materialize directly into canonical form.
    pub fn consolidate(self) -> Multiset<T>
    where
        T: Ord,
    {
        self.materialize().consolidate()
    }
}

impl<T: Send + 'static> From<Multiset<T>> for LazyMultiset<T> {
    fn from(collection: Multiset<T>) -> Self {
        Self { entries: Box::new(collection.entries.into_iter()) }
    }
}
