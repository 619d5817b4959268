//! Test data builders for constructing delta collections fluently.

use crate::multiset::Multiset;

/// A fluent builder for [`Multiset`] test data.
///
/// # Example
///
/// ```
/// use deltaflow::testing::MultisetBuilder;
///
/// let deltas = MultisetBuilder::new()
///     .insert(1)
///     .insert(2)
///     .retract(1)
///     .with_multiplicity(3, 5)
///     .build();
///
/// assert_eq!(deltas.len(), 4);
/// ```
#[derive(Default)]
pub struct MultisetBuilder<T> {
    entries: Vec<(T, i64)>,
}

impl<T> MultisetBuilder<T> {
    /// An empty builder.
    #[must_use]
    pub const fn new() -> Self {
        Self { entries: Vec::new() }
    }

    /// Add one insertion of `value`.
    #[must_use]
    pub fn insert(mut self, value: T) -> Self {
        self.entries.push((value, 1));
        self
    }

    /// Add one retraction of `value`.
    #[must_use]
    pub fn retract(mut self, value: T) -> Self {
        self.entries.push((value, -1));
        self
    }

    /// Add `value` with an explicit multiplicity.
    #[must_use]
    pub fn with_multiplicity(mut self, value: T, multiplicity: i64) -> Self {
        self.entries.push((value, multiplicity));
        self
    }

    /// Add one insertion per value of an iterator.
    #[must_use]
    pub fn insert_all(mut self, values: impl IntoIterator<Item = T>) -> Self {
        self.entries.extend(values.into_iter().map(|value| (value, 1)));
        self
    }

    /// Build the collection.
    #[must_use]
    pub fn build(self) -> Multiset<T> {
        Multiset::from(self.entries)
    }
}

/// Builder for keyed delta collections, the shape the stateful operators
/// consume.
///
/// # Example
///
/// ```
/// use deltaflow::testing::KeyedDeltaBuilder;
///
/// let deltas = KeyedDeltaBuilder::new()
///     .insert("a", 10)
///     .insert("a", 20)
///     .retract("b", 30)
///     .build();
///
/// assert_eq!(deltas.len(), 3);
/// ```
#[derive(Default)]
pub struct KeyedDeltaBuilder<K, V> {
    entries: Vec<((K, V), i64)>,
}

impl<K, V> KeyedDeltaBuilder<K, V> {
    /// An empty builder.
    #[must_use]
    pub const fn new() -> Self {
        Self { entries: Vec::new() }
    }

    /// Add one insertion of `value` under `key`.
    #[must_use]
    pub fn insert(mut self, key: K, value: V) -> Self {
        self.entries.push(((key, value), 1));
        self
    }

    /// Add one retraction of `value` under `key`.
    #[must_use]
    pub fn retract(mut self, key: K, value: V) -> Self {
        self.entries.push(((key, value), -1));
        self
    }

    /// Add an entry with an explicit multiplicity.
    #[must_use]
    pub fn with_multiplicity(mut self, key: K, value: V, multiplicity: i64) -> Self {
        self.entries.push(((key, value), multiplicity));
        self
    }

    /// Build the keyed collection.
    #[must_use]
    pub fn build(self) -> Multiset<(K, V)> {
        Multiset::from(self.entries)
    }
}
