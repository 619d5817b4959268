//! Stateless operators: map, filter, negate, concat.
//!
//! These forward one output message per input message, retain no state
//! beyond per-call locals, and pass frontier notifications straight through.
//! The keyed conveniences (`key_by`, `unkey`, `map_values`, `filter_values`)
//! are thin wrappers over `map`/`filter`.

use crate::dataflow::DeltaStream;
use crate::graph::{BinaryCore, Message, Operator, OperatorId, UnaryCore};
use crate::multiset::Data;

pub(crate) struct MapOperator<I, O, F> {
    core: UnaryCore<I, O>,
    f: F,
}

impl<I, O, F> MapOperator<I, O, F> {
    pub(crate) fn new(core: UnaryCore<I, O>, f: F) -> Self {
        Self { core, f }
    }
}

impl<I, O, F> Operator for MapOperator<I, O, F>
where
    I: Data,
    O: Data,
    F: Fn(&I) -> O + Send + 'static,
{
    fn id(&self) -> OperatorId {
        self.core.id
    }

    fn name(&self) -> &'static str {
        "map"
    }

    fn pending_work(&self) -> bool {
        self.core.pending_work()
    }

    fn run(&mut self) {
        for message in self.core.drain() {
            match message {
                Message::Data { version, collection } => {
                    let f = &self.f;
                    self.core.send_data(version, collection.map(|value| f(&value)));
                }
                Message::Frontier(frontier) => self.core.note_input_frontier(frontier),
            }
        }
        self.core.sync_frontier();
    }
}

pub(crate) struct FilterOperator<T, P> {
    core: UnaryCore<T, T>,
    predicate: P,
}

impl<T, P> FilterOperator<T, P> {
    pub(crate) fn new(core: UnaryCore<T, T>, predicate: P) -> Self {
        Self { core, predicate }
    }
}

impl<T, P> Operator for FilterOperator<T, P>
where
    T: Data,
    P: Fn(&T) -> bool + Send + 'static,
{
    fn id(&self) -> OperatorId {
        self.core.id
    }

    fn name(&self) -> &'static str {
        "filter"
    }

    fn pending_work(&self) -> bool {
        self.core.pending_work()
    }

    fn run(&mut self) {
        for message in self.core.drain() {
            match message {
                Message::Data { version, collection } => {
                    let predicate = &self.predicate;
                    self.core.send_data(version, collection.filter(|value| predicate(value)));
                }
                Message::Frontier(frontier) => self.core.note_input_frontier(frontier),
            }
        }
        self.core.sync_frontier();
    }
}

pub(crate) struct NegateOperator<T> {
    core: UnaryCore<T, T>,
}

impl<T> NegateOperator<T> {
    pub(crate) fn new(core: UnaryCore<T, T>) -> Self {
        Self { core }
    }
}

impl<T: Data> Operator for NegateOperator<T> {
    fn id(&self) -> OperatorId {
        self.core.id
    }

    fn name(&self) -> &'static str {
        "negate"
    }

    fn pending_work(&self) -> bool {
        self.core.pending_work()
    }

    fn run(&mut self) {
        for message in self.core.drain() {
            match message {
                Message::Data { version, collection } => {
                    self.core.send_data(version, collection.negate());
                }
                Message::Frontier(frontier) => self.core.note_input_frontier(frontier),
            }
        }
        self.core.sync_frontier();
    }
}

/// Logical union of two streams of the same type. Forwards both sides
/// unchanged; the output frontier is the meet of the two input frontiers,
/// and the output may be non-canonical.
pub(crate) struct ConcatOperator<T> {
    core: BinaryCore<T, T, T>,
}

impl<T> ConcatOperator<T> {
    pub(crate) fn new(core: BinaryCore<T, T, T>) -> Self {
        Self { core }
    }
}

impl<T: Data> Operator for ConcatOperator<T> {
    fn id(&self) -> OperatorId {
        self.core.id
    }

    fn name(&self) -> &'static str {
        "concat"
    }

    fn pending_work(&self) -> bool {
        self.core.pending_work()
    }

    fn run(&mut self) {
        for message in self.core.input_a.drain() {
            match message {
                Message::Data { version, collection } => self.core.send_data(version, collection),
                Message::Frontier(frontier) => self.core.note_frontier_a(frontier),
            }
        }
        for message in self.core.input_b.drain() {
            match message {
                Message::Data { version, collection } => self.core.send_data(version, collection),
                Message::Frontier(frontier) => self.core.note_frontier_b(frontier),
            }
        }
        self.core.sync_frontier();
    }
}

impl<T: Data> DeltaStream<T> {
    /// Apply `f` to every value, preserving multiplicities.
    pub fn map<O: Data>(&self, f: impl Fn(&T) -> O + Send + 'static) -> DeltaStream<O> {
        self.add_unary(|core| MapOperator::new(core, f))
    }

    /// Keep the entries whose value satisfies `predicate`.
    pub fn filter(&self, predicate: impl Fn(&T) -> bool + Send + 'static) -> DeltaStream<T> {
        self.add_unary(|core| FilterOperator::new(core, predicate))
    }

    /// Flip the sign of every multiplicity: insertions become retractions
    /// and vice versa.
    pub fn negate(&self) -> DeltaStream<T> {
        self.add_unary(NegateOperator::new)
    }

    /// Union with another stream of the same type.
    ///
    /// # Panics
    /// Panics if `other` belongs to a different dataflow.
    pub fn concat(&self, other: &DeltaStream<T>) -> DeltaStream<T> {
        self.add_binary(other, ConcatOperator::new)
    }

    /// Turn a stream of values into a keyed stream of `(key, value)` pairs.
    pub fn key_by<K: Data>(&self, key: impl Fn(&T) -> K + Send + 'static) -> DeltaStream<(K, T)> {
        self.map(move |value| (key(value), value.clone()))
    }
}

impl<K: Data, V: Data> DeltaStream<(K, V)> {
    /// Drop the keys, keeping the values with their multiplicities.
    pub fn unkey(&self) -> DeltaStream<V> {
        self.map(|(_, value)| value.clone())
    }

    /// Transform the values of a keyed stream, preserving keys.
    pub fn map_values<O: Data>(&self, f: impl Fn(&V) -> O + Send + 'static) -> DeltaStream<(K, O)> {
        self.map(move |(key, value)| (key.clone(), f(value)))
    }

    /// Keep the pairs whose value satisfies `predicate`.
    pub fn filter_values(&self, predicate: impl Fn(&V) -> bool + Send + 'static) -> DeltaStream<(K, V)> {
        self.filter(move |(_, value)| predicate(value))
    }
}
