//! Keyed joins: the inner join operator and the outer variants derived from
//! it.
//!
//! The inner join keeps one versioned index per side. Each run drains both
//! inputs into temporary delta indexes and emits three contributions,
//! arranged so every pairing is counted exactly once:
//!
//! 1. `δA ⋈ B` (new left against accumulated right),
//! 2. fold `δA` into `A`,
//! 3. `A ⋈ δB` (accumulated left, now including `δA`, against new right),
//! 4. fold `δB` into `B`.
//!
//! Join is bilinear, so results ship as soon as both sides' deltas are seen
//! — no completion gating — at the join (least upper bound) of the
//! contributing versions. Inputs need not be canonical; the indexes
//! consolidate as they compact.
//!
//! The anti/left/right/full variants are compositions of inner join, negate
//! and concat, with `Option` standing in for the missing side.

use crate::dataflow::DeltaStream;
use crate::graph::{BinaryCore, Message, Operator, OperatorId};
use crate::indexes::VersionedIndex;
use crate::multiset::{Data, Multiset};
use crate::order::Version;
use std::collections::HashMap;

pub(crate) struct JoinOperator<K, V1, V2> {
    core: BinaryCore<(K, V1), (K, V2), (K, (V1, V2))>,
    index_a: VersionedIndex<K, V1>,
    index_b: VersionedIndex<K, V2>,
}

impl<K: Data, V1: Data, V2: Data> JoinOperator<K, V1, V2> {
    pub(crate) fn new(core: BinaryCore<(K, V1), (K, V2), (K, (V1, V2))>) -> Self {
        Self { core, index_a: VersionedIndex::new(), index_b: VersionedIndex::new() }
    }
}

impl<K, V1, V2> Operator for JoinOperator<K, V1, V2>
where
    K: Data,
    V1: Data,
    V2: Data,
{
    fn id(&self) -> OperatorId {
        self.core.id
    }

    fn name(&self) -> &'static str {
        "join"
    }

    fn pending_work(&self) -> bool {
        self.core.pending_work()
    }

    fn run(&mut self) {
        let mut delta_a = VersionedIndex::new();
        let mut delta_b = VersionedIndex::new();
        for message in self.core.input_a.drain() {
            match message {
                Message::Data { version, collection } => {
                    for ((key, value), multiplicity) in collection {
                        delta_a.add(key, &version, (value, multiplicity));
                    }
                }
                Message::Frontier(frontier) => self.core.note_frontier_a(frontier),
            }
        }
        for message in self.core.input_b.drain() {
            match message {
                Message::Data { version, collection } => {
                    for ((key, value), multiplicity) in collection {
                        delta_b.add(key, &version, (value, multiplicity));
                    }
                }
                Message::Frontier(frontier) => self.core.note_frontier_b(frontier),
            }
        }

        let mut by_version: HashMap<Version, Multiset<(K, (V1, V2))>> = HashMap::new();
        for (version, collection) in delta_a.join(&self.index_b) {
            by_version.entry(version).or_default().extend(collection.into_entries());
        }
        self.index_a.append(delta_a);
        for (version, collection) in self.index_a.join(&delta_b) {
            by_version.entry(version).or_default().extend(collection.into_entries());
        }
        self.index_b.append(delta_b);

        let mut results: Vec<(Version, Multiset<(K, (V1, V2))>)> = by_version.into_iter().collect();
        results.sort_by(|a, b| a.0.lex_cmp(&b.0));
        for (version, collection) in results {
            self.core.send_data(version, collection.consolidate());
        }

        if self.core.sync_frontier() {
            let frontier = self.core.combined_input_frontier();
            self.index_a.compact(&frontier, None);
            self.index_b.compact(&frontier, None);
        }
    }
}

impl<K: Data, V: Data> DeltaStream<(K, V)> {
    /// Inner join on key: the accumulated output is the natural join of the
    /// accumulated inputs, with multiplicities multiplied.
    ///
    /// # Panics
    /// Panics if `other` belongs to a different dataflow.
    pub fn join<V2: Data>(&self, other: &DeltaStream<(K, V2)>) -> DeltaStream<(K, (V, V2))> {
        self.add_binary(other, JoinOperator::new)
    }

    /// Left rows whose key has no match on the right; the right side of
    /// every output pair is `None`.
    pub fn anti_join<V2: Data>(
        &self,
        other: &DeltaStream<(K, V2)>,
    ) -> DeltaStream<(K, (V, Option<V2>))> {
        let matched_keys = other.map(|(key, _)| (key.clone(), ())).distinct();
        let suppressed = self
            .join(&matched_keys)
            .map(|(key, (value, _))| (key.clone(), (value.clone(), None::<V2>)));
        self.map(|(key, value)| (key.clone(), (value.clone(), None::<V2>)))
            .concat(&suppressed.negate())
            .consolidate()
    }

    /// Inner join plus the unmatched left rows.
    pub fn left_join<V2: Data>(
        &self,
        other: &DeltaStream<(K, V2)>,
    ) -> DeltaStream<(K, (V, Option<V2>))> {
        let matched = self
            .join(other)
            .map(|(key, (value, with))| (key.clone(), (value.clone(), Some(with.clone()))));
        matched.concat(&self.anti_join(other)).consolidate()
    }

    /// Inner join plus the unmatched right rows.
    pub fn right_join<V2: Data>(
        &self,
        other: &DeltaStream<(K, V2)>,
    ) -> DeltaStream<(K, (Option<V>, V2))> {
        other
            .left_join(self)
            .map(|(key, (value, with))| (key.clone(), (with.clone(), value.clone())))
    }

    /// Inner join plus the unmatched rows of both sides.
    #[allow(clippy::type_complexity)]
    pub fn full_join<V2: Data>(
        &self,
        other: &DeltaStream<(K, V2)>,
    ) -> DeltaStream<(K, (Option<V>, Option<V2>))> {
        let matched = self
            .join(other)
            .map(|(key, (value, with))| (key.clone(), (Some(value.clone()), Some(with.clone()))));
        let left_only = self
            .anti_join(other)
            .map(|(key, (value, _))| (key.clone(), (Some(value.clone()), None::<V2>)));
        let right_only = other
            .anti_join(self)
            .map(|(key, (with, _))| (key.clone(), (None::<V>, Some(with.clone()))));
        matched.concat(&left_only).concat(&right_only).consolidate()
    }
}
