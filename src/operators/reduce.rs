//! The keyed reduce operator and the aggregates derived from it.
//!
//! `reduce` applies a user function to the accumulated bag of values per key
//! and emits, at each completion point, the *delta* between the function's
//! result and what was previously emitted for that key — so the accumulated
//! output is always exactly the function of the accumulated input, and a key
//! whose result did not change produces nothing.
//!
//! The operator keeps two versioned indexes: the accumulated input per key
//! and the accumulated output per key. When the input frontier stops
//! covering a version, every key touched at that version is reconciled:
//!
//! 1. reconstruct the input bag visible at the version and apply `f`;
//! 2. reconstruct the previously emitted output at the version;
//! 3. emit (and fold into the output index) the difference.
//!
//! Zero-multiplicity entries returned by user reducers are dropped before
//! the difference is formed.

use crate::dataflow::DeltaStream;
use crate::graph::{Message, Operator, OperatorId, UnaryCore};
use crate::indexes::VersionedIndex;
use crate::multiset::{Data, Multiset};
use crate::order::Version;
use ordered_float::OrderedFloat;
use std::collections::{HashMap, HashSet};

pub(crate) struct ReduceOperator<K, V, O, F> {
    core: UnaryCore<(K, V), (K, O)>,
    f: F,
    index: VersionedIndex<K, V>,
    index_out: VersionedIndex<K, O>,
    keys_todo: HashMap<Version, HashSet<K>>,
}

impl<K: Data, V: Data, O: Data, F> ReduceOperator<K, V, O, F> {
    pub(crate) fn new(core: UnaryCore<(K, V), (K, O)>, f: F) -> Self {
        Self {
            core,
            f,
            index: VersionedIndex::new(),
            index_out: VersionedIndex::new(),
            keys_todo: HashMap::new(),
        }
    }
}

impl<K, V, O, F> Operator for ReduceOperator<K, V, O, F>
where
    K: Data,
    V: Data,
    O: Data,
    F: Fn(&[(V, i64)]) -> Vec<(O, i64)> + Send + 'static,
{
    fn id(&self) -> OperatorId {
        self.core.id
    }

    fn name(&self) -> &'static str {
        "reduce"
    }

    fn pending_work(&self) -> bool {
        self.core.pending_work()
    }

    fn run(&mut self) {
        for message in self.core.drain() {
            match message {
                Message::Data { version, collection } => {
                    for ((key, value), multiplicity) in collection {
                        // A key with entries at incomparable versions may
                        // change at their join as well; schedule those too.
                        for existing in self.index.versions(&key) {
                            let joined = existing.join(&version);
                            if joined != version {
                                self.keys_todo.entry(joined).or_default().insert(key.clone());
                            }
                        }
                        self.keys_todo
                            .entry(version.clone())
                            .or_default()
                            .insert(key.clone());
                        self.index.add(key, &version, (value, multiplicity));
                    }
                }
                Message::Frontier(frontier) => self.core.note_input_frontier(frontier),
            }
        }

        let mut finished: Vec<Version> = self
            .keys_todo
            .keys()
            .filter(|version| !self.core.input_frontier().covers(version))
            .cloned()
            .collect();
        finished.sort_by(|a, b| a.lex_cmp(b));

        for version in finished {
            let keys = self.keys_todo.remove(&version).expect("version listed above");
            let mut delta = Multiset::new();
            let mut corrections: Vec<(K, O, i64)> = Vec::new();
            for key in keys {
                let input_bag = self.index.reconstruct_at(&key, &version);
                let emitted = self.index_out.reconstruct_at(&key, &version);
                let mut target = (self.f)(&input_bag);
                target.retain(|(_, multiplicity)| *multiplicity != 0);

                let mut difference: HashMap<O, i64> = HashMap::new();
                for (value, multiplicity) in target {
                    *difference.entry(value).or_insert(0) += multiplicity;
                }
                for (value, multiplicity) in emitted {
                    *difference.entry(value).or_insert(0) -= multiplicity;
                }
                for (value, multiplicity) in difference {
                    if multiplicity != 0 {
                        corrections.push((key.clone(), value.clone(), multiplicity));
                        delta.push((key.clone(), value), multiplicity);
                    }
                }
            }
            // All user code for this version has run; commit, then emit.
            for (key, value, multiplicity) in corrections {
                self.index_out.add(key, &version, (value, multiplicity));
            }
            self.core.send_data(version, delta.consolidate());
        }

        if self.core.sync_frontier() {
            let frontier = self.core.input_frontier().clone();
            self.index.compact(&frontier, None);
            self.index_out.compact(&frontier, None);
        }
    }
}

impl<K: Data, V: Data> DeltaStream<(K, V)> {
    /// Reduce the bag of values per key with `f`, incrementally.
    ///
    /// `f` receives the consolidated bag accumulated for a key and returns
    /// the bag the output should hold for that key. At every completion
    /// point the operator emits only the difference against what it emitted
    /// before; keys whose result is unchanged stay silent. Entries returned
    /// with zero multiplicity are discarded.
    ///
    /// # Example
    /// ```
    /// use deltaflow::{BatchFlow, Multiset};
    ///
    /// # fn main() -> anyhow::Result<()> {
    /// let flow = BatchFlow::new();
    /// let (input, pairs) = flow.new_input::<(&'static str, i64)>();
    /// let sums = pairs.reduce(|values| {
    ///     let total: i64 = values.iter().map(|(value, m)| value * m).sum();
    ///     vec![(total, 1)]
    /// });
    /// # let _sink = sums.subscribe();
    /// # flow.finalize()?;
    /// # input.send(Multiset::from(vec![(("a", 2), 1)]))?;
    /// # flow.run()?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn reduce<O: Data>(
        &self,
        f: impl Fn(&[(V, i64)]) -> Vec<(O, i64)> + Send + 'static,
    ) -> DeltaStream<(K, O)> {
        self.add_unary(|core| ReduceOperator::new(core, f))
    }

    /// Number of values per key (respecting multiplicities). A key whose bag
    /// empties out retracts its count entirely.
    pub fn count(&self) -> DeltaStream<(K, i64)> {
        self.reduce(|values| {
            if values.is_empty() {
                return Vec::new();
            }
            let total: i64 = values.iter().map(|(_, multiplicity)| multiplicity).sum();
            vec![(total, 1)]
        })
    }

    /// Smallest value currently present per key (positive accumulated
    /// multiplicity).
    pub fn min(&self) -> DeltaStream<(K, V)> {
        self.reduce(|values| {
            values
                .iter()
                .filter(|(_, multiplicity)| *multiplicity > 0)
                .map(|(value, _)| value)
                .min()
                .map(|value| (value.clone(), 1))
                .into_iter()
                .collect()
        })
    }

    /// Largest value currently present per key.
    pub fn max(&self) -> DeltaStream<(K, V)> {
        self.reduce(|values| {
            values
                .iter()
                .filter(|(_, multiplicity)| *multiplicity > 0)
                .map(|(value, _)| value)
                .max()
                .map(|value| (value.clone(), 1))
                .into_iter()
                .collect()
        })
    }
}

impl<K: Data> DeltaStream<(K, i64)> {
    /// Sum of the values per key, weighted by multiplicity.
    pub fn sum(&self) -> DeltaStream<(K, i64)> {
        self.reduce(|values| {
            if values.is_empty() {
                return Vec::new();
            }
            let total: i64 = values.iter().map(|(value, multiplicity)| value * multiplicity).sum();
            vec![(total, 1)]
        })
    }

    /// Mean of the values per key. Empty or fully retracted keys emit
    /// nothing; the output is wrapped in [`OrderedFloat`] so it can live in
    /// a collection.
    pub fn avg(&self) -> DeltaStream<(K, OrderedFloat<f64>)> {
        self.reduce(|values| {
            let count: i64 = values.iter().map(|(_, multiplicity)| multiplicity).sum();
            if count <= 0 {
                return Vec::new();
            }
            let total: i64 = values.iter().map(|(value, multiplicity)| value * multiplicity).sum();
            vec![(OrderedFloat(total as f64 / count as f64), 1)]
        })
    }
}
