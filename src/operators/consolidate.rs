//! Consolidation and buffering at version granularity.
//!
//! Both operators hold arriving deltas until their version is complete
//! (the input frontier no longer covers it). `consolidate` then emits the
//! canonical form of everything that accumulated at that version;
//! `buffer` re-emits the accumulated deltas untouched, smoothing bursty
//! producers without changing the stream's content.

use crate::dataflow::DeltaStream;
use crate::graph::{Message, Operator, OperatorId, UnaryCore};
use crate::multiset::{Data, Multiset};
use crate::order::Version;
use std::collections::HashMap;

pub(crate) struct ConsolidateOperator<T> {
    core: UnaryCore<T, T>,
    pending: HashMap<Version, Multiset<T>>,
}

impl<T> ConsolidateOperator<T> {
    pub(crate) fn new(core: UnaryCore<T, T>) -> Self {
        Self { core, pending: HashMap::new() }
    }
}

impl<T: Data> Operator for ConsolidateOperator<T> {
    fn id(&self) -> OperatorId {
        self.core.id
    }

    fn name(&self) -> &'static str {
        "consolidate"
    }

    fn pending_work(&self) -> bool {
        self.core.pending_work()
    }

    fn run(&mut self) {
        for message in self.core.drain() {
            match message {
                Message::Data { version, collection } => {
                    self.pending
                        .entry(version)
                        .or_default()
                        .extend(collection.into_entries());
                }
                Message::Frontier(frontier) => self.core.note_input_frontier(frontier),
            }
        }
        let mut finished: Vec<Version> = self
            .pending
            .keys()
            .filter(|version| !self.core.input_frontier().covers(version))
            .cloned()
            .collect();
        finished.sort_by(|a, b| a.lex_cmp(b));
        for version in finished {
            let collection = self.pending.remove(&version).expect("version listed above");
            self.core.send_data(version, collection.consolidate());
        }
        self.core.sync_frontier();
    }
}

pub(crate) struct BufferOperator<T> {
    core: UnaryCore<T, T>,
    pending: HashMap<Version, Vec<Multiset<T>>>,
}

impl<T> BufferOperator<T> {
    pub(crate) fn new(core: UnaryCore<T, T>) -> Self {
        Self { core, pending: HashMap::new() }
    }
}

impl<T: Data> Operator for BufferOperator<T> {
    fn id(&self) -> OperatorId {
        self.core.id
    }

    fn name(&self) -> &'static str {
        "buffer"
    }

    fn pending_work(&self) -> bool {
        self.core.pending_work()
    }

    fn run(&mut self) {
        for message in self.core.drain() {
            match message {
                Message::Data { version, collection } => {
                    self.pending.entry(version).or_default().push(collection);
                }
                Message::Frontier(frontier) => self.core.note_input_frontier(frontier),
            }
        }
        let mut finished: Vec<Version> = self
            .pending
            .keys()
            .filter(|version| !self.core.input_frontier().covers(version))
            .cloned()
            .collect();
        finished.sort_by(|a, b| a.lex_cmp(b));
        for version in finished {
            for collection in self.pending.remove(&version).expect("version listed above") {
                self.core.send_data(version.clone(), collection);
            }
        }
        self.core.sync_frontier();
    }
}

impl<T: Data> DeltaStream<T> {
    /// Hold deltas until their version is complete, then emit the canonical
    /// form of everything that accumulated there. Emits nothing for versions
    /// that consolidate to nothing; applying `consolidate` twice is the same
    /// as applying it once.
    pub fn consolidate(&self) -> DeltaStream<T> {
        self.add_unary(ConsolidateOperator::new)
    }

    /// Hold deltas until their version is complete, then release them
    /// unchanged.
    pub fn buffer(&self) -> DeltaStream<T> {
        self.add_unary(BufferOperator::new)
    }
}
