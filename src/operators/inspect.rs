//! Side-effecting endpoints: `output` and `debug`.
//!
//! `output` installs a callback sink: every data message and every frontier
//! notification on the stream is handed to the callback, and the returned
//! [`OutputHandle`] lets a host probe how far the stream's frontier has
//! advanced — the standard way to drive a graph to quiescence under
//! iteration.
//!
//! `debug` is a pass-through that prints traffic to stderr.

use crate::dataflow::DeltaStream;
use crate::graph::{Message, Operator, OperatorId, StreamReader, UnaryCore};
use crate::multiset::Data;
use crate::order::Antichain;
use std::fmt::Debug;
use std::sync::{Arc, Mutex};

pub(crate) struct OutputOperator<T, F> {
    id: OperatorId,
    input: StreamReader<T>,
    input_frontier: Antichain,
    shared_frontier: Arc<Mutex<Antichain>>,
    callback: F,
}

impl<T, F> Operator for OutputOperator<T, F>
where
    T: Data,
    F: FnMut(Message<T>) + Send + 'static,
{
    fn id(&self) -> OperatorId {
        self.id
    }

    fn name(&self) -> &'static str {
        "output"
    }

    fn pending_work(&self) -> bool {
        !self.input.is_empty()
    }

    fn run(&mut self) {
        for message in self.input.drain() {
            if let Message::Frontier(frontier) = &message {
                assert!(
                    self.input_frontier.less_equal(frontier),
                    "operator {:?} received a non-monotone input frontier",
                    self.id
                );
                self.input_frontier = frontier.clone();
                *self.shared_frontier.lock().unwrap() = frontier.clone();
            }
            (self.callback)(message);
        }
    }
}

/// A probe on the frontier of an output stream.
///
/// Returned by [`DeltaStream::output`]; cheaply cloneable.
#[derive(Clone)]
pub struct OutputHandle {
    frontier: Arc<Mutex<Antichain>>,
}

impl OutputHandle {
    /// The frontier most recently observed at the output.
    pub fn frontier(&self) -> Antichain {
        self.frontier.lock().unwrap().clone()
    }

    /// True while the output frontier has not yet reached `frontier` — the
    /// loop condition for hosts stepping a graph until some round of results
    /// is complete.
    pub fn probe_frontier_less_than(&self, frontier: &Antichain) -> bool {
        !frontier.less_equal(&self.frontier.lock().unwrap())
    }
}

pub(crate) struct DebugOperator<T> {
    core: UnaryCore<T, T>,
    label: String,
}

impl<T: Data + Debug> Operator for DebugOperator<T> {
    fn id(&self) -> OperatorId {
        self.core.id
    }

    fn name(&self) -> &'static str {
        "debug"
    }

    fn pending_work(&self) -> bool {
        self.core.pending_work()
    }

    fn run(&mut self) {
        for message in self.core.drain() {
            match message {
                Message::Data { version, collection } => {
                    eprintln!("[debug {}] data {version:?} {collection:?}", self.label);
                    self.core.send_data(version, collection);
                }
                Message::Frontier(frontier) => {
                    eprintln!("[debug {}] frontier {frontier:?}", self.label);
                    self.core.note_input_frontier(frontier);
                }
            }
        }
        self.core.sync_frontier();
    }
}

impl<T: Data> DeltaStream<T> {
    /// Terminate the stream into a callback. The callback receives every
    /// forwarded message — deltas and frontier notifications alike — and the
    /// returned handle exposes the observed frontier for probing.
    ///
    /// The callback runs inside the scheduler; it must not call back into
    /// the dataflow.
    pub fn output(&self, callback: impl FnMut(Message<T>) + Send + 'static) -> OutputHandle {
        let mut graph = self.flow.lock();
        let id = graph.alloc_id();
        let initial = graph.scope_frontier();
        let shared_frontier = Arc::new(Mutex::new(initial.clone()));
        let operator = OutputOperator {
            id,
            input: self.writer.subscribe(),
            input_frontier: initial,
            shared_frontier: Arc::clone(&shared_frontier),
            callback,
        };
        graph.add_operator(Box::new(operator));
        OutputHandle { frontier: shared_frontier }
    }

    /// Pass-through that prints every message to stderr under `label`.
    pub fn debug(&self, label: &str) -> DeltaStream<T>
    where
        T: Debug,
    {
        let label = label.to_string();
        self.add_unary(|core| DebugOperator { core, label })
    }
}
