//! The dataflow runtime: messages, edges, operators, and scheduling.
//!
//! A finalized dataflow is a directed graph of **operators** connected by
//! **edges**. Each edge is a single-writer, multi-reader FIFO: the writer
//! publishes once and every reader drains its own queue independently. Two
//! kinds of message flow along an edge:
//!
//! - `Data { version, collection }`: a delta to the stream at a logical time;
//! - `Frontier(antichain)`: a promise that no future data at a version
//!   covered only below the antichain will arrive.
//!
//! Scheduling is cooperative and single-threaded: [`Graph::step`] runs one
//! operator with pending input, [`Graph::run`] steps until no operator is
//! ready. Operators drain all buffered input per invocation and run to
//! completion; the only scheduling boundary is the return from `step`. The
//! graph is a list, not a topological order — the feedback edge of an
//! iteration scope makes the graph cyclic, and the pending-work discipline
//! (not reachability) is what drives execution and termination.
//!
//! Frontier bookkeeping lives in the operator cores here: input frontiers
//! are tracked per input edge, output frontiers are monotone under the
//! lattice order, and an operator may emit data at a version only while its
//! output frontier still covers it. Violations of these rules are
//! programming errors and fail fast.

use crate::multiset::Multiset;
use crate::order::{Antichain, Version};
use anyhow::{Result, bail};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

#[cfg(feature = "metrics")]
use crate::metrics::MetricsCollector;

/// Unique numeric identifier for an operator in a graph.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct OperatorId(u64);

impl OperatorId {
    pub(crate) fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The underlying numeric value, mainly for debugging.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// A message on an edge: either a delta at a version, or a frontier
/// notification. Consumers pattern-match.
#[derive(Clone, Debug)]
pub enum Message<T> {
    /// A delta to the stream at `version`.
    Data {
        /// The logical time of the delta.
        version: Version,
        /// The delta itself; not necessarily canonical.
        collection: Multiset<T>,
    },
    /// The upstream frontier advanced: versions no longer covered are
    /// complete.
    Frontier(Antichain),
}

struct WriterShared<T> {
    queues: Vec<Arc<Mutex<VecDeque<Message<T>>>>>,
    frontier: Antichain,
}

/// The writing end of an edge. Cloning the handle aliases the same edge;
/// every subscribed reader observes the same message sequence.
pub(crate) struct StreamWriter<T> {
    shared: Arc<Mutex<WriterShared<T>>>,
}

impl<T> Clone for StreamWriter<T> {
    fn clone(&self) -> Self {
        Self { shared: Arc::clone(&self.shared) }
    }
}

impl<T: Clone> StreamWriter<T> {
    pub(crate) fn new(initial_frontier: Antichain) -> Self {
        Self {
            shared: Arc::new(Mutex::new(WriterShared {
                queues: Vec::new(),
                frontier: initial_frontier,
            })),
        }
    }

    /// Attach a new reader with its own FIFO view of future messages.
    pub(crate) fn subscribe(&self) -> StreamReader<T> {
        let queue = Arc::new(Mutex::new(VecDeque::new()));
        self.shared.lock().unwrap().queues.push(Arc::clone(&queue));
        StreamReader { queue }
    }

    pub(crate) fn reader_count(&self) -> usize {
        self.shared.lock().unwrap().queues.len()
    }

    pub(crate) fn frontier(&self) -> Antichain {
        self.shared.lock().unwrap().frontier.clone()
    }

    /// Publish a delta to every reader. Empty deltas are suppressed: an
    /// operator that computes nothing sends nothing.
    ///
    /// # Panics
    /// Panics if `version` is no longer covered by the writer's frontier —
    /// emitting below one's own frontier corrupts every consumer downstream.
    pub(crate) fn send_data(&self, version: Version, collection: Multiset<T>) {
        if collection.is_empty() {
            return;
        }
        let shared = self.shared.lock().unwrap();
        assert!(
            shared.frontier.covers(&version),
            "emission below the output frontier: {:?} not covered by {:?}",
            version,
            shared.frontier
        );
        for queue in &shared.queues {
            queue
                .lock()
                .unwrap()
                .push_back(Message::Data { version: version.clone(), collection: collection.clone() });
        }
    }

    /// Advance the writer's frontier and notify every reader. No-op when the
    /// frontier is unchanged.
    ///
    /// # Panics
    /// Panics on a non-monotone advance.
    pub(crate) fn send_frontier(&self, frontier: Antichain) {
        let mut shared = self.shared.lock().unwrap();
        if shared.frontier == frontier {
            return;
        }
        assert!(
            shared.frontier.less_equal(&frontier),
            "non-monotone frontier: {:?} -> {:?}",
            shared.frontier,
            frontier
        );
        shared.frontier = frontier.clone();
        for queue in &shared.queues {
            queue.lock().unwrap().push_back(Message::Frontier(frontier.clone()));
        }
    }
}

/// The reading end of an edge: a private FIFO over the writer's messages.
pub struct StreamReader<T> {
    queue: Arc<Mutex<VecDeque<Message<T>>>>,
}

impl<T> StreamReader<T> {
    /// Take every currently buffered message, in arrival order.
    pub fn drain(&self) -> Vec<Message<T>> {
        self.queue.lock().unwrap().drain(..).collect()
    }

    /// True when nothing is buffered.
    pub fn is_empty(&self) -> bool {
        self.queue.lock().unwrap().is_empty()
    }
}

/// The engine-facing face of an operator: drain inputs, emit outputs.
pub(crate) trait Operator: Send {
    fn id(&self) -> OperatorId;
    fn name(&self) -> &'static str;
    /// True while buffered input remains to be drained.
    fn pending_work(&self) -> bool;
    /// Drain all buffered input and emit whatever is ready.
    fn run(&mut self);
}

/// Shared plumbing for single-input operators: the input reader with its
/// tracked frontier, and the output writer with the monotone output
/// frontier.
pub(crate) struct UnaryCore<I, O> {
    pub(crate) id: OperatorId,
    pub(crate) input: StreamReader<I>,
    pub(crate) output: StreamWriter<O>,
    pub(crate) input_frontier: Antichain,
    pub(crate) output_frontier: Antichain,
}

impl<I: Clone, O: Clone> UnaryCore<I, O> {
    pub(crate) fn new(
        id: OperatorId,
        input: StreamReader<I>,
        output: StreamWriter<O>,
        initial_input_frontier: Antichain,
        initial_output_frontier: Antichain,
    ) -> Self {
        Self {
            id,
            input,
            output,
            input_frontier: initial_input_frontier,
            output_frontier: initial_output_frontier,
        }
    }

    pub(crate) fn pending_work(&self) -> bool {
        !self.input.is_empty()
    }

    pub(crate) fn drain(&mut self) -> Vec<Message<I>> {
        self.input.drain()
    }

    /// Record an advanced input frontier.
    pub(crate) fn note_input_frontier(&mut self, frontier: Antichain) {
        assert!(
            self.input_frontier.less_equal(&frontier),
            "operator {:?} received a non-monotone input frontier",
            self.id
        );
        self.input_frontier = frontier;
    }

    pub(crate) fn input_frontier(&self) -> &Antichain {
        &self.input_frontier
    }

    /// Emit a delta. Empty deltas are suppressed by the writer.
    pub(crate) fn send_data(&mut self, version: Version, collection: Multiset<O>) {
        self.output.send_data(version, collection);
    }

    /// Adopt the input frontier as the output frontier when it moved, and
    /// notify downstream. Returns true when an advance was published — the
    /// moment to compact operator state.
    pub(crate) fn sync_frontier(&mut self) -> bool {
        if self.output_frontier == self.input_frontier {
            return false;
        }
        assert!(
            self.output_frontier.less_equal(&self.input_frontier),
            "operator {:?} would regress its output frontier",
            self.id
        );
        self.output_frontier = self.input_frontier.clone();
        self.output.send_frontier(self.output_frontier.clone());
        true
    }
}

/// Shared plumbing for two-input operators. The combined input frontier is
/// the meet of the per-input frontiers.
pub(crate) struct BinaryCore<A, B, O> {
    pub(crate) id: OperatorId,
    pub(crate) input_a: StreamReader<A>,
    pub(crate) input_b: StreamReader<B>,
    pub(crate) output: StreamWriter<O>,
    pub(crate) frontier_a: Antichain,
    pub(crate) frontier_b: Antichain,
    pub(crate) output_frontier: Antichain,
}

impl<A: Clone, B: Clone, O: Clone> BinaryCore<A, B, O> {
    pub(crate) fn new(
        id: OperatorId,
        input_a: StreamReader<A>,
        input_b: StreamReader<B>,
        output: StreamWriter<O>,
        initial_frontier_a: Antichain,
        initial_frontier_b: Antichain,
        initial_output_frontier: Antichain,
    ) -> Self {
        Self {
            id,
            input_a,
            input_b,
            output,
            frontier_a: initial_frontier_a,
            frontier_b: initial_frontier_b,
            output_frontier: initial_output_frontier,
        }
    }

    pub(crate) fn pending_work(&self) -> bool {
        !self.input_a.is_empty() || !self.input_b.is_empty()
    }

    pub(crate) fn note_frontier_a(&mut self, frontier: Antichain) {
        assert!(
            self.frontier_a.less_equal(&frontier),
            "operator {:?} received a non-monotone frontier on input a",
            self.id
        );
        self.frontier_a = frontier;
    }

    pub(crate) fn note_frontier_b(&mut self, frontier: Antichain) {
        assert!(
            self.frontier_b.less_equal(&frontier),
            "operator {:?} received a non-monotone frontier on input b",
            self.id
        );
        self.frontier_b = frontier;
    }

    /// The meet of the two input frontiers: the earliest time either input
    /// may still produce.
    pub(crate) fn combined_input_frontier(&self) -> Antichain {
        self.frontier_a.meet(&self.frontier_b)
    }

    pub(crate) fn send_data(&mut self, version: Version, collection: Multiset<O>) {
        self.output.send_data(version, collection);
    }

    /// Adopt the combined input frontier as the output frontier when it
    /// moved. Returns true when an advance was published.
    pub(crate) fn sync_frontier(&mut self) -> bool {
        let combined = self.combined_input_frontier();
        if self.output_frontier == combined {
            return false;
        }
        assert!(
            self.output_frontier.less_equal(&combined),
            "operator {:?} would regress its output frontier",
            self.id
        );
        self.output_frontier = combined.clone();
        self.output.send_frontier(combined);
        true
    }
}

/// An edge endpoint registered during construction; `finalize` checks every
/// writer found at least one reader.
struct Endpoint {
    operator: String,
    readers: Box<dyn Fn() -> usize + Send>,
}

/// The operator registry and scheduler behind a dataflow.
pub(crate) struct Graph {
    next_id: u64,
    operators: Vec<Box<dyn Operator>>,
    endpoints: Vec<Endpoint>,
    /// Scope stack: the frontier new operators start from. The bottom entry
    /// is the root scope; `iterate` pushes an extended frontier for the
    /// duration of its body.
    pub(crate) frontier_stack: Vec<Antichain>,
    finalized: bool,
    cursor: usize,
    #[cfg(feature = "metrics")]
    pub(crate) metrics: Option<MetricsCollector>,
}

impl Graph {
    pub(crate) fn new(initial_frontier: Antichain) -> Self {
        Self {
            next_id: 0,
            operators: Vec::new(),
            endpoints: Vec::new(),
            frontier_stack: vec![initial_frontier],
            finalized: false,
            cursor: 0,
            #[cfg(feature = "metrics")]
            metrics: None,
        }
    }

    pub(crate) fn alloc_id(&mut self) -> OperatorId {
        assert!(!self.finalized, "cannot extend a finalized dataflow");
        let id = OperatorId::new(self.next_id);
        self.next_id += 1;
        id
    }

    pub(crate) fn scope_frontier(&self) -> Antichain {
        self.frontier_stack.last().expect("scope stack is never empty").clone()
    }

    pub(crate) fn at_root_scope(&self) -> bool {
        self.frontier_stack.len() == 1
    }

    pub(crate) fn add_operator(&mut self, operator: Box<dyn Operator>) {
        assert!(!self.finalized, "cannot extend a finalized dataflow");
        self.operators.push(operator);
    }

    pub(crate) fn register_endpoint(
        &mut self,
        operator: String,
        readers: Box<dyn Fn() -> usize + Send>,
    ) {
        self.endpoints.push(Endpoint { operator, readers });
    }

    pub(crate) fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// Freeze the topology. Fails on a second call and when any stream has
    /// no consumer — a dangling edge means the graph can never drain it.
    pub(crate) fn finalize(&mut self) -> Result<()> {
        if self.finalized {
            bail!("dataflow already finalized");
        }
        for endpoint in &self.endpoints {
            if (endpoint.readers)() == 0 {
                bail!("stream from `{}` has no consumer; every edge needs a reader", endpoint.operator);
            }
        }
        self.finalized = true;
        Ok(())
    }

    /// Execute one ready operator, round-robin. Returns false when no
    /// operator has pending input.
    pub(crate) fn step(&mut self) -> Result<bool> {
        if !self.finalized {
            bail!("dataflow must be finalized before stepping");
        }
        let count = self.operators.len();
        if count == 0 {
            return Ok(false);
        }
        for offset in 0..count {
            let index = (self.cursor + offset) % count;
            if self.operators[index].pending_work() {
                self.cursor = (index + 1) % count;
                self.operators[index].run();
                #[cfg(feature = "metrics")]
                if let Some(metrics) = &self.metrics {
                    metrics.increment_counter("graph_steps", 1);
                    metrics.increment_counter("operator_runs", 1);
                }
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Step until quiescent.
    pub(crate) fn run(&mut self) -> Result<()> {
        #[cfg(feature = "metrics")]
        if let Some(metrics) = &self.metrics {
            metrics.record_start();
        }
        while self.step()? {}
        #[cfg(feature = "metrics")]
        if let Some(metrics) = &self.metrics {
            metrics.record_end();
        }
        Ok(())
    }
}
