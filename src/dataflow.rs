//! Dataflow construction and the typed stream-builder API.
//!
//! A [`Dataflow`] is the container for a computation graph. It is cheaply
//! cloneable — all clones share the same underlying graph — and is built
//! incrementally:
//!
//! 1. [`Dataflow::new_input`] registers a producer and returns an
//!    [`InputHandle`] plus a [`DeltaStream`] to build on.
//! 2. `DeltaStream` methods (`map`, `filter`, `join`, `reduce`, `iterate`,
//!    ...) insert operators and wire edges.
//! 3. [`Dataflow::finalize`] freezes the topology and validates it.
//! 4. [`Dataflow::step`] / [`Dataflow::run`] drain ready operators on the
//!    caller's thread.
//!
//! Producers push deltas at explicit versions and advance their frontier as
//! they go. Pipelines that never iterate and never interleave rounds can use
//! [`BatchFlow`] instead, which hides versions and frontiers entirely and
//! reaches every completion point once per [`BatchFlow::run`].

use crate::graph::{BinaryCore, Graph, Operator, StreamReader, StreamWriter, UnaryCore};
use crate::multiset::{Data, Multiset};
use crate::order::{Antichain, Version};
use anyhow::{Result, bail};
use std::sync::{Arc, Mutex, MutexGuard};

#[cfg(feature = "metrics")]
use crate::metrics::MetricsCollector;

/// A handle on a dataflow graph under construction (and, once finalized, on
/// its scheduler). Cheaply cloneable; clones share the graph.
pub struct Dataflow {
    inner: Arc<Mutex<Graph>>,
}

impl Clone for Dataflow {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

impl Default for Dataflow {
    fn default() -> Self {
        Self::new()
    }
}

impl Dataflow {
    /// A dataflow whose producers stamp one-dimensional versions starting at
    /// zero.
    pub fn new() -> Self {
        Self::with_frontier(Antichain::from(Version::root(1)))
    }

    /// A dataflow with an explicit initial frontier, for hosts that stamp
    /// multi-dimensional versions at the edge.
    pub fn with_frontier(initial: Antichain) -> Self {
        Self { inner: Arc::new(Mutex::new(Graph::new(initial))) }
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, Graph> {
        self.inner.lock().unwrap()
    }

    pub(crate) fn same_graph(&self, other: &Dataflow) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Register a producer. Returns the producer handle and the stream to
    /// build the consuming pipeline on.
    ///
    /// # Panics
    /// Panics when called inside an `iterate` body or after `finalize` —
    /// inputs enter at the root scope only.
    pub fn new_input<T: Data>(&self) -> (InputHandle<T>, DeltaStream<T>) {
        let mut graph = self.lock();
        assert!(!graph.is_finalized(), "cannot add an input to a finalized dataflow");
        assert!(graph.at_root_scope(), "inputs can only be created at the root scope");
        let writer = StreamWriter::new(graph.scope_frontier());
        let endpoint = writer.clone();
        graph.register_endpoint("input".to_string(), Box::new(move || endpoint.reader_count()));
        drop(graph);
        (
            InputHandle { writer: writer.clone() },
            DeltaStream { flow: self.clone(), writer },
        )
    }

    /// Freeze the topology. Fails on a second call and when any stream was
    /// left without a consumer.
    pub fn finalize(&self) -> Result<()> {
        self.lock().finalize()
    }

    /// Execute one ready operator. Returns `Ok(false)` once no operator has
    /// pending input.
    pub fn step(&self) -> Result<bool> {
        self.lock().step()
    }

    /// Execute until no operator is ready.
    pub fn run(&self) -> Result<()> {
        self.lock().run()
    }

    /// Install a metrics collector; the scheduler will count steps and
    /// operator runs into it.
    #[cfg(feature = "metrics")]
    pub fn set_metrics(&self, metrics: MetricsCollector) {
        self.lock().metrics = Some(metrics);
    }

    /// Remove and return the installed metrics collector, if any.
    #[cfg(feature = "metrics")]
    pub fn take_metrics(&self) -> Option<MetricsCollector> {
        self.lock().metrics.take()
    }
}

/// A typed stream of deltas inside a dataflow graph.
///
/// `DeltaStream` is a lightweight handle: transformation methods insert an
/// operator, wire it to this stream's edge, and return the handle of the new
/// operator's output stream. A stream may be piped into any number of
/// downstream operators; each gets its own FIFO view of the same messages.
pub struct DeltaStream<T> {
    pub(crate) flow: Dataflow,
    pub(crate) writer: StreamWriter<T>,
}

impl<T> Clone for DeltaStream<T> {
    fn clone(&self) -> Self {
        Self { flow: self.flow.clone(), writer: self.writer.clone() }
    }
}

impl<T: Data> DeltaStream<T> {
    /// Wire a unary operator onto this stream within the current scope.
    pub(crate) fn add_unary<O, Op>(
        &self,
        build: impl FnOnce(UnaryCore<T, O>) -> Op,
    ) -> DeltaStream<O>
    where
        O: Data,
        Op: Operator + 'static,
    {
        let frontier = self.flow.lock().scope_frontier();
        self.add_unary_scoped(frontier, build)
    }

    /// Wire a unary operator with an explicit initial output frontier, for
    /// the scope boundary operators whose input and output live in different
    /// scopes. The input frontier starts from what the upstream writer has
    /// already promised.
    pub(crate) fn add_unary_scoped<O, Op>(
        &self,
        output_frontier: Antichain,
        build: impl FnOnce(UnaryCore<T, O>) -> Op,
    ) -> DeltaStream<O>
    where
        O: Data,
        Op: Operator + 'static,
    {
        let mut graph = self.flow.lock();
        let id = graph.alloc_id();
        let reader = self.writer.subscribe();
        let writer = StreamWriter::new(output_frontier.clone());
        let core =
            UnaryCore::new(id, reader, writer.clone(), self.writer.frontier(), output_frontier);
        let operator = build(core);
        let endpoint = writer.clone();
        graph.register_endpoint(
            format!("{} ({:?})", operator.name(), operator.id()),
            Box::new(move || endpoint.reader_count()),
        );
        graph.add_operator(Box::new(operator));
        drop(graph);
        DeltaStream { flow: self.flow.clone(), writer }
    }

    /// Wire a binary operator onto this stream and `other`.
    ///
    /// # Panics
    /// Panics if the two streams belong to different dataflows.
    pub(crate) fn add_binary<B, O, Op>(
        &self,
        other: &DeltaStream<B>,
        build: impl FnOnce(BinaryCore<T, B, O>) -> Op,
    ) -> DeltaStream<O>
    where
        B: Data,
        O: Data,
        Op: Operator + 'static,
    {
        assert!(
            self.flow.same_graph(&other.flow),
            "cannot wire streams from different dataflows together"
        );
        let mut graph = self.flow.lock();
        let id = graph.alloc_id();
        let frontier = graph.scope_frontier();
        let reader_a = self.writer.subscribe();
        let reader_b = other.writer.subscribe();
        let writer = StreamWriter::new(frontier.clone());
        let core = BinaryCore::new(
            id,
            reader_a,
            reader_b,
            writer.clone(),
            self.writer.frontier(),
            other.writer.frontier(),
            frontier,
        );
        let operator = build(core);
        let endpoint = writer.clone();
        graph.register_endpoint(
            format!("{} ({:?})", operator.name(), operator.id()),
            Box::new(move || endpoint.reader_count()),
        );
        graph.add_operator(Box::new(operator));
        drop(graph);
        DeltaStream { flow: self.flow.clone(), writer }
    }

    /// Materialize a raw reader on this stream, for external consumers that
    /// want to pattern-match [`Message`](crate::Message)s themselves. The
    /// reader must be drained; an unread subscription keeps messages queued
    /// for the lifetime of the graph.
    pub fn subscribe(&self) -> StreamReader<T> {
        self.writer.subscribe()
    }

    /// The dataflow this stream belongs to.
    pub fn dataflow(&self) -> Dataflow {
        self.flow.clone()
    }
}

/// The producer side of an input stream.
///
/// Data is sent at explicit versions; the handle's frontier must cover every
/// version it sends, and frontier advances must be monotone. Closing the
/// handle advances its frontier to the top of the lattice.
pub struct InputHandle<T> {
    writer: StreamWriter<T>,
}

impl<T> Clone for InputHandle<T> {
    fn clone(&self) -> Self {
        Self { writer: self.writer.clone() }
    }
}

impl<T: Data> InputHandle<T> {
    /// Push a delta at `version`. Empty collections are accepted and
    /// dropped.
    pub fn send_data(&self, version: impl Into<Version>, collection: Multiset<T>) -> Result<()> {
        let version = version.into();
        let frontier = self.writer.frontier();
        if !frontier.covers(&version) {
            bail!(
                "cannot send data at {version:?}: the input frontier {frontier:?} no longer covers it"
            );
        }
        self.writer.send_data(version, collection);
        Ok(())
    }

    /// Advance the producer frontier, promising that no future delta will
    /// arrive at a version the new frontier does not cover.
    pub fn send_frontier(&self, frontier: impl Into<Antichain>) -> Result<()> {
        let frontier = frontier.into();
        let current = self.writer.frontier();
        if !current.less_equal(&frontier) {
            bail!("non-monotone input frontier: {current:?} -> {frontier:?}");
        }
        self.writer.send_frontier(frontier);
        Ok(())
    }

    /// The current producer frontier.
    pub fn frontier(&self) -> Antichain {
        self.writer.frontier()
    }

    /// Advance the frontier to the top of the lattice: this producer is
    /// done.
    pub fn close(&self) -> Result<()> {
        self.send_frontier(Antichain::empty())
    }
}

struct BatchShared {
    epoch: u64,
    advance: Vec<Box<dyn Fn(u64) -> Result<()> + Send>>,
}

/// The version-free execution mode, for single-pass batch processing.
///
/// Producers push plain collections — no versions, no frontiers. Every call
/// to [`BatchFlow::run`] closes the current round before draining, so each
/// stateful operator reaches its completion point exactly once per run and
/// emission happens per input-drain.
///
/// # Example
/// ```
/// use deltaflow::{BatchFlow, Multiset};
///
/// # fn main() -> anyhow::Result<()> {
/// let flow = BatchFlow::new();
/// let (input, stream) = flow.new_input::<i64>();
/// let doubled = stream.map(|x| x * 2);
/// let sink = doubled.subscribe();
/// flow.finalize()?;
///
/// input.send(Multiset::from(vec![(4, 1)]))?;
/// flow.run()?;
/// # let _ = sink.drain();
/// # Ok(())
/// # }
/// ```
pub struct BatchFlow {
    flow: Dataflow,
    shared: Arc<Mutex<BatchShared>>,
}

impl Default for BatchFlow {
    fn default() -> Self {
        Self::new()
    }
}

impl BatchFlow {
    /// An empty version-free dataflow.
    pub fn new() -> Self {
        Self {
            flow: Dataflow::new(),
            shared: Arc::new(Mutex::new(BatchShared { epoch: 0, advance: Vec::new() })),
        }
    }

    /// Register a producer. The returned stream supports the full operator
    /// set, `iterate` included.
    pub fn new_input<T: Data>(&self) -> (BatchInput<T>, DeltaStream<T>) {
        let (handle, stream) = self.flow.new_input::<T>();
        let advance_handle = handle.clone();
        self.shared
            .lock()
            .unwrap()
            .advance
            .push(Box::new(move |epoch| advance_handle.send_frontier(Version::from(epoch))));
        (BatchInput { handle, shared: Arc::clone(&self.shared) }, stream)
    }

    /// Freeze the topology.
    pub fn finalize(&self) -> Result<()> {
        self.flow.finalize()
    }

    /// Close the current round on every input, then drain the graph. All
    /// deltas sent since the previous run are processed together.
    pub fn run(&self) -> Result<()> {
        {
            let mut shared = self.shared.lock().unwrap();
            let next = shared.epoch + 1;
            for advance in &shared.advance {
                advance(next)?;
            }
            shared.epoch = next;
        }
        self.flow.run()
    }

    /// Install a metrics collector on the underlying graph.
    #[cfg(feature = "metrics")]
    pub fn set_metrics(&self, metrics: MetricsCollector) {
        self.flow.set_metrics(metrics);
    }

    /// Remove and return the installed metrics collector, if any.
    #[cfg(feature = "metrics")]
    pub fn take_metrics(&self) -> Option<MetricsCollector> {
        self.flow.take_metrics()
    }
}

/// The producer side of a version-free input stream.
pub struct BatchInput<T> {
    handle: InputHandle<T>,
    shared: Arc<Mutex<BatchShared>>,
}

impl<T: Data> BatchInput<T> {
    /// Push a delta into the current round.
    pub fn send(&self, collection: Multiset<T>) -> Result<()> {
        let epoch = self.shared.lock().unwrap().epoch;
        self.handle.send_data(Version::from(epoch), collection)
    }
}
