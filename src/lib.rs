//! # Deltaflow
//!
//! An **incremental dataflow engine** for differential collections in Rust.
//! Deltaflow maintains long-running computations over streams of typed
//! records carrying signed multiplicities (`+1` insert, `-1` retract) and
//! emits, at all times, the *deltas* to the output that keep it equal to the
//! operator semantics applied to the accumulated input — without ever
//! recomputing from scratch.
//!
//! ## Key Features
//!
//! - **Declarative stream API** - chain relational operators with a fluent interface
//! - **Incremental by construction** - `map`, `filter`, `negate`, `concat`,
//!   `join`, `reduce`, `distinct`, `consolidate`, `top_k`
//! - **Recursion to fixpoint** - `iterate` runs a subgraph until it stops
//!   producing new data, driven by frontier arithmetic rather than reachability
//! - **Partially ordered time** - versions form a lattice; antichain
//!   frontiers tell every operator which times are complete
//! - **Stable incremental ordering** - `top_k_with_fractional_index` reorders
//!   under churn while reusing the order keys of undisturbed elements
//! - **Two execution modes** - a versioned runtime, and a version-free
//!   [`BatchFlow`] for single-pass batch processing
//! - **Type-safe** - streams are typed end to end; state is keyed by value
//!
//! ## Quick Start
//!
//! ```
//! use deltaflow::{BatchFlow, Multiset};
//! use deltaflow::testing::*;
//!
//! # fn main() -> anyhow::Result<()> {
//! // Build a word-count over change streams.
//! let flow = BatchFlow::new();
//! let (input, words) = flow.new_input::<String>();
//!
//! let counts = words.key_by(|word| word.clone()).count().capture();
//! flow.finalize()?;
//!
//! // First round: two hellos, one world.
//! input.send(Multiset::from(vec![
//!     ("hello".to_string(), 2),
//!     ("world".to_string(), 1),
//! ]))?;
//! flow.run()?;
//! assert_multisets_equal(
//!     &counts.accumulated(),
//!     &Multiset::from(vec![(("hello".to_string(), 2), 1), (("world".to_string(), 1), 1)]),
//! );
//!
//! // Second round: retract one hello; only the changed count is re-emitted.
//! input.send(Multiset::from(vec![("hello".to_string(), -1)]))?;
//! flow.run()?;
//! assert_multisets_equal(
//!     &counts.accumulated(),
//!     &Multiset::from(vec![(("hello".to_string(), 1), 1), (("world".to_string(), 1), 1)]),
//! );
//! # Ok(())
//! # }
//! ```
//!
//! ## Core Concepts
//!
//! ### Collections and deltas
//!
//! A [`Multiset<T>`] is a bag of `(value, multiplicity)` pairs. Streams carry
//! multisets as *deltas*; the **accumulated** collection is the running sum
//! of everything a stream has carried. [`Multiset::consolidate`] puts a
//! collection in canonical form (no duplicate values, no zeros).
//!
//! ### Versions and frontiers
//!
//! In the versioned mode every delta is stamped with a [`Version`] — a tuple
//! of integers, partially ordered pointwise. An [`Antichain`] *frontier*
//! bounds the versions at which data may still arrive; once an operator's
//! input frontier stops covering a version, that version is complete and any
//! output depending on it can be emitted. Frontiers are what let stateful
//! operators emit exact deltas, and what proves an iteration has reached its
//! fixpoint.
//!
//! ### Dataflow graphs
//!
//! A [`Dataflow`] owns a graph of operators connected by single-writer,
//! multi-reader FIFO edges. [`Dataflow::new_input`] returns a producer
//! [`InputHandle`] plus a [`DeltaStream`] to build on; [`Dataflow::finalize`]
//! freezes the topology; [`Dataflow::step`] and [`Dataflow::run`] drain ready
//! operators cooperatively on the caller's thread.
//!
//! ```
//! use deltaflow::{Dataflow, Multiset, Version};
//!
//! # fn main() -> anyhow::Result<()> {
//! let flow = Dataflow::new();
//! let (input, values) = flow.new_input::<i64>();
//! let sink = values.map(|x| x * 2).filter(|x| *x > 2).subscribe();
//! flow.finalize()?;
//!
//! input.send_data(Version::from(0), Multiset::from(vec![(1, 1), (2, 1)]))?;
//! input.send_frontier(Version::from(1))?;
//! flow.run()?;
//! # let _ = sink.drain();
//! # Ok(())
//! # }
//! ```
//!
//! ### Stateful operators
//!
//! [`reduce`](DeltaStream::reduce) applies a user function to the
//! accumulated bag of values per key and emits only what changed; `count`,
//! `sum`, `min`, `max` and `avg` derive from it. [`join`](DeltaStream::join)
//! keeps one index per side and joins deltas against accumulations, so each
//! pairing is produced exactly once. [`distinct`](DeltaStream::distinct)
//! collapses multiplicities to presence. Every stateful operator owns its
//! indexes outright; streams, not indexes, are shared.
//!
//! ### Iteration
//!
//! [`iterate`](DeltaStream::iterate) appends a coordinate to every version
//! inside the loop, feeds the body's output back into its input one sub-step
//! later, and lets the loop close for an outer version once frontier
//! advances stop carrying new data:
//!
//! ```
//! use deltaflow::{BatchFlow, Multiset};
//! use deltaflow::testing::*;
//!
//! # fn main() -> anyhow::Result<()> {
//! let flow = BatchFlow::new();
//! let (input, seed) = flow.new_input::<i64>();
//! let reachable = seed
//!     .iterate(|inner| {
//!         inner.map(|x| x * 2).concat(inner).filter(|x| *x <= 50).distinct()
//!     })
//!     .capture();
//! flow.finalize()?;
//!
//! input.send(Multiset::from(vec![(1, 1)]))?;
//! flow.run()?;
//! assert_multisets_equal(
//!     &reachable.accumulated(),
//!     &Multiset::from(vec![(1, 1), (2, 1), (4, 1), (8, 1), (16, 1), (32, 1)]),
//! );
//! # Ok(())
//! # }
//! ```
//!
//! ## Execution Modes
//!
//! The versioned runtime is the engine; all operators function under it. The
//! version-free [`BatchFlow`] mode hides versions and frontiers for
//! pipelines that just want batch rounds: every [`BatchFlow::run`] closes
//! the current round, so each stateful operator reaches its completion point
//! once per drain.
//!
//! ## Probing
//!
//! [`DeltaStream::output`] installs a callback sink and returns an
//! [`OutputHandle`] whose
//! [`probe_frontier_less_than`](OutputHandle::probe_frontier_less_than)
//! tells a host whether results up to some version are still outstanding —
//! the idiomatic way to drive a graph to quiescence under iteration.
//!
//! ## Testing Your Pipelines
//!
//! The [`testing`] module ships the assertion helpers, data builders, and
//! the [`capture`](testing::DeltaStreamTestExt::capture) sink used
//! throughout this crate's own test suite.
//!
//! ## Metrics
//!
//! With the `metrics` feature (default), install a
//! [`MetricsCollector`](metrics::MetricsCollector) on a flow and the
//! scheduler counts steps and operator runs; collectors print to stdout or
//! save JSON. See [`metrics`].
//!
//! ## Module Overview
//!
//! - [`multiset`] - collections, the multiset algebra, the lazy variant
//! - [`order`] - versions, the time lattice, antichain frontiers
//! - [`indexes`] - the keyed stores behind the stateful operators
//! - [`graph`] - messages, edges, operator scheduling
//! - [`dataflow`] - graph construction, producer handles, execution modes
//! - [`operators`] - the operator set and the stream-builder methods
//! - [`fractional`] - order-encoding index strings
//! - [`testing`] - assertions, builders, capture
//! - [`metrics`] - execution metrics (feature `metrics`)

pub mod dataflow;
pub mod fractional;
pub mod graph;
pub mod indexes;
pub mod multiset;
pub mod operators;
pub mod order;
pub mod testing;

#[cfg(feature = "metrics")]
pub mod metrics;

// General re-exports
pub use dataflow::{BatchFlow, BatchInput, Dataflow, DeltaStream, InputHandle};
pub use graph::{Message, OperatorId, StreamReader};
pub use indexes::{Index, VersionedIndex};
pub use multiset::{Data, LazyMultiset, Multiset};
pub use operators::inspect::OutputHandle;
pub use order::{Antichain, Version};

// Float values need a total order before they can live in a collection.
pub use ordered_float::OrderedFloat;
