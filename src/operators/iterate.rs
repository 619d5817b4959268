//! Recursive iteration to fixpoint.
//!
//! `iterate(body)` runs a stream through `body` inside a nested scope whose
//! versions carry one extra coordinate:
//!
//! - **ingress** brings each input delta into the scope at sub-step zero and
//!   retracts it again at sub-step one, so the accumulated loop input at any
//!   later sub-step is exactly what the feedback edge carried there;
//! - the body's output is **fed back** into its own input with the sub-step
//!   advanced by one;
//! - **egress** strips the extra coordinate on the way out.
//!
//! Termination is a frontier argument, not a reachability one: the feedback
//! operator watches, per outer version, for frontier advances that carry no
//! new data. After [`EMPTY_ROUND_THRESHOLD`] such rounds it stops extending
//! the frontier for that outer version, the scope's frontier passes it, and
//! every downstream consumer sees the outer version complete.

use crate::dataflow::DeltaStream;
use crate::graph::{Message, Operator, OperatorId, StreamWriter, UnaryCore};
use crate::multiset::Data;
use crate::order::{Antichain, Version};
use std::collections::{HashMap, HashSet};

/// Consecutive data-free frontier advances the feedback edge tolerates for
/// an outer version before letting the loop close on it.
pub(crate) const EMPTY_ROUND_THRESHOLD: u32 = 3;

pub(crate) struct IngressOperator<T> {
    core: UnaryCore<T, T>,
}

impl<T> IngressOperator<T> {
    pub(crate) fn new(core: UnaryCore<T, T>) -> Self {
        Self { core }
    }
}

impl<T: Data> Operator for IngressOperator<T> {
    fn id(&self) -> OperatorId {
        self.core.id
    }

    fn name(&self) -> &'static str {
        "ingress"
    }

    fn pending_work(&self) -> bool {
        self.core.pending_work()
    }

    fn run(&mut self) {
        for message in self.core.drain() {
            match message {
                Message::Data { version, collection } => {
                    let entered = version.extend();
                    self.core.send_data(entered.clone(), collection.clone());
                    // Retract at the next sub-step: from there on the loop
                    // input is whatever the feedback edge carries.
                    self.core.send_data(entered.apply_step(1), collection.negate());
                }
                Message::Frontier(frontier) => self.core.note_input_frontier(frontier),
            }
        }
        let extended = self.core.input_frontier().extend();
        if self.core.output_frontier != extended {
            self.core.output_frontier = extended.clone();
            self.core.output.send_frontier(extended);
        }
    }
}

pub(crate) struct EgressOperator<T> {
    core: UnaryCore<T, T>,
}

impl<T> EgressOperator<T> {
    pub(crate) fn new(core: UnaryCore<T, T>) -> Self {
        Self { core }
    }
}

impl<T: Data> Operator for EgressOperator<T> {
    fn id(&self) -> OperatorId {
        self.core.id
    }

    fn name(&self) -> &'static str {
        "egress"
    }

    fn pending_work(&self) -> bool {
        self.core.pending_work()
    }

    fn run(&mut self) {
        for message in self.core.drain() {
            match message {
                Message::Data { version, collection } => {
                    self.core.send_data(version.truncate(), collection);
                }
                Message::Frontier(frontier) => self.core.note_input_frontier(frontier),
            }
        }
        let truncated = self.core.input_frontier().truncate();
        if self.core.output_frontier != truncated {
            self.core.output_frontier = truncated.clone();
            self.core.output.send_frontier(truncated);
        }
    }
}

pub(crate) struct FeedbackOperator<T> {
    core: UnaryCore<T, T>,
    step: u64,
    /// Data-free frontier advances observed per outer version.
    empty_rounds: HashMap<Version, u32>,
    /// The frontier element last observed per outer version; an empty round
    /// only counts when the element actually moved.
    last_seen: HashMap<Version, Version>,
}

impl<T> FeedbackOperator<T> {
    pub(crate) fn new(core: UnaryCore<T, T>, step: u64) -> Self {
        Self { core, step, empty_rounds: HashMap::new(), last_seen: HashMap::new() }
    }
}

impl<T: Data> Operator for FeedbackOperator<T> {
    fn id(&self) -> OperatorId {
        self.core.id
    }

    fn name(&self) -> &'static str {
        "feedback"
    }

    fn pending_work(&self) -> bool {
        self.core.pending_work()
    }

    fn run(&mut self) {
        let mut saw_data: HashSet<Version> = HashSet::new();
        for message in self.core.drain() {
            match message {
                Message::Data { version, collection } => {
                    saw_data.insert(version.truncate());
                    self.core.send_data(version.apply_step(self.step), collection);
                }
                Message::Frontier(frontier) => self.core.note_input_frontier(frontier),
            }
        }

        let mut kept: Vec<Version> = Vec::new();
        let mut next_seen: HashMap<Version, Version> = HashMap::new();
        for element in self.core.input_frontier().elements() {
            let outer = element.truncate();
            let moved = self.last_seen.get(&outer) != Some(element);
            next_seen.insert(outer.clone(), element.clone());
            if saw_data.contains(&outer) {
                self.empty_rounds.remove(&outer);
                kept.push(element.apply_step(self.step));
                continue;
            }
            let rounds = self.empty_rounds.entry(outer).or_insert(0);
            if moved {
                *rounds += 1;
            }
            if *rounds < EMPTY_ROUND_THRESHOLD {
                kept.push(element.apply_step(self.step));
            }
        }
        self.last_seen = next_seen;
        let seen = &self.last_seen;
        self.empty_rounds.retain(|outer, _| seen.contains_key(outer));

        let candidate = Antichain::new(kept);
        if self.core.output_frontier != candidate {
            self.core.output_frontier = candidate.clone();
            self.core.output.send_frontier(candidate);
        }
    }
}

impl<T: Data> DeltaStream<T> {
    /// Feed this stream through `body` inside an iteration scope,
    /// concatenating the body's output back into its input, until successive
    /// passes produce no new data.
    ///
    /// The body builds on the stream it is given; the value it returns is
    /// both the feedback and what leaves the scope. Outer consumers observe
    /// an outer version as complete only once the inner fixpoint for it has
    /// been reached.
    ///
    /// # Example
    /// ```
    /// use deltaflow::{BatchFlow, Multiset};
    ///
    /// # fn main() -> anyhow::Result<()> {
    /// let flow = BatchFlow::new();
    /// let (input, seed) = flow.new_input::<i64>();
    /// // All powers of two up to 50.
    /// let powers = seed.iterate(|inner| {
    ///     inner
    ///         .map(|x| x * 2)
    ///         .concat(inner)
    ///         .filter(|x| *x <= 50)
    ///         .distinct()
    /// });
    /// # let _sink = powers.subscribe();
    /// # flow.finalize()?;
    /// input.send(Multiset::from(vec![(1, 1)]))?;
    /// flow.run()?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn iterate(&self, body: impl FnOnce(&DeltaStream<T>) -> DeltaStream<T>) -> DeltaStream<T> {
        let (outer_frontier, inner_frontier) = {
            let mut graph = self.flow.lock();
            let outer = graph.scope_frontier();
            let inner = outer.extend();
            graph.frontier_stack.push(inner.clone());
            (outer, inner)
        };

        let entered = self.add_unary_scoped(inner_frontier.clone(), IngressOperator::new);

        // The feedback edge exists before the operator that fills it, so the
        // body can be wired against it. It never carries data at sub-step
        // zero, so it starts one step ahead of the scope — without this the
        // first sub-step could never complete.
        let feedback_writer = StreamWriter::new(inner_frontier.apply_step(1));
        let feedback_stream =
            DeltaStream { flow: self.flow.clone(), writer: feedback_writer.clone() };
        let looped = entered.concat(&feedback_stream);
        let result = body(&looped);

        {
            let mut graph = self.flow.lock();
            let id = graph.alloc_id();
            let core = UnaryCore::new(
                id,
                result.writer.subscribe(),
                feedback_writer.clone(),
                result.writer.frontier(),
                inner_frontier.apply_step(1),
            );
            let operator = FeedbackOperator::new(core, 1);
            let endpoint = feedback_writer;
            graph.register_endpoint(
                format!("feedback ({id:?})"),
                Box::new(move || endpoint.reader_count()),
            );
            graph.add_operator(Box::new(operator));
            graph.frontier_stack.pop();
        }

        result.add_unary_scoped(outer_frontier, EgressOperator::new)
    }
}
