//! Ordered slices per key: `top_k` and its variants.
//!
//! `top_k` is a specialized reduce: the bag of values under a key is
//! expanded by multiplicity, sorted by the user comparator (ties broken by
//! the value's own order so slicing is deterministic), and cut to
//! `[offset, offset + limit)`. The positional and predecessor-reference
//! variants ride the same reduce machinery — the reduce delta discipline
//! already emits only the entries whose attachment changed.
//!
//! `top_k_with_fractional_index` keeps its own operator: the emitted index
//! strings must survive rearrangement with minimal churn, so the operator
//! remembers the arrangement it last emitted per key and diffs against it,
//! reusing existing indices wherever an element's position is undisturbed
//! and freed indices where a slot changed hands. Sorting the emitted
//! `(value, index)` pairs by index always reproduces the comparator order.
//!
//! The `order_by` family applies the same operators to non-keyed streams by
//! routing everything through a unit key.

use crate::dataflow::DeltaStream;
use crate::fractional::key_between;
use crate::graph::{Message, Operator, OperatorId, UnaryCore};
use crate::indexes::VersionedIndex;
use crate::multiset::{Data, Multiset};
use crate::order::Version;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet, VecDeque};

/// Expand a consolidated bag by multiplicity, sort, and slice.
fn sorted_slice<V, C>(values: &[(V, i64)], cmp: &C, offset: usize, limit: usize) -> Vec<V>
where
    V: Data,
    C: Fn(&V, &V) -> Ordering + ?Sized,
{
    let mut expanded: Vec<&V> = Vec::new();
    for (value, multiplicity) in values {
        for _ in 0..*multiplicity {
            expanded.push(value);
        }
    }
    expanded.sort_by(|a, b| cmp(a, b).then_with(|| a.cmp(b)));
    expanded.into_iter().skip(offset).take(limit).cloned().collect()
}

impl<K: Data, V: Data> DeltaStream<(K, V)> {
    /// Within each key group, keep only the `[offset, offset + limit)` slice
    /// of the values under `cmp`. Ties are broken by the value's own order.
    pub fn top_k(
        &self,
        cmp: impl Fn(&V, &V) -> Ordering + Send + 'static,
        limit: usize,
        offset: usize,
    ) -> DeltaStream<(K, V)> {
        self.reduce(move |values| {
            let slice = sorted_slice(values, &cmp, offset, limit);
            let mut out: Vec<(V, i64)> = Vec::new();
            for value in slice {
                match out.last_mut() {
                    Some((last, multiplicity)) if *last == value => *multiplicity += 1,
                    _ => out.push((value, 1)),
                }
            }
            out
        })
    }

    /// Like [`top_k`](Self::top_k), attaching each value's position in the
    /// sorted group (counting from the start of the group, so the first
    /// emitted element carries `offset`).
    pub fn top_k_with_index(
        &self,
        cmp: impl Fn(&V, &V) -> Ordering + Send + 'static,
        limit: usize,
        offset: usize,
    ) -> DeltaStream<(K, (V, usize))> {
        self.reduce(move |values| {
            sorted_slice(values, &cmp, offset, limit)
                .into_iter()
                .enumerate()
                .map(|(position, value)| ((value, offset + position), 1))
                .collect()
        })
    }

    /// Like [`top_k`](Self::top_k), attaching to each value a reference to
    /// its predecessor in the slice (`None` for the first element), so a
    /// consumer can maintain an intrusive linked list. Only elements whose
    /// predecessor changed are re-emitted.
    pub fn top_k_with_previous_ref(
        &self,
        cmp: impl Fn(&V, &V) -> Ordering + Send + 'static,
        limit: usize,
        offset: usize,
    ) -> DeltaStream<(K, (V, Option<V>))> {
        self.reduce(move |values| {
            let slice = sorted_slice(values, &cmp, offset, limit);
            let mut out = Vec::with_capacity(slice.len());
            let mut previous: Option<V> = None;
            for value in slice {
                out.push(((value.clone(), previous.replace(value)), 1));
            }
            out
        })
    }

    /// Like [`top_k`](Self::top_k), attaching a string index whose
    /// lexicographic order agrees with the comparator order. Indices are
    /// stable: an element whose position did not change keeps its index, a
    /// slot that changed hands reuses the freed index, and only genuinely
    /// new positions receive freshly generated indices.
    pub fn top_k_with_fractional_index(
        &self,
        cmp: impl Fn(&V, &V) -> Ordering + Send + 'static,
        limit: usize,
        offset: usize,
    ) -> DeltaStream<(K, (V, String))> {
        self.add_unary(|core| TopKFractionalOperator {
            core,
            cmp,
            limit,
            offset,
            index: VersionedIndex::new(),
            keys_todo: HashMap::new(),
            arrangements: HashMap::new(),
        })
    }
}

impl<V: Data> DeltaStream<V> {
    /// [`top_k`](DeltaStream::top_k) over the whole stream as one group.
    pub fn order_by(
        &self,
        cmp: impl Fn(&V, &V) -> Ordering + Send + 'static,
        limit: usize,
        offset: usize,
    ) -> DeltaStream<V> {
        self.map(|value| ((), value.clone()))
            .top_k(cmp, limit, offset)
            .map(|(_, value)| value.clone())
    }

    /// [`top_k_with_index`](DeltaStream::top_k_with_index) over the whole
    /// stream as one group.
    pub fn order_by_with_index(
        &self,
        cmp: impl Fn(&V, &V) -> Ordering + Send + 'static,
        limit: usize,
        offset: usize,
    ) -> DeltaStream<(V, usize)> {
        self.map(|value| ((), value.clone()))
            .top_k_with_index(cmp, limit, offset)
            .map(|(_, entry)| entry.clone())
    }

    /// [`top_k_with_fractional_index`](DeltaStream::top_k_with_fractional_index)
    /// over the whole stream as one group.
    pub fn order_by_with_fractional_index(
        &self,
        cmp: impl Fn(&V, &V) -> Ordering + Send + 'static,
        limit: usize,
        offset: usize,
    ) -> DeltaStream<(V, String)> {
        self.map(|value| ((), value.clone()))
            .top_k_with_fractional_index(cmp, limit, offset)
            .map(|(_, entry)| entry.clone())
    }
}

pub(crate) struct TopKFractionalOperator<K, V, C> {
    core: UnaryCore<(K, V), (K, (V, String))>,
    cmp: C,
    limit: usize,
    offset: usize,
    index: VersionedIndex<K, V>,
    keys_todo: HashMap<Version, HashSet<K>>,
    /// The `(value, index)` slice last emitted per key, in order.
    arrangements: HashMap<K, Vec<(V, String)>>,
}

impl<K, V, C> Operator for TopKFractionalOperator<K, V, C>
where
    K: Data,
    V: Data,
    C: Fn(&V, &V) -> Ordering + Send + 'static,
{
    fn id(&self) -> OperatorId {
        self.core.id
    }

    fn name(&self) -> &'static str {
        "top_k_with_fractional_index"
    }

    fn pending_work(&self) -> bool {
        self.core.pending_work()
    }

    fn run(&mut self) {
        for message in self.core.drain() {
            match message {
                Message::Data { version, collection } => {
                    for ((key, value), multiplicity) in collection {
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
            for key in keys {
                let bag = self.index.reconstruct_at(&key, &version);
                let next = sorted_slice(&bag, &self.cmp, self.offset, self.limit);
                let previous = self.arrangements.remove(&key).unwrap_or_default();
                let (changes, arrangement) = rearrange(previous, next);
                for (entry, multiplicity) in changes {
                    delta.push((key.clone(), entry), multiplicity);
                }
                if !arrangement.is_empty() {
                    self.arrangements.insert(key.clone(), arrangement);
                }
            }
            self.core.send_data(version, delta.consolidate());
        }

        if self.core.sync_frontier() {
            let frontier = self.core.input_frontier().clone();
            self.index.compact(&frontier, None);
        }
    }
}

/// Diff a freshly sorted slice against the previously emitted arrangement.
///
/// Returns the `(value, index)` deltas to emit and the new arrangement.
/// Elements whose position is undisturbed keep their index and emit
/// nothing; an element replacing a departed occupant of the same slot
/// reuses the freed index; everything else gets a fresh index generated
/// between its final neighbors.
fn rearrange<V: Data>(
    previous: Vec<(V, String)>,
    next: Vec<V>,
) -> (Vec<((V, String), i64)>, Vec<(V, String)>) {
    // Pair each new position with the old slot holding the same value, first
    // occurrence first.
    let mut old_slots: HashMap<&V, VecDeque<usize>> = HashMap::new();
    for (slot, (value, _)) in previous.iter().enumerate() {
        old_slots.entry(value).or_default().push_back(slot);
    }
    let matched: Vec<Option<usize>> = next
        .iter()
        .map(|value| old_slots.get_mut(value).and_then(VecDeque::pop_front))
        .collect();

    // The largest set of matched elements whose old indices already appear
    // in the new order keep their indices; everything else is reassigned.
    let kept_positions = longest_increasing_chain(&matched);
    let kept_old_slots: HashSet<usize> =
        kept_positions.iter().map(|position| matched[*position].expect("kept implies matched")).collect();

    // For every position, the nearest kept index at or after it bounds any
    // index assigned there from above.
    let mut upper_bounds: Vec<Option<String>> = vec![None; next.len()];
    let mut bound: Option<String> = None;
    for position in (0..next.len()).rev() {
        upper_bounds[position] = bound.clone();
        if kept_positions.contains(&position) {
            bound = Some(previous[matched[position].expect("kept implies matched")].1.clone());
        }
    }

    let mut assigned: Vec<String> = Vec::with_capacity(next.len());
    let mut lower: Option<String> = None;
    for position in 0..next.len() {
        let index = if kept_positions.contains(&position) {
            previous[matched[position].expect("kept implies matched")].1.clone()
        } else {
            let upper = upper_bounds[position].as_deref();
            let reusable = (position < previous.len() && !kept_old_slots.contains(&position))
                .then(|| previous[position].1.clone())
                .filter(|candidate| {
                    lower.as_deref().is_none_or(|low| low < candidate.as_str())
                        && upper.is_none_or(|high| candidate.as_str() < high)
                });
            reusable.unwrap_or_else(|| key_between(lower.as_deref(), upper))
        };
        lower = Some(index.clone());
        assigned.push(index);
    }

    let mut changes: Vec<((V, String), i64)> = Vec::new();
    for (slot, (value, index)) in previous.into_iter().enumerate() {
        if !kept_old_slots.contains(&slot) {
            changes.push(((value, index), -1));
        }
    }
    let arrangement: Vec<(V, String)> = next.into_iter().zip(assigned).collect();
    for (position, (value, index)) in arrangement.iter().enumerate() {
        if !kept_positions.contains(&position) {
            changes.push(((value.clone(), index.clone()), 1));
        }
    }
    (changes, arrangement)
}

/// Positions of a longest chain of matched old slots in increasing order.
fn longest_increasing_chain(matched: &[Option<usize>]) -> HashSet<usize> {
    let count = matched.len();
    let mut length = vec![0usize; count];
    let mut parent = vec![usize::MAX; count];
    let mut best: Option<usize> = None;
    for i in 0..count {
        let Some(slot_i) = matched[i] else { continue };
        length[i] = 1;
        for j in 0..i {
            let Some(slot_j) = matched[j] else { continue };
            if slot_j < slot_i && length[j] + 1 > length[i] {
                length[i] = length[j] + 1;
                parent[i] = j;
            }
        }
        if best.is_none_or(|b| length[i] > length[b]) {
            best = Some(i);
        }
    }
    let mut kept = HashSet::new();
    let mut cursor = best;
    while let Some(position) = cursor {
        kept.insert(position);
        cursor = (parent[position] != usize::MAX).then(|| parent[position]);
    }
    kept
}
