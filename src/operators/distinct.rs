//! Multiplicity-to-presence: `distinct` and `distinct_by`.
//!
//! A value is *present* while its accumulated multiplicity is positive.
//! `distinct` maps every present value to multiplicity one, so the output
//! changes only when presence flips: `(value, +1)` when it becomes present,
//! `(value, -1)` when it stops being present, and silence otherwise. The
//! presence function is evaluated through the reduce machinery, which keeps
//! it correct at partially ordered versions inside iteration scopes; the
//! reduce delta discipline *is* the sign-transition emission.

use crate::dataflow::DeltaStream;
use crate::multiset::Data;

impl<T: Data> DeltaStream<T> {
    /// Collapse multiplicities to presence: every value with positive
    /// accumulated multiplicity appears exactly once in the accumulated
    /// output.
    ///
    /// # Example
    /// ```
    /// use deltaflow::{BatchFlow, Multiset};
    ///
    /// # fn main() -> anyhow::Result<()> {
    /// let flow = BatchFlow::new();
    /// let (input, values) = flow.new_input::<i64>();
    /// let present = values.distinct();
    /// # let _sink = present.subscribe();
    /// # flow.finalize()?;
    /// input.send(Multiset::from(vec![(7, 3), (8, 1), (8, -1)]))?;
    /// flow.run()?;
    /// // accumulated output: {7: +1}
    /// # Ok(())
    /// # }
    /// ```
    pub fn distinct(&self) -> DeltaStream<T> {
        self.map(|value| (value.clone(), ()))
            .reduce(|values| {
                let total: i64 = values.iter().map(|(_, multiplicity)| multiplicity).sum();
                if total > 0 { vec![((), 1)] } else { Vec::new() }
            })
            .map(|(value, _)| value.clone())
    }

    /// Presence under a user-supplied equivalence key: while any member of a
    /// class is present, the class contributes its smallest present member,
    /// once.
    pub fn distinct_by<K: Data>(&self, key: impl Fn(&T) -> K + Send + 'static) -> DeltaStream<T> {
        self.map(move |value| (key(value), value.clone()))
            .reduce(|values| {
                values
                    .iter()
                    .filter(|(_, multiplicity)| *multiplicity > 0)
                    .map(|(value, _)| value)
                    .min()
                    .map(|value| (value.clone(), 1))
                    .into_iter()
                    .collect()
            })
            .map(|(_, value)| value.clone())
    }
}
