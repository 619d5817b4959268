//! Assertion functions for comparing delta collections.
//!
//! Collections are compared **up to consolidation**: two multisets are the
//! same collection when their canonical forms are equal, whatever order or
//! fragmentation their entries arrived in.

use crate::multiset::{Data, Multiset};
use std::fmt::Debug;

/// Assert that two collections are equal after consolidation.
///
/// # Panics
///
/// Panics with both canonical forms if they differ.
///
/// # Example
///
/// ```
/// use deltaflow::Multiset;
/// use deltaflow::testing::assert_multisets_equal;
///
/// let actual = Multiset::from(vec![(2, 1), (1, 2), (2, -1)]);
/// let expected = Multiset::from(vec![(1, 2)]);
/// assert_multisets_equal(&actual, &expected);
/// ```
pub fn assert_multisets_equal<T: Data + Debug>(actual: &Multiset<T>, expected: &Multiset<T>) {
    let actual = actual.clone().consolidate();
    let expected = expected.clone().consolidate();
    assert_eq!(
        actual, expected,
        "Collections differ after consolidation:\n  Expected: {expected:?}\n  Actual: {actual:?}"
    );
}

/// Assert that a collection is already canonical: no duplicate values, no
/// zero multiplicities.
///
/// # Panics
///
/// Panics with the offending collection if it is not canonical.
pub fn assert_canonical<T: Data + Debug>(collection: &Multiset<T>) {
    assert!(
        collection.is_canonical(),
        "Collection is not canonical: {collection:?}\n  Consolidated: {:?}",
        collection.clone().consolidate()
    );
}

/// Assert that a collection consolidates to nothing.
///
/// # Panics
///
/// Panics with the canonical form if anything survives consolidation.
pub fn assert_accumulates_to_nothing<T: Data + Debug>(collection: &Multiset<T>) {
    let consolidated = collection.clone().consolidate();
    assert!(
        consolidated.is_empty(),
        "Collection does not cancel out:\n  Canonical form: {consolidated:?}"
    );
}

/// Assert that every accumulated multiplicity is exactly one — the shape of
/// a presence (distinct) output.
///
/// # Panics
///
/// Panics with the canonical form if any value accumulates to anything but
/// one.
pub fn assert_all_unit_multiplicities<T: Data + Debug>(collection: &Multiset<T>) {
    let consolidated = collection.clone().consolidate();
    for (value, multiplicity) in consolidated.iter() {
        assert_eq!(
            *multiplicity, 1,
            "Value {value:?} accumulates to {multiplicity}, expected 1:\n  Full collection: {consolidated:?}"
        );
    }
}
