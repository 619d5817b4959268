use deltaflow::testing::*;
use deltaflow::{LazyMultiset, Multiset};

#[test]
fn consolidate_sums_and_drops_zeros() {
    let deltas = Multiset::from(vec![(2, 1), (1, 2), (2, -1), (3, 0), (1, 1)]);
    let canonical = deltas.consolidate();
    assert_eq!(canonical, Multiset::from(vec![(1, 3)]));
    assert_canonical(&canonical);
}

#[test]
fn consolidate_is_idempotent() {
    let deltas = Multiset::from(vec![(5, 2), (1, -1), (5, -2), (9, 4)]);
    let once = deltas.consolidate();
    let twice = once.clone().consolidate();
    assert_eq!(once, twice);
}

#[test]
fn negate_is_an_involution() {
    let deltas = Multiset::from(vec![(1, 1), (2, -3), (3, 2)]);
    assert_multisets_equal(&deltas.clone().negate().negate(), &deltas);
}

#[test]
fn concat_commutes_up_to_consolidation() {
    let left = Multiset::from(vec![(1, 1), (2, 2)]);
    let right = Multiset::from(vec![(2, -1), (3, 1)]);
    assert_multisets_equal(
        &left.clone().concat(right.clone()),
        &right.concat(left),
    );
}

#[test]
fn map_composes_on_values() {
    let deltas = Multiset::from(vec![(1, 1), (2, -2)]);
    let composed = deltas.clone().map(|x| (x * 2) + 1);
    let chained = deltas.map(|x| x * 2).map(|x| x + 1);
    assert_multisets_equal(&composed, &chained);
}

#[test]
fn map_preserves_multiplicities() {
    let deltas = Multiset::from(vec![(1, 5), (2, -3)]);
    let mapped = deltas.map(|_| "same");
    assert_multisets_equal(&mapped, &Multiset::from(vec![("same", 2)]));
}

#[test]
fn filter_drops_failing_values_only() {
    let deltas = Multiset::from(vec![(1, 1), (2, -2), (3, 1)]);
    let kept = deltas.filter(|x| x % 2 == 1);
    assert_multisets_equal(&kept, &Multiset::from(vec![(1, 1), (3, 1)]));
}

#[test]
fn retractions_cancel_under_accumulation() {
    let mut total = Multiset::new();
    total.extend(Multiset::from(vec![(1, 1), (2, 1)]).into_entries());
    total.extend(Multiset::from(vec![(1, -1), (2, -1)]).into_entries());
    assert_accumulates_to_nothing(&total);
}

#[test]
fn lazy_algebra_matches_strict() {
    let source = Multiset::from(vec![(1, 1), (2, 2), (3, -1), (10, 1)]);
    let strict = source
        .clone()
        .map(|x| x * 3)
        .filter(|x| *x < 10)
        .negate()
        .consolidate();
    let lazy = LazyMultiset::from(source)
        .map(|x| x * 3)
        .filter(|x| *x < 10)
        .negate()
        .consolidate();
    assert_eq!(strict, lazy);
}

#[test]
fn lazy_concat_defers_both_sides() {
    let left = LazyMultiset::from(Multiset::from(vec![(1, 1)]));
    let right = LazyMultiset::from(Multiset::from(vec![(2, 1)]));
    let merged = left.concat(right).materialize();
    assert_multisets_equal(&merged, &Multiset::from(vec![(1, 1), (2, 1)]));
}

#[test]
fn builder_shapes_deltas() {
    let deltas = MultisetBuilder::new()
        .insert("a")
        .insert("a")
        .retract("b")
        .with_multiplicity("c", 3)
        .build();
    assert_multisets_equal(
        &deltas,
        &Multiset::from(vec![("a", 2), ("b", -1), ("c", 3)]),
    );
}
