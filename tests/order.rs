use deltaflow::{Antichain, Version};

#[test]
fn versions_order_pointwise() {
    let low = Version::from([0, 1]);
    let high = Version::from([1, 1]);
    let sideways = Version::from([1, 0]);

    assert!(low.less_equal(&high));
    assert!(low.less_than(&high));
    assert!(!low.less_equal(&sideways));
    assert!(!sideways.less_equal(&low));
    assert!(low.less_equal(&low));
    assert!(!low.less_than(&low));
}

#[test]
fn join_and_meet_are_pointwise_extrema() {
    let a = Version::from([0, 3]);
    let b = Version::from([2, 1]);
    assert_eq!(a.join(&b), Version::from([2, 3]));
    assert_eq!(a.meet(&b), Version::from([0, 1]));
    // Lattice laws on a sample.
    assert_eq!(a.join(&a), a);
    assert_eq!(a.meet(&a), a);
    assert_eq!(a.join(&b), b.join(&a));
}

#[test]
fn extend_truncate_and_step() {
    let outer = Version::from([3]);
    let inner = outer.extend();
    assert_eq!(inner, Version::from([3, 0]));
    assert_eq!(inner.apply_step(2), Version::from([3, 2]));
    assert_eq!(inner.apply_step(5).truncate(), outer);
}

#[test]
#[should_panic]
fn comparing_across_dimensions_is_a_bug() {
    let _ = Version::from([1]).less_equal(&Version::from([1, 0]));
}

#[test]
fn antichain_keeps_only_minimal_elements() {
    let frontier = Antichain::new(vec![
        Version::from([2, 0]),
        Version::from([0, 1]),
        Version::from([2, 1]), // dominated by both of the above
        Version::from([0, 1]), // duplicate
    ]);
    assert_eq!(frontier.elements().len(), 2);
    assert!(frontier.covers(&Version::from([2, 1])));
}

#[test]
fn covers_means_data_may_still_arrive() {
    let frontier = Antichain::from(Version::from([1, 1]));
    assert!(frontier.covers(&Version::from([1, 1])));
    assert!(frontier.covers(&Version::from([5, 9])));
    assert!(!frontier.covers(&Version::from([0, 9])));
    assert!(!frontier.covers(&Version::from([9, 0])));
}

#[test]
fn the_empty_frontier_covers_nothing() {
    let top = Antichain::empty();
    assert!(top.is_empty());
    assert!(!top.covers(&Version::from([0])));
    // Everything is less-equal the top of the lattice.
    assert!(Antichain::from(Version::from([7])).less_equal(&top));
}

#[test]
fn frontier_dominance_orders_progress() {
    let earlier = Antichain::from(Version::from([1]));
    let later = Antichain::from(Version::from([4]));
    assert!(earlier.less_equal(&later));
    assert!(!later.less_equal(&earlier));
    assert!(earlier.less_equal(&earlier));
}

#[test]
fn meet_of_frontiers_is_their_union_minimized() {
    let a = Antichain::from(Version::from([2, 0]));
    let b = Antichain::from(Version::from([0, 3]));
    let meet = a.meet(&b);
    assert_eq!(meet.elements().len(), 2);
    assert!(meet.less_equal(&a));
    assert!(meet.less_equal(&b));
    // Meet with a dominated frontier collapses back.
    let dominated = Antichain::from(Version::from([5, 5]));
    assert_eq!(a.meet(&dominated), a);
}

#[test]
fn advance_by_moves_to_the_earliest_indistinguishable_version() {
    let version = Version::from([0, 5]);
    let frontier = Antichain::new(vec![Version::from([1, 0]), Version::from([0, 3])]);
    assert_eq!(version.advance_by(&frontier), Version::from([0, 5]));

    let early = Version::from([0, 1]);
    assert_eq!(early.advance_by(&Antichain::from(Version::from([2, 2]))), Version::from([2, 2]));

    // An empty frontier leaves versions alone.
    assert_eq!(early.advance_by(&Antichain::empty()), early);
}

#[test]
fn advance_by_preserves_visibility_at_covered_versions() {
    // For any version still covered by the frontier, advancing an older
    // version must not change whether it is visible.
    let frontier = Antichain::new(vec![Version::from([2, 0]), Version::from([0, 2])]);
    let olds = [Version::from([0, 0]), Version::from([1, 0]), Version::from([0, 1])];
    let probes = [Version::from([2, 0]), Version::from([0, 2]), Version::from([3, 3])];
    for old in &olds {
        let advanced = old.advance_by(&frontier);
        for probe in &probes {
            assert!(frontier.covers(probe));
            assert_eq!(old.less_equal(probe), advanced.less_equal(probe));
        }
    }
}

#[test]
fn scope_maps_apply_elementwise() {
    let frontier = Antichain::new(vec![Version::from([1, 2]), Version::from([0, 4])]);
    assert_eq!(
        frontier.extend().elements(),
        &[Version::from([0, 4, 0]), Version::from([1, 2, 0])]
    );
    assert_eq!(frontier.apply_step(1).elements().len(), 2);
    // Truncation can collapse elements that only differed innermost.
    let collapsing = Antichain::new(vec![Version::from([1, 0]), Version::from([1, 3])]);
    assert_eq!(collapsing.elements().len(), 1);
}
