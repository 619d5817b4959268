use deltaflow::{Antichain, Index, Multiset, Version, VersionedIndex};

#[test]
fn add_get_and_compact() {
    let mut index: Index<&str, i64> = Index::new();
    index.add("a", (10, 1));
    index.add("a", (10, 2));
    index.add("a", (20, 1));
    index.add("b", (30, 1));
    index.add("b", (30, -1));

    assert_eq!(index.get(&"a").len(), 3);
    index.compact(None);
    assert_eq!(index.get(&"a"), &[(10, 3), (20, 1)]);
    // b cancelled out entirely and its key is gone.
    assert!(index.get(&"b").is_empty());
    assert_eq!(index.key_count(), 1);
}

#[test]
fn compact_restricts_to_requested_keys() {
    let mut index: Index<&str, i64> = Index::new();
    index.add("a", (1, 1));
    index.add("a", (1, 1));
    index.add("b", (2, 1));
    index.add("b", (2, 1));

    index.compact(Some(&["a"]));
    assert_eq!(index.get(&"a"), &[(1, 2)]);
    assert_eq!(index.get(&"b").len(), 2);
}

#[test]
fn join_multiplies_multiplicities_per_key() {
    let mut left: Index<&str, &str> = Index::new();
    left.add("k", ("a", 2));
    left.add("k", ("b", 1));
    left.add("only-left", ("c", 1));
    let mut right: Index<&str, i64> = Index::new();
    right.add("k", (10, 1));
    right.add("k", (20, -1));

    let product = left.join(&right).consolidate();
    let expected = Multiset::from(vec![
        (("k", ("a", 10)), 2),
        (("k", ("a", 20)), -2),
        (("k", ("b", 10)), 1),
        (("k", ("b", 20)), -1),
    ])
    .consolidate();
    assert_eq!(product, expected);
}

#[test]
fn join_result_is_independent_of_which_side_is_larger() {
    // The smaller index drives the outer loop; the observable result must
    // not depend on it.
    let mut small: Index<i64, &str> = Index::new();
    small.add(1, ("x", 1));
    let mut large: Index<i64, &str> = Index::new();
    large.add(1, ("a", 1));
    large.add(2, ("b", 1));
    large.add(3, ("c", 1));

    let one_way = small.join(&large).consolidate();
    let other_way: Multiset<(i64, (&str, &str))> = large
        .join(&small)
        .map(|(key, (a, b))| (key, (b, a)))
        .consolidate();
    assert_eq!(one_way, other_way);
}

#[test]
fn reconstruct_at_sees_only_earlier_versions() {
    let mut index: VersionedIndex<&str, i64> = VersionedIndex::new();
    index.add("k", &Version::from(0), (1, 1));
    index.add("k", &Version::from(1), (2, 1));
    index.add("k", &Version::from(2), (1, -1));

    assert_eq!(index.reconstruct_at(&"k", &Version::from(0)), vec![(1, 1)]);
    assert_eq!(index.reconstruct_at(&"k", &Version::from(1)), vec![(1, 1), (2, 1)]);
    assert_eq!(index.reconstruct_at(&"k", &Version::from(2)), vec![(2, 1)]);
    assert!(index.reconstruct_at(&"missing", &Version::from(9)).is_empty());
}

#[test]
fn versions_enumerates_per_key() {
    let mut index: VersionedIndex<&str, i64> = VersionedIndex::new();
    index.add("k", &Version::from(0), (1, 1));
    index.add("k", &Version::from(3), (2, 1));
    let mut versions = index.versions(&"k");
    versions.sort_by(|a, b| a.lex_cmp(b));
    assert_eq!(versions, vec![Version::from(0), Version::from(3)]);
    assert!(index.versions(&"other").is_empty());
}

#[test]
fn versioned_join_stamps_the_join_of_versions() {
    let mut left: VersionedIndex<&str, &str> = VersionedIndex::new();
    left.add("k", &Version::from([0, 1]), ("a", 1));
    let mut right: VersionedIndex<&str, &str> = VersionedIndex::new();
    right.add("k", &Version::from([1, 0]), ("x", 1));

    let results = left.join(&right);
    assert_eq!(results.len(), 1);
    let (version, collection) = &results[0];
    assert_eq!(*version, Version::from([1, 1]));
    assert_eq!(
        collection.clone().consolidate(),
        Multiset::from(vec![(("k", ("a", "x")), 1)])
    );
}

#[test]
fn compaction_preserves_reconstruction_at_covered_versions() {
    let mut index: VersionedIndex<&str, i64> = VersionedIndex::new();
    index.add("k", &Version::from(0), (1, 1));
    index.add("k", &Version::from(1), (1, 1));
    index.add("k", &Version::from(1), (2, -1));
    index.add("k", &Version::from(2), (2, 1));

    let frontier = Antichain::from(Version::from(2));
    let before = index.reconstruct_at(&"k", &Version::from(5));
    index.compact(&frontier, None);
    let after = index.reconstruct_at(&"k", &Version::from(5));
    assert_eq!(before, after);
    // Both closed versions folded into the frontier version.
    assert_eq!(index.versions(&"k"), vec![Version::from(2)]);
}

#[test]
fn compaction_drops_cancelled_keys() {
    let mut index: VersionedIndex<&str, i64> = VersionedIndex::new();
    index.add("k", &Version::from(0), (1, 1));
    index.add("k", &Version::from(1), (1, -1));
    index.compact(&Antichain::from(Version::from(2)), None);
    assert!(index.is_empty());
}
