use deltaflow::testing::*;
use deltaflow::{BatchFlow, Multiset};
use std::collections::HashMap;

fn round_delta<T: deltaflow::Data + std::fmt::Debug>(out: &CapturedOutput<T>) -> Multiset<T> {
    let mut delta = Multiset::new();
    for (_, collection) in out.take_data() {
        delta.extend(collection.into_entries());
    }
    delta.consolidate()
}

#[test]
fn top_k_slices_each_key_group() -> anyhow::Result<()> {
    let flow = BatchFlow::new();
    let (input, pairs) = flow.new_input::<(&'static str, i64)>();

    let sliced = pairs.top_k(|a, b| a.cmp(b), 2, 1).capture();
    flow.finalize()?;

    input.send(
        KeyedDeltaBuilder::new()
            .insert("g", 5)
            .insert("g", 3)
            .insert("g", 8)
            .insert("g", 1)
            .insert("h", 7)
            .build(),
    )?;
    flow.run()?;
    // g sorts to [1, 3, 5, 8]; the [1, 3) slice is {3, 5}. h has nothing
    // beyond the offset.
    assert_multisets_equal(
        &sliced.accumulated(),
        &Multiset::from(vec![(("g", 3), 1), (("g", 5), 1)]),
    );

    input.send(KeyedDeltaBuilder::new().retract("g", 1).build())?;
    flow.run()?;
    assert_multisets_equal(
        &sliced.accumulated(),
        &Multiset::from(vec![(("g", 5), 1), (("g", 8), 1)]),
    );
    Ok(())
}

#[test]
fn top_k_expands_multiplicities_into_slots() -> anyhow::Result<()> {
    let flow = BatchFlow::new();
    let (input, pairs) = flow.new_input::<(&'static str, i64)>();

    let sliced = pairs.top_k(|a, b| a.cmp(b), 3, 0).capture();
    flow.finalize()?;

    input.send(
        KeyedDeltaBuilder::new()
            .with_multiplicity("k", 1, 2)
            .insert("k", 2)
            .insert("k", 3)
            .build(),
    )?;
    flow.run()?;
    // Slots are [1, 1, 2]; 3 falls off the end.
    assert_multisets_equal(
        &sliced.accumulated(),
        &Multiset::from(vec![(("k", 1), 2), (("k", 2), 1)]),
    );
    Ok(())
}

#[test]
fn top_k_with_index_attaches_positions() -> anyhow::Result<()> {
    let flow = BatchFlow::new();
    let (input, pairs) = flow.new_input::<(&'static str, i64)>();

    let positioned = pairs.top_k_with_index(|a, b| a.cmp(b), 2, 1).capture();
    flow.finalize()?;

    input.send(
        KeyedDeltaBuilder::new().insert("k", 30).insert("k", 10).insert("k", 20).build(),
    )?;
    flow.run()?;
    assert_multisets_equal(
        &positioned.accumulated(),
        &Multiset::from(vec![(("k", (20, 1)), 1), (("k", (30, 2)), 1)]),
    );
    Ok(())
}

#[test]
fn previous_refs_form_a_linked_list() -> anyhow::Result<()> {
    let flow = BatchFlow::new();
    let (input, pairs) = flow.new_input::<(&'static str, &'static str)>();

    let linked = pairs.top_k_with_previous_ref(|a, b| a.cmp(b), 10, 0).capture();
    flow.finalize()?;

    input.send(
        KeyedDeltaBuilder::new().insert("k", "a").insert("k", "b").insert("k", "c").build(),
    )?;
    flow.run()?;
    assert_multisets_equal(
        &linked.accumulated(),
        &Multiset::from(vec![
            (("k", ("a", None)), 1),
            (("k", ("b", Some("a"))), 1),
            (("k", ("c", Some("b"))), 1),
        ]),
    );

    // Appending at the end touches only the new element.
    linked.take_data();
    input.send(KeyedDeltaBuilder::new().insert("k", "d").build())?;
    flow.run()?;
    let delta = round_delta(&linked);
    assert_multisets_equal(&delta, &Multiset::from(vec![(("k", ("d", Some("c"))), 1)]));
    Ok(())
}

fn fractional_setup() -> anyhow::Result<(
    BatchFlow,
    deltaflow::BatchInput<&'static str>,
    CapturedOutput<(&'static str, String)>,
)> {
    let flow = BatchFlow::new();
    let (input, values) = flow.new_input::<&'static str>();
    let arranged = values
        .order_by_with_fractional_index(|a, b| a.cmp(b), usize::MAX, 0)
        .capture();
    flow.finalize()?;
    Ok((flow, input, arranged))
}

fn arrangement_of(out: &CapturedOutput<(&'static str, String)>) -> Vec<(String, &'static str)> {
    let mut pairs: Vec<(String, &'static str)> = out
        .accumulated()
        .into_entries()
        .into_iter()
        .map(|((value, index), multiplicity)| {
            assert_eq!(multiplicity, 1);
            (index, value)
        })
        .collect();
    pairs.sort();
    pairs
}

#[test]
fn fractional_indices_sort_like_the_comparator() -> anyhow::Result<()> {
    let (flow, input, arranged) = fractional_setup()?;

    input.send(Multiset::from(vec![("m", 1), ("c", 1), ("x", 1)]))?;
    flow.run()?;
    input.send(Multiset::from(vec![("a", 1), ("p", 1), ("c", -1)]))?;
    flow.run()?;

    let by_index: Vec<&str> = arrangement_of(&arranged).into_iter().map(|(_, v)| v).collect();
    let mut by_value = by_index.clone();
    by_value.sort();
    assert_eq!(by_index, by_value);
    assert_eq!(by_index, vec!["a", "m", "p", "x"]);
    Ok(())
}

#[test]
fn swapped_values_reuse_their_slots_indices() -> anyhow::Result<()> {
    let (flow, input, arranged) = fractional_setup()?;

    input.send(Multiset::from(vec![("a", 1), ("b", 1), ("c", 1), ("d", 1), ("e", 1)]))?;
    flow.run()?;
    let initial: HashMap<&str, String> = arrangement_of(&arranged)
        .into_iter()
        .map(|(index, value)| (value, index))
        .collect();
    arranged.take_data();

    // b and d are replaced in place: b+ still sorts into b's slot, d+ into
    // d's. Exactly four deltas, and both indices are reused.
    input.send(Multiset::from(vec![("b", -1), ("d", -1), ("b+", 1), ("d+", 1)]))?;
    flow.run()?;
    let delta = round_delta(&arranged);
    assert_eq!(delta.len(), 4);
    assert_multisets_equal(
        &delta,
        &Multiset::from(vec![
            (("b", initial["b"].clone()), -1),
            (("d", initial["d"].clone()), -1),
            (("b+", initial["b"].clone()), 1),
            (("d+", initial["d"].clone()), 1),
        ]),
    );
    Ok(())
}

#[test]
fn single_edits_touch_at_most_two_entries() -> anyhow::Result<()> {
    let (flow, input, arranged) = fractional_setup()?;

    input.send(Multiset::from(vec![("a", 1), ("c", 1), ("e", 1)]))?;
    flow.run()?;
    let seeded = round_delta(&arranged);

    // One insertion in the middle: one delta, nothing else moves.
    input.send(Multiset::from(vec![("b", 1)]))?;
    flow.run()?;
    let inserted = round_delta(&arranged);
    assert!(inserted.len() <= 2);

    // One deletion: one retraction, nothing else moves.
    input.send(Multiset::from(vec![("c", -1)]))?;
    flow.run()?;
    let deleted = round_delta(&arranged);
    assert!(deleted.len() <= 2);

    let mut pairs: Vec<(String, &str)> = seeded
        .concat(inserted)
        .concat(deleted)
        .consolidate()
        .into_entries()
        .into_iter()
        .map(|((value, index), multiplicity)| {
            assert_eq!(multiplicity, 1);
            (index, value)
        })
        .collect();
    pairs.sort();
    let by_index: Vec<&str> = pairs.into_iter().map(|(_, value)| value).collect();
    assert_eq!(by_index, vec!["a", "b", "e"]);
    Ok(())
}

#[test]
fn keyed_groups_arrange_independently() -> anyhow::Result<()> {
    let flow = BatchFlow::new();
    let (input, pairs) = flow.new_input::<(&'static str, i64)>();

    let arranged = pairs.top_k_with_fractional_index(|a, b| a.cmp(b), 2, 0).capture();
    flow.finalize()?;

    input.send(
        KeyedDeltaBuilder::new()
            .insert("g", 2)
            .insert("g", 1)
            .insert("g", 3)
            .insert("h", 9)
            .build(),
    )?;
    flow.run()?;

    let entries = arranged.accumulated();
    // g keeps its two smallest, h keeps its only value.
    let g_values: Vec<i64> = entries
        .iter()
        .filter(|((key, _), _)| *key == "g")
        .map(|((_, (value, _)), _)| *value)
        .collect();
    assert_eq!(g_values.len(), 2);
    assert!(g_values.contains(&1) && g_values.contains(&2));
    assert_eq!(entries.iter().filter(|((key, _), _)| *key == "h").count(), 1);
    Ok(())
}
