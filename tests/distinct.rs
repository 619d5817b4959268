use deltaflow::testing::*;
use deltaflow::{BatchFlow, Multiset};

#[test]
fn presence_flips_once_per_round() -> anyhow::Result<()> {
    let flow = BatchFlow::new();
    let (input, values) = flow.new_input::<&'static str>();

    let present = values.distinct().capture();
    flow.finalize()?;

    // Net multiplicity ends at +1: exactly one insertion comes out.
    input.send(Multiset::from(vec![("v", 2), ("v", -1), ("v", -1), ("v", 1)]))?;
    flow.run()?;

    let rounds = present.take_data();
    assert_eq!(rounds.len(), 1);
    assert_eq!(rounds[0].1.clone().consolidate(), Multiset::from(vec![("v", 1)]));
    Ok(())
}

#[test]
fn presence_law_holds_across_rounds() -> anyhow::Result<()> {
    let flow = BatchFlow::new();
    let (input, values) = flow.new_input::<i64>();

    let stream = values.distinct();
    let rounds = stream.capture();
    let total = stream.capture();
    flow.finalize()?;

    input.send(Multiset::from(vec![(1, 3), (2, 1)]))?;
    flow.run()?;
    assert_multisets_equal(&total.accumulated(), &Multiset::from(vec![(1, 1), (2, 1)]));
    assert_all_unit_multiplicities(&total.accumulated());
    rounds.take_data();

    // Dropping one of three copies changes nothing.
    input.send(Multiset::from(vec![(1, -1)]))?;
    flow.run()?;
    assert!(rounds.take_data().is_empty());
    assert_multisets_equal(&total.accumulated(), &Multiset::from(vec![(1, 1), (2, 1)]));

    // Dropping the last copy of 2 retracts its presence.
    input.send(Multiset::from(vec![(2, -1)]))?;
    flow.run()?;
    assert_multisets_equal(&total.accumulated(), &Multiset::from(vec![(1, 1)]));
    Ok(())
}

#[test]
fn negative_accumulations_are_absent() -> anyhow::Result<()> {
    let flow = BatchFlow::new();
    let (input, values) = flow.new_input::<i64>();

    let present = values.distinct().capture();
    flow.finalize()?;

    // A retraction ahead of any insertion leaves presence false.
    input.send(Multiset::from(vec![(5, -1)]))?;
    flow.run()?;
    assert!(present.take_data().is_empty());

    // One insertion brings the accumulation to zero: still absent.
    input.send(Multiset::from(vec![(5, 1)]))?;
    flow.run()?;
    assert!(present.take_data().is_empty());

    // The next insertion finally makes it present.
    input.send(Multiset::from(vec![(5, 1)]))?;
    flow.run()?;
    assert_multisets_equal(&present.accumulated(), &Multiset::from(vec![(5, 1)]));
    Ok(())
}

#[test]
fn distinct_by_collapses_equivalence_classes() -> anyhow::Result<()> {
    let flow = BatchFlow::new();
    let (input, values) = flow.new_input::<(i64, &'static str)>();

    // Equivalence on the numeric component; the representative is the
    // smallest present member of the class.
    let representatives = values.distinct_by(|(class, _)| *class).capture();
    flow.finalize()?;

    input.send(Multiset::from(vec![
        ((1, "b"), 1),
        ((1, "a"), 1),
        ((2, "z"), 1),
    ]))?;
    flow.run()?;
    assert_multisets_equal(
        &representatives.accumulated(),
        &Multiset::from(vec![((1, "a"), 1), ((2, "z"), 1)]),
    );

    // Retracting the representative hands the class to the next member.
    input.send(Multiset::from(vec![((1, "a"), -1)]))?;
    flow.run()?;
    assert_multisets_equal(
        &representatives.accumulated(),
        &Multiset::from(vec![((1, "b"), 1), ((2, "z"), 1)]),
    );
    Ok(())
}
