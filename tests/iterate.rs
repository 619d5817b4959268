use deltaflow::testing::*;
use deltaflow::{Antichain, BatchFlow, Dataflow, Multiset, Version};

#[test]
fn geometric_series_reaches_its_fixpoint() -> anyhow::Result<()> {
    let flow = BatchFlow::new();
    let (input, seed) = flow.new_input::<i64>();

    let series = seed
        .iterate(|inner| {
            inner.map(|x| x * 2).concat(inner).filter(|x| *x <= 50).distinct()
        })
        .capture();
    flow.finalize()?;

    input.send(Multiset::from(vec![(1, 1)]))?;
    flow.run()?;

    assert_multisets_equal(
        &series.accumulated(),
        &Multiset::from(vec![(1, 1), (2, 1), (4, 1), (8, 1), (16, 1), (32, 1)]),
    );
    assert_all_unit_multiplicities(&series.accumulated());
    Ok(())
}

#[test]
fn contractive_bodies_terminate() -> anyhow::Result<()> {
    let flow = BatchFlow::new();
    let (input, seed) = flow.new_input::<i64>();

    let chain = seed
        .iterate(|inner| {
            inner.map(|x| x + 1).concat(inner).filter(|x| *x < 5).distinct()
        })
        .capture();
    flow.finalize()?;

    input.send(Multiset::from(vec![(0, 1)]))?;
    // `run` returning at all is the termination property; the loop closes
    // through frontier accounting, not through any bound on steps.
    flow.run()?;

    assert_multisets_equal(
        &chain.accumulated(),
        &Multiset::from(vec![(0, 1), (1, 1), (2, 1), (3, 1), (4, 1)]),
    );
    Ok(())
}

#[test]
fn identity_body_settles_immediately() -> anyhow::Result<()> {
    let flow = BatchFlow::new();
    let (input, seed) = flow.new_input::<&'static str>();

    let settled = seed.iterate(|inner| inner.distinct()).capture();
    flow.finalize()?;

    input.send(Multiset::from(vec![("only", 1)]))?;
    flow.run()?;

    assert_multisets_equal(&settled.accumulated(), &Multiset::from(vec![("only", 1)]));
    Ok(())
}

#[test]
fn retracting_the_seed_unwinds_the_fixpoint() -> anyhow::Result<()> {
    let flow = BatchFlow::new();
    let (input, seed) = flow.new_input::<i64>();

    let series = seed
        .iterate(|inner| {
            inner.map(|x| x * 2).concat(inner).filter(|x| *x <= 50).distinct()
        })
        .capture();
    flow.finalize()?;

    input.send(Multiset::from(vec![(1, 1)]))?;
    flow.run()?;
    assert_eq!(series.accumulated().len(), 6);

    // Withdraw the seed in a later round: every derived value follows it
    // out, incrementally.
    input.send(Multiset::from(vec![(1, -1)]))?;
    flow.run()?;
    assert_accumulates_to_nothing(&series.accumulated());
    Ok(())
}

#[test]
fn independent_seeds_iterate_independently() -> anyhow::Result<()> {
    let flow = BatchFlow::new();
    let (input, seed) = flow.new_input::<i64>();

    let series = seed
        .iterate(|inner| {
            inner.map(|x| x * 10).concat(inner).filter(|x| *x <= 1000).distinct()
        })
        .capture();
    flow.finalize()?;

    input.send(Multiset::from(vec![(1, 1)]))?;
    flow.run()?;
    input.send(Multiset::from(vec![(2, 1)]))?;
    flow.run()?;

    assert_multisets_equal(
        &series.accumulated(),
        &Multiset::from(vec![
            (1, 1),
            (10, 1),
            (100, 1),
            (1000, 1),
            (2, 1),
            (20, 1),
            (200, 1),
        ]),
    );
    Ok(())
}

#[test]
fn probing_observes_the_outer_fixpoint() -> anyhow::Result<()> {
    let flow = Dataflow::new();
    let (input, seed) = flow.new_input::<i64>();

    let series = seed
        .iterate(|inner| {
            inner.map(|x| x * 3).concat(inner).filter(|x| *x <= 30).distinct()
        })
        .capture();
    flow.finalize()?;

    input.send_data(Version::from(0), Multiset::from(vec![(1, 1)]))?;
    input.send_frontier(Version::from(1))?;

    let target = Antichain::from(Version::from(1));
    assert!(series.probe().probe_frontier_less_than(&target));
    // Drive the graph one operator at a time until the output frontier
    // passes the round, the way a host embeds the engine.
    while series.probe().probe_frontier_less_than(&target) {
        assert!(flow.step()?, "graph went quiet before the fixpoint was reached");
    }

    assert_multisets_equal(
        &series.accumulated(),
        &Multiset::from(vec![(1, 1), (3, 1), (9, 1), (27, 1)]),
    );
    Ok(())
}
