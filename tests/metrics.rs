#![cfg(feature = "metrics")]

use deltaflow::metrics::{CounterMetric, GaugeMetric, Metric, MetricsCollector};
use deltaflow::testing::*;
use deltaflow::{BatchFlow, Multiset};

#[test]
fn scheduler_counts_steps_and_runs() -> anyhow::Result<()> {
    let flow = BatchFlow::new();
    let (input, values) = flow.new_input::<i64>();
    let _out = values.map(|x| x * 2).filter(|x| *x > 0).capture();
    flow.set_metrics(MetricsCollector::new());
    flow.finalize()?;

    input.send(Multiset::from(vec![(1, 1), (2, 1)]))?;
    flow.run()?;

    let metrics = flow.take_metrics().expect("collector was installed");
    let snapshot = metrics.snapshot();
    let steps = snapshot["graph_steps"].as_u64().unwrap();
    let runs = snapshot["operator_runs"].as_u64().unwrap();
    assert!(steps >= 3, "expected at least one step per operator, saw {steps}");
    assert_eq!(steps, runs);
    assert!(metrics.elapsed().is_some());
    Ok(())
}

#[test]
fn counters_accumulate_and_custom_metrics_register() {
    let mut metrics = MetricsCollector::new();
    metrics.register(Box::new(CounterMetric::with_value("input_records", 1000)));
    metrics.register(Box::new(
        GaugeMetric::new("queue_depth", 4.0).with_description("messages waiting"),
    ));
    metrics.increment_counter("input_records", 24);
    metrics.increment_counter("fresh", 1);

    let snapshot = metrics.snapshot();
    assert_eq!(snapshot["input_records"].as_u64(), Some(1024));
    assert_eq!(snapshot["fresh"].as_u64(), Some(1));
    assert_eq!(snapshot["queue_depth"].as_f64(), Some(4.0));
}

#[test]
fn metrics_round_trip_through_json_files() -> anyhow::Result<()> {
    let metrics = MetricsCollector::new();
    metrics.set_counter("graph_steps", 7);
    metrics.record_start();
    metrics.record_end();

    let dir = tempfile::tempdir()?;
    let path = dir.path().join("metrics.json");
    metrics.save_to_file(path.to_str().unwrap())?;

    let raw = std::fs::read_to_string(&path)?;
    let parsed: serde_json::Value = serde_json::from_str(&raw)?;
    assert_eq!(parsed["graph_steps"]["value"].as_u64(), Some(7));
    assert!(parsed["execution_time_ms"]["value"].as_u64().is_some());
    Ok(())
}

#[test]
fn a_metric_reports_its_own_shape() {
    let counter = CounterMetric::new("lonely");
    assert_eq!(counter.name(), "lonely");
    assert_eq!(counter.value().as_u64(), Some(0));
    assert!(counter.description().is_none());
}
