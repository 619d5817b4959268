//! Metrics collection and reporting for graph execution.
//!
//! An extensible API for tracking what a dataflow did: install a
//! [`MetricsCollector`] on a [`Dataflow`](crate::Dataflow) (or
//! [`BatchFlow`](crate::BatchFlow)) and the scheduler counts `graph_steps`
//! and `operator_runs` into it while `run` records wall-clock time. Hosts
//! can register their own metrics alongside the built-in ones and print or
//! save everything once the graph quiesces.
//!
//! # Example
//!
//! ```no_run
//! use deltaflow::{BatchFlow, Multiset};
//! use deltaflow::metrics::MetricsCollector;
//!
//! # fn main() -> anyhow::Result<()> {
//! let flow = BatchFlow::new();
//! let (input, values) = flow.new_input::<i64>();
//! let _sink = values.map(|x| x * 2).subscribe();
//! flow.set_metrics(MetricsCollector::new());
//! flow.finalize()?;
//!
//! input.send(Multiset::from(vec![(1, 1)]))?;
//! flow.run()?;
//!
//! if let Some(metrics) = flow.take_metrics() {
//!     metrics.print();
//!     metrics.save_to_file("flow_metrics.json")?;
//! }
//! # Ok(())
//! # }
//! ```

use anyhow::Result;
use serde_json::{Value, json};
use std::any::Any;
use std::collections::HashMap;
use std::fs::File;
use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Trait for custom metrics.
pub trait Metric: Send + Sync + Any {
    /// The name of this metric (e.g. `operator_runs`).
    fn name(&self) -> &str;

    /// The current value of this metric as a JSON value.
    fn value(&self) -> Value;

    /// Optional description of what this metric measures.
    fn description(&self) -> Option<&str> {
        None
    }

    /// Cast to `Any` for downcasting.
    fn as_any(&self) -> &dyn Any;
}

/// Thread-safe container for graph execution metrics.
///
/// Cheaply cloneable; clones share the same store, which is how the
/// scheduler and the host both see the counters.
#[derive(Clone)]
pub struct MetricsCollector {
    inner: Arc<Mutex<CollectorInner>>,
}

struct CollectorInner {
    metrics: HashMap<String, Box<dyn Metric>>,
    start_time: Option<Instant>,
    end_time: Option<Instant>,
}

impl MetricsCollector {
    /// A collector with no metrics registered yet.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(CollectorInner {
                metrics: HashMap::new(),
                start_time: None,
                end_time: None,
            })),
        }
    }

    /// Register a custom metric, replacing any metric of the same name.
    pub fn register(&mut self, metric: Box<dyn Metric>) {
        let mut inner = self.inner.lock().unwrap();
        inner.metrics.insert(metric.name().to_string(), metric);
    }

    /// Record the start of a `run`.
    pub fn record_start(&self) {
        self.inner.lock().unwrap().start_time = Some(Instant::now());
    }

    /// Record the end of a `run`.
    pub fn record_end(&self) {
        self.inner.lock().unwrap().end_time = Some(Instant::now());
    }

    /// Wall-clock time of the most recent complete `run`, if any.
    #[must_use]
    pub fn elapsed(&self) -> Option<Duration> {
        let inner = self.inner.lock().unwrap();
        match (inner.start_time, inner.end_time) {
            (Some(start), Some(end)) => Some(end.duration_since(start)),
            _ => None,
        }
    }

    /// Add `value` to a counter, creating it at zero if absent.
    pub fn increment_counter(&self, name: &str, value: u64) {
        let mut inner = self.inner.lock().unwrap();
        let current = inner
            .metrics
            .get(name)
            .and_then(|metric| metric.as_any().downcast_ref::<CounterMetric>())
            .map_or(0, |counter| counter.count);
        inner.metrics.insert(
            name.to_string(),
            Box::new(CounterMetric { name: name.to_string(), count: current + value }),
        );
    }

    /// Set a counter to a specific value.
    pub fn set_counter(&self, name: &str, value: u64) {
        let mut inner = self.inner.lock().unwrap();
        inner.metrics.insert(
            name.to_string(),
            Box::new(CounterMetric { name: name.to_string(), count: value }),
        );
    }

    /// All metrics as a JSON object, execution time included when known.
    #[must_use]
    pub fn to_json(&self) -> Value {
        let inner = self.inner.lock().unwrap();
        let mut out = serde_json::Map::new();
        for (name, metric) in &inner.metrics {
            let mut entry = serde_json::Map::new();
            entry.insert("value".to_string(), metric.value());
            if let Some(description) = metric.description() {
                entry.insert("description".to_string(), json!(description));
            }
            out.insert(name.clone(), Value::Object(entry));
        }
        if let (Some(start), Some(end)) = (inner.start_time, inner.end_time) {
            let mut entry = serde_json::Map::new();
            entry.insert("value".to_string(), json!(end.duration_since(start).as_millis()));
            entry.insert(
                "description".to_string(),
                json!("Wall-clock time of the last run in milliseconds"),
            );
            out.insert("execution_time_ms".to_string(), Value::Object(entry));
        }
        drop(inner);
        json!(out)
    }

    /// Print all metrics to stdout in a human-readable format.
    pub fn print(&self) {
        println!("\n========== Dataflow Metrics ==========");
        let inner = self.inner.lock().unwrap();
        if let (Some(start), Some(end)) = (inner.start_time, inner.end_time) {
            let elapsed = end.duration_since(start);
            println!("Run Time: {:.3}s ({} ms)", elapsed.as_secs_f64(), elapsed.as_millis());
            println!("--------------------------------------");
        }
        let mut sorted: Vec<_> = inner.metrics.iter().collect();
        sorted.sort_by_key(|(name, _)| *name);
        for (name, metric) in sorted {
            match metric.description() {
                Some(description) => println!("{}: {} ({})", name, metric.value(), description),
                None => println!("{}: {}", name, metric.value()),
            }
        }
        drop(inner);
        println!("======================================\n");
    }

    /// Save all metrics to a JSON file.
    ///
    /// # Errors
    /// Fails when the file cannot be created or written.
    pub fn save_to_file(&self, path: &str) -> Result<()> {
        let mut file = File::create(path)?;
        let formatted = serde_json::to_string_pretty(&self.to_json())?;
        file.write_all(formatted.as_bytes())?;
        Ok(())
    }

    /// A snapshot of all metric names and values.
    #[must_use]
    pub fn snapshot(&self) -> HashMap<String, Value> {
        let inner = self.inner.lock().unwrap();
        inner
            .metrics
            .iter()
            .map(|(name, metric)| (name.clone(), metric.value()))
            .collect()
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

// ========== Built-in Metrics ==========

/// A simple counter metric.
pub struct CounterMetric {
    name: String,
    count: u64,
}

impl CounterMetric {
    /// A counter starting at zero.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), count: 0 }
    }

    /// A counter with an initial value.
    pub fn with_value(name: impl Into<String>, count: u64) -> Self {
        Self { name: name.into(), count }
    }
}

impl Metric for CounterMetric {
    fn name(&self) -> &str {
        &self.name
    }

    fn value(&self) -> Value {
        json!(self.count)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A gauge metric holding a single numeric value.
pub struct GaugeMetric {
    name: String,
    value: f64,
    description: Option<String>,
}

impl GaugeMetric {
    /// A gauge with the given value.
    pub fn new(name: impl Into<String>, value: f64) -> Self {
        Self { name: name.into(), value, description: None }
    }

    /// Attach a description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

impl Metric for GaugeMetric {
    fn name(&self) -> &str {
        &self.name
    }

    fn value(&self) -> Value {
        json!(self.value)
    }

    fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
