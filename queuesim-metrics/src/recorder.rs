//! A `metrics::Recorder` that keeps the counters and gauges components emit.
//!
//! Components report through the standard `metrics` macros
//! (`queuesim_arrivals_total`, `queuesim_departures_total`,
//! `queuesim_queue_length`, `queuesim_server_transitions_total`, each
//! labelled with `component`). Install a local recorder around a run to
//! collect them without touching global state:
//!
//! ```rust,ignore
//! let store = Arc::new(Mutex::new(RecordedMetrics::default()));
//! with_recorded_metrics(&store, || sim.run(Some(SimTime::from_secs(600)), 10_000));
//! let arrivals = store.lock().unwrap().counter("queuesim_arrivals_total", &[("component", "Q0")]);
//! ```

use metrics::{Counter, Gauge, Histogram, Key, KeyName, Metadata, Recorder, SharedString, Unit};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// Metric name plus its labels, sorted by label key.
pub type MetricKey = (String, Vec<(String, String)>);

#[derive(Debug, Clone, Default, Serialize)]
pub struct RecordedMetrics {
    counters: BTreeMap<MetricKey, u64>,
    gauges: BTreeMap<MetricKey, f64>,
}

impl RecordedMetrics {
    pub fn counter(&self, name: &str, labels: &[(&str, &str)]) -> Option<u64> {
        self.counters.get(&metric_key(name, labels)).copied()
    }

    pub fn gauge(&self, name: &str, labels: &[(&str, &str)]) -> Option<f64> {
        self.gauges.get(&metric_key(name, labels)).copied()
    }

    /// Sum of a counter across every label set.
    pub fn counter_total(&self, name: &str) -> u64 {
        self.counters
            .iter()
            .filter(|((n, _), _)| n == name)
            .map(|(_, v)| v)
            .sum()
    }

    pub fn counters(&self) -> impl Iterator<Item = (&MetricKey, u64)> {
        self.counters.iter().map(|(k, v)| (k, *v))
    }

    pub fn gauges(&self) -> impl Iterator<Item = (&MetricKey, f64)> {
        self.gauges.iter().map(|(k, v)| (k, *v))
    }
}

fn metric_key(name: &str, labels: &[(&str, &str)]) -> MetricKey {
    let mut labels: Vec<(String, String)> = labels
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    labels.sort();
    (name.to_string(), labels)
}

fn owned_key(key: &Key) -> MetricKey {
    let mut labels: Vec<(String, String)> = key
        .labels()
        .map(|l| (l.key().to_string(), l.value().to_string()))
        .collect();
    labels.sort();
    (key.name().to_string(), labels)
}

/// A poisoned store only means a panicking test held the lock; the data is
/// still usable.
fn lock(store: &Mutex<RecordedMetrics>) -> MutexGuard<'_, RecordedMetrics> {
    store.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Clone)]
pub struct SimulationRecorder {
    store: Arc<Mutex<RecordedMetrics>>,
}

impl SimulationRecorder {
    pub fn new(store: Arc<Mutex<RecordedMetrics>>) -> Self {
        Self { store }
    }
}

/// Run `f` with a local recorder writing into `store`.
pub fn with_recorded_metrics<T>(store: &Arc<Mutex<RecordedMetrics>>, f: impl FnOnce() -> T) -> T {
    let recorder = SimulationRecorder::new(store.clone());
    metrics::with_local_recorder(&recorder, f)
}

struct CounterHandle {
    store: Arc<Mutex<RecordedMetrics>>,
    key: MetricKey,
}

impl metrics::CounterFn for CounterHandle {
    fn increment(&self, value: u64) {
        *lock(&self.store).counters.entry(self.key.clone()).or_default() += value;
    }

    fn absolute(&self, value: u64) {
        lock(&self.store).counters.insert(self.key.clone(), value);
    }
}

struct GaugeHandle {
    store: Arc<Mutex<RecordedMetrics>>,
    key: MetricKey,
}

impl metrics::GaugeFn for GaugeHandle {
    fn increment(&self, value: f64) {
        *lock(&self.store).gauges.entry(self.key.clone()).or_default() += value;
    }

    fn decrement(&self, value: f64) {
        *lock(&self.store).gauges.entry(self.key.clone()).or_default() -= value;
    }

    fn set(&self, value: f64) {
        lock(&self.store).gauges.insert(self.key.clone(), value);
    }
}

impl Recorder for SimulationRecorder {
    fn describe_counter(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {}

    fn describe_gauge(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {}

    fn describe_histogram(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {}

    fn register_counter(&self, key: &Key, _metadata: &Metadata<'_>) -> Counter {
        Counter::from_arc(Arc::new(CounterHandle {
            store: self.store.clone(),
            key: owned_key(key),
        }))
    }

    fn register_gauge(&self, key: &Key, _metadata: &Metadata<'_>) -> Gauge {
        Gauge::from_arc(Arc::new(GaugeHandle {
            store: self.store.clone(),
            key: owned_key(key),
        }))
    }

    // components emit no histograms
    fn register_histogram(&self, _key: &Key, _metadata: &Metadata<'_>) -> Histogram {
        Histogram::noop()
    }
}
