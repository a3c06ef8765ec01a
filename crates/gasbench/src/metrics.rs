//! Harness metrics on the `metrics` facade.
//!
//! Adapters record through the free functions below. The binary installs
//! [`CliRecorder`] to collect everything in memory and print a summary at
//! exit; without a recorder the calls are no-ops.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use gasbench_table::SummaryTable;
use metrics::{
    Counter, Gauge, Histogram, Key, KeyName, Metadata, Recorder, SharedString, Unit, counter,
    describe_counter, describe_gauge, describe_histogram, gauge, histogram,
};
use parking_lot::RwLock;

/// Register metric descriptions. Call once at startup.
pub fn init() {
    describe_counter!(
        "gasbench_trials_completed_total",
        Unit::Count,
        "Trials that built, executed and passed the shape check"
    );
    describe_counter!(
        "gasbench_gate_failures_total",
        Unit::Count,
        "Gate evaluations that fell outside the acceptance interval"
    );
    describe_histogram!(
        "gasbench_build_duration_seconds",
        Unit::Seconds,
        "Compiler wall-clock time per workload"
    );
    describe_histogram!(
        "gasbench_execute_duration_seconds",
        Unit::Seconds,
        "Runtime wall-clock time per trial"
    );
    describe_gauge!(
        "gasbench_metric_mean",
        Unit::Count,
        "Mean of the metric column per summary row"
    );
    describe_gauge!(
        "gasbench_gate_value",
        Unit::Count,
        "Statistic value the gate evaluated"
    );
}

pub fn record_build(workload: &str, elapsed: Duration) {
    let labels = [("workload", workload.to_string())];
    histogram!("gasbench_build_duration_seconds", &labels).record(elapsed.as_secs_f64());
}

pub fn record_execute(elapsed: Duration) {
    histogram!("gasbench_execute_duration_seconds").record(elapsed.as_secs_f64());
}

pub fn record_trial() {
    counter!("gasbench_trials_completed_total").increment(1);
}

/// One gauge per summary row, labelled with the row's key cells.
pub fn record_summary(summary: &SummaryTable, key: &[usize]) {
    for row in summary.rows() {
        let label = key
            .iter()
            .filter_map(|&i| row.cell(i))
            .collect::<Vec<_>>()
            .join("/");
        gauge!("gasbench_metric_mean", "row" => label).set(row.stats.mean);
    }
}

pub fn record_gate(statistic: &str, value: f64, passed: bool) {
    let labels = [("statistic", statistic.to_string())];
    gauge!("gasbench_gate_value", &labels).set(value);
    if !passed {
        counter!("gasbench_gate_failures_total", &labels).increment(1);
    }
}

// ============================================================================
// CLI recorder
// ============================================================================

/// Everything recorded so far, keyed by `name{label=value,...}`.
#[derive(Default)]
struct Store {
    counters: RwLock<BTreeMap<String, u64>>,
    gauges: RwLock<BTreeMap<String, f64>>,
    histograms: RwLock<BTreeMap<String, Vec<f64>>>,
}

/// Handle bound to one key of the shared store.
struct Slot {
    key: String,
    store: Arc<Store>,
}

impl metrics::CounterFn for Slot {
    fn increment(&self, value: u64) {
        *self.store.counters.write().entry(self.key.clone()).or_default() += value;
    }

    fn absolute(&self, value: u64) {
        self.store.counters.write().insert(self.key.clone(), value);
    }
}

impl metrics::GaugeFn for Slot {
    fn increment(&self, value: f64) {
        *self.store.gauges.write().entry(self.key.clone()).or_default() += value;
    }

    fn decrement(&self, value: f64) {
        *self.store.gauges.write().entry(self.key.clone()).or_default() -= value;
    }

    fn set(&self, value: f64) {
        self.store.gauges.write().insert(self.key.clone(), value);
    }
}

impl metrics::HistogramFn for Slot {
    fn record(&self, value: f64) {
        self.store
            .histograms
            .write()
            .entry(self.key.clone())
            .or_default()
            .push(value);
    }
}

/// In-memory recorder printed at the end of a CLI run.
#[derive(Default)]
pub struct CliRecorder {
    store: Arc<Store>,
}

impl CliRecorder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Install as the global recorder. `None` if one is already installed.
    #[must_use]
    pub fn install(self) -> Option<CliRecorderHandle> {
        let store = Arc::clone(&self.store);
        metrics::set_global_recorder(self).ok()?;
        Some(CliRecorderHandle { store })
    }

    fn slot(&self, key: &Key) -> Arc<Slot> {
        Arc::new(Slot {
            key: key_to_string(key),
            store: Arc::clone(&self.store),
        })
    }
}

fn key_to_string(key: &Key) -> String {
    let labels: Vec<String> = key
        .labels()
        .map(|l| format!("{}={}", l.key(), l.value()))
        .collect();
    if labels.is_empty() {
        key.name().to_string()
    } else {
        format!("{}{{{}}}", key.name(), labels.join(","))
    }
}

impl Recorder for CliRecorder {
    fn describe_counter(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {}
    fn describe_gauge(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {}
    fn describe_histogram(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {}

    fn register_counter(&self, key: &Key, _metadata: &Metadata<'_>) -> Counter {
        Counter::from_arc(self.slot(key))
    }

    fn register_gauge(&self, key: &Key, _metadata: &Metadata<'_>) -> Gauge {
        Gauge::from_arc(self.slot(key))
    }

    fn register_histogram(&self, key: &Key, _metadata: &Metadata<'_>) -> Histogram {
        Histogram::from_arc(self.slot(key))
    }
}

/// Read access to what an installed [`CliRecorder`] collected.
pub struct CliRecorderHandle {
    store: Arc<Store>,
}

impl CliRecorderHandle {
    #[must_use]
    pub fn counter(&self, key: &str) -> Option<u64> {
        self.store.counters.read().get(key).copied()
    }

    #[must_use]
    pub fn gauge(&self, key: &str) -> Option<f64> {
        self.store.gauges.read().get(key).copied()
    }

    #[must_use]
    pub fn histogram(&self, key: &str) -> Option<Vec<f64>> {
        self.store.histograms.read().get(key).cloned()
    }

    /// Render every metric as plain text, sorted by key.
    #[must_use]
    pub fn render(&self) -> String {
        use std::fmt::Write;

        let counters = self.store.counters.read();
        let gauges = self.store.gauges.read();
        let histograms = self.store.histograms.read();
        if counters.is_empty() && gauges.is_empty() && histograms.is_empty() {
            return "No metrics collected.\n".to_string();
        }

        let mut out = String::from("\n## Metrics\n\n");
        if !counters.is_empty() {
            out.push_str("### Counters\n");
            for (key, value) in counters.iter() {
                let _ = writeln!(out, "  {key}: {value}");
            }
            out.push('\n');
        }
        if !gauges.is_empty() {
            out.push_str("### Gauges\n");
            for (key, value) in gauges.iter() {
                let _ = writeln!(out, "  {key}: {value:.3}");
            }
            out.push('\n');
        }
        if !histograms.is_empty() {
            out.push_str("### Histograms\n");
            for (key, values) in histograms.iter() {
                if values.is_empty() {
                    continue;
                }
                let min = values.iter().copied().fold(f64::INFINITY, f64::min);
                let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                #[allow(clippy::cast_precision_loss)]
                let avg = values.iter().sum::<f64>() / values.len() as f64;
                let _ = writeln!(
                    out,
                    "  {key}: count={}, min={min:.3}, max={max:.3}, avg={avg:.3}",
                    values.len()
                );
            }
            out.push('\n');
        }
        out
    }

    pub fn print_summary(&self) {
        print!("{}", self.render());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use metrics::Label;

    #[test]
    fn test_key_to_string() {
        assert_eq!(key_to_string(&Key::from_name("trials")), "trials");
        let key = Key::from_parts(
            "build",
            vec![Label::new("workload", "calc"), Label::new("trial", "3")],
        );
        assert_eq!(key_to_string(&key), "build{workload=calc,trial=3}");
    }

    #[test]
    fn test_store_through_slots() {
        let recorder = CliRecorder::new();
        let handle = CliRecorderHandle {
            store: Arc::clone(&recorder.store),
        };
        let metadata = Metadata::new("gasbench", metrics::Level::INFO, None);

        let trials = recorder.register_counter(&Key::from_name("trials"), &metadata);
        trials.increment(2);
        trials.increment(1);
        assert_eq!(handle.counter("trials"), Some(3));

        let mean = recorder.register_gauge(&Key::from_name("mean"), &metadata);
        mean.set(252.0);
        assert_eq!(handle.gauge("mean"), Some(252.0));

        let build = recorder.register_histogram(&Key::from_name("build"), &metadata);
        build.record(1.0);
        build.record(3.0);
        assert_eq!(handle.histogram("build"), Some(vec![1.0, 3.0]));

        let text = handle.render();
        assert!(text.contains("trials: 3"));
        assert!(text.contains("build: count=2, min=1.000, max=3.000, avg=2.000"));
    }

    #[test]
    fn test_render_empty() {
        let recorder = CliRecorder::new();
        let handle = CliRecorderHandle {
            store: Arc::clone(&recorder.store),
        };
        assert_eq!(handle.render(), "No metrics collected.\n");
    }
}
