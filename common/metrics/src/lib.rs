//! A wrapper around the `prometheus` crate that provides a global metrics registry and functions
//! to add and use the following components (more info at
//! [Prometheus docs](https://prometheus.io/docs/concepts/metric_types/)):
//!
//! - `Histogram`: used with `start_timer(..)` and `stop_timer(..)` to record durations.
//! - `IntCounter`: used to represent an ideally ever-growing, never-shrinking integer.
//! - `IntGauge`: used to represent a varying integer (e.g., number of attestations per block).
//!
//! ## Important
//!
//! Metrics will fail if two items have the same `name`. All metrics must have a unique `name`.
//! Because we use a global registry there is no namespace per crate, it's one big global space.
//!
//! Functions for creating metrics return `Result`, which is stored in a `LazyLock` static and
//! passed by reference to the helpers below. A metric that failed to register is silently
//! ignored by every helper, so instrumentation can never interrupt the code it measures.
//!
//! ## Example
//!
//! ```rust
//! use metrics::*;
//! use std::sync::LazyLock;
//!
//! // These metrics are "magically" linked to the global registry defined in `prometheus`.
//! pub static RUN_COUNT: LazyLock<Result<IntCounter>> = LazyLock::new(|| {
//!     try_create_int_counter("runs_total", "Total number of runs")
//! });
//! pub static CURRENT_VALUE: LazyLock<Result<IntGauge>> = LazyLock::new(|| {
//!     try_create_int_gauge("current_value", "The current value")
//! });
//! pub static RUN_TIME: LazyLock<Result<Histogram>> =
//!     LazyLock::new(|| try_create_histogram("run_seconds", "Time taken (measured to high precision)"));
//!
//! fn main() {
//!     for i in 0..100 {
//!         inc_counter(&RUN_COUNT);
//!         let timer = start_timer(&RUN_TIME);
//!
//!         for j in 0..10 {
//!             set_gauge(&CURRENT_VALUE, j);
//!             println!("Howdy partner");
//!         }
//!
//!         stop_timer(timer);
//!     }
//! }
//! ```

use prometheus::{HistogramOpts, Opts};

pub use prometheus::{
    Encoder, Gauge, Histogram, HistogramTimer, IntCounter, IntGauge, TextEncoder,
    proto::{Metric, MetricFamily, MetricType},
};

pub type Result<T> = std::result::Result<T, prometheus::Error>;

/// Collect all the metrics for reporting.
pub fn gather() -> Vec<MetricFamily> {
    prometheus::gather()
}

/// Attempts to create an `IntCounter`, returning `Err` if the registry does not accept the counter
/// (potentially due to naming conflict).
pub fn try_create_int_counter(name: &str, help: &str) -> Result<IntCounter> {
    let opts = Opts::new(name, help);
    let counter = IntCounter::with_opts(opts)?;
    prometheus::register(Box::new(counter.clone()))?;
    Ok(counter)
}

/// Attempts to create an `IntGauge`, returning `Err` if the registry does not accept the gauge
/// (potentially due to naming conflict).
pub fn try_create_int_gauge(name: &str, help: &str) -> Result<IntGauge> {
    let opts = Opts::new(name, help);
    let gauge = IntGauge::with_opts(opts)?;
    prometheus::register(Box::new(gauge.clone()))?;
    Ok(gauge)
}

/// Attempts to create a `Histogram`, returning `Err` if the registry does not accept the histogram
/// (potentially due to naming conflict).
pub fn try_create_histogram(name: &str, help: &str) -> Result<Histogram> {
    try_create_histogram_with_buckets(name, help, Ok(prometheus::DEFAULT_BUCKETS.to_vec()))
}

/// Attempts to create a `Histogram` with specified buckets, returning `Err` if the registry does
/// not accept the histogram (potentially due to naming conflict) or the buckets are invalid.
pub fn try_create_histogram_with_buckets(
    name: &str,
    help: &str,
    buckets: Result<Vec<f64>>,
) -> Result<Histogram> {
    let opts = HistogramOpts::new(name, help).buckets(buckets?);
    let histogram = Histogram::with_opts(opts)?;
    prometheus::register(Box::new(histogram.clone()))?;
    Ok(histogram)
}

/// Exponential buckets starting at `start`, each `factor` times the last.
pub fn exponential_buckets(start: f64, factor: f64, count: usize) -> Result<Vec<f64>> {
    prometheus::exponential_buckets(start, factor, count)
}

/// Starts a timer for the given `Histogram`, stopping when it gets dropped or given to `stop_timer(..)`.
pub fn start_timer(histogram: &Result<Histogram>) -> Option<HistogramTimer> {
    if let Ok(histogram) = histogram {
        Some(histogram.start_timer())
    } else {
        None
    }
}

/// Stops a timer created with `start_timer(..)`.
pub fn stop_timer(timer: Option<HistogramTimer>) {
    if let Some(t) = timer {
        t.observe_duration()
    }
}

pub fn observe(histogram: &Result<Histogram>, value: f64) {
    if let Ok(histogram) = histogram {
        histogram.observe(value);
    }
}

pub fn inc_counter(counter: &Result<IntCounter>) {
    if let Ok(counter) = counter {
        counter.inc();
    }
}

pub fn inc_counter_by(counter: &Result<IntCounter>, value: u64) {
    if let Ok(counter) = counter {
        counter.inc_by(value);
    }
}

pub fn set_gauge(gauge: &Result<IntGauge>, value: i64) {
    if let Ok(gauge) = gauge {
        gauge.set(value);
    }
}

pub fn get_int_gauge_value(gauge: &Result<IntGauge>) -> Option<i64> {
    gauge.as_ref().ok().map(|gauge| gauge.get())
}

pub fn get_int_counter_value(counter: &Result<IntCounter>) -> Option<u64> {
    counter.as_ref().ok().map(|counter| counter.get())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_names_are_rejected() {
        let first = try_create_int_counter("metrics_test_duplicate_total", "First");
        let second = try_create_int_counter("metrics_test_duplicate_total", "Second");
        assert!(first.is_ok());
        assert!(second.is_err());

        // Helpers ignore a metric that failed to register.
        inc_counter(&second);
        assert_eq!(get_int_counter_value(&second), None);
    }

    #[test]
    fn counters_and_gauges() {
        let counter = try_create_int_counter("metrics_test_counter_total", "Counter");
        inc_counter(&counter);
        inc_counter_by(&counter, 4);
        assert_eq!(get_int_counter_value(&counter), Some(5));

        let gauge = try_create_int_gauge("metrics_test_gauge", "Gauge");
        set_gauge(&gauge, -3);
        assert_eq!(get_int_gauge_value(&gauge), Some(-3));
    }

    #[test]
    fn timers_record_observations() {
        let histogram = try_create_histogram_with_buckets(
            "metrics_test_seconds",
            "Histogram",
            exponential_buckets(0.001, 2.0, 8),
        );
        stop_timer(start_timer(&histogram));
        observe(&histogram, 0.5);
        assert_eq!(histogram.as_ref().map(|h| h.get_sample_count()).ok(), Some(2));
    }
}
