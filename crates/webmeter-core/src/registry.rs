//! Metric capability registry.
//!
//! `MetricsRegistry` is the capability every middleware unit writes through. The in-memory
//! implementation keeps counters, gauges, meters, histograms and timers with dynamic labels
//! backed by `DashMap`. Labels are flattened into sorted key vectors to keep deterministic
//! ordering; values are atomics so writers never wait on each other beyond a shard lock.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use dashmap::DashMap;

use crate::snapshot::{
    CounterSample, GaugeSample, HistogramSample, MeterSample, MetricSnapshot,
};

/// Write/read capability consumed by instrumentation and reporters.
///
/// Every write must be safe under unbounded concurrent callers. `snapshot` must not block
/// writers for longer than a shard read.
pub trait MetricsRegistry: Send + Sync {
    fn increment_counter(&self, name: &str, labels: &[(&str, &str)], v: u64);
    fn add_gauge(&self, name: &str, labels: &[(&str, &str)], delta: i64);
    /// Record a raw value (e.g. bytes) into a histogram.
    fn observe_histogram(&self, name: &str, labels: &[(&str, &str)], value: u64);
    fn record_timer(&self, name: &str, labels: &[(&str, &str)], elapsed: Duration);
    fn mark_meter(&self, name: &str, labels: &[(&str, &str)]);
    fn snapshot(&self) -> MetricSnapshot;
}

/// Value buckets for raw histograms (bytes): 64B .. 4MiB.
pub const BUCKETS_BYTES: [u64; 9] = [
    64, 256, 1_024, 4_096, 16_384, 65_536, 262_144, 1_048_576, 4_194_304,
];

// Fixed Buckets in Microseconds (µs)
// 100us, 500us, 1ms, 5ms, 10ms, 50ms, 100ms, 500ms, 1s
pub const BUCKETS_MICROS: [u64; 9] = [
    100, 500, 1_000, 5_000, 10_000, 50_000, 100_000, 500_000, 1_000_000,
];

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
struct MetricKey {
    name: String,
    labels: Vec<(String, String)>,
}

impl MetricKey {
    fn new(name: &str, labels: &[(&str, &str)]) -> Self {
        let mut labels: Vec<(String, String)> = labels
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        labels.sort();
        Self { name: name.to_string(), labels }
    }

    fn label_map(&self) -> BTreeMap<String, String> {
        self.labels.iter().cloned().collect()
    }
}

struct AtomicHistogram {
    bounds: &'static [u64],
    count: AtomicU64,
    sum: AtomicU64,
    min: AtomicU64,
    max: AtomicU64,
    buckets: Vec<AtomicU64>,
}

impl AtomicHistogram {
    fn new(bounds: &'static [u64]) -> Self {
        Self {
            bounds,
            count: AtomicU64::new(0),
            sum: AtomicU64::new(0),
            min: AtomicU64::new(u64::MAX),
            max: AtomicU64::new(0),
            buckets: bounds.iter().map(|_| AtomicU64::new(0)).collect(),
        }
    }

    fn observe(&self, value: u64) {
        self.count.fetch_add(1, Ordering::Relaxed);
        // Client-declared sizes can be arbitrarily large; the sum pins at u64::MAX.
        let _ = self
            .sum
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |s| Some(s.saturating_add(value)));
        self.min.fetch_min(value, Ordering::Relaxed);
        self.max.fetch_max(value, Ordering::Relaxed);

        // Cumulative buckets: increment every bucket whose bound covers the value
        for (i, &b) in self.bounds.iter().enumerate() {
            if value <= b {
                self.buckets[i].fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    fn sample(&self, key: &MetricKey) -> HistogramSample {
        let count = self.count.load(Ordering::Relaxed);
        let min = self.min.load(Ordering::Relaxed);
        HistogramSample {
            name: key.name.clone(),
            labels: key.label_map(),
            count,
            sum: self.sum.load(Ordering::Relaxed),
            min: if count == 0 || min == u64::MAX { 0 } else { min },
            max: self.max.load(Ordering::Relaxed),
            buckets: self
                .bounds
                .iter()
                .zip(self.buckets.iter())
                .map(|(&le, c)| (le, c.load(Ordering::Relaxed)))
                .collect(),
        }
    }
}

struct AtomicMeter {
    count: AtomicU64,
    started: Instant,
}

impl AtomicMeter {
    fn new() -> Self {
        Self { count: AtomicU64::new(0), started: Instant::now() }
    }
}

/// Default registry: lock-sharded maps of atomics.
#[derive(Default)]
pub struct InMemoryRegistry {
    context: String,
    global_tags: BTreeMap<String, String>,
    counters: DashMap<MetricKey, AtomicU64>,
    gauges: DashMap<MetricKey, AtomicI64>,
    meters: DashMap<MetricKey, AtomicMeter>,
    histograms: DashMap<MetricKey, AtomicHistogram>,
    timers: DashMap<MetricKey, AtomicHistogram>,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Label every snapshot with a context name (e.g. "application").
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = context.into();
        self
    }

    /// Tags rendered on every sample in addition to per-metric labels.
    pub fn with_global_tags(mut self, tags: BTreeMap<String, String>) -> Self {
        self.global_tags = tags;
        self
    }
}

impl MetricsRegistry for InMemoryRegistry {
    fn increment_counter(&self, name: &str, labels: &[(&str, &str)], v: u64) {
        let counter = self
            .counters
            .entry(MetricKey::new(name, labels))
            .or_insert_with(|| AtomicU64::new(0));
        counter.fetch_add(v, Ordering::Relaxed);
    }

    fn add_gauge(&self, name: &str, labels: &[(&str, &str)], delta: i64) {
        let gauge = self
            .gauges
            .entry(MetricKey::new(name, labels))
            .or_insert_with(|| AtomicI64::new(0));
        gauge.fetch_add(delta, Ordering::Relaxed);
    }

    fn observe_histogram(&self, name: &str, labels: &[(&str, &str)], value: u64) {
        let hist = self
            .histograms
            .entry(MetricKey::new(name, labels))
            .or_insert_with(|| AtomicHistogram::new(&BUCKETS_BYTES));
        hist.observe(value);
    }

    fn record_timer(&self, name: &str, labels: &[(&str, &str)], elapsed: Duration) {
        let timer = self
            .timers
            .entry(MetricKey::new(name, labels))
            .or_insert_with(|| AtomicHistogram::new(&BUCKETS_MICROS));
        timer.observe(elapsed.as_micros().min(u64::MAX as u128) as u64);
    }

    fn mark_meter(&self, name: &str, labels: &[(&str, &str)]) {
        let meter = self
            .meters
            .entry(MetricKey::new(name, labels))
            .or_insert_with(AtomicMeter::new);
        meter.count.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> MetricSnapshot {
        let mut counters: Vec<CounterSample> = self
            .counters
            .iter()
            .map(|r| CounterSample {
                name: r.key().name.clone(),
                labels: r.key().label_map(),
                value: r.value().load(Ordering::Relaxed),
            })
            .collect();
        counters.sort_by(|a, b| (&a.name, &a.labels).cmp(&(&b.name, &b.labels)));

        let mut gauges: Vec<GaugeSample> = self
            .gauges
            .iter()
            .map(|r| GaugeSample {
                name: r.key().name.clone(),
                labels: r.key().label_map(),
                value: r.value().load(Ordering::Relaxed),
            })
            .collect();
        gauges.sort_by(|a, b| (&a.name, &a.labels).cmp(&(&b.name, &b.labels)));

        let mut meters: Vec<MeterSample> = self
            .meters
            .iter()
            .map(|r| {
                let count = r.value().count.load(Ordering::Relaxed);
                let secs = r.value().started.elapsed().as_secs_f64();
                MeterSample {
                    name: r.key().name.clone(),
                    labels: r.key().label_map(),
                    count,
                    mean_rate: if secs > 0.0 { count as f64 / secs } else { 0.0 },
                }
            })
            .collect();
        meters.sort_by(|a, b| (&a.name, &a.labels).cmp(&(&b.name, &b.labels)));

        let mut histograms: Vec<HistogramSample> =
            self.histograms.iter().map(|r| r.value().sample(r.key())).collect();
        histograms.sort_by(|a, b| (&a.name, &a.labels).cmp(&(&b.name, &b.labels)));

        let mut timers: Vec<HistogramSample> =
            self.timers.iter().map(|r| r.value().sample(r.key())).collect();
        timers.sort_by(|a, b| (&a.name, &a.labels).cmp(&(&b.name, &b.labels)));

        MetricSnapshot {
            context: self.context.clone(),
            taken_at_ms: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_millis() as u64,
            global_tags: self.global_tags.clone(),
            counters,
            gauges,
            meters,
            histograms,
            timers,
        }
    }
}
