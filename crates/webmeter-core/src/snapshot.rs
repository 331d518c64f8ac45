//! Immutable point-in-time view of a registry.
//!
//! Snapshots are plain data: they serialize to JSON with `serde` and render to the Prometheus
//! text exposition format. Nothing here touches the live registry.

use std::collections::BTreeMap;
use std::fmt::Write;

use serde::Serialize;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CounterSample {
    pub name: String,
    pub labels: BTreeMap<String, String>,
    pub value: u64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct GaugeSample {
    pub name: String,
    pub labels: BTreeMap<String, String>,
    pub value: i64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MeterSample {
    pub name: String,
    pub labels: BTreeMap<String, String>,
    pub count: u64,
    /// Marks per second since the meter was first touched.
    pub mean_rate: f64,
}

/// Shared shape for value histograms and timers (timers are in microseconds).
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct HistogramSample {
    pub name: String,
    pub labels: BTreeMap<String, String>,
    pub count: u64,
    pub sum: u64,
    pub min: u64,
    pub max: u64,
    /// Cumulative `(upper_bound, count)` pairs.
    pub buckets: Vec<(u64, u64)>,
}

impl HistogramSample {
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum as f64 / self.count as f64
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct MetricSnapshot {
    pub context: String,
    pub taken_at_ms: u64,
    pub global_tags: BTreeMap<String, String>,
    pub counters: Vec<CounterSample>,
    pub gauges: Vec<GaugeSample>,
    pub meters: Vec<MeterSample>,
    pub histograms: Vec<HistogramSample>,
    pub timers: Vec<HistogramSample>,
}

fn labels_match(have: &BTreeMap<String, String>, want: &[(&str, &str)]) -> bool {
    have.len() == want.len()
        && want
            .iter()
            .all(|(k, v)| have.get(*k).map(String::as_str) == Some(*v))
}

/// Helper to escape label values.
fn escape_label(v: &str) -> String {
    v.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n")
}

impl MetricSnapshot {
    pub fn counter(&self, name: &str, labels: &[(&str, &str)]) -> Option<u64> {
        self.counters
            .iter()
            .find(|s| s.name == name && labels_match(&s.labels, labels))
            .map(|s| s.value)
    }

    pub fn gauge(&self, name: &str, labels: &[(&str, &str)]) -> Option<i64> {
        self.gauges
            .iter()
            .find(|s| s.name == name && labels_match(&s.labels, labels))
            .map(|s| s.value)
    }

    pub fn meter(&self, name: &str, labels: &[(&str, &str)]) -> Option<&MeterSample> {
        self.meters
            .iter()
            .find(|s| s.name == name && labels_match(&s.labels, labels))
    }

    pub fn histogram(&self, name: &str, labels: &[(&str, &str)]) -> Option<&HistogramSample> {
        self.histograms
            .iter()
            .find(|s| s.name == name && labels_match(&s.labels, labels))
    }

    pub fn timer(&self, name: &str, labels: &[(&str, &str)]) -> Option<&HistogramSample> {
        self.timers
            .iter()
            .find(|s| s.name == name && labels_match(&s.labels, labels))
    }

    /// Sum of a counter across all label sets.
    pub fn counter_total(&self, name: &str) -> u64 {
        self.counters.iter().filter(|s| s.name == name).map(|s| s.value).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.counters.is_empty()
            && self.gauges.is_empty()
            && self.meters.is_empty()
            && self.histograms.is_empty()
            && self.timers.is_empty()
    }

    fn label_str(&self, labels: &BTreeMap<String, String>) -> String {
        self.global_tags
            .iter()
            .filter(|(k, _)| !labels.contains_key(*k))
            .chain(labels.iter())
            .map(|(k, v)| format!("{}=\"{}\"", k, escape_label(v)))
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Render in Prometheus text exposition format.
    ///
    /// Meters render as counters; timer buckets keep their microsecond unit.
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let mut last_type: Option<&str> = None;

        for s in &self.counters {
            if last_type != Some(s.name.as_str()) {
                let _ = writeln!(out, "# TYPE {} counter", s.name);
                last_type = Some(s.name.as_str());
            }
            let _ = writeln!(out, "{}{{{}}} {}", s.name, self.label_str(&s.labels), s.value);
        }
        for s in &self.gauges {
            if last_type != Some(s.name.as_str()) {
                let _ = writeln!(out, "# TYPE {} gauge", s.name);
                last_type = Some(s.name.as_str());
            }
            let _ = writeln!(out, "{}{{{}}} {}", s.name, self.label_str(&s.labels), s.value);
        }
        for s in &self.meters {
            if last_type != Some(s.name.as_str()) {
                let _ = writeln!(out, "# TYPE {} counter", s.name);
                last_type = Some(s.name.as_str());
            }
            let _ = writeln!(out, "{}{{{}}} {}", s.name, self.label_str(&s.labels), s.count);
        }
        for s in self.histograms.iter().chain(self.timers.iter()) {
            if last_type != Some(s.name.as_str()) {
                let _ = writeln!(out, "# TYPE {} histogram", s.name);
                last_type = Some(s.name.as_str());
            }
            let label_str = self.label_str(&s.labels);
            let prefix = if label_str.is_empty() { String::new() } else { format!("{},", label_str) };
            for (le, count) in &s.buckets {
                let _ = writeln!(out, "{}_bucket{{{}le=\"{}\"}} {}", s.name, prefix, le, count);
            }
            let _ = writeln!(out, "{}_bucket{{{}le=\"+Inf\"}} {}", s.name, prefix, s.count);
            let _ = writeln!(out, "{}_sum{{{}}} {}", s.name, label_str, s.sum);
            let _ = writeln!(out, "{}_count{{{}}} {}", s.name, label_str, s.count);
        }
        out
    }
}
