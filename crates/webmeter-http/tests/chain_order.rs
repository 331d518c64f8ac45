#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Body;
use axum::extract::Request;
use axum::http::{Method, StatusCode};
use axum::response::Response;

use webmeter_core::{MetricSnapshot, MetricsRegistry, WebMeterError};
use webmeter_http::config::{EndpointOptions, MetricsOptions, TimerPlacement};
use webmeter_http::pipeline::downstream_fn;
use webmeter_http::{compose, Services};

/// Registry that only records the order of writes.
#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<String>>,
}

impl Recorder {
    fn push(&self, e: String) {
        self.events.lock().unwrap().push(e);
    }

    fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.events.lock().unwrap())
    }
}

impl MetricsRegistry for Recorder {
    fn increment_counter(&self, name: &str, _labels: &[(&str, &str)], _v: u64) {
        self.push(format!("counter {name}"));
    }
    fn add_gauge(&self, name: &str, _labels: &[(&str, &str)], delta: i64) {
        self.push(format!("gauge {name} {delta:+}"));
    }
    fn observe_histogram(&self, name: &str, _labels: &[(&str, &str)], _value: u64) {
        self.push(format!("histogram {name}"));
    }
    fn record_timer(&self, name: &str, _labels: &[(&str, &str)], _elapsed: Duration) {
        self.push(format!("timer {name}"));
    }
    fn mark_meter(&self, name: &str, _labels: &[(&str, &str)]) {
        self.push(format!("meter {name}"));
    }
    fn snapshot(&self) -> MetricSnapshot {
        MetricSnapshot::default()
    }
}

fn services(recorder: &Arc<Recorder>, metrics: MetricsOptions) -> Services {
    Services::new()
        .with_metrics_options(metrics)
        .with_endpoint_options(EndpointOptions::none())
        .with_registry(recorder.clone())
}

async fn run(recorder: &Arc<Recorder>, metrics: MetricsOptions, method: Method) -> Vec<String> {
    let chain = compose(&services(recorder, metrics)).unwrap();
    let seen = recorder.clone();
    let req = Request::builder().method(method).uri("/orders").body(Body::empty()).unwrap();
    chain
        .handle(
            req,
            downstream_fn(move |_req| async move {
                seen.push("downstream".into());
                Ok(Response::new(Body::empty()))
            }),
        )
        .await
        .unwrap();
    recorder.take()
}

#[tokio::test]
async fn get_event_order_with_default_tracking_and_apdex() {
    let recorder = Arc::new(Recorder::default());
    let events = run(&recorder, MetricsOptions::default(), Method::GET).await;
    assert_eq!(
        events,
        vec![
            "gauge http_active_requests +1",
            "downstream",
            "counter http_requests_by_auth_scheme_total",
            "timer http_request_duration_micros",
            "meter http_requests",
            "counter http_apdex_total",
            "gauge http_active_requests -1",
        ]
    );
}

#[tokio::test]
async fn outside_placement_meters_before_timing() {
    let recorder = Arc::new(Recorder::default());
    let metrics = MetricsOptions {
        timer_placement: TimerPlacement::OutsideErrorMeter,
        ..MetricsOptions::default()
    };
    let events = run(&recorder, metrics, Method::POST).await;
    assert_eq!(
        events,
        vec![
            "gauge http_active_requests +1",
            "downstream",
            "histogram http_request_body_bytes",
            "counter http_requests_by_auth_scheme_total",
            "meter http_requests",
            "timer http_request_duration_micros",
            "counter http_apdex_total",
            "gauge http_active_requests -1",
        ]
    );
}

#[tokio::test]
async fn apdex_alone_when_default_tracking_is_off() {
    let recorder = Arc::new(Recorder::default());
    let metrics = MetricsOptions { default_tracking_enabled: false, ..MetricsOptions::default() };
    let events = run(&recorder, metrics, Method::GET).await;
    assert_eq!(events, vec!["downstream", "counter http_apdex_total"]);
}

#[tokio::test]
async fn ignored_routes_pass_through_untracked() {
    let recorder = Arc::new(Recorder::default());
    let metrics = MetricsOptions { ignored_routes: vec!["/orders".into()], ..MetricsOptions::default() };
    let events = run(&recorder, metrics, Method::GET).await;
    assert_eq!(events, vec!["downstream"]);
}

#[tokio::test]
async fn fault_passes_through_every_unit_unchanged() {
    let recorder = Arc::new(Recorder::default());
    let chain = compose(&services(&recorder, MetricsOptions::default())).unwrap();
    let req = Request::builder().uri("/orders").body(Body::empty()).unwrap();
    let err = chain
        .handle(req, downstream_fn(|_req| async { Err(WebMeterError::Downstream("db gone".into())) }))
        .await
        .expect_err("fault must propagate");
    assert_eq!(err.to_string(), "downstream: db gone");

    let events = recorder.take();
    assert_eq!(events.first().map(String::as_str), Some("gauge http_active_requests +1"));
    assert_eq!(events.last().map(String::as_str), Some("gauge http_active_requests -1"));
    assert!(events.contains(&"meter http_error_requests".to_string()));
    assert!(events.contains(&"meter http_unhandled_faults".to_string()));
    assert_eq!(
        events.iter().filter(|e| *e == "timer http_request_duration_micros").count(),
        1,
        "{events:?}"
    );
}

#[tokio::test]
async fn endpoints_short_circuit_before_tracking() {
    let recorder = Arc::new(Recorder::default());
    let chain = compose(
        &Services::new()
            .with_metrics_options(MetricsOptions::default())
            .with_endpoint_options(EndpointOptions::default())
            .with_registry(recorder.clone()),
    )
    .unwrap();

    let req = Request::builder().uri("/ping").body(Body::empty()).unwrap();
    let resp = chain
        .handle(
            req,
            downstream_fn(|_req| async {
                let reached = true;
                if reached {
                    panic!("downstream must not run");
                }
                Ok(Response::new(Body::empty()))
            }),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(recorder.take().is_empty());
}
