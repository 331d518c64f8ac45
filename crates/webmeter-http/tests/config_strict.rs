#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use webmeter_http::config::{self, ReporterKind, TimerPlacement};

#[test]
fn deny_unknown_fields_nested() {
    let bad = r#"
version: 1
metrics:
  apdex_taget_ms: 100 # typo should fail
"#;

    let err = config::load_from_str(bad).expect_err("must fail");
    assert_eq!(err.kind().as_str(), "CONFIGURATION");
}

#[test]
fn ok_minimal_config() {
    let cfg = config::load_from_str("version: 1\n").expect("must parse");
    assert_eq!(cfg.version, 1);
    assert!(cfg.metrics.enabled);
    assert_eq!(cfg.metrics.apdex_target_ms, 500);
    assert_eq!(cfg.metrics.timer_placement, TimerPlacement::InsideErrorMeter);
    assert!(!cfg.endpoints.health_enabled);
    assert_eq!(cfg.endpoints.metrics_text_path, "/metrics-text");
    assert!(cfg.reporting.reporters.is_empty());
}

#[test]
fn full_config_round_trips_into_options() {
    let cfg = config::load_from_str(
        r#"
version: 1
listen: "127.0.0.1:9000"
metrics:
  apdex_target_ms: 100
  global_tags: { region: "eu-1" }
  ignored_status_codes: [404]
  ignored_routes: ["/internal"]
  timer_placement: outside_error_meter
endpoints:
  health_enabled: true
  metrics_path: "/stats"
reporting:
  shutdown_grace_ms: 1500
  reporters:
    - { name: "console", kind: log, interval_ms: 1000 }
    - { name: "prom", kind: file, path: "/tmp/webmeter.prom" }
"#,
    )
    .expect("must parse");

    assert_eq!(cfg.listen, "127.0.0.1:9000");
    assert_eq!(cfg.metrics.global_tags["region"], "eu-1");
    assert!(cfg.metrics.is_ignored_status(404));
    assert_eq!(cfg.metrics.timer_placement, TimerPlacement::OutsideErrorMeter);
    assert_eq!(cfg.endpoints.metrics_path, "/stats");
    assert_eq!(cfg.reporting.reporters[1].kind, ReporterKind::File);
    assert_eq!(cfg.reporting.reporters[1].interval_ms, 10_000);
}

#[test]
fn invalid_values_are_rejected() {
    for bad in [
        "version: 2\n",
        "version: 1\nmetrics: { apdex_target_ms: 0 }\n",
        "version: 1\nendpoints: { ping_path: \"ping\" }\n",
        "version: 1\nendpoints: { env_info_path: \"/ping\" }\n",
        "version: 1\nreporting: { reporters: [ { name: \"f\", kind: file } ] }\n",
        "version: 1\nreporting: { reporters: [ { name: \"a\", kind: log }, { name: \"a\", kind: log } ] }\n",
        "version: 1\nreporting: { reporters: [ { name: \"a\", kind: log, interval_ms: 0 } ] }\n",
    ] {
        let err = config::load_from_str(bad).expect_err(bad);
        assert!(err.is_fatal(), "{bad}");
    }
}
