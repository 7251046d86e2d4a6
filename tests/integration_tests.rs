//! Integration tests for the event logging system
//!
//! These tests verify:
//! - End-to-end event emission into a capped append log
//! - Scoped metadata enrichment
//! - Notifier fan-out with per-sink isolation
//! - Failure containment of the logging pipeline
//! - Pattern formatting of drained events

use event_log_system::prelude::*;
use event_log_system::{fields, info};
use parking_lot::Mutex;
use std::sync::Arc;

#[derive(Clone, Default)]
struct VecAppender {
    lines: Arc<Mutex<Vec<(Severity, String)>>>,
}

impl VecAppender {
    fn lines(&self) -> Vec<(Severity, String)> {
        self.lines.lock().clone()
    }
}

impl Appender for VecAppender {
    fn append(&mut self, severity: Severity, line: &str) -> Result<()> {
        self.lines.lock().push((severity, line.to_string()));
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &str {
        "vec"
    }
}

#[derive(Default)]
struct RecordingNotifier {
    notifications: Mutex<Vec<(String, String)>>,
}

impl Notifier for RecordingNotifier {
    fn notify(&self, message: &str, data: &Fields) {
        let payload = serde_json::to_string(data).expect("payload");
        self.notifications.lock().push((message.to_string(), payload));
    }
}

#[test]
fn test_events_flow_into_append_log() {
    let store = Arc::new(MemoryStore::new());
    let log = Log::builder()
        .appender(CappedAppendLog::new(Arc::clone(&store), "app_log", 0))
        .build();

    log.info("first").warn_with("second", fields! { "user_id": 7 });

    let drain = CappedAppendLog::new(Arc::clone(&store), "app_log", 0);
    let lines: Vec<String> = drain.each_line(100 * 1024).expect("lines").collect();
    assert_eq!(lines.len(), 2);

    let first = Event::parse(&lines[0]).expect("event");
    assert_eq!(first.severity(), Severity::Info);
    assert_eq!(first["message"], "first");
    assert_eq!(first.emitter(), Some("log"));

    let second = Event::parse(&lines[1]).expect("event");
    assert_eq!(second.severity(), Severity::Warn);
    assert_eq!(second["user_id"], 7);

    // the drain emptied the buffer
    assert!(drain.is_empty().expect("is_empty"));
}

#[test]
fn test_emitted_lines_pass_the_event_probe() {
    let appender = VecAppender::default();
    let log = Log::builder().appender(appender.clone()).build();
    log.info("probe me");
    let lines = appender.lines();
    assert!(Event::is_event_line(&lines[0].1));
    assert!(!Event::is_event_line("a plain legacy log line"));
}

#[test]
fn test_scoped_metadata_enriches_events() {
    let appender = VecAppender::default();
    let log = Log::builder().appender(appender.clone()).build();

    MetadataContext::with_scope(fields! { "request_id": "r-1" }, |_| {
        log.info("inside scope");
    });
    log.info("outside scope");

    let lines = appender.lines();
    let inside = Event::parse(&lines[0].1).expect("event");
    let outside = Event::parse(&lines[1].1).expect("event");
    assert_eq!(inside["meta"]["request_id"], "r-1");
    assert!(outside["meta"].get("request_id").is_none());
}

#[test]
fn test_notifier_fan_out_end_to_end() {
    let appender = VecAppender::default();
    let log = Log::builder().appender(appender.clone()).build();
    let first = Arc::new(RecordingNotifier::default());
    let second = Arc::new(RecordingNotifier::default());
    log.notifiers().register(first.clone());
    log.notifiers().register(second.clone());

    log.error_with("service down", fields! { "notify": true });
    log.error("not flagged");

    let first = first.notifications.lock();
    let second = second.notifications.lock();
    assert_eq!(first.len(), 1);
    assert_eq!(second.len(), 1);
    assert_eq!(first[0].0, "service down");
    assert_eq!(first[0].1, second[0].1);
}

#[test]
fn test_logging_never_panics_into_caller() {
    struct Bomb;
    impl std::fmt::Debug for Bomb {
        fn fmt(&self, _f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            panic!("stringification failed")
        }
    }

    let appender = VecAppender::default();
    let log = Log::builder().appender(appender.clone()).build();
    log.info(Inspect(Bomb)).info("still alive");

    let lines = appender.lines();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0].0, Severity::Fatal);
    assert_eq!(lines[1].0, Severity::Info);
}

#[test]
fn test_drained_events_format_with_patterns() {
    let store = Arc::new(MemoryStore::new());
    let log = Log::builder()
        .appender(CappedAppendLog::new(Arc::clone(&store), "app_log", 0))
        .build();
    info!(log, "ready on port {}", 8080);

    let drain = CappedAppendLog::new(Arc::clone(&store), "app_log", 0);
    let line = drain
        .each_line(1024)
        .expect("lines")
        .next()
        .expect("one line");
    let event = Event::parse(&line).expect("event");

    let config = FormatConfig::new();
    let out = event.format(
        &config,
        &FormatOptions::pattern("[{severity}] {message}{-%O%backtrace}"),
    );
    assert_eq!(out, "[info] ready on port 8080");
}

#[test]
fn test_min_level_threshold() {
    let appender = VecAppender::default();
    let log = Log::builder()
        .min_level(Severity::Warn)
        .appender(appender.clone())
        .build();
    log.debug("quiet").info("quiet").warn("loud").fatal("loud");
    let severities: Vec<Severity> = appender.lines().iter().map(|(s, _)| *s).collect();
    assert_eq!(severities, [Severity::Warn, Severity::Fatal]);
}

#[test]
fn test_unknown_severity_is_never_filtered() {
    let appender = VecAppender::default();
    let log = Log::builder()
        .min_level(Severity::Fatal)
        .appender(appender.clone())
        .build();
    log.output("odd", fields! { "severity": "whatever" });
    let lines = appender.lines();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].0, Severity::Unknown);
}

#[test]
fn test_metric_pipeline() {
    let appender = VecAppender::default();
    let log = Log::builder().appender(appender.clone()).build();
    let total = log.measure("sum", || (1..=10).sum::<i32>());
    assert_eq!(total, 55);

    let event = Event::parse(&appender.lines()[0].1).expect("event");
    assert_eq!(event["type"], "metric");
    assert_eq!(event["name"], "sum");
    assert_eq!(event["success"], true);
}

#[test]
fn test_concurrent_emission_is_isolated_per_thread() {
    let appender = VecAppender::default();
    let log = Arc::new(Log::builder().appender(appender.clone()).build());

    let mut handles = Vec::new();
    for i in 0..4 {
        let log = Arc::clone(&log);
        handles.push(std::thread::spawn(move || {
            MetadataContext::with_scope(fields! { "worker": i }, |_| {
                for _ in 0..10 {
                    log.info(format!("from worker {}", i));
                }
            });
        }));
    }
    for handle in handles {
        handle.join().expect("worker");
    }

    let lines = appender.lines();
    assert_eq!(lines.len(), 40);
    for (_, line) in lines {
        let event = Event::parse(&line).expect("event");
        let worker = event["meta"]["worker"].as_i64().expect("worker tag");
        let message = event.message().expect("message");
        assert_eq!(message, format!("from worker {}", worker));
    }
}
