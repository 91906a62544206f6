//! Integration tests for the logging pipeline
//!
//! These tests verify:
//! - End-to-end JSON records written through a file sink
//! - Redaction and static attributes on every record
//! - Async drain on shutdown
//! - Configuration errors surfaced before any sink is opened
//! - Sink failure isolation
//! - Remote export through a caller-supplied exporter
//! - Reconfiguration and context merging
//! - The process-wide API

use otel_logger_system::core::error::{LoggerError, Result};
use otel_logger_system::sinks::{ExporterConfig, InMemoryExporter, LogExporter};
use otel_logger_system::{
    configure_logging, get_logger, log_context, logging_state, shutdown_logging, with_log_context,
    Attributes, FileSettings, LogLevel, LogSettings, LoggingSession, OverflowPolicy,
    RemoteSettings, SessionOptions, SessionState,
};
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;
use tempfile::TempDir;

fn read_records(path: &Path) -> Vec<Map<String, Value>> {
    fs::read_to_string(path)
        .expect("Failed to read log file")
        .lines()
        .map(|line| serde_json::from_str(line).expect("Each line should be a JSON object"))
        .collect()
}

#[test]
fn test_file_sink_end_to_end() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let log_file = temp_dir.path().join("app.log");

    let mut session = LoggingSession::start(
        LogSettings::new("billing")
            .with_version("1.4.2")
            .with_environment("staging")
            .without_console()
            .with_file(FileSettings::new(&log_file))
            .with_async(false)
            .with_static_attribute("team", "core"),
    )
    .expect("Failed to start session");

    let logger = session.logger("billing.api");
    logger
        .event(LogLevel::Info, "login for {}")
        .arg("alice")
        .attr("password", "secret")
        .attr("attempt", 1)
        .emit();

    assert!(session.shutdown());

    let records = read_records(&log_file);
    assert_eq!(records.len(), 1);
    let record = &records[0];

    let keys: Vec<&str> = record.keys().map(String::as_str).take(4).collect();
    assert_eq!(keys, ["time", "severity_text", "severity_number", "body"]);

    assert_eq!(record["body"], "login for alice");
    assert_eq!(record["severity_text"], "INFO");
    assert_eq!(record["severity_number"], 9);
    assert_eq!(record["service.name"], "billing");
    assert_eq!(record["service.version"], "1.4.2");
    assert_eq!(record["deployment.environment"], "staging");
    assert_eq!(record["logger.name"], "billing.api");
    assert_eq!(record["team"], "core");
    assert_eq!(record["password"], "***");
    assert_eq!(record["attempt"], 1);
    assert!(record["time"].as_str().unwrap().ends_with('Z'));

    let raw = fs::read_to_string(&log_file).unwrap();
    assert!(!raw.contains("secret"));
}

#[test]
fn test_nested_secrets_never_reach_the_file() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let log_file = temp_dir.path().join("nested.log");

    let mut session = LoggingSession::start(
        LogSettings::new("billing")
            .without_console()
            .with_file(FileSettings::new(&log_file))
            .with_async(false),
    )
    .expect("Failed to start session");

    session
        .logger("billing.auth")
        .event(LogLevel::Info, "upstream call")
        .attr("auth", serde_json::json!({"password": "secret", "user": "alice"}))
        .emit();
    assert!(session.shutdown());

    let raw = fs::read_to_string(&log_file).unwrap();
    assert!(!raw.contains("secret"));

    let records = read_records(&log_file);
    assert_eq!(records[0]["auth"]["password"], "***");
    assert_eq!(records[0]["auth"]["user"], "alice");
}

#[test]
fn test_injected_newlines_stay_on_one_line() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let log_file = temp_dir.path().join("injection.log");

    let mut session = LoggingSession::start(
        LogSettings::new("svc")
            .without_console()
            .with_file(FileSettings::new(&log_file))
            .with_async(false),
    )
    .unwrap();

    let malicious = "User login\n{\"severity_text\":\"ERROR\",\"body\":\"fake\"}\nINFO tail";
    session.logger("auth").info(malicious);
    session.shutdown();

    let records = read_records(&log_file);
    assert_eq!(records.len(), 1, "Record must be a single line");
    assert_eq!(records[0]["body"], malicious);
}

#[test]
fn test_async_drains_everything_on_shutdown() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let log_file = temp_dir.path().join("async.log");

    let mut session = LoggingSession::start(
        LogSettings::new("worker")
            .without_console()
            .with_file(FileSettings::new(&log_file))
            .with_async(true)
            .with_level("DEBUG"),
    )
    .unwrap();
    assert_eq!(session.state(), SessionState::Async);

    let logger = session.logger("worker.jobs");
    for i in 0..1000 {
        logger.event(LogLevel::Debug, "job {} done").arg(i).emit();
    }

    assert!(session.shutdown_with_timeout(Duration::from_secs(10)));
    assert_eq!(session.state(), SessionState::Stopped);

    let records = read_records(&log_file);
    assert_eq!(records.len(), 1000);
    for (i, record) in records.iter().enumerate() {
        assert_eq!(record["body"], format!("job {} done", i));
    }
    assert_eq!(session.metrics().delivered_count(), 1000);
    assert_eq!(session.metrics().dropped_count(), 0);
}

#[test]
fn test_level_filtering_per_sink() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let all_file = temp_dir.path().join("all.log");
    let exporter = InMemoryExporter::new();

    let mut session = LoggingSession::start_with(
        LogSettings::new("svc")
            .without_console()
            .with_file(FileSettings::new(&all_file))
            .with_remote(RemoteSettings::default().with_level("ERROR"))
            .with_level("DEBUG")
            .with_async(false),
        SessionOptions::new().exporter_factory(exporter.factory()),
    )
    .unwrap();

    let logger = session.logger("svc");
    logger.trace("dropped by session level");
    logger.debug("debug");
    logger.warn("warn");
    logger.error("error");
    session.shutdown();

    let bodies: Vec<Value> = read_records(&all_file)
        .into_iter()
        .map(|r| r["body"].clone())
        .collect();
    assert_eq!(bodies, ["debug", "warn", "error"]);

    let exported = exporter.records();
    assert_eq!(exported.len(), 1);
    assert_eq!(exported[0]["body"], "error");
}

#[test]
fn test_no_sink_is_a_configuration_error() {
    let err = LoggingSession::start(LogSettings::new("svc").without_console()).unwrap_err();
    assert!(err.is_configuration());
}

#[test]
fn test_unknown_level_rejected() {
    let err = LoggingSession::start(LogSettings::new("svc").with_level("VERBOSE")).unwrap_err();
    assert!(matches!(err, LoggerError::UnknownLevel(ref l) if l == "VERBOSE"));
}

#[test]
fn test_level_aliases_and_numbers_accepted() {
    for level in ["warning", "CRITICAL", "30", "fatal"] {
        let session = LoggingSession::start(LogSettings::new("svc").with_level(level).with_async(false));
        assert!(session.is_ok(), "level '{}' should resolve", level);
    }
}

#[test]
fn test_unsupported_protocol_rejected() {
    let exporter = InMemoryExporter::new();
    let err = LoggingSession::start_with(
        LogSettings::new("svc").with_remote(RemoteSettings::default().with_protocol("thrift")),
        SessionOptions::new().exporter_factory(exporter.factory()),
    )
    .unwrap_err();
    assert!(matches!(err, LoggerError::UnsupportedProtocol(_)));
}

#[test]
fn test_missing_exporter_factory_rejected() {
    let err = LoggingSession::start(
        LogSettings::new("svc")
            .without_console()
            .with_remote(RemoteSettings::default()),
    )
    .unwrap_err();
    assert!(err.is_configuration());
}

#[test]
fn test_directory_creation_failure() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let blocker = temp_dir.path().join("not_a_dir");
    fs::write(&blocker, b"file").unwrap();

    let err = LoggingSession::start(
        LogSettings::new("svc")
            .without_console()
            .with_file(FileSettings::new(blocker.join("logs").join("app.log"))),
    )
    .unwrap_err();
    assert!(matches!(err, LoggerError::DirectoryCreation { .. }));
}

#[test]
fn test_nested_log_directories_created() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let log_file = temp_dir.path().join("a").join("b").join("c").join("app.log");

    let mut session = LoggingSession::start(
        LogSettings::new("svc")
            .without_console()
            .with_file(FileSettings::new(&log_file))
            .with_async(false),
    )
    .unwrap();
    session.logger("svc").info("created");
    session.shutdown();

    assert_eq!(read_records(&log_file).len(), 1);
}

struct FailingExporter;

impl LogExporter for FailingExporter {
    fn export(&mut self, _record: &Map<String, Value>) -> Result<()> {
        Err(LoggerError::export("collector unavailable"))
    }

    fn shutdown(&mut self) -> Result<()> {
        Ok(())
    }
}

#[test]
fn test_failing_sink_does_not_block_others() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let log_file = temp_dir.path().join("isolated.log");

    let factory = Arc::new(|_: &ExporterConfig| -> Result<Box<dyn LogExporter>> {
        Ok(Box::new(FailingExporter))
    });

    let mut session = LoggingSession::start_with(
        LogSettings::new("svc")
            .without_console()
            .with_file(FileSettings::new(&log_file))
            .with_remote(RemoteSettings::default())
            .with_async(true),
        SessionOptions::new().exporter_factory(factory),
    )
    .unwrap();

    let logger = session.logger("svc");
    for i in 0..10 {
        logger.event(LogLevel::Info, "event {}").arg(i).emit();
    }
    assert!(session.shutdown());

    assert_eq!(read_records(&log_file).len(), 10);
    assert_eq!(session.metrics().sink_failures(), 10);
    assert_eq!(session.metrics().delivered_count(), 10);
}

#[test]
fn test_remote_export_with_resource_and_trace() {
    let exporter = InMemoryExporter::new();
    let trace_provider = Arc::new(|| -> Option<otel_logger_system::TraceContext> {
        Some(otel_logger_system::TraceContext::new(0xabc, 0x12).with_sampled(true))
    });

    let mut session = LoggingSession::start_with(
        LogSettings::new("gateway")
            .with_environment("prod")
            .without_console()
            .with_remote(
                RemoteSettings::default()
                    .with_protocol("grpc")
                    .with_endpoint("collector:4317"),
            ),
        SessionOptions::new()
            .exporter_factory(exporter.factory())
            .trace_provider(trace_provider),
    )
    .unwrap();

    session.logger("gateway.http").warn("upstream slow");
    assert!(session.shutdown());

    let records = exporter.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["body"], "upstream slow");
    assert_eq!(records[0]["service.name"], "gateway");
    assert_eq!(records[0]["trace_id"], format!("{:032x}", 0xabc));
    assert_eq!(records[0]["span_id"], format!("{:016x}", 0x12));
    assert_eq!(records[0]["trace_sampled"], true);
    assert_eq!(exporter.shutdown_count(), 1);
}

#[test]
fn test_reconfigure_switches_sinks() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let first = temp_dir.path().join("first.log");
    let second = temp_dir.path().join("second.log");

    let mut session = LoggingSession::start(
        LogSettings::new("svc")
            .without_console()
            .with_file(FileSettings::new(&first))
            .with_async(true),
    )
    .unwrap();
    let logger = session.logger("svc");
    logger.info("before");

    session
        .reconfigure(
            LogSettings::new("svc")
                .without_console()
                .with_file(FileSettings::new(&second))
                .with_async(false),
        )
        .unwrap();
    assert_eq!(session.state(), SessionState::Sync);

    logger.info("after");

    // Invalid settings leave the current pipeline running
    assert!(session
        .reconfigure(LogSettings::new("svc").with_level("LOUD"))
        .is_err());
    logger.info("still here");
    session.shutdown();

    let first_bodies: Vec<Value> = read_records(&first).into_iter().map(|r| r["body"].clone()).collect();
    let second_bodies: Vec<Value> = read_records(&second).into_iter().map(|r| r["body"].clone()).collect();
    assert_eq!(first_bodies, ["before"]);
    assert_eq!(second_bodies, ["after", "still here"]);
}

/// Exporter that takes a while per record and logs what it saw, tagged by
/// the pipeline that built it
struct SlowExporter {
    tag: String,
    timeline: Arc<Mutex<Vec<String>>>,
}

impl LogExporter for SlowExporter {
    fn export(&mut self, record: &Map<String, Value>) -> Result<()> {
        thread::sleep(Duration::from_millis(25));
        let body = record["body"].as_str().unwrap_or_default();
        self.timeline.lock().unwrap().push(format!("{}:{}", self.tag, body));
        Ok(())
    }

    fn shutdown(&mut self) -> Result<()> {
        self.timeline.lock().unwrap().push(format!("{}:shutdown", self.tag));
        Ok(())
    }
}

#[test]
fn test_reconfigure_waits_for_slow_drain() {
    let timeline = Arc::new(Mutex::new(Vec::new()));
    let builds = Arc::new(AtomicUsize::new(0));
    let factory = {
        let timeline = Arc::clone(&timeline);
        Arc::new(move |_: &ExporterConfig| -> Result<Box<dyn LogExporter>> {
            let tag = if builds.fetch_add(1, Ordering::SeqCst) == 0 { "old" } else { "new" };
            Ok(Box::new(SlowExporter {
                tag: tag.to_string(),
                timeline: Arc::clone(&timeline),
            }))
        })
    };

    // Shutdown timeout far shorter than the backlog takes to export
    let settings = LogSettings::new("svc")
        .without_console()
        .with_remote(RemoteSettings::default())
        .with_async(true)
        .with_shutdown_timeout(Duration::from_millis(20));

    let mut session =
        LoggingSession::start_with(settings.clone(), SessionOptions::new().exporter_factory(factory))
            .unwrap();
    let logger = session.logger("svc");
    for i in 0..20 {
        logger.event(LogLevel::Info, "e{}").arg(i).emit();
    }

    session.reconfigure(settings).unwrap();
    logger.info("new-1");
    assert!(session.shutdown_with_timeout(Duration::from_secs(10)));

    let mut expected: Vec<String> = (0..20).map(|i| format!("old:e{}", i)).collect();
    expected.push("old:shutdown".to_string());
    expected.push("new:new-1".to_string());
    expected.push("new:shutdown".to_string());
    assert_eq!(*timeline.lock().unwrap(), expected);
}

#[test]
fn test_reconfigure_reuses_same_file() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let log_file = temp_dir.path().join("same.log");
    let settings = LogSettings::new("svc")
        .without_console()
        .with_file(FileSettings::new(&log_file))
        .with_async(true);

    let mut session = LoggingSession::start(settings.clone()).unwrap();
    session.logger("svc").info("one");
    session.reconfigure(settings).unwrap();
    session.logger("svc").info("two");
    session.shutdown();

    assert_eq!(read_records(&log_file).len(), 2);
}

#[test]
fn test_context_merge_precedence() {
    let exporter = InMemoryExporter::new();
    let mut session = LoggingSession::start_with(
        LogSettings::new("svc")
            .without_console()
            .with_remote(RemoteSettings::default())
            .with_async(false)
            .with_static_attribute("region", "static")
            .with_static_attribute("tier", "static"),
        SessionOptions::new().exporter_factory(exporter.factory()),
    )
    .unwrap();
    let logger = session.logger("svc");

    {
        let _outer = log_context(Attributes::new().with_field("request_id", "r-1"));
        with_log_context(Attributes::new().with_field("tier", "context"), || {
            logger
                .event(LogLevel::Info, "inside")
                .attr("tier", "extra")
                .attr("region", "extra")
                .emit();
        });
        logger.info("outer only");
    }
    logger.info("no context");
    session.shutdown();

    let records = exporter.records();
    assert_eq!(records.len(), 3);

    assert_eq!(records[0]["request_id"], "r-1");
    assert_eq!(records[0]["tier"], "context");
    assert_eq!(records[0]["region"], "extra");

    assert_eq!(records[1]["request_id"], "r-1");
    assert_eq!(records[1]["tier"], "static");

    assert!(!records[2].contains_key("request_id"));
}

#[test]
fn test_drop_newest_keeps_earliest_events() {
    let exporter = InMemoryExporter::new();
    let mut session = LoggingSession::start_with(
        LogSettings::new("svc")
            .without_console()
            .with_remote(RemoteSettings::default())
            .with_queue(4, OverflowPolicy::DropNewest),
        SessionOptions::new().exporter_factory(exporter.factory()),
    )
    .unwrap();

    let logger = session.logger("svc");
    for i in 0..500 {
        logger.event(LogLevel::Info, "n{}").arg(i).emit();
    }
    session.shutdown();

    let metrics = session.metrics();
    let records = exporter.records();
    assert_eq!(records.len() as u64 + metrics.dropped_count(), 500);
    assert_eq!(records[0]["body"], "n0");
}

#[test]
fn test_exception_is_structured() {
    let exporter = InMemoryExporter::new();
    let mut session = LoggingSession::start_with(
        LogSettings::new("svc")
            .without_console()
            .with_remote(RemoteSettings::default())
            .with_async(false),
        SessionOptions::new().exporter_factory(exporter.factory()),
    )
    .unwrap();

    let err = std::io::Error::new(std::io::ErrorKind::NotFound, "config.toml missing");
    session.logger("svc").exception("startup failed", &err);
    session.shutdown();

    let records = exporter.records();
    assert_eq!(records[0]["severity_text"], "ERROR");
    assert_eq!(records[0]["exception.message"], "config.toml missing");
    assert!(records[0]["exception.type"].as_str().unwrap().contains("Error"));
}

#[test]
fn test_global_api_lifecycle() {
    // The process-wide session is shared, so the whole lifecycle runs in one test
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let log_file = temp_dir.path().join("global.log");

    let early = get_logger("global.early");
    early.info("before configure is discarded");
    assert_eq!(logging_state(), SessionState::Unconfigured);

    let first_guard = configure_logging(
        LogSettings::new("global")
            .without_console()
            .with_file(FileSettings::new(&log_file))
            .with_async(true),
    )
    .unwrap();
    assert_eq!(logging_state(), SessionState::Async);

    early.info("early handle now works");
    get_logger("global.late").info("late handle");

    let _guard = configure_logging(
        LogSettings::new("global")
            .without_console()
            .with_file(FileSettings::new(&log_file))
            .with_async(false),
    )
    .unwrap();
    assert_eq!(logging_state(), SessionState::Sync);

    // A guard from before the reconfigure no longer owns the session
    drop(first_guard);
    assert_eq!(logging_state(), SessionState::Sync);
    early.info("after reconfigure");

    assert!(shutdown_logging());
    assert_eq!(logging_state(), SessionState::Unconfigured);
    early.info("after shutdown is discarded");

    let bodies: Vec<Value> = read_records(&log_file).into_iter().map(|r| r["body"].clone()).collect();
    assert_eq!(bodies, ["early handle now works", "late handle", "after reconfigure"]);
}
