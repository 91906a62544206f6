//! Record formatting
//!
//! Turns a [`LogEvent`] into either an OpenTelemetry-style structured map
//! (serialized as one JSON object per line) or a single human-readable line
//! colored by severity. Formatting is pure: a formatter holds only read-only
//! configuration and can be shared across threads.

use super::log_event::LogEvent;
use super::metadata::{StaticMetadata, DEPLOYMENT_ENVIRONMENT, SERVICE_NAME, SERVICE_VERSION};
use super::redaction::Redactor;
use super::timestamp::TimeZoneMode;
use serde::Serialize;
use serde_json::{Map, Value};
use std::cell::OnceCell;
use std::sync::Arc;

/// Keys that extras are not allowed to overwrite
pub const CORE_KEYS: [&str; 4] = ["time", "severity_text", "severity_number", "body"];

/// Output format for a sink
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// One JSON object per line
    #[default]
    Json,

    /// Single colorized line for terminals
    ///
    /// Example: `2025-01-08T10:30:45.123456Z INFO orders - checkout [cart.rs:42 orders::cart()]`
    Human,
}

/// Field inclusion and rendering switches
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatOptions {
    pub time_zone: TimeZoneMode,
    pub json_indent: Option<usize>,
    pub include_logger_name: bool,
    pub include_thread: bool,
    pub include_pid: bool,
    pub include_host: bool,
    pub include_code: bool,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            time_zone: TimeZoneMode::Utc,
            json_indent: None,
            include_logger_name: true,
            include_thread: false,
            include_pid: true,
            include_host: true,
            include_code: true,
        }
    }
}

/// Formats events for one logging session
#[derive(Debug, Clone)]
pub struct RecordFormatter {
    metadata: Arc<StaticMetadata>,
    options: FormatOptions,
    redactor: Arc<Redactor>,
    host_name: Option<String>,
    pid: Option<u32>,
}

impl RecordFormatter {
    pub fn new(metadata: Arc<StaticMetadata>, options: FormatOptions, redactor: Arc<Redactor>) -> Self {
        let host_name = if options.include_host {
            resolve_host_name()
        } else {
            None
        };
        let pid = options.include_pid.then(std::process::id);

        Self {
            metadata,
            options,
            redactor,
            host_name,
            pid,
        }
    }

    pub fn options(&self) -> &FormatOptions {
        &self.options
    }

    pub fn metadata(&self) -> &StaticMetadata {
        &self.metadata
    }

    /// Build the redacted structured record for an event
    pub fn structured(&self, event: &LogEvent) -> Map<String, Value> {
        let mut out = Map::new();

        out.insert(
            "time".to_string(),
            Value::String(self.options.time_zone.format(&event.timestamp)),
        );
        out.insert(
            "severity_text".to_string(),
            Value::String(event.level.to_str().to_string()),
        );
        out.insert(
            "severity_number".to_string(),
            Value::from(event.level.severity_number()),
        );
        out.insert("body".to_string(), Value::String(event.body()));
        out.insert(
            SERVICE_NAME.to_string(),
            Value::String(self.metadata.service_name.clone()),
        );
        insert_opt(&mut out, SERVICE_VERSION, self.metadata.service_version.clone());
        insert_opt(&mut out, DEPLOYMENT_ENVIRONMENT, self.metadata.environment.clone());
        insert_opt(&mut out, "host.name", self.host_name.clone());
        insert_opt(&mut out, "process.pid", self.pid);

        if self.options.include_logger_name {
            insert_opt(&mut out, "logger.name", event.logger_name.clone());
        }
        if self.options.include_thread {
            let thread = event.thread_name.clone().unwrap_or_else(|| event.thread_id.clone());
            out.insert("thread.name".to_string(), Value::String(thread));
        }
        if self.options.include_code {
            if let Some(ref location) = event.location {
                out.insert("code.file.path".to_string(), Value::String(location.file.clone()));
                out.insert(
                    "code.function.name".to_string(),
                    Value::String(location.function.clone()),
                );
                out.insert("code.line.number".to_string(), Value::from(location.line));
            }
        }
        if let Some(trace) = event.trace {
            out.insert("trace_id".to_string(), Value::String(trace.trace_id_hex()));
            out.insert("span_id".to_string(), Value::String(trace.span_id_hex()));
            out.insert("trace_sampled".to_string(), Value::Bool(trace.sampled));
        }

        for (key, value) in event.attributes.iter() {
            if value.is_null() || CORE_KEYS.contains(&key.as_str()) {
                continue;
            }
            out.insert(key.clone(), value.clone());
        }

        if let Some(ref exception) = event.exception {
            out.insert(
                "exception.type".to_string(),
                Value::String(exception.type_name.clone()),
            );
            out.insert(
                "exception.message".to_string(),
                Value::String(exception.message.clone()),
            );
            out.insert(
                "exception.stacktrace".to_string(),
                Value::String(exception.stacktrace.trim_end().to_string()),
            );
        } else if let Some(ref stack) = event.stack {
            out.insert("stack".to_string(), Value::String(stack.trim_end().to_string()));
        }

        self.redactor.redact_map(&out)
    }

    /// Serialize a structured record to a single JSON document
    pub fn serialize(&self, record: &Map<String, Value>) -> String {
        match self.options.json_indent {
            None => serde_json::to_string(record).unwrap_or_default(),
            Some(width) => {
                let indent = vec![b' '; width];
                let formatter = serde_json::ser::PrettyFormatter::with_indent(&indent);
                let mut buf = Vec::new();
                let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
                match record.serialize(&mut ser) {
                    Ok(()) => String::from_utf8(buf).unwrap_or_default(),
                    Err(_) => serde_json::to_string(record).unwrap_or_default(),
                }
            }
        }
    }

    pub fn format_json(&self, event: &LogEvent) -> String {
        self.serialize(&self.structured(event))
    }

    /// Format as a single human-readable line
    pub fn format_human(&self, event: &LogEvent, colorize: bool) -> String {
        let timestamp = self.options.time_zone.format(&event.timestamp);
        let level = if colorize {
            format!(
                "\x1b[{}m{}\x1b[0m",
                event.level.color_code().to_fg_str(),
                event.level.to_str()
            )
        } else {
            event.level.to_str().to_string()
        };
        let logger = event
            .logger_name
            .as_deref()
            .unwrap_or(&self.metadata.service_name);
        let body = self.redactor.scrub_str(&sanitize_line(&event.body()));

        let mut line = format!("{} {} {} - {}", timestamp, level, logger, body);

        if let Some(ref location) = event.location {
            line.push_str(&format!(
                " [{}:{} {}()]",
                location.file_name(),
                location.line,
                location.function
            ));
        }

        if let Some(trace) = event.trace {
            line.push_str(&format!(
                " (trace_id={} span_id={})",
                trace.trace_id_hex(),
                trace.span_id_hex()
            ));
        }

        let extras: Map<String, Value> = event
            .attributes
            .iter()
            .filter(|(k, v)| {
                !v.is_null()
                    && !matches!(k.as_str(), SERVICE_NAME | SERVICE_VERSION | DEPLOYMENT_ENVIRONMENT)
            })
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        if !extras.is_empty() {
            for (key, value) in self.redactor.redact_map(&extras) {
                match value {
                    Value::String(s) => line.push_str(&format!(" {}={}", key, sanitize_line(&s))),
                    other => line.push_str(&format!(" {}={}", key, other)),
                }
            }
        }

        if let Some(ref exception) = event.exception {
            line.push_str(&format!(
                " {}: {}",
                self.redactor.scrub_str(&sanitize_line(&exception.type_name)),
                self.redactor.scrub_str(&sanitize_line(&exception.message))
            ));
        }

        line
    }
}

fn insert_opt<V: Into<Value>>(out: &mut Map<String, Value>, key: &str, value: Option<V>) {
    if let Some(value) = value {
        out.insert(key.to_string(), value.into());
    }
}

/// Escape line breaks so one record stays on one line
fn sanitize_line(text: &str) -> String {
    text.replace('\n', "\\n")
        .replace('\r', "\\r")
        .replace('\t', "\\t")
}

/// Host name from the environment, falling back to `/etc/hostname`
fn resolve_host_name() -> Option<String> {
    std::env::var("HOSTNAME")
        .ok()
        .or_else(|| std::fs::read_to_string("/etc/hostname").ok())
        .map(|h| h.trim().to_string())
        .filter(|h| !h.is_empty())
}

/// One event on its way through the sinks, formatted lazily and at most
/// once per representation
pub struct FormattedRecord<'a> {
    event: &'a LogEvent,
    formatter: &'a RecordFormatter,
    structured: OnceCell<Map<String, Value>>,
    json: OnceCell<String>,
}

impl<'a> FormattedRecord<'a> {
    pub fn new(event: &'a LogEvent, formatter: &'a RecordFormatter) -> Self {
        Self {
            event,
            formatter,
            structured: OnceCell::new(),
            json: OnceCell::new(),
        }
    }

    pub fn event(&self) -> &LogEvent {
        self.event
    }

    /// Redacted structured record
    pub fn structured(&self) -> &Map<String, Value> {
        self.structured
            .get_or_init(|| self.formatter.structured(self.event))
    }

    /// Serialized JSON document (without trailing newline)
    pub fn json(&self) -> &str {
        self.json
            .get_or_init(|| self.formatter.serialize(self.structured()))
    }

    pub fn human(&self, colorize: bool) -> String {
        self.formatter.format_human(self.event, colorize)
    }

    pub fn render(&self, format: OutputFormat, colorize: bool) -> String {
        match format {
            OutputFormat::Json => self.json().to_string(),
            OutputFormat::Human => self.human(colorize),
        }
    }
}
