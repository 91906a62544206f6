//! Logging settings
//!
//! [`LogSettings`] is the single configuration object a logging session is
//! built from. It deserializes with serde (every field has a default) and
//! also offers builder methods. [`LogSettings::validate`] is the
//! configure-time gate: every fatal configuration error surfaces there,
//! before any sink is opened.

use super::attributes::Attributes;
use super::error::{LoggerError, Result};
use super::log_level::LogLevel;
use super::metadata::StaticMetadata;
use super::output_format::FormatOptions;
use super::overflow_policy::OverflowPolicy;
use super::redaction::{Redactor, DEFAULT_REDACT_KEYS};
use super::timestamp::TimeZoneMode;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

/// Default shutdown timeout for draining the dispatch queue (5 seconds)
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

pub const PROTOCOL_HTTP: &str = "http/protobuf";
pub const PROTOCOL_GRPC: &str = "grpc";

const DEFAULT_HTTP_ENDPOINT: &str = "http://localhost:4318/v1/logs";
const DEFAULT_GRPC_ENDPOINT: &str = "localhost:4317";

pub const ENV_LOGS_ENDPOINT: &str = "OTEL_EXPORTER_OTLP_LOGS_ENDPOINT";
pub const ENV_ENDPOINT: &str = "OTEL_EXPORTER_OTLP_ENDPOINT";

/// How the console sink renders records
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsoleMode {
    /// Human-readable and colored when `dev_color` is set and stdout is a
    /// terminal, JSON otherwise
    #[default]
    Auto,
    Json,
    Human,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleSettings {
    /// Level override for this sink
    pub level: Option<String>,
    pub mode: ConsoleMode,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSettings {
    pub path: PathBuf,

    /// Rotate before the active file would reach this size; `None` or 0
    /// disables rotation
    #[serde(default)]
    pub rotate_bytes: Option<u64>,

    #[serde(default = "default_rotate_backups")]
    pub rotate_backups: usize,

    #[serde(default)]
    pub level: Option<String>,

    /// Gzip rotated backups
    #[serde(default)]
    pub compress: bool,
}

fn default_rotate_backups() -> usize {
    5
}

impl FileSettings {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            rotate_bytes: None,
            rotate_backups: default_rotate_backups(),
            level: None,
            compress: false,
        }
    }

    #[must_use]
    pub fn with_rotation(mut self, rotate_bytes: u64, rotate_backups: usize) -> Self {
        self.rotate_bytes = Some(rotate_bytes);
        self.rotate_backups = rotate_backups;
        self
    }

    #[must_use]
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = Some(level.into());
        self
    }

    #[must_use]
    pub fn with_compression(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }
}

/// Remote collector settings, handed to the exporter factory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteSettings {
    pub protocol: String,
    pub endpoint: Option<String>,
    /// Disable TLS verification on the exporter transport
    pub insecure: bool,
    pub headers: BTreeMap<String, String>,
    pub compression: Option<String>,
    pub timeout: Option<Duration>,
    pub level: Option<String>,
    pub resource_attributes: Attributes,
}

impl Default for RemoteSettings {
    fn default() -> Self {
        Self {
            protocol: PROTOCOL_HTTP.to_string(),
            endpoint: None,
            insecure: true,
            headers: BTreeMap::new(),
            compression: None,
            timeout: None,
            level: None,
            resource_attributes: Attributes::new(),
        }
    }
}

impl RemoteSettings {
    #[must_use]
    pub fn with_protocol(mut self, protocol: impl Into<String>) -> Self {
        self.protocol = protocol.into();
        self
    }

    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    #[must_use]
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = Some(level.into());
        self
    }

    #[must_use]
    pub fn with_resource_attribute<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<serde_json::Value>,
    {
        self.resource_attributes.insert(key, value);
        self
    }

    /// Canonical protocol name
    pub fn normalized_protocol(&self) -> Result<&'static str> {
        normalize_protocol(&self.protocol)
    }

    /// Endpoint from settings, then the OTLP environment variables, then the
    /// protocol default
    pub fn resolved_endpoint(&self) -> Result<String> {
        let protocol = self.normalized_protocol()?;
        Ok(resolve_endpoint(
            self.endpoint.as_deref(),
            protocol,
            |name| std::env::var(name).ok(),
        ))
    }
}

/// Map accepted spellings to `http/protobuf` or `grpc`
pub fn normalize_protocol(protocol: &str) -> Result<&'static str> {
    match protocol.trim().to_ascii_lowercase().as_str() {
        "http" | "http/protobuf" | "http_protobuf" | "http-protobuf" => Ok(PROTOCOL_HTTP),
        "grpc" | "grpc/protobuf" | "grpc_proto" | "grpc-protobuf" => Ok(PROTOCOL_GRPC),
        _ => Err(LoggerError::unsupported_protocol(protocol)),
    }
}

pub(crate) fn resolve_endpoint<F>(explicit: Option<&str>, protocol: &str, env: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    explicit
        .map(str::to_string)
        .filter(|e| !e.trim().is_empty())
        .or_else(|| env(ENV_LOGS_ENDPOINT).filter(|e| !e.trim().is_empty()))
        .or_else(|| env(ENV_ENDPOINT).filter(|e| !e.trim().is_empty()))
        .unwrap_or_else(|| {
            if protocol == PROTOCOL_GRPC {
                DEFAULT_GRPC_ENDPOINT.to_string()
            } else {
                DEFAULT_HTTP_ENDPOINT.to_string()
            }
        })
}

/// Settings for one logging session
///
/// # Example
///
/// ```
/// use otel_logger_system::{FileSettings, LogSettings, OverflowPolicy};
///
/// let settings = LogSettings::new("checkout")
///     .with_version("2.1.0")
///     .without_console()
///     .with_file(FileSettings::new("/var/log/checkout.jsonl").with_rotation(10 << 20, 3))
///     .with_queue(1024, OverflowPolicy::DropNewest)
///     .with_static_attribute("team", "core");
///
/// assert!(settings.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    pub service_name: String,
    pub service_version: Option<String>,
    pub environment: Option<String>,

    /// `None` disables the console sink
    pub console: Option<ConsoleSettings>,
    pub file: Option<FileSettings>,
    pub remote: Option<RemoteSettings>,

    /// Session minimum level: a name, an alias, or a level number
    pub level: String,
    pub utc: bool,
    pub async_mode: bool,
    /// Dispatch queue capacity; 0 means unbounded
    pub queue_capacity: usize,
    pub overflow_policy: OverflowPolicy,
    pub shutdown_timeout: Duration,
    pub json_indent: Option<usize>,
    pub dev_color: bool,

    pub include_logger_name: bool,
    pub include_thread: bool,
    pub include_pid: bool,
    pub include_host: bool,
    pub include_code: bool,
    /// Query the trace context provider for correlation ids
    pub try_trace_context: bool,

    pub static_attributes: Attributes,
    pub redact_keys: Vec<String>,
    pub redact_value_patterns: Vec<String>,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            service_name: "app".to_string(),
            service_version: None,
            environment: None,
            console: Some(ConsoleSettings::default()),
            file: None,
            remote: None,
            level: "INFO".to_string(),
            utc: true,
            async_mode: true,
            queue_capacity: 0,
            overflow_policy: OverflowPolicy::DropOldest,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
            json_indent: None,
            dev_color: false,
            include_logger_name: true,
            include_thread: false,
            include_pid: true,
            include_host: true,
            include_code: true,
            try_trace_context: true,
            static_attributes: Attributes::new(),
            redact_keys: DEFAULT_REDACT_KEYS.iter().map(|k| k.to_string()).collect(),
            redact_value_patterns: Vec::new(),
        }
    }
}

impl LogSettings {
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            ..Self::default()
        }
    }

    /// Parse settings from a JSON document
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.service_version = Some(version.into());
        self
    }

    #[must_use]
    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = Some(environment.into());
        self
    }

    #[must_use]
    pub fn with_console(mut self, console: ConsoleSettings) -> Self {
        self.console = Some(console);
        self
    }

    #[must_use]
    pub fn without_console(mut self) -> Self {
        self.console = None;
        self
    }

    #[must_use]
    pub fn with_file(mut self, file: FileSettings) -> Self {
        self.file = Some(file);
        self
    }

    #[must_use]
    pub fn with_remote(mut self, remote: RemoteSettings) -> Self {
        self.remote = Some(remote);
        self
    }

    #[must_use]
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }

    #[must_use]
    pub fn with_async(mut self, async_mode: bool) -> Self {
        self.async_mode = async_mode;
        self
    }

    #[must_use]
    pub fn with_queue(mut self, capacity: usize, policy: OverflowPolicy) -> Self {
        self.queue_capacity = capacity;
        self.overflow_policy = policy;
        self
    }

    #[must_use]
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_utc(mut self, utc: bool) -> Self {
        self.utc = utc;
        self
    }

    #[must_use]
    pub fn with_json_indent(mut self, indent: Option<usize>) -> Self {
        self.json_indent = indent;
        self
    }

    #[must_use]
    pub fn with_dev_color(mut self, dev_color: bool) -> Self {
        self.dev_color = dev_color;
        self
    }

    #[must_use]
    pub fn with_static_attribute<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<serde_json::Value>,
    {
        self.static_attributes.insert(key, value);
        self
    }

    #[must_use]
    pub fn with_redact_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.redact_keys = keys.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_redact_patterns<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.redact_value_patterns = patterns.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_trace_context(mut self, enabled: bool) -> Self {
        self.try_trace_context = enabled;
        self
    }

    /// Check that a session can be built from these settings
    ///
    /// Fails when no sink is enabled, when any level does not resolve, or
    /// when the remote protocol is unsupported.
    pub fn validate(&self) -> Result<()> {
        self.min_level()?;

        if self.console.is_none() && self.file.is_none() && self.remote.is_none() {
            return Err(LoggerError::config(
                "sinks",
                "no sink enabled; configure at least one of console, file or remote",
            ));
        }

        if let Some(ref console) = self.console {
            resolve_sink_level(console.level.as_deref())?;
        }

        if let Some(ref file) = self.file {
            if file.path.as_os_str().is_empty() {
                return Err(LoggerError::config("file", "path must not be empty"));
            }
            resolve_sink_level(file.level.as_deref())?;
        }

        if let Some(ref remote) = self.remote {
            remote.normalized_protocol()?;
            resolve_sink_level(remote.level.as_deref())?;
        }

        if self.service_name.trim().is_empty() {
            return Err(LoggerError::config("service_name", "must not be empty"));
        }

        Ok(())
    }

    /// Session-wide minimum level
    pub fn min_level(&self) -> Result<LogLevel> {
        LogLevel::resolve(&self.level)
    }

    pub(crate) fn static_metadata(&self) -> StaticMetadata {
        StaticMetadata {
            service_name: self.service_name.clone(),
            service_version: self.service_version.clone(),
            environment: self.environment.clone(),
            attributes: self.static_attributes.clone(),
        }
    }

    pub(crate) fn format_options(&self) -> FormatOptions {
        FormatOptions {
            time_zone: TimeZoneMode::from_utc_flag(self.utc),
            json_indent: self.json_indent,
            include_logger_name: self.include_logger_name,
            include_thread: self.include_thread,
            include_pid: self.include_pid,
            include_host: self.include_host,
            include_code: self.include_code,
        }
    }

    pub(crate) fn redactor(&self) -> Redactor {
        Redactor::new(&self.redact_keys, &self.redact_value_patterns)
    }
}

/// Resolve an optional per-sink level override; no override admits everything
pub(crate) fn resolve_sink_level(level: Option<&str>) -> Result<LogLevel> {
    match level {
        Some(level) => LogLevel::resolve(level),
        None => Ok(LogLevel::Trace),
    }
}
